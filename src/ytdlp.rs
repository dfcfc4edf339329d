use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::config::ServerConfiguration;

/// Max amount of stderr characters that are carried in error
const STDERR_EXCERPT_CHARS: usize = 1000;

#[derive(Debug, thiserror::Error)]
pub enum YtDlpError {
    #[error("failed to start {path}: {source}")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("yt-dlp command failed. Error: {stderr}")]
    Failed { status: ExitStatus, stderr: String },
    #[error("yt-dlp did not finish in {0:?}")]
    Timeout(Duration),
    #[error("yt-dlp output exceeded {limit} bytes")]
    OutputTooLarge { limit: usize },
    #[error("failed to read yt-dlp output: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse yt-dlp output: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug)]
struct CapturedOutput {
    bytes: Vec<u8>,
    truncated: bool,
}

#[derive(Debug)]
struct ProcessOutput {
    status: ExitStatus,
    stdout: CapturedOutput,
    stderr: CapturedOutput,
}

/// yt-dlp command runner.
///
/// Every run is bounded by timeout and output limits. Child process is killed when the run is cancelled.
#[derive(Debug, Clone)]
pub struct YtDlp {
    path: PathBuf,
    timeout: Duration,
    max_stdout: usize,
    max_stderr: usize,
}

impl YtDlp {
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
            max_stdout: 16 * 1024 * 1024,
            max_stderr: 64 * 1024,
        }
    }

    pub fn from_config(config: &ServerConfiguration) -> Self {
        Self::new(&config.ytdlp_path, config.ytdlp_timeout)
            .with_output_limits(config.ytdlp_max_stdout, config.ytdlp_max_stderr)
    }

    pub fn with_output_limits(mut self, max_stdout: usize, max_stderr: usize) -> Self {
        self.max_stdout = max_stdout;
        self.max_stderr = max_stderr;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Arguments that make yt-dlp print video info with resolved subtitles without downloading anything
    pub fn subtitle_info_args(url: &str, lang: &str) -> Vec<OsString> {
        [
            "--skip-download",
            "--write-subs",
            "--write-auto-subs",
            "--sub-langs",
            lang,
            "--sub-format",
            "json3",
            "--dump-single-json",
            "--no-warnings",
            "--no-playlist",
            "--",
            url,
        ]
        .into_iter()
        .map(OsString::from)
        .collect()
    }

    /// Video info json with `requested_subtitles` resolved for `lang`
    pub async fn subtitle_info(&self, url: &str, lang: &str) -> Result<Value, YtDlpError> {
        let output = self.run(Self::subtitle_info_args(url, lang)).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr.bytes);
            let stderr = stderr.trim();
            tracing::warn!(
                status = %output.status,
                stderr_truncated = output.stderr.truncated,
                "yt-dlp failed: {stderr}"
            );
            return Err(YtDlpError::Failed {
                status: output.status,
                stderr: excerpt(stderr, STDERR_EXCERPT_CHARS),
            });
        }
        if output.stdout.truncated {
            return Err(YtDlpError::OutputTooLarge {
                limit: self.max_stdout,
            });
        }
        Ok(serde_json::from_slice(&output.stdout.bytes)?)
    }

    /// Installed yt-dlp version
    pub async fn version(&self) -> Result<String, YtDlpError> {
        let output = self.run(vec!["--version".into()]).await?;
        let stdout = String::from_utf8_lossy(&output.stdout.bytes).trim().to_owned();
        if output.status.success() {
            Ok(stdout)
        } else {
            Err(YtDlpError::Failed {
                status: output.status,
                stderr: excerpt(
                    String::from_utf8_lossy(&output.stderr.bytes).trim(),
                    STDERR_EXCERPT_CHARS,
                ),
            })
        }
    }

    async fn run(&self, args: Vec<OsString>) -> Result<ProcessOutput, YtDlpError> {
        tracing::trace!("Running {} {:?}", self.path.display(), args);
        let mut child = Command::new(&self.path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| YtDlpError::Spawn {
                path: self.path.display().to_string(),
                source,
            })?;
        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(std::io::Error::other("child output is not captured").into());
        };

        let collect = async {
            tokio::try_join!(
                read_bounded(stdout, self.max_stdout),
                read_bounded(stderr, self.max_stderr),
                child.wait(),
            )
        };
        let result = tokio::time::timeout(self.timeout, collect).await;
        let (stdout, stderr, status) = match result {
            Ok(output) => output?,
            Err(_) => {
                tracing::warn!("yt-dlp did not finish in {:?}, killing it", self.timeout);
                if let Err(e) = child.kill().await {
                    tracing::error!("Failed to kill yt-dlp process: {e}");
                }
                return Err(YtDlpError::Timeout(self.timeout));
            }
        };
        tracing::debug!(%status, stdout_len = stdout.bytes.len(), "yt-dlp exited");
        Ok(ProcessOutput {
            status,
            stdout,
            stderr,
        })
    }
}

/// Read at most `limit` bytes. Everything past the limit is drained so the writer never blocks on full pipe
async fn read_bounded(
    mut reader: impl AsyncRead + Unpin,
    limit: usize,
) -> std::io::Result<CapturedOutput> {
    let mut bytes = Vec::new();
    (&mut reader)
        .take(limit as u64)
        .read_to_end(&mut bytes)
        .await?;
    let discarded = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await?;
    Ok(CapturedOutput {
        bytes,
        truncated: discarded > 0,
    })
}

fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_owned(),
    }
}

/// Look up `requested_subtitles.<lang>.url` in yt-dlp video info
pub fn find_subtitle_url<'a>(info: &'a Value, lang: &str) -> Option<&'a str> {
    info.get("requested_subtitles")?
        .get(lang)?
        .get("url")?
        .as_str()
}
