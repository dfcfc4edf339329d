use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::ytdlp::{find_subtitle_url, YtDlp, YtDlpError};

use super::{required_params, MissingParameters};

/// Response body of subtitle url service. All fields are always present
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SubtitleUrlResponse {
    pub success: bool,
    pub subtitle_url: Option<String>,
    pub error: Option<String>,
}

impl SubtitleUrlResponse {
    pub fn found(url: impl Into<String>) -> Self {
        Self {
            success: true,
            subtitle_url: Some(url.into()),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            subtitle_url: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug)]
pub enum SubtitleUrlError {
    MissingParameters,
    InvalidUrl(String),
    SubtitleNotFound { lang: String },
    ToolFailure(String),
    Internal(String),
}

impl SubtitleUrlError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingParameters | Self::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            Self::SubtitleNotFound { .. } => StatusCode::NOT_FOUND,
            Self::ToolFailure(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::MissingParameters => "Missing parameters. Required: url and lang.".to_owned(),
            Self::InvalidUrl(reason) => format!("invalid url: {reason}"),
            Self::SubtitleNotFound { lang } => {
                format!("no subtitle found for {lang}, check language code or availability")
            }
            Self::ToolFailure(message) => message.clone(),
            Self::Internal(details) => format!("internal server error: {details}"),
        }
    }
}

impl From<MissingParameters> for SubtitleUrlError {
    fn from(_: MissingParameters) -> Self {
        Self::MissingParameters
    }
}

impl From<YtDlpError> for SubtitleUrlError {
    fn from(err: YtDlpError) -> Self {
        match err {
            YtDlpError::Failed { .. } => Self::ToolFailure(err.to_string()),
            YtDlpError::Spawn { .. }
            | YtDlpError::Timeout(_)
            | YtDlpError::OutputTooLarge { .. }
            | YtDlpError::Io(_)
            | YtDlpError::Json(_) => Self::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for SubtitleUrlError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(SubtitleUrlResponse::failure(self.message())),
        )
            .into_response()
    }
}

fn check_url(input: &str) -> Result<(), SubtitleUrlError> {
    let url = url::Url::parse(input).map_err(|e| SubtitleUrlError::InvalidUrl(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(SubtitleUrlError::InvalidUrl(format!(
            "unsupported scheme {scheme}"
        ))),
    }
}

/// Resolve subtitle download url with yt-dlp
#[utoipa::path(
    get,
    path = "/get_subtitle_url",
    params(
        ("url" = String, Query, description = "Video url"),
        ("lang" = String, Query, description = "Subtitle language code"),
    ),
    responses(
        (status = 200, body = SubtitleUrlResponse),
        (status = 400, body = SubtitleUrlResponse, description = "Missing parameters or invalid url"),
        (status = 404, body = SubtitleUrlResponse, description = "Subtitle in requested language is not available"),
        (status = 500, body = SubtitleUrlResponse, description = "yt-dlp failed"),
    ),
    tag = "Subtitles",
)]
pub async fn get_subtitle_url(
    State(ytdlp): State<YtDlp>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<SubtitleUrlResponse>, SubtitleUrlError> {
    let (url, lang) = required_params(&params, ["url", "lang"])?;
    check_url(url)?;
    tracing::debug!(url, lang, "Subtitle url requested");

    let info = ytdlp.subtitle_info(url, lang).await.map_err(|err| {
        tracing::error!(url, lang, "Failed to resolve subtitles: {err}");
        SubtitleUrlError::from(err)
    })?;

    match find_subtitle_url(&info, lang) {
        Some(subtitle_url) => {
            tracing::info!(url, lang, "Resolved subtitle url");
            Ok(Json(SubtitleUrlResponse::found(subtitle_url)))
        }
        None => {
            tracing::info!(url, lang, "Subtitle is not available");
            Err(SubtitleUrlError::SubtitleNotFound {
                lang: lang.to_owned(),
            })
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use std::time::Duration;

    use axum::body::to_bytes;
    use serde_json::{json, Value};

    use super::*;

    /// Directory with fake yt-dlp executable. Removed on drop
    struct FakeYtDlp {
        dir: PathBuf,
        ytdlp: YtDlp,
    }

    impl FakeYtDlp {
        fn new(script: &str) -> Self {
            let mut dir = std::env::temp_dir();
            dir.push("youtube-subtitle-api-test");
            dir.push(uuid::Uuid::new_v4().to_string());
            std::fs::create_dir_all(&dir).unwrap();
            let path = dir.join("yt-dlp");
            std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            let ytdlp = YtDlp::new(&path, Duration::from_secs(5));
            Self { dir, ytdlp }
        }

        fn with_limits(mut self, timeout: Duration, max_stdout: usize) -> Self {
            self.ytdlp = YtDlp::new(self.ytdlp.path(), timeout).with_output_limits(max_stdout, 1024);
            self
        }

        async fn call(&self, pairs: &[(&str, &str)]) -> (StatusCode, Value) {
            let params = pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            let response = get_subtitle_url(State(self.ytdlp.clone()), Query(params))
                .await
                .into_response();
            let status = response.status();
            let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            (status, serde_json::from_slice(&body).unwrap())
        }
    }

    impl Drop for FakeYtDlp {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.dir);
        }
    }

    const VIDEO_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    #[tokio::test]
    async fn resolves_subtitle_url() {
        let fake = FakeYtDlp::new(
            r#"echo '{"id":"dQw4w9WgXcQ","requested_subtitles":{"en":{"ext":"json3","url":"https://x/y.vtt"}}}'"#,
        );
        let (status, body) = fake.call(&[("url", VIDEO_URL), ("lang", "en")]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "success": true, "subtitle_url": "https://x/y.vtt", "error": null })
        );
    }

    #[tokio::test]
    async fn passes_language_and_url_to_ytdlp() {
        // Echo the arguments back as subtitle url
        let fake = FakeYtDlp::new(
            r#"printf '{"requested_subtitles":{"de":{"url":"%s"}}}' "$*""#,
        );
        let (status, body) = fake.call(&[("url", VIDEO_URL), ("lang", "de")]).await;
        assert_eq!(status, StatusCode::OK);
        let args = body["subtitle_url"].as_str().unwrap();
        assert!(args.contains("--skip-download"));
        assert!(args.contains("--sub-langs de"));
        assert!(args.contains("--sub-format json3"));
        assert!(args.ends_with(&format!("-- {VIDEO_URL}")));
    }

    #[tokio::test]
    async fn language_not_available() {
        let fake = FakeYtDlp::new(
            r#"echo '{"id":"dQw4w9WgXcQ","requested_subtitles":{"en":{"url":"https://x/y.vtt"}}}'"#,
        );
        let (status, body) = fake.call(&[("url", VIDEO_URL), ("lang", "fr")]).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body,
            json!({
                "success": false,
                "subtitle_url": null,
                "error": "no subtitle found for fr, check language code or availability"
            })
        );

        let fake = FakeYtDlp::new(r#"echo '{"id":"dQw4w9WgXcQ","requested_subtitles":null}'"#);
        let (status, body) = fake.call(&[("url", VIDEO_URL), ("lang", "fr")]).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn failed_command_reports_stderr() {
        let fake = FakeYtDlp::new("echo 'ERROR: [youtube] dQw4w9WgXcQ: Video unavailable  ' >&2\nexit 1");
        let (status, body) = fake.call(&[("url", VIDEO_URL), ("lang", "en")]).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({
                "success": false,
                "subtitle_url": null,
                "error": "yt-dlp command failed. Error: ERROR: [youtube] dQw4w9WgXcQ: Video unavailable"
            })
        );
    }

    #[tokio::test]
    async fn invalid_json_is_internal_error() {
        let fake = FakeYtDlp::new("echo 'not json'");
        let (status, body) = fake.call(&[("url", VIDEO_URL), ("lang", "en")]).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("internal server error: "));
    }

    #[test_log::test(tokio::test)]
    async fn hung_process_is_killed() {
        let fake = FakeYtDlp::new("exec sleep 30").with_limits(Duration::from_millis(200), 1024);
        let started = std::time::Instant::now();
        let (status, body) = fake.call(&[("url", VIDEO_URL), ("lang", "en")]).await;
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("did not finish"));
    }

    #[tokio::test]
    async fn oversized_output_is_rejected() {
        let fake = FakeYtDlp::new(r#"head -c 4096 /dev/zero | tr '\0' 'a'"#)
            .with_limits(Duration::from_secs(5), 100);
        let (status, body) = fake.call(&[("url", VIDEO_URL), ("lang", "en")]).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("exceeded 100 bytes"));
    }

    #[tokio::test]
    async fn missing_parameters_skip_ytdlp() {
        // Any call of this script would be reported as success
        let fake = FakeYtDlp::new(r#"echo '{"requested_subtitles":{"en":{"url":"https://x/y.vtt"}}}'"#);
        for pairs in [
            &[][..],
            &[("url", VIDEO_URL)][..],
            &[("lang", "en")][..],
            &[("url", ""), ("lang", "en")][..],
        ] {
            let (status, body) = fake.call(pairs).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(
                body,
                json!({
                    "success": false,
                    "subtitle_url": null,
                    "error": "Missing parameters. Required: url and lang."
                })
            );
        }
    }

    #[tokio::test]
    async fn rejects_non_http_urls() {
        let fake = FakeYtDlp::new(r#"echo '{"requested_subtitles":{"en":{"url":"https://x/y.vtt"}}}'"#);
        for url in ["--exec=id", "file:///etc/passwd", "dQw4w9WgXcQ"] {
            let (status, body) = fake.call(&[("url", url), ("lang", "en")]).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{url} was accepted");
            assert!(body["error"].as_str().unwrap().starts_with("invalid url: "));
        }
    }
}
