use std::{
    fs::{self},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigLogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl FromStr for ConfigLogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(anyhow::anyhow!("{} does not match any log level", s)),
        }
    }
}

impl From<tracing::Level> for ConfigLogLevel {
    fn from(value: tracing::Level) -> Self {
        match value {
            tracing::Level::TRACE => Self::Trace,
            tracing::Level::DEBUG => Self::Debug,
            tracing::Level::INFO => Self::Info,
            tracing::Level::WARN => Self::Warn,
            tracing::Level::ERROR => Self::Error,
        }
    }
}

impl From<ConfigLogLevel> for tracing::Level {
    fn from(value: ConfigLogLevel) -> Self {
        match value {
            ConfigLogLevel::Trace => tracing::Level::TRACE,
            ConfigLogLevel::Debug => tracing::Level::DEBUG,
            ConfigLogLevel::Info => tracing::Level::INFO,
            ConfigLogLevel::Warn => tracing::Level::WARN,
            ConfigLogLevel::Error => tracing::Level::ERROR,
        }
    }
}

pub const PORT_ENV: &str = "PORT";
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";
pub const PUBLIC_URL_ENV: &str = "PUBLIC_URL";
pub const YTDLP_PATH_ENV: &str = "YTDLP_PATH";
pub const YTDLP_TIMEOUT_ENV: &str = "YTDLP_TIMEOUT_SECS";
pub const REQUEST_TIMEOUT_ENV: &str = "REQUEST_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfiguration {
    pub port: u16,
    pub log_level: ConfigLogLevel,
    /// Base url used in usage examples. Defaults to localhost with configured port
    pub public_url: Option<String>,
    pub ytdlp_path: PathBuf,
    pub ytdlp_timeout: Duration,
    pub ytdlp_max_stdout: usize,
    pub ytdlp_max_stderr: usize,
    /// Timeout of every request made to youtube by transcript client
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct TomlConfig {
    port: u16,
    log_level: ConfigLogLevel,
    public_url: Option<String>,
    ytdlp_path: PathBuf,
    ytdlp_timeout_secs: u64,
    ytdlp_max_stdout: usize,
    ytdlp_max_stderr: usize,
    request_timeout_secs: u64,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            log_level: ConfigLogLevel::Info,
            public_url: None,
            ytdlp_path: PathBuf::from("yt-dlp"),
            ytdlp_timeout_secs: 60,
            ytdlp_max_stdout: 16 * 1024 * 1024,
            ytdlp_max_stderr: 64 * 1024,
            request_timeout_secs: 30,
        }
    }
}

impl From<TomlConfig> for ServerConfiguration {
    fn from(toml: TomlConfig) -> Self {
        Self {
            port: toml.port,
            log_level: toml.log_level,
            public_url: toml.public_url,
            ytdlp_path: toml.ytdlp_path,
            ytdlp_timeout: Duration::from_secs(toml.ytdlp_timeout_secs),
            ytdlp_max_stdout: toml.ytdlp_max_stdout,
            ytdlp_max_stderr: toml.ytdlp_max_stderr,
            request_timeout: Duration::from_secs(toml.request_timeout_secs),
        }
    }
}

impl Default for ServerConfiguration {
    fn default() -> Self {
        TomlConfig::default().into()
    }
}

#[derive(Debug, Clone)]
pub struct ConfigFile(pub PathBuf);

impl ConfigFile {
    /// Open config file, creating one with defaults when it does not exist
    pub fn open(config_path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let path = config_path.as_ref().to_path_buf();
        match fs::OpenOptions::new()
            .read(true)
            .open(&config_path)
            .map_err(|e| e.kind())
        {
            Err(ErrorKind::NotFound) => {
                let default_config = TomlConfig::default();
                let mut file = fs::File::create_new(&config_path)?;
                file.write_all(toml::to_string_pretty(&default_config)?.as_bytes())?;
                tracing::info!(
                    "Created configuration file with defaults: {}",
                    config_path.as_ref().display()
                );
                Ok(ConfigFile(path))
            }
            Err(e) => Err(anyhow::anyhow!(
                "Unknown fs error occured while opening config: {e}"
            )),
            Ok(_) => Ok(ConfigFile(path)),
        }
    }

    /// Reads contents of config. Broken config is repaired field by field
    fn read(&self) -> Result<TomlConfig, anyhow::Error> {
        let buf = fs::read_to_string(&self.0)?;
        Ok(toml::from_str(&buf).unwrap_or_else(|e| {
            tracing::error!("Failed to read config: {}", e);
            match repair_config(&buf) {
                Ok(repaired_config) => {
                    tracing::info!("Successfuly repaired config");
                    repaired_config
                }
                Err(e) => {
                    tracing::error!("Failed to repair config, using defaults: {e}");
                    TomlConfig::default()
                }
            }
        }))
    }
}

fn repair_config(raw: &str) -> Result<TomlConfig, anyhow::Error> {
    tracing::trace!("Trying to repair config");
    let default = TomlConfig::default();
    let parsed: toml::Table = toml::from_str(raw)?;
    let integer = |key: &str| parsed.get(key).and_then(|v| v.as_integer());
    let string = |key: &str| parsed.get(key).and_then(|v| v.as_str());

    let port = integer("port")
        .and_then(|v| u16::try_from(v).ok())
        .unwrap_or(default.port);
    let log_level = string("log_level")
        .and_then(|s| ConfigLogLevel::from_str(s).ok())
        .unwrap_or(default.log_level);
    let public_url = string("public_url").map(String::from).or(default.public_url);
    let ytdlp_path = string("ytdlp_path").map_or(default.ytdlp_path, PathBuf::from);
    let ytdlp_timeout_secs = integer("ytdlp_timeout_secs")
        .and_then(|v| u64::try_from(v).ok())
        .unwrap_or(default.ytdlp_timeout_secs);
    let ytdlp_max_stdout = integer("ytdlp_max_stdout")
        .and_then(|v| usize::try_from(v).ok())
        .unwrap_or(default.ytdlp_max_stdout);
    let ytdlp_max_stderr = integer("ytdlp_max_stderr")
        .and_then(|v| usize::try_from(v).ok())
        .unwrap_or(default.ytdlp_max_stderr);
    let request_timeout_secs = integer("request_timeout_secs")
        .and_then(|v| u64::try_from(v).ok())
        .unwrap_or(default.request_timeout_secs);

    Ok(TomlConfig {
        port,
        log_level,
        public_url,
        ytdlp_path,
        ytdlp_timeout_secs,
        ytdlp_max_stdout,
        ytdlp_max_stderr,
        request_timeout_secs,
    })
}

impl ServerConfiguration {
    /// Resolve configuration: defaults, config file, environment and finally cli arguments
    pub fn load(args: &Args) -> Result<Self, anyhow::Error> {
        let mut config = match &args.config_path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.apply_args(args);
        Ok(config)
    }

    /// Tries to load config or creates default config file
    /// Errors when cant create or read file
    pub fn from_file(config_path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let file_config = ConfigFile::open(&config_path)?.read()?;
        tracing::debug!("Loaded config file {}", config_path.as_ref().display());
        Ok(file_config.into())
    }

    /// Apply overrides from environment. Unparsable values are ignored
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        fn parsed<T: FromStr>(key: &str, value: Option<String>) -> Option<T> {
            let value = value?;
            let value = value.trim();
            if value.is_empty() {
                return None;
            }
            match value.parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!("Ignoring invalid {key} environment variable: {value}");
                    None
                }
            }
        }

        if let Some(port) = parsed(PORT_ENV, var(PORT_ENV)) {
            self.port = port;
        }
        if let Some(level) = parsed(LOG_LEVEL_ENV, var(LOG_LEVEL_ENV)) {
            self.log_level = level;
        }
        if let Some(public_url) = var(PUBLIC_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.public_url = Some(public_url.trim().to_owned());
        }
        if let Some(path) = var(YTDLP_PATH_ENV).filter(|v| !v.trim().is_empty()) {
            self.ytdlp_path = PathBuf::from(path.trim());
        }
        if let Some(secs) = parsed(YTDLP_TIMEOUT_ENV, var(YTDLP_TIMEOUT_ENV)) {
            self.ytdlp_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parsed(REQUEST_TIMEOUT_ENV, var(REQUEST_TIMEOUT_ENV)) {
            self.request_timeout = Duration::from_secs(secs);
        }
    }

    pub fn apply_args(&mut self, args: &Args) {
        if let Some(port) = args.port {
            self.port = port;
        }
        if let Some(level) = args.log_level {
            self.log_level = level.into();
        }
    }

    /// Base url of this deployment without trailing slash
    pub fn public_url(&self) -> String {
        match &self.public_url {
            Some(url) => url.trim_end_matches('/').to_owned(),
            None => format!("http://localhost:{}", self.port),
        }
    }
}

#[derive(Debug, Parser)]
#[command(version, about = "YouTube subtitle REST api")]
pub struct Args {
    #[command(subcommand)]
    pub service: Service,
    /// Override port
    #[arg(short, long, global = true)]
    pub port: Option<u16>,
    /// Override log level
    #[arg(short, long, global = true)]
    pub log_level: Option<tracing::Level>,
    /// Provide config file location
    #[arg(short, long, global = true)]
    pub config_path: Option<PathBuf>,
}

/// Service that is served by the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Service {
    /// Transcript of a video fetched from youtube (`GET /get_subtitle`)
    Transcript,
    /// Subtitle download url resolved by yt-dlp (`GET /get_subtitle_url`)
    SubtitleUrl,
}
