//! Configuration system for Transcribe4All
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (TRANSCRIBE_* prefix)
//! 3. Configuration file (TOML)
//! 4. Default values

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings
    pub server: ServerSettings,

    /// Transcription pipeline settings
    pub transcription: TranscriptionSettings,

    /// Outgoing mail account used to notify job submitters
    pub email: EmailSettings,

    /// Logging configuration
    pub logging: LoggingSettings,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Interface to bind
    pub host: String,

    /// TCP port to listen on
    pub port: u16,
}

/// Transcription pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Directory holding one working directory per job
    pub work_dir: String,

    /// ffmpeg executable (name on PATH or absolute path)
    pub ffmpeg_path: String,

    /// Timeout for downloading the source audio, in seconds
    pub download_timeout_secs: u64,
}

/// Outgoing mail settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailSettings {
    /// Account name, also used as the From address
    pub username: String,

    /// Account password. Never written back out by `config show`.
    #[serde(skip_serializing)]
    pub password: String,

    /// SMTP server host
    pub smtp_host: String,

    /// SMTP server port
    pub smtp_port: u16,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            work_dir: "~/.transcribe4all/work".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
            download_timeout_secs: 600,
        }
    }
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
        }
    }
}

impl EmailSettings {
    /// Whether notification e-mails should be sent
    pub fn is_configured(&self) -> bool {
        !self.username.trim().is_empty()
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_files: 5,
            json_format: false,
        }
    }
}

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl AppConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = Self::find_config_file(config_path)? {
            debug!(path = %path.display(), "Loading configuration file");
            let content = fs::read_to_string(&path).map_err(|e| Error::IoRead {
                path: path.clone(),
                source: e,
            })?;
            config = toml::from_str(&content).map_err(|e| Error::ConfigParse {
                message: format!("{}: {}", path.display(), e.message()),
                source: Some(e),
            })?;
            info!(path = %path.display(), "Configuration loaded from file");
        }

        config.apply_env_overrides();
        config.expand_paths();
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            return if path.exists() {
                Ok(Some(path))
            } else {
                Err(Error::config_not_found(path))
            };
        }

        let search_paths = [
            PathBuf::from("transcribe4all.toml"),
            PathBuf::from("config.toml"),
            dirs::config_dir()
                .map(|p| p.join("transcribe4all").join("config.toml"))
                .unwrap_or_default(),
            dirs::home_dir()
                .map(|p| p.join(".transcribe4all").join("config.toml"))
                .unwrap_or_default(),
        ];

        for path in &search_paths {
            if !path.as_os_str().is_empty() && path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("TRANSCRIBE_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("TRANSCRIBE_PORT") {
            if let Ok(n) = val.parse() {
                self.server.port = n;
            }
        }

        if let Ok(val) = std::env::var("TRANSCRIBE_WORK_DIR") {
            self.transcription.work_dir = val;
        }
        if let Ok(val) = std::env::var("TRANSCRIBE_FFMPEG_PATH") {
            self.transcription.ffmpeg_path = val;
        }
        if let Ok(val) = std::env::var("TRANSCRIBE_DOWNLOAD_TIMEOUT_SECS") {
            if let Ok(n) = val.parse() {
                self.transcription.download_timeout_secs = n;
            }
        }

        if let Ok(val) = std::env::var("TRANSCRIBE_EMAIL_USERNAME") {
            self.email.username = val;
        }
        if let Ok(val) = std::env::var("TRANSCRIBE_EMAIL_PASSWORD") {
            self.email.password = val;
        }
        if let Ok(val) = std::env::var("TRANSCRIBE_SMTP_HOST") {
            self.email.smtp_host = val;
        }
        if let Ok(val) = std::env::var("TRANSCRIBE_SMTP_PORT") {
            if let Ok(n) = val.parse() {
                self.email.smtp_port = n;
            }
        }

        if let Ok(val) = std::env::var("TRANSCRIBE_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("TRANSCRIBE_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Ok(val) = std::env::var("TRANSCRIBE_LOG_JSON") {
            self.logging.json_format = val.to_lowercase() == "true" || val == "1";
        }
    }

    /// Expand ~ and other path variables
    fn expand_paths(&mut self) {
        self.transcription.work_dir = expand_path(&self.transcription.work_dir);

        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(Error::config_field_invalid("server.host", "host cannot be empty"));
        }
        if self.server.port == 0 {
            return Err(Error::config_field_invalid("server.port", "port must be non-zero"));
        }

        if self.transcription.ffmpeg_path.trim().is_empty() {
            return Err(Error::config_field_invalid(
                "transcription.ffmpeg_path",
                "ffmpeg path cannot be empty",
            ));
        }
        if self.transcription.download_timeout_secs == 0 {
            return Err(Error::config_field_invalid(
                "transcription.download_timeout_secs",
                "download timeout must be at least one second",
            ));
        }

        if self.email.is_configured() {
            if !self.email.username.contains('@') {
                return Err(Error::config_field_invalid(
                    "email.username",
                    format!("'{}' is not an e-mail address", self.email.username),
                ));
            }
            if self.email.smtp_host.trim().is_empty() {
                return Err(Error::config_field_invalid(
                    "email.smtp_host",
                    "SMTP host cannot be empty when e-mail is enabled",
                ));
            }
            if self.email.smtp_port == 0 {
                return Err(Error::config_field_invalid(
                    "email.smtp_port",
                    "SMTP port must be non-zero",
                ));
            }
        }

        if !VALID_LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            ));
        }

        Ok(())
    }

    /// Address the HTTP listener binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Get the job work directory as a PathBuf
    pub fn work_dir(&self) -> PathBuf {
        PathBuf::from(&self.transcription.work_dir)
    }
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or(std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Initialize a new configuration file
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".transcribe4all")
                .join("config.toml")
        });

    if config_path.exists() && !force {
        return Err(Error::config_validation(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::IoWrite {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    fs::write(&config_path, generate_default_config()).map_err(|e| Error::IoWrite {
        path: config_path.clone(),
        source: e,
    })?;

    Ok(config_path)
}

/// Generate default configuration content with comments
fn generate_default_config() -> String {
    r#"# Transcribe4All Configuration

[server]
# Interface to bind
host = "0.0.0.0"

# TCP port to listen on
port = 8080

[transcription]
# Directory holding one working directory per job
work_dir = "~/.transcribe4all/work"

# ffmpeg executable (name on PATH or absolute path)
ffmpeg_path = "ffmpeg"

# Timeout for downloading the source audio, in seconds
download_timeout_secs = 600

[email]
# Account name, also used as the From address.
# Leave empty to skip job notification e-mails.
username = ""

# Account password (prefer TRANSCRIBE_EMAIL_PASSWORD)
# password = ""

smtp_host = "smtp.gmail.com"
smtp_port = 587

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (comment out to disable file logging)
# file = "~/.transcribe4all/logs/transcribe4all.log"

# Number of rotated log files to keep
max_files = 5

# Enable JSON formatted logging
json_format = false
"#
    .to_string()
}
