//! Error types for Transcribe4All
//!
//! Provides structured error handling with:
//! - Numeric error codes for machine parsing
//! - User-friendly messages with suggestions
//! - Exit codes for CLI
//!
//! Task outcomes are *not* errors of this type: a failed or panicked task is
//! only ever observable as [`TaskStatus::Failure`](crate::executor::TaskStatus).

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::executor::{QueryError, TaskId};

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,

    // IO errors (2xx)
    IoRead = 200,
    IoWrite = 201,
    IoPermission = 202,
    IoNotFound = 203,

    // Download errors (3xx)
    DownloadFailed = 300,
    DownloadStatus = 301,
    InvalidUrl = 302,

    // Conversion errors (4xx)
    ConversionFailed = 400,
    ConverterMissing = 401,

    // Task errors (5xx)
    TaskNotFound = 500,

    // Request validation errors (6xx)
    InvalidRequest = 600,

    // Notification errors (7xx)
    NotifyFailed = 700,

    // Internal errors (9xx)
    InternalError = 900,
}

impl ErrorCode {
    /// Get the string code (e.g., "E100")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Get the exit code for CLI (maps to 1-125 range)
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10,
            200..=299 => 20,
            300..=399 => 30,
            400..=499 => 40,
            500..=599 => 50,
            600..=699 => 60,
            700..=799 => 70,
            900..=999 => 90,
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for the service
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration parse error
    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<toml::de::Error>,
    },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String, field: Option<String> },

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────

    /// File read error
    #[error("Failed to read file: {path}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File write error
    #[error("Failed to write file: {path}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    // ─────────────────────────────────────────────────────────────
    // Download Errors
    // ─────────────────────────────────────────────────────────────

    /// Transport-level download failure
    #[error("Failed to download {url}: {message}")]
    DownloadFailed { url: String, message: String },

    /// Server answered with a non-success status
    #[error("Download of {url} returned HTTP {status}")]
    DownloadStatus { url: String, status: u16 },

    /// URL cannot be used as an audio source
    #[error("Invalid audio URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    // ─────────────────────────────────────────────────────────────
    // Conversion Errors
    // ─────────────────────────────────────────────────────────────

    /// Converter ran but exited unsuccessfully
    #[error("Audio conversion of {input} failed: {message}")]
    ConversionFailed { input: PathBuf, message: String },

    /// Converter binary could not be started
    #[error("Could not run converter '{program}': {source}")]
    ConverterMissing {
        program: String,
        #[source]
        source: std::io::Error,
    },

    // ─────────────────────────────────────────────────────────────
    // Notification Errors
    // ─────────────────────────────────────────────────────────────

    /// Job notification e-mail could not be built or delivered
    #[error("Failed to notify {recipients}: {message}")]
    NotifyFailed { recipients: String, message: String },

    // ─────────────────────────────────────────────────────────────
    // Task / Request Errors
    // ─────────────────────────────────────────────────────────────

    /// Status lookup for an id this executor never issued
    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    /// Rejected job submission
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::NotFound(id) => Error::TaskNotFound(id),
        }
    }
}

impl Error {
    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Error::ConfigValidation { .. } => ErrorCode::ConfigValidation,

            Error::IoRead { .. } => ErrorCode::IoRead,
            Error::IoWrite { .. } => ErrorCode::IoWrite,
            Error::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::IoNotFound,
                std::io::ErrorKind::PermissionDenied => ErrorCode::IoPermission,
                _ => ErrorCode::IoRead,
            },
            Error::Toml(_) => ErrorCode::ConfigParseError,

            Error::DownloadFailed { .. } => ErrorCode::DownloadFailed,
            Error::DownloadStatus { .. } => ErrorCode::DownloadStatus,
            Error::InvalidUrl { .. } => ErrorCode::InvalidUrl,

            Error::ConversionFailed { .. } => ErrorCode::ConversionFailed,
            Error::ConverterMissing { .. } => ErrorCode::ConverterMissing,

            Error::NotifyFailed { .. } => ErrorCode::NotifyFailed,

            Error::TaskNotFound(_) => ErrorCode::TaskNotFound,
            Error::InvalidRequest(_) => ErrorCode::InvalidRequest,

            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    /// Get a user-friendly suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => Some(
                "Run 'transcribe4all config init' to create a default configuration file.",
            ),
            Error::ConfigParse { .. } => Some(
                "Check your configuration file syntax. Run 'transcribe4all config validate' to see details.",
            ),
            Error::ConfigValidation { .. } => Some(
                "Review the configuration file and fix the invalid values.",
            ),
            Error::ConverterMissing { .. } => Some(
                "Install ffmpeg or point 'transcription.ffmpeg_path' at the binary.",
            ),
            Error::InvalidUrl { .. } => Some(
                "The audio URL must be an http(s) link ending in a file name.",
            ),
            Error::NotifyFailed { .. } => Some(
                "Check the [email] account settings and that the SMTP server is reachable.",
            ),
            _ => None,
        }
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let mut output = format!("\x1b[31mError [{}]\x1b[0m: {}\n", self.code().as_str(), self);

        if let Some(hint) = self.suggestion() {
            output.push_str(&format!("\n\x1b[33mHint\x1b[0m: {}\n", hint));
        }

        output
    }

    /// Format the error for logging (no colors)
    pub fn format_for_log(&self) -> String {
        format!("[{}] {}", self.code().as_str(), self)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    /// Create a config not found error
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Error::ConfigNotFound { path: path.into() }
    }

    /// Create a config validation error
    pub fn config_validation(message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a config validation error with field name
    pub fn config_field_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create an invalid URL error
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a download failure error
    pub fn download_failed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Error::DownloadFailed {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a notification failure error
    pub fn notify_failed(recipients: &[String], message: impl Into<String>) -> Self {
        Error::NotifyFailed {
            recipients: recipients.join(", "),
            message: message.into(),
        }
    }
}
