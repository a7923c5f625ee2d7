//! Unified error handling for nbdrive
//!
//! Every fallible operation in the crate returns [`NbResult`]. Errors are
//! classified so the CLI can pick a user-facing message and exit status.

use anyhow::Error as AnyhowError;
use std::fmt;
use std::io;
use thiserror::Error;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum NbDriveError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        source: Option<BoxedSource>,
    },

    /// Authentication errors
    #[error("Authentication error: {message}")]
    Auth {
        message: String,
        source: Option<BoxedSource>,
    },

    /// Network errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        url: Option<String>,
        source: Option<BoxedSource>,
    },

    /// Filesystem errors
    #[error("Filesystem error: {message} (path: {path})")]
    Filesystem {
        message: String,
        path: String,
        source: Option<BoxedSource>,
    },

    /// Archive command failures
    #[error("Archive error: {message}")]
    Archive {
        message: String,
        command: String,
        exit_code: Option<i32>,
    },

    /// Google Drive API errors
    #[error("Drive error ({operation}): {message}")]
    Drive {
        operation: DriveOperation,
        message: String,
        status: Option<u16>,
    },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// The user backed out of an interactive prompt
    #[error("Cancelled: {message}")]
    Cancelled { message: String },

    /// Unknown errors
    #[error("Unknown error: {message}")]
    Unknown {
        message: String,
        source: Option<BoxedSource>,
    },
}

/// Remote operations against Google Drive, used for messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveOperation {
    DeviceAuthorization,
    TokenRefresh,
    Upload,
    Search,
    GetContents,
    Download,
    Update,
    CreateFolder,
}

impl fmt::Display for DriveOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DriveOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriveOperation::DeviceAuthorization => "device_authorization",
            DriveOperation::TokenRefresh => "token_refresh",
            DriveOperation::Upload => "upload",
            DriveOperation::Search => "search",
            DriveOperation::GetContents => "get_contents",
            DriveOperation::Download => "download",
            DriveOperation::Update => "update",
            DriveOperation::CreateFolder => "create_folder",
        }
    }
}

impl NbDriveError {
    /// Get error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            NbDriveError::Config { .. } => ErrorCategory::Config,
            NbDriveError::Auth { .. } => ErrorCategory::Auth,
            NbDriveError::Network { .. } => ErrorCategory::Network,
            NbDriveError::Filesystem { .. } => ErrorCategory::Filesystem,
            NbDriveError::Archive { .. } => ErrorCategory::Archive,
            NbDriveError::Drive { .. } => ErrorCategory::Drive,
            NbDriveError::Validation { .. } => ErrorCategory::Validation,
            NbDriveError::Cancelled { .. } => ErrorCategory::Cancelled,
            NbDriveError::Unknown { .. } => ErrorCategory::Unknown,
        }
    }

    /// Check if retrying the same call could succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            NbDriveError::Config { .. } => false,
            NbDriveError::Auth { .. } => true,
            NbDriveError::Network { .. } => true,
            NbDriveError::Filesystem { .. } => false,
            NbDriveError::Archive { .. } => false,
            NbDriveError::Drive { status, .. } => {
                matches!(status, Some(429) | Some(500..=599) | None)
            }
            NbDriveError::Validation { .. } => true,
            NbDriveError::Cancelled { .. } => true,
            NbDriveError::Unknown { .. } => true,
        }
    }

    /// Returns the Drive operation associated with the error, if any.
    pub fn drive_operation(&self) -> Option<DriveOperation> {
        if let NbDriveError::Drive { operation, .. } = self {
            Some(*operation)
        } else {
            None
        }
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            NbDriveError::Config { message, .. } => {
                format!("Configuration problem: {}", message)
            }
            NbDriveError::Auth { message, .. } => {
                format!("Google Drive sign-in failed: {}", message)
            }
            NbDriveError::Network { message, .. } => format!("Network issue: {}", message),
            NbDriveError::Filesystem { message, .. } => {
                format!("File system problem: {}", message)
            }
            NbDriveError::Archive { message, .. } => {
                format!("Failed to create archive: {}", message)
            }
            NbDriveError::Drive {
                operation, message, ..
            } => match operation {
                DriveOperation::DeviceAuthorization | DriveOperation::TokenRefresh => {
                    format!("Google Drive authentication required: {}", message)
                }
                DriveOperation::Upload => format!("Upload failed: {}", message),
                DriveOperation::Search => format!("Search failed: {}", message),
                DriveOperation::GetContents => format!("Reading file failed: {}", message),
                DriveOperation::Download => format!("Download failed: {}", message),
                DriveOperation::Update => format!("Update failed: {}", message),
                DriveOperation::CreateFolder => format!("Creating folder failed: {}", message),
            },
            NbDriveError::Validation { message, .. } => {
                format!("Input validation failed: {}", message)
            }
            NbDriveError::Cancelled { message } => format!("Cancelled: {}", message),
            NbDriveError::Unknown { message, .. } => format!("Unexpected error: {}", message),
        }
    }
}

impl From<AnyhowError> for NbDriveError {
    fn from(err: AnyhowError) -> Self {
        NbDriveError::Unknown {
            message: err.to_string(),
            source: None,
        }
    }
}

impl From<io::Error> for NbDriveError {
    fn from(err: io::Error) -> Self {
        NbDriveError::Filesystem {
            message: format!("I/O error: {err}"),
            path: "<io>".to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<reqwest::Error> for NbDriveError {
    fn from(err: reqwest::Error) -> Self {
        NbDriveError::Network {
            message: format!("Request to Google failed: {err}"),
            url: err.url().map(|url| url.to_string()),
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_json::Error> for NbDriveError {
    fn from(err: serde_json::Error) -> Self {
        NbDriveError::Config {
            message: format!("JSON error: {err}"),
            source: Some(Box::new(err)),
        }
    }
}

impl From<config::ConfigError> for NbDriveError {
    fn from(err: config::ConfigError) -> Self {
        NbDriveError::Config {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

/// Error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Config,
    Auth,
    Network,
    Filesystem,
    Archive,
    Drive,
    Validation,
    Cancelled,
    Unknown,
}

/// Result type alias for convenience
pub type NbResult<T> = Result<T, NbDriveError>;

/// Constructors for the common error shapes
pub mod errors {
    use super::*;

    pub fn config_error(message: impl Into<String>) -> NbDriveError {
        NbDriveError::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn validation_error(message: impl Into<String>, field: Option<&str>) -> NbDriveError {
        NbDriveError::Validation {
            message: message.into(),
            field: field.map(str::to_string),
        }
    }

    pub fn filesystem_error(
        message: impl Into<String>,
        path: impl AsRef<std::path::Path>,
        source: Option<io::Error>,
    ) -> NbDriveError {
        NbDriveError::Filesystem {
            message: message.into(),
            path: path.as_ref().display().to_string(),
            source: source.map(|err| Box::new(err) as BoxedSource),
        }
    }
}
