//! nbdrive Library
//!
//! Convenience helpers for interactive sessions: zip and export a folder,
//! prompt for uploads, and thin pass-through calls to the Google Drive API.

pub mod commands;
pub mod config;
pub mod drive;
pub mod error;
pub mod files;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::Settings;
pub use drive::{sign_in, sign_out, DriveClient};
pub use error::{NbDriveError, NbResult};
pub use files::{archive_and_export, Archiver, DirectoryExporter, UploadedFiles};
