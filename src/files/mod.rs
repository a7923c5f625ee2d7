//! Local file helpers
//!
//! Archive a folder and hand it to the host's export trigger, or prompt the
//! user for files to upload into the session.

pub mod archive;
pub mod exporter;
pub mod upload_prompt;

pub use archive::{archive_and_export, archive_name_for, Archiver};
pub use exporter::{DirectoryExporter, FileExporter};
pub use upload_prompt::{read_uploads, save_uploads, TerminalUploadPrompt, UploadPrompt, UploadedFiles};
