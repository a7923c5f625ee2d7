use super::exporter::FileExporter;
use crate::config::DEFAULT_ARCHIVE_COMMAND;
use crate::error::{errors, NbDriveError, NbResult};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

/// Archive name for `folder`: `<folder>.zip`, ignoring trailing separators.
pub fn archive_name_for(folder: &Path) -> PathBuf {
    let raw = folder.as_os_str().to_string_lossy();
    let trimmed = raw.trim_end_matches(['/', '\\']);
    let base = if trimmed.is_empty() { &*raw } else { trimmed };

    let mut name = OsString::from(base);
    name.push(".zip");
    PathBuf::from(name)
}

/// Shells out to an external zip executable.
#[derive(Debug, Clone)]
pub struct Archiver {
    command: String,
}

impl Default for Archiver {
    fn default() -> Self {
        Self::new(DEFAULT_ARCHIVE_COMMAND)
    }
}

impl Archiver {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Compress `folder` recursively into `<folder>.zip` and return that path.
    ///
    /// An existing archive of the same name is replaced, not updated.
    pub async fn archive(&self, folder: &Path) -> NbResult<PathBuf> {
        if !folder.is_dir() {
            return Err(errors::validation_error(
                format!("{} is not a directory", folder.display()),
                Some("folder"),
            ));
        }

        let executable = which::which(&self.command).map_err(|err| NbDriveError::Archive {
            message: format!("archive command '{}' not found: {}", self.command, err),
            command: self.command.clone(),
            exit_code: None,
        })?;

        let zip_path = archive_name_for(folder);
        if zip_path.exists() {
            debug!("Removing stale archive {:?}", zip_path);
            tokio::fs::remove_file(&zip_path).await.map_err(|err| {
                errors::filesystem_error("Failed to remove existing archive", &zip_path, Some(err))
            })?;
        }

        info!("Archiving {:?} into {:?}", folder, zip_path);

        let output = Command::new(&executable)
            .arg("-q")
            .arg("-r")
            .arg(&zip_path)
            .arg(folder)
            .output()
            .await
            .map_err(|err| NbDriveError::Archive {
                message: format!("failed to run {}: {}", self.command, err),
                command: self.command.clone(),
                exit_code: None,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(NbDriveError::Archive {
                message: format!(
                    "{} exited with {}: {}",
                    self.command,
                    output.status,
                    stderr.trim()
                ),
                command: self.command.clone(),
                exit_code: output.status.code(),
            });
        }

        Ok(zip_path)
    }
}

/// Zip `folder` and pass the archive to the host's export trigger.
///
/// Returns the archive path, not the exported copy.
pub async fn archive_and_export(
    archiver: &Archiver,
    exporter: &dyn FileExporter,
    folder: &Path,
) -> NbResult<PathBuf> {
    let zip_path = archiver.archive(folder).await?;
    let exported = exporter.export(&zip_path)?;
    info!("Exported {:?} to {:?}", zip_path, exported);
    Ok(zip_path)
}
