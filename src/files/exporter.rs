use crate::error::{errors, NbResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The host's "download" trigger: makes a local file available to the user.
pub trait FileExporter {
    /// Export `path` and return where the user can find it.
    fn export(&self, path: &Path) -> NbResult<PathBuf>;
}

/// Terminal host: copies exported files into a target directory.
#[derive(Debug, Clone)]
pub struct DirectoryExporter {
    target_dir: PathBuf,
}

impl DirectoryExporter {
    pub fn new(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_dir: target_dir.into(),
        }
    }
}

impl FileExporter for DirectoryExporter {
    fn export(&self, path: &Path) -> NbResult<PathBuf> {
        let file_name = path.file_name().ok_or_else(|| {
            errors::validation_error(
                format!("{} has no file name", path.display()),
                Some("path"),
            )
        })?;

        fs::create_dir_all(&self.target_dir).map_err(|err| {
            errors::filesystem_error("Failed to create export directory", &self.target_dir, Some(err))
        })?;

        let destination = self.target_dir.join(file_name);

        // Exporting a file onto itself would truncate it
        if fs::canonicalize(path).ok() == fs::canonicalize(&destination).ok()
            && destination.exists()
        {
            return Ok(destination);
        }

        debug!("Copying {:?} to {:?}", path, destination);
        fs::copy(path, &destination)
            .map_err(|err| errors::filesystem_error("Failed to export file", path, Some(err)))?;
        Ok(destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn copies_into_target_and_overwrites() {
        let source_dir = TempDir::new().unwrap();
        let target_dir = TempDir::new().unwrap();
        let source = source_dir.path().join("report.zip");
        fs::write(&source, b"new contents").unwrap();
        fs::write(target_dir.path().join("report.zip"), b"old").unwrap();

        let exporter = DirectoryExporter::new(target_dir.path());
        let exported = exporter.export(&source).unwrap();

        assert_eq!(exported, target_dir.path().join("report.zip"));
        assert_eq!(fs::read(&exported).unwrap(), b"new contents");
    }

    #[test]
    fn exporting_in_place_keeps_contents() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.zip");
        fs::write(&source, b"payload").unwrap();

        let exported = DirectoryExporter::new(dir.path()).export(&source).unwrap();
        assert_eq!(fs::read(exported).unwrap(), b"payload");
    }

    #[test]
    fn missing_source_is_a_filesystem_error() {
        let dir = TempDir::new().unwrap();
        let err = DirectoryExporter::new(dir.path())
            .export(&dir.path().join("missing.zip"))
            .unwrap_err();
        assert_eq!(err.category(), crate::error::ErrorCategory::Filesystem);
    }
}
