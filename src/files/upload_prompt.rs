use crate::error::{errors, NbDriveError, NbResult};
use dialoguer::theme::ColorfulTheme;
use dialoguer::Input;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Uploaded file name mapped to its raw bytes.
pub type UploadedFiles = BTreeMap<String, Vec<u8>>;

/// The host's upload widget.
pub trait UploadPrompt {
    /// Block until the user picks files (or cancels) and return their contents.
    fn prompt(&self) -> NbResult<UploadedFiles>;
}

/// Asks for file paths on the terminal, one per line, until an empty answer.
#[derive(Debug, Clone, Default)]
pub struct TerminalUploadPrompt;

impl UploadPrompt for TerminalUploadPrompt {
    fn prompt(&self) -> NbResult<UploadedFiles> {
        let theme = ColorfulTheme::default();
        let paths = collect_paths(|label| {
            Input::with_theme(&theme)
                .with_prompt(label)
                .allow_empty(true)
                .validate_with(|input: &String| -> Result<(), String> {
                    let trimmed = input.trim();
                    if trimmed.is_empty() || Path::new(trimmed).is_file() {
                        Ok(())
                    } else {
                        Err(format!("{} is not a readable file", trimmed))
                    }
                })
                .interact_text()
                .map_err(|err| NbDriveError::Cancelled {
                    message: format!("upload prompt closed: {err}"),
                })
        })?;
        read_uploads(paths)
    }
}

/// Ask for paths until an empty answer. An empty first answer cancels.
fn collect_paths<F>(mut ask: F) -> NbResult<Vec<PathBuf>>
where
    F: FnMut(&str) -> NbResult<String>,
{
    let mut paths = Vec::new();

    loop {
        let label = if paths.is_empty() {
            "File to upload (empty to cancel)"
        } else {
            "Another file (empty to finish)"
        };

        let answer = ask(label)?;
        let answer = answer.trim();
        if answer.is_empty() {
            break;
        }
        paths.push(PathBuf::from(answer));
    }

    if paths.is_empty() {
        info!("Upload cancelled by user");
    }
    Ok(paths)
}

/// Read each file fully, keyed by its final path component.
///
/// A later path with the same file name replaces an earlier one.
pub fn read_uploads<I, P>(paths: I) -> NbResult<UploadedFiles>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut files = UploadedFiles::new();
    for path in paths {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                errors::validation_error(
                    format!("{} has no usable file name", path.display()),
                    Some("path"),
                )
            })?
            .to_string();

        let content = fs::read(path)
            .map_err(|err| errors::filesystem_error("Failed to read upload", path, Some(err)))?;

        debug!("Read {} bytes from {:?}", content.len(), path);
        files.insert(name, content);
    }
    Ok(files)
}

/// Write uploaded files into `dir`, overwriting, and return the written paths.
pub fn save_uploads(files: &UploadedFiles, dir: &Path) -> NbResult<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .map_err(|err| errors::filesystem_error("Failed to create directory", dir, Some(err)))?;

    let mut written = Vec::with_capacity(files.len());
    for (name, content) in files {
        let destination = dir.join(name);
        fs::write(&destination, content).map_err(|err| {
            errors::filesystem_error("Failed to save upload", &destination, Some(err))
        })?;
        written.push(destination);
    }
    Ok(written)
}
