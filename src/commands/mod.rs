//! Command handlers for the `nbdrive` binary

pub mod parser;

pub use parser::{Cli, Commands};

use crate::config::Settings;
use crate::drive::{sign_in, sign_out};
use crate::error::NbResult;
use crate::files::{
    archive_and_export, save_uploads, Archiver, DirectoryExporter, TerminalUploadPrompt,
    UploadPrompt,
};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::process::ExitCode;
use std::time::Duration;

/// Run a parsed command and return the process exit code.
pub async fn execute(command: Commands, settings: &Settings) -> NbResult<ExitCode> {
    let term = Term::stdout();

    match command {
        Commands::Zip {
            folder,
            export_dir,
            no_export,
        } => {
            let archiver = Archiver::new(settings.archive_command());
            let zip_path = if no_export {
                archiver.archive(&folder).await?
            } else {
                let exporter =
                    DirectoryExporter::new(export_dir.unwrap_or_else(|| settings.export_dir()));
                archive_and_export(&archiver, &exporter, &folder).await?
            };
            term.write_line(&zip_path.display().to_string())?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Upload { dest } => {
            let files = TerminalUploadPrompt.prompt()?;
            if files.is_empty() {
                Term::stderr().write_line("No files selected.")?;
                return Ok(ExitCode::SUCCESS);
            }
            save_uploads(&files, &dest)?;
            for (name, content) in &files {
                term.write_line(&format!("{}\t{} bytes", name, content.len()))?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::SignIn => match sign_in(settings).await? {
            Some(_) => {
                Term::stderr().write_line(&format!(
                    "{} Google Drive credentials are ready",
                    style("✓").green()
                ))?;
                Ok(ExitCode::SUCCESS)
            }
            None => signed_out(),
        },
        Commands::SignOut => {
            sign_out(settings)?;
            Term::stderr().write_line("Signed out of Google Drive.")?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Push { file, parent } => {
            let Some(mut drive) = sign_in(settings).await? else {
                return signed_out();
            };
            let id = with_spinner(
                format!("Uploading {}", file.display()),
                drive.upload_file(&file, parent.as_deref()),
            )
            .await?;
            term.write_line(&id)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Find { name } => {
            let Some(mut drive) = sign_in(settings).await? else {
                return signed_out();
            };
            match with_spinner(format!("Searching for {}", name), drive.find_by_name(&name)).await? {
                Some(id) => {
                    term.write_line(&id)?;
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    Term::stderr().write_line(&format!("No file named '{}'", name))?;
                    Ok(ExitCode::from(1))
                }
            }
        }
        Commands::Cat { id } => {
            let Some(mut drive) = sign_in(settings).await? else {
                return signed_out();
            };
            let content = drive.get_contents(&id).await?;
            term.write_str(&content)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Pull { id, file } => {
            let Some(mut drive) = sign_in(settings).await? else {
                return signed_out();
            };
            with_spinner(format!("Downloading {}", id), drive.download_file(&id, &file)).await?;
            term.write_line(&file.display().to_string())?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Update { id, file } => {
            let Some(mut drive) = sign_in(settings).await? else {
                return signed_out();
            };
            with_spinner(format!("Updating {}", id), drive.update_file(&id, &file)).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Mkdir { name, parent } => {
            let Some(mut drive) = sign_in(settings).await? else {
                return signed_out();
            };
            let id = with_spinner(
                format!("Creating folder {}", name),
                drive.create_folder(&name, parent.as_deref()),
            )
            .await?;
            term.write_line(&id)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn signed_out() -> NbResult<ExitCode> {
    Term::stderr().write_line("Google Drive access was not granted.")?;
    Ok(ExitCode::from(1))
}

/// Show a stderr spinner while a remote call runs.
async fn with_spinner<T, F>(message: String, future: F) -> NbResult<T>
where
    F: Future<Output = NbResult<T>>,
{
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = future.await;
    spinner.finish_and_clear();
    result
}
