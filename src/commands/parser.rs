//! Command-line argument parsing
//!
//! Defines the CLI with clap derive.

use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "nbdrive",
    version,
    about = "Zip and export folders, prompt uploads, and move files to and from Google Drive"
)]
pub struct Cli {
    /// Settings file (default ~/.nbdrive/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Zip a folder into <FOLDER>.zip and export the archive
    Zip {
        /// Folder to compress
        folder: PathBuf,
        /// Export directory (default: your downloads folder)
        #[arg(long = "to", value_name = "DIR")]
        export_dir: Option<PathBuf>,
        /// Only create the archive
        #[arg(long)]
        no_export: bool,
    },

    /// Prompt for local files and copy them into the working directory
    Upload {
        /// Destination directory
        #[arg(long, value_name = "DIR", default_value = ".")]
        dest: PathBuf,
    },

    /// Sign in to Google Drive
    SignIn,

    /// Forget stored Google Drive credentials
    SignOut,

    /// Upload a local file to Google Drive and print its id
    Push {
        /// Local file
        file: PathBuf,
        /// Parent folder id
        #[arg(long, value_name = "ID")]
        parent: Option<String>,
    },

    /// Print the id of the first file with exactly this name
    Find {
        /// File name to match
        name: String,
    },

    /// Print a Drive file's content as text
    Cat {
        /// Remote file id
        id: String,
    },

    /// Download a Drive file to a local path (overwrites)
    Pull {
        /// Remote file id
        id: String,
        /// Local destination
        file: PathBuf,
    },

    /// Replace a Drive file's content with a local file
    Update {
        /// Remote file id
        id: String,
        /// Local source
        file: PathBuf,
    },

    /// Create a folder on Google Drive and print its id
    Mkdir {
        /// Folder name
        name: String,
        /// Parent folder id
        #[arg(long, value_name = "ID")]
        parent: Option<String>,
    },
}

impl Cli {
    /// Parse process arguments (clap prints errors and exits)
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Parse a custom argv (for tests)
    pub fn try_parse_args_from<I, T>(iter: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::try_parse_from(iter)
    }
}
