//! Configuration path management
//!
//! Persistent state (settings, OAuth tokens) lives in `~/.nbdrive/`.

use anyhow::Result;
use std::path::PathBuf;

pub const CONFIG_DIRECTORY: &str = ".nbdrive";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const AUTH_FILE_NAME: &str = "auth.json";

/// Resolved file locations
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// Persistent config directory (`~/.nbdrive/`)
    pub config_dir: PathBuf,
    /// Settings file
    pub config_file: PathBuf,
    /// OAuth token file
    pub auth_file: PathBuf,
}

impl ConfigPaths {
    pub fn new() -> Result<Self> {
        let home_dir =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?;
        Ok(Self::with_root(home_dir.join(CONFIG_DIRECTORY)))
    }

    pub fn with_root(config_dir: PathBuf) -> Self {
        Self {
            config_file: config_dir.join(CONFIG_FILE_NAME),
            auth_file: config_dir.join(AUTH_FILE_NAME),
            config_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_live_under_the_root() {
        let paths = ConfigPaths::with_root(PathBuf::from("/home/me/.nbdrive"));
        assert_eq!(
            paths.config_file,
            PathBuf::from("/home/me/.nbdrive/config.toml")
        );
        assert_eq!(paths.auth_file, PathBuf::from("/home/me/.nbdrive/auth.json"));
        assert_eq!(paths.config_dir, PathBuf::from("/home/me/.nbdrive"));
    }
}
