//! Runtime settings
//!
//! Layered with the `config` crate: built-in defaults, then the TOML file
//! (`~/.nbdrive/config.toml` or `--config`), then `NBDRIVE_*` environment
//! variables (`NBDRIVE_OAUTH__CLIENT_ID`, `NBDRIVE_LOG_LEVEL`, ...).

use crate::error::NbResult;
use crate::utils::config_paths::ConfigPaths;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ENV_PREFIX: &str = "NBDRIVE";
pub const CLIENT_ID_ENV: &str = "NBDRIVE_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "NBDRIVE_CLIENT_SECRET";

pub const DEFAULT_ARCHIVE_COMMAND: &str = "zip";
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// OAuth client registration used for the device flow
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OAuthSettings {
    pub client_id: String,
    pub client_secret: String,
    pub scopes: Vec<String>,
}

impl Default for OAuthSettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            // find-by-name has to see files this app did not create
            scopes: vec![DRIVE_SCOPE.to_string()],
        }
    }
}

/// Google endpoints, overridable so tests can target a local server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GoogleEndpoints {
    pub drive_api: String,
    pub upload_api: String,
    pub device_code_url: String,
    pub token_url: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            drive_api: "https://www.googleapis.com/drive/v3".to_string(),
            upload_api: "https://www.googleapis.com/upload/drive/v3".to_string(),
            device_code_url: "https://oauth2.googleapis.com/device/code".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
        }
    }
}

impl GoogleEndpoints {
    /// Point every endpoint at one base URL (mock servers).
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            drive_api: format!("{base}/drive/v3"),
            upload_api: format!("{base}/upload/drive/v3"),
            device_code_url: format!("{base}/device/code"),
            token_url: format!("{base}/token"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Settings {
    pub oauth: OAuthSettings,
    pub endpoints: GoogleEndpoints,
    /// Where OAuth tokens are persisted (default `~/.nbdrive/auth.json`)
    pub auth_file: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
    /// Target of the export trigger (default: the user's download dir)
    pub export_dir: Option<PathBuf>,
    pub archive_command: Option<String>,
}

impl Settings {
    /// Load settings from the default config file location.
    pub fn load() -> NbResult<Self> {
        match ConfigPaths::new() {
            Ok(paths) => Self::load_from(Some(paths.config_file.as_path())),
            Err(err) => {
                debug!("No config directory available: {}", err);
                Self::load_from(None)
            }
        }
    }

    /// Load settings, reading `config_file` when it exists.
    pub fn load_from(config_file: Option<&Path>) -> NbResult<Self> {
        let mut builder = Config::builder();

        if let Some(path) = config_file {
            debug!("Reading settings from {:?}", path);
            builder = builder.add_source(File::from(path).required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(" ")
                .with_list_parse_key("oauth.scopes"),
        );

        let mut settings: Settings = builder.build()?.try_deserialize()?;
        settings.apply_credential_overrides();
        Ok(settings)
    }

    /// Short-form credential variables win over everything else.
    fn apply_credential_overrides(&mut self) {
        if let Ok(client_id) = std::env::var(CLIENT_ID_ENV) {
            self.oauth.client_id = client_id;
        }
        if let Ok(client_secret) = std::env::var(CLIENT_SECRET_ENV) {
            self.oauth.client_secret = client_secret;
        }
    }

    pub fn archive_command(&self) -> &str {
        self.archive_command
            .as_deref()
            .unwrap_or(DEFAULT_ARCHIVE_COMMAND)
    }

    pub fn auth_file(&self) -> NbResult<PathBuf> {
        match &self.auth_file {
            Some(path) => Ok(path.clone()),
            None => Ok(ConfigPaths::new()?.auth_file),
        }
    }

    pub fn export_dir(&self) -> PathBuf {
        self.export_dir
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
