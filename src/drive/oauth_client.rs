use super::error::DriveError;
use crate::config::{GoogleEndpoints, OAuthSettings};
use crate::error::{errors, DriveOperation, NbResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info, warn};

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Refresh when fewer than this many seconds of validity remain
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Anything that can hand out a bearer token for Drive requests.
#[async_trait]
pub trait TokenSource: Send + Sync + fmt::Debug {
    async fn access_token(&mut self) -> NbResult<String>;
}

/// A fixed bearer token, for tests and pre-authorised environments.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&mut self) -> NbResult<String> {
        Ok(self.0.clone())
    }
}

/// OAuth client credentials plus the current token set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub token_type: String,
    pub scopes: Vec<String>,
}

impl OAuthConfig {
    pub fn from_settings(settings: &OAuthSettings) -> Self {
        Self {
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            access_token: None,
            refresh_token: None,
            expires_at: None,
            token_type: "Bearer".to_string(),
            scopes: settings.scopes.clone(),
        }
    }

    /// Cached access token that stays valid past the refresh margin
    fn usable_access_token(&self, now: DateTime<Utc>) -> Option<&str> {
        let token = self.access_token.as_deref()?;
        match self.expires_at {
            Some(expires_at) if expires_at - now > Duration::seconds(EXPIRY_MARGIN_SECS) => {
                Some(token)
            }
            _ => None,
        }
    }
}

/// Token set persisted between runs
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct StoredTokens {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    scopes: Vec<String>,
}

/// OAuth token response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthTokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: u64,
    pub token_type: String,
    pub scope: Option<String>,
}

/// Device code response from the device authorisation grant (RFC 8628)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceCodeResponse {
    pub device_code: String,
    pub user_code: String,
    #[serde(alias = "verification_uri")]
    pub verification_url: String,
    pub expires_in: u64,
    #[serde(default = "default_poll_interval")]
    pub interval: u64,
}

fn default_poll_interval() -> u64 {
    5
}

/// Result of a single device-flow poll
#[derive(Debug, Clone)]
pub enum DevicePoll {
    /// User has not finished yet
    Pending,
    /// Polling too fast; add five seconds to the interval
    SlowDown,
    Authorized(OAuthTokenResponse),
    Denied,
    Expired,
}

#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
}

/// OAuth client for the device flow and token refresh
#[derive(Debug, Clone)]
pub struct OAuthClient {
    config: OAuthConfig,
    endpoints: GoogleEndpoints,
    /// Path to the file where OAuth tokens are persisted
    auth_file_path: PathBuf,
    http_client: reqwest::Client,
}

impl OAuthClient {
    pub fn new(settings: &OAuthSettings, endpoints: GoogleEndpoints, auth_file: PathBuf) -> Self {
        Self {
            config: OAuthConfig::from_settings(settings),
            endpoints,
            auth_file_path: auth_file,
            http_client: reqwest::Client::new(),
        }
    }

    /// Create a client and merge in any tokens already stored on disk.
    pub fn load(
        settings: &OAuthSettings,
        endpoints: GoogleEndpoints,
        auth_file: PathBuf,
    ) -> NbResult<Self> {
        let mut client = Self::new(settings, endpoints, auth_file);

        if client.auth_file_path.exists() {
            let content = std::fs::read_to_string(&client.auth_file_path).map_err(|err| {
                errors::filesystem_error("Failed to read auth file", &client.auth_file_path, Some(err))
            })?;
            let stored: StoredTokens = serde_json::from_str(&content)?;

            // Tokens granted for other scopes would fail on first use
            if stored.scopes.is_empty() || stored.scopes == client.config.scopes {
                client.config.access_token = stored.access_token;
                client.config.refresh_token = stored.refresh_token;
                client.config.expires_at = stored.expires_at;
                debug!("Loaded stored OAuth tokens from {:?}", client.auth_file_path);
            } else {
                warn!("Stored tokens were granted for different scopes; ignoring them");
            }
        }

        Ok(client)
    }

    /// Request device and user codes to show to the user
    pub async fn start_device_flow(&self) -> NbResult<DeviceCodeResponse> {
        self.validate_config()?;
        info!("Starting device authorization flow");
        debug!("Using scopes: {:?}", self.config.scopes);

        let scope = self.config.scopes.join(" ");
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("scope", scope.as_str()),
        ];

        let response = self
            .http_client
            .post(&self.endpoints.device_code_url)
            .form(&params)
            .timeout(std::time::Duration::from_secs(15))
            .send()
            .await?;

        let response =
            DriveError::ensure_success(DriveOperation::DeviceAuthorization, response).await?;
        let device_response: DeviceCodeResponse = response.json().await?;

        debug!("Device code obtained, user code {}", device_response.user_code);
        Ok(device_response)
    }

    /// Poll the token endpoint once with a device code
    pub async fn poll_for_tokens(&mut self, device_code: &str) -> NbResult<DevicePoll> {
        debug!("Polling for device flow authorization...");

        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("device_code", device_code),
            ("grant_type", DEVICE_CODE_GRANT),
        ];

        let response = self
            .http_client
            .post(&self.endpoints.token_url)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let tokens: OAuthTokenResponse = response.json().await?;
            self.store_tokens(&tokens);
            info!("Device flow authorization completed");
            return Ok(DevicePoll::Authorized(tokens));
        }

        let body = response.text().await.unwrap_or_default();
        let error = serde_json::from_str::<OAuthErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or_default();

        match error.as_str() {
            "authorization_pending" => Ok(DevicePoll::Pending),
            "slow_down" => Ok(DevicePoll::SlowDown),
            "access_denied" => Ok(DevicePoll::Denied),
            "expired_token" => Ok(DevicePoll::Expired),
            _ => Err(DriveError::status(
                DriveOperation::DeviceAuthorization,
                status.as_u16(),
                &body,
            )),
        }
    }

    /// Exchange the refresh token for a new access token
    pub async fn refresh_access_token(&mut self) -> NbResult<OAuthTokenResponse> {
        info!("Refreshing OAuth access token");

        let refresh_token = self
            .config
            .refresh_token
            .clone()
            .ok_or_else(DriveError::authentication_required)?;

        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("refresh_token", refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http_client
            .post(&self.endpoints.token_url)
            .form(&params)
            .send()
            .await?;

        let response = DriveError::ensure_success(DriveOperation::TokenRefresh, response).await?;
        let tokens: OAuthTokenResponse = response.json().await?;
        self.store_tokens(&tokens);
        Ok(tokens)
    }

    fn store_tokens(&mut self, tokens: &OAuthTokenResponse) {
        self.config.access_token = Some(tokens.access_token.clone());
        if tokens.refresh_token.is_some() {
            self.config.refresh_token = tokens.refresh_token.clone();
        }
        self.config.expires_at = Some(Utc::now() + Duration::seconds(tokens.expires_in as i64));

        // Persisting is best effort; the in-memory tokens are still usable
        if let Err(e) = self.save() {
            warn!("Failed to save OAuth tokens to disk: {}", e);
        }
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Stored credentials can produce a token without user interaction:
    /// either a refresh token or an access token that has not expired.
    pub fn is_authenticated(&self) -> bool {
        self.config.refresh_token.is_some()
            || self.config.usable_access_token(Utc::now()).is_some()
    }

    /// Persist the token set as JSON, readable only by the current user.
    pub fn save(&self) -> NbResult<()> {
        debug!("Saving OAuth tokens to {:?}", self.auth_file_path);

        if let Some(parent) = self.auth_file_path.parent() {
            std::fs::create_dir_all(parent)?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let mut perms = std::fs::metadata(parent)?.permissions();
                perms.set_mode(0o700);
                std::fs::set_permissions(parent, perms)?;
            }
        }

        let stored = StoredTokens {
            access_token: self.config.access_token.clone(),
            refresh_token: self.config.refresh_token.clone(),
            expires_at: self.config.expires_at,
            scopes: self.config.scopes.clone(),
        };
        std::fs::write(&self.auth_file_path, serde_json::to_string_pretty(&stored)?)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&self.auth_file_path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(&self.auth_file_path, perms)?;
        }

        Ok(())
    }

    /// Forget all tokens, in memory and on disk.
    pub fn clear(&mut self) -> NbResult<()> {
        self.config.access_token = None;
        self.config.refresh_token = None;
        self.config.expires_at = None;

        if self.auth_file_path.exists() {
            std::fs::remove_file(&self.auth_file_path).map_err(|err| {
                errors::filesystem_error("Failed to remove auth file", &self.auth_file_path, Some(err))
            })?;
        }
        Ok(())
    }

    pub fn validate_config(&self) -> NbResult<()> {
        if self.config.client_id.is_empty() || self.config.client_secret.is_empty() {
            return Err(errors::config_error(
                "OAuth client ID and secret are required. Create a \"TVs and Limited Input devices\" \
                 OAuth client in Google Cloud Console and set NBDRIVE_CLIENT_ID and NBDRIVE_CLIENT_SECRET, \
                 or the [oauth] section of ~/.nbdrive/config.toml.",
            ));
        }

        if self.config.scopes.is_empty() {
            return Err(errors::config_error("At least one OAuth scope is required"));
        }

        Ok(())
    }
}

#[async_trait]
impl TokenSource for OAuthClient {
    async fn access_token(&mut self) -> NbResult<String> {
        if let Some(token) = self.config.usable_access_token(Utc::now()) {
            return Ok(token.to_string());
        }

        if self.config.refresh_token.is_none() {
            return Err(DriveError::authentication_required());
        }

        Ok(self.refresh_access_token().await?.access_token)
    }
}
