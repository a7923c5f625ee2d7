use super::oauth_client::{DeviceCodeResponse, DevicePoll, OAuthClient};
use super::service::DriveClient;
use crate::config::Settings;
use crate::error::NbResult;
use console::{style, Term};
use std::time::Duration;
use tracing::{info, warn};

/// RFC 8628: add five seconds to the interval on `slow_down`
const SLOW_DOWN_STEP: Duration = Duration::from_secs(5);

/// Runs the device authorisation grant to completion, polling the token endpoint.
#[derive(Debug)]
pub struct DeviceFlowAuthenticator {
    client: OAuthClient,
    term: Term,
}

impl DeviceFlowAuthenticator {
    pub fn new(client: OAuthClient) -> Self {
        Self {
            client,
            term: Term::stderr(),
        }
    }

    /// Returns the authorised client, or `None` if the user denied access or
    /// the code expired before they finished.
    pub async fn authenticate(mut self) -> NbResult<Option<OAuthClient>> {
        let device = self.client.start_device_flow().await?;
        self.show_instructions(&device)?;

        let mut interval = Duration::from_secs(device.interval);
        let deadline = tokio::time::Instant::now() + Duration::from_secs(device.expires_in);

        loop {
            if tokio::time::Instant::now() >= deadline {
                warn!("Device code expired before authorization completed");
                return Ok(None);
            }

            tokio::time::sleep(interval).await;

            match self.client.poll_for_tokens(&device.device_code).await? {
                DevicePoll::Authorized(_) => {
                    self.term
                        .write_line(&format!("{} Signed in to Google Drive", style("✓").green()))?;
                    return Ok(Some(self.client));
                }
                DevicePoll::Pending => continue,
                DevicePoll::SlowDown => {
                    interval += SLOW_DOWN_STEP;
                }
                DevicePoll::Denied => {
                    warn!("User denied Google Drive access");
                    return Ok(None);
                }
                DevicePoll::Expired => {
                    warn!("Device code expired");
                    return Ok(None);
                }
            }
        }
    }

    fn show_instructions(&self, device: &DeviceCodeResponse) -> NbResult<()> {
        self.term.write_line("")?;
        self.term
            .write_line(&style("Google Drive authorization required").bold().to_string())?;
        self.term
            .write_line(&format!("  Visit:      {}", style(&device.verification_url).cyan()))?;
        self.term.write_line(&format!(
            "  Enter code: {}",
            style(&device.user_code).yellow().bold()
        ))?;
        self.term.write_line("Waiting for authorization...")?;
        Ok(())
    }
}

/// Sign in to Google Drive.
///
/// Reuses stored tokens when present, otherwise runs the device flow
/// interactively. `None` means the user did not grant access.
pub async fn sign_in(settings: &Settings) -> NbResult<Option<DriveClient>> {
    let client = OAuthClient::load(
        &settings.oauth,
        settings.endpoints.clone(),
        settings.auth_file()?,
    )?;

    if client.is_authenticated() {
        info!("Using stored Google Drive credentials");
        return Ok(Some(DriveClient::new(client, settings.endpoints.clone())));
    }

    let authorized = DeviceFlowAuthenticator::new(client).authenticate().await?;
    Ok(authorized.map(|client| DriveClient::new(client, settings.endpoints.clone())))
}

/// Forget stored Google Drive credentials.
pub fn sign_out(settings: &Settings) -> NbResult<()> {
    let mut client = OAuthClient::new(
        &settings.oauth,
        settings.endpoints.clone(),
        settings.auth_file()?,
    );
    client.clear()?;
    info!("Removed stored Google Drive credentials");
    Ok(())
}
