//! Google Drive pass-through calls
//!
//! `sign_in` yields a [`DriveClient`]; each client method performs exactly one
//! remote operation. Remote file identifiers are opaque strings assigned by Drive.

pub mod auth;
pub mod error;
pub mod oauth_client;
pub mod service;

pub use auth::{sign_in, sign_out, DeviceFlowAuthenticator};
pub use oauth_client::{OAuthClient, OAuthConfig, StaticToken, TokenSource};
pub use service::{DriveClient, DriveFile};
