use crate::error::{DriveOperation, NbDriveError, NbResult};
use reqwest::Response;
use serde::Deserialize;

/// Helper namespace that turns Drive and OAuth failures into `NbDriveError`s.
pub struct DriveError;

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiErrorDetail {
    Structured { message: String },
    Code(String),
}

impl DriveError {
    pub fn request(operation: DriveOperation, message: impl Into<String>) -> NbDriveError {
        NbDriveError::Drive {
            operation,
            message: message.into(),
            status: None,
        }
    }

    pub fn status(operation: DriveOperation, status: u16, body: &str) -> NbDriveError {
        NbDriveError::Drive {
            operation,
            message: Self::extract_message(body),
            status: Some(status),
        }
    }

    pub fn authentication_required() -> NbDriveError {
        NbDriveError::Auth {
            message: "Google Drive authentication required; run `nbdrive sign-in`".to_string(),
            source: None,
        }
    }

    /// Pass a successful response through, or convert the body into an error.
    pub async fn ensure_success(operation: DriveOperation, response: Response) -> NbResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(Self::status(operation, status.as_u16(), &body))
    }

    /// Google wraps errors as `{"error": {"message": ...}}` or `{"error": "code"}`.
    fn extract_message(body: &str) -> String {
        match serde_json::from_str::<ApiErrorBody>(body) {
            Ok(ApiErrorBody {
                error: ApiErrorDetail::Structured { message },
            }) => message,
            Ok(ApiErrorBody {
                error: ApiErrorDetail::Code(code),
            }) => code,
            Err(_) if body.trim().is_empty() => "empty response body".to_string(),
            Err(_) => body.trim().to_string(),
        }
    }
}
