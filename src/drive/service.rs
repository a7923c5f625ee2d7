// Google Drive v3 client over plain HTTP requests.
// Each public method performs exactly one remote operation.

use super::error::DriveError;
use super::oauth_client::TokenSource;
use crate::config::{GoogleEndpoints, FOLDER_MIME_TYPE};
use crate::error::{errors, DriveOperation, NbResult};
use mime_guess::from_path;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Google Drive file metadata, as much of it as these calls request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub parents: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct DriveFileListResponse {
    files: Option<Vec<DriveFile>>,
}

/// Metadata for a new file or folder; `parents` only when a parent is given.
pub fn file_metadata(name: &str, mime_type: &str, parent_id: Option<&str>) -> Value {
    let mut metadata = json!({
        "name": name,
        "mimeType": mime_type,
    });

    if let Some(parent) = parent_id {
        metadata["parents"] = json!([parent]);
    }

    metadata
}

/// Escape a value for use inside a single-quoted Drive query string.
pub fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Exact-name query over non-trashed files.
pub fn name_query(name: &str) -> String {
    format!("name = '{}' and trashed = false", escape_query_value(name))
}

/// Authenticated Drive handle
#[derive(Debug)]
pub struct DriveClient {
    tokens: Box<dyn TokenSource>,
    endpoints: GoogleEndpoints,
    http_client: reqwest::Client,
}

impl DriveClient {
    pub fn new(tokens: impl TokenSource + 'static, endpoints: GoogleEndpoints) -> Self {
        Self {
            tokens: Box::new(tokens),
            endpoints,
            http_client: reqwest::Client::new(),
        }
    }

    async fn bearer(&mut self) -> NbResult<String> {
        Ok(format!("Bearer {}", self.tokens.access_token().await?))
    }

    fn file_url(base: &str, file_id: &str) -> String {
        format!("{}/files/{}", base, urlencoding::encode(file_id))
    }

    /// Upload a local file and return the id Drive assigned to it.
    ///
    /// The remote name is the final component of `path`, not the path as given.
    pub async fn upload_file(&mut self, path: &Path, parent_id: Option<&str>) -> NbResult<String> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                errors::validation_error(format!("Invalid file name: {}", path.display()), Some("path"))
            })?
            .to_string();

        info!("Uploading {:?} (parent: {:?})", path, parent_id);

        let content = fs::read(path)
            .map_err(|err| errors::filesystem_error("Failed to read file for upload", path, Some(err)))?;
        let mime_type = from_path(path).first_or_octet_stream().to_string();
        let metadata = file_metadata(&file_name, &mime_type, parent_id);

        let metadata_part = Part::text(metadata.to_string())
            .file_name("metadata")
            .mime_str("application/json")?;
        let file_part = Part::bytes(content)
            .file_name(file_name.clone())
            .mime_str(&mime_type)?;
        let form = Form::new()
            .part("metadata", metadata_part)
            .part("file", file_part);

        let bearer = self.bearer().await?;
        let response = self
            .http_client
            .post(format!("{}/files", self.endpoints.upload_api))
            .header("Authorization", bearer)
            .query(&[("uploadType", "multipart"), ("fields", "id,name")])
            .multipart(form)
            .send()
            .await?;

        let response = DriveError::ensure_success(DriveOperation::Upload, response).await?;
        let file: DriveFile = response.json().await?;

        info!("Uploaded {} (ID: {})", file_name, file.id);
        Ok(file.id)
    }

    /// Id of the first file whose name is exactly `name`, if any.
    ///
    /// Only the first page of results is consulted.
    pub async fn find_by_name(&mut self, name: &str) -> NbResult<Option<String>> {
        let query = name_query(name);
        debug!("Searching with query: {}", query);

        let bearer = self.bearer().await?;
        let response = self
            .http_client
            .get(format!("{}/files", self.endpoints.drive_api))
            .header("Authorization", bearer)
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id,name)"),
                ("pageSize", "10"),
            ])
            .send()
            .await?;

        let response = DriveError::ensure_success(DriveOperation::Search, response).await?;
        let list: DriveFileListResponse = response.json().await?;

        let found = list
            .files
            .and_then(|files| files.into_iter().next())
            .map(|file| file.id);

        match &found {
            Some(id) => debug!("Found {} (ID: {})", name, id),
            None => debug!("No file named {}", name),
        }
        Ok(found)
    }

    async fn fetch_media(&mut self, operation: DriveOperation, file_id: &str) -> NbResult<Vec<u8>> {
        let bearer = self.bearer().await?;
        let response = self
            .http_client
            .get(Self::file_url(&self.endpoints.drive_api, file_id))
            .header("Authorization", bearer)
            .query(&[("alt", "media")])
            .send()
            .await?;

        let response = DriveError::ensure_success(operation, response).await?;
        let bytes = response.bytes().await?;
        debug!("Fetched {} bytes for {}", bytes.len(), file_id);
        Ok(bytes.to_vec())
    }

    /// File content decoded as UTF-8 text.
    pub async fn get_contents(&mut self, file_id: &str) -> NbResult<String> {
        info!("Reading contents of {}", file_id);
        let bytes = self.fetch_media(DriveOperation::GetContents, file_id).await?;
        String::from_utf8(bytes).map_err(|err| {
            DriveError::request(
                DriveOperation::GetContents,
                format!("content of {} is not valid UTF-8 text: {}", file_id, err),
            )
        })
    }

    /// Download a file to exactly `output_path`, replacing whatever is there.
    pub async fn download_file(&mut self, file_id: &str, output_path: &Path) -> NbResult<()> {
        info!("Downloading {} to {:?}", file_id, output_path);
        let content = self.fetch_media(DriveOperation::Download, file_id).await?;

        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| {
                errors::filesystem_error("Failed to create output directory", parent, Some(err))
            })?;
        }

        fs::write(output_path, content).map_err(|err| {
            errors::filesystem_error("Failed to write downloaded file", output_path, Some(err))
        })?;
        Ok(())
    }

    /// Replace the content of a remote file with a local file's bytes.
    pub async fn update_file(&mut self, file_id: &str, path: &Path) -> NbResult<()> {
        info!("Updating {} from {:?}", file_id, path);

        let content = fs::read(path)
            .map_err(|err| errors::filesystem_error("Failed to read file for update", path, Some(err)))?;
        let mime_type = from_path(path).first_or_octet_stream().to_string();

        let bearer = self.bearer().await?;
        let response = self
            .http_client
            .patch(Self::file_url(&self.endpoints.upload_api, file_id))
            .header("Authorization", bearer)
            .header(CONTENT_TYPE, mime_type)
            .query(&[("uploadType", "media"), ("fields", "id")])
            .body(content)
            .send()
            .await?;

        DriveError::ensure_success(DriveOperation::Update, response).await?;
        info!("Updated {}", file_id);
        Ok(())
    }

    /// Create a folder and return its id. Duplicate names are allowed.
    pub async fn create_folder(&mut self, name: &str, parent_id: Option<&str>) -> NbResult<String> {
        info!("Creating folder {} (parent: {:?})", name, parent_id);

        let metadata = file_metadata(name, FOLDER_MIME_TYPE, parent_id);
        let bearer = self.bearer().await?;
        let response = self
            .http_client
            .post(format!("{}/files", self.endpoints.drive_api))
            .header("Authorization", bearer)
            .query(&[("fields", "id,name")])
            .json(&metadata)
            .send()
            .await?;

        let response = DriveError::ensure_success(DriveOperation::CreateFolder, response).await?;
        let folder: DriveFile = response.json().await?;

        info!("Created folder {} (ID: {})", name, folder.id);
        Ok(folder.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn metadata_without_parent_has_no_parents_key() {
        let metadata = file_metadata("notes.txt", "text/plain", None);
        assert_eq!(metadata, json!({"name": "notes.txt", "mimeType": "text/plain"}));
        assert!(metadata.get("parents").is_none());
    }

    #[test]
    fn metadata_with_parent_has_exactly_one_link() {
        let metadata = file_metadata("runs", FOLDER_MIME_TYPE, Some("parent123"));
        assert_eq!(metadata["parents"], json!(["parent123"]));
        assert_eq!(metadata["mimeType"], FOLDER_MIME_TYPE);
    }

    #[test]
    fn query_values_are_escaped() {
        assert_eq!(escape_query_value("it's"), "it\\'s");
        assert_eq!(escape_query_value(r"a\b"), r"a\\b");
        assert_eq!(
            name_query("Bob's notes.txt"),
            "name = 'Bob\\'s notes.txt' and trashed = false"
        );
    }

    #[test]
    fn file_urls_encode_ids() {
        assert_eq!(
            DriveClient::file_url("https://x/drive/v3", "a b/c"),
            "https://x/drive/v3/files/a%20b%2Fc"
        );
    }

    #[test]
    fn drive_file_parses_camel_case() {
        let file: DriveFile = serde_json::from_str(
            r#"{"id": "1", "name": "a.txt", "mimeType": "text/plain", "parents": ["p"]}"#,
        )
        .unwrap();
        assert_eq!(file.mime_type.as_deref(), Some("text/plain"));
        assert_eq!(file.parents, Some(vec!["p".to_string()]));
    }
}
