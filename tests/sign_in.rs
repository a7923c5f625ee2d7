use mockito::{Matcher, Server};
use nbdrive::config::{GoogleEndpoints, OAuthSettings, Settings};
use nbdrive::drive::{sign_in, sign_out};
use nbdrive::error::NbDriveError;
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn settings(server: &Server, auth_file: &Path) -> Settings {
    Settings {
        oauth: OAuthSettings {
            client_id: "cid".to_string(),
            client_secret: "secret".to_string(),
            ..OAuthSettings::default()
        },
        endpoints: GoogleEndpoints::with_base(&server.url()),
        auth_file: Some(auth_file.to_path_buf()),
        ..Settings::default()
    }
}

fn device_code_body() -> String {
    json!({
        "device_code": "dev-123",
        "user_code": "ABCD-EFGH",
        "verification_url": "https://www.google.com/device",
        "expires_in": 60,
        "interval": 0
    })
    .to_string()
}

#[tokio::test]
async fn device_flow_grants_a_usable_client() {
    let temp = TempDir::new().unwrap();
    let auth_file = temp.path().join("auth.json");

    let mut server = Server::new_async().await;
    let device = server
        .mock("POST", "/device/code")
        .match_body(Matcher::UrlEncoded("client_id".into(), "cid".into()))
        .with_body(device_code_body())
        .create_async()
        .await;
    let token = server
        .mock("POST", "/token")
        .match_body(Matcher::UrlEncoded("device_code".into(), "dev-123".into()))
        .with_body(
            json!({
                "access_token": "from-device",
                "refresh_token": "refresh-1",
                "expires_in": 3600,
                "token_type": "Bearer"
            })
            .to_string(),
        )
        .create_async()
        .await;
    let search = server
        .mock("GET", "/drive/v3/files")
        .match_header("authorization", "Bearer from-device")
        .match_query(Matcher::Any)
        .with_body(r#"{"files": [{"id": "f-1"}]}"#)
        .create_async()
        .await;

    let mut drive = sign_in(&settings(&server, &auth_file))
        .await
        .unwrap()
        .expect("authorization should succeed");
    assert_eq!(drive.find_by_name("x").await.unwrap().as_deref(), Some("f-1"));

    device.assert_async().await;
    token.assert_async().await;
    search.assert_async().await;

    let stored: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&auth_file).unwrap()).unwrap();
    assert_eq!(stored["refresh_token"], "refresh-1");
}

#[tokio::test]
async fn denied_authorization_yields_no_client() {
    let temp = TempDir::new().unwrap();
    let mut server = Server::new_async().await;
    let _device = server
        .mock("POST", "/device/code")
        .with_body(device_code_body())
        .create_async()
        .await;
    let _token = server
        .mock("POST", "/token")
        .with_status(428)
        .with_body(r#"{"error": "access_denied"}"#)
        .create_async()
        .await;

    let result = sign_in(&settings(&server, &temp.path().join("auth.json")))
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn stored_refresh_token_skips_device_flow() {
    let temp = TempDir::new().unwrap();
    let auth_file = temp.path().join("auth.json");
    fs::write(
        &auth_file,
        json!({"access_token": null, "refresh_token": "stored-refresh"}).to_string(),
    )
    .unwrap();

    let mut server = Server::new_async().await;
    let device = server
        .mock("POST", "/device/code")
        .expect(0)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/token")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
            Matcher::UrlEncoded("refresh_token".into(), "stored-refresh".into()),
        ]))
        .with_body(r#"{"access_token": "refreshed", "expires_in": 3600, "token_type": "Bearer"}"#)
        .create_async()
        .await;
    let folder = server
        .mock("POST", "/drive/v3/files")
        .match_header("authorization", "Bearer refreshed")
        .match_query(Matcher::Any)
        .with_body(r#"{"id": "folder-1"}"#)
        .create_async()
        .await;

    let mut drive = sign_in(&settings(&server, &auth_file))
        .await
        .unwrap()
        .expect("stored credentials should be reused");
    assert_eq!(drive.create_folder("runs", None).await.unwrap(), "folder-1");

    device.assert_async().await;
    refresh.assert_async().await;
    folder.assert_async().await;
}

#[tokio::test]
async fn missing_client_credentials_is_a_config_error() {
    let temp = TempDir::new().unwrap();
    let server = Server::new_async().await;
    let mut settings = settings(&server, &temp.path().join("auth.json"));
    settings.oauth.client_secret.clear();

    let err = sign_in(&settings).await.unwrap_err();
    assert!(matches!(err, NbDriveError::Config { .. }));
}

#[tokio::test]
async fn sign_out_removes_stored_tokens() {
    let temp = TempDir::new().unwrap();
    let auth_file = temp.path().join("auth.json");
    fs::write(&auth_file, r#"{"refresh_token": "r"}"#).unwrap();

    let server = Server::new_async().await;
    sign_out(&settings(&server, &auth_file)).unwrap();
    assert!(!auth_file.exists());
}

#[tokio::test]
async fn expired_access_token_without_refresh_runs_device_flow() {
    let temp = TempDir::new().unwrap();
    let auth_file = temp.path().join("auth.json");
    fs::write(
        &auth_file,
        json!({
            "access_token": "stale",
            "refresh_token": null,
            "expires_at": "2000-01-01T00:00:00Z"
        })
        .to_string(),
    )
    .unwrap();

    let mut server = Server::new_async().await;
    let device = server
        .mock("POST", "/device/code")
        .with_body(device_code_body())
        .expect(1)
        .create_async()
        .await;
    let _token = server
        .mock("POST", "/token")
        .with_body(
            json!({
                "access_token": "fresh",
                "refresh_token": "refresh-2",
                "expires_in": 3600,
                "token_type": "Bearer"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let result = sign_in(&settings(&server, &auth_file)).await.unwrap();
    assert!(result.is_some());
    device.assert_async().await;

    let stored: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&auth_file).unwrap()).unwrap();
    assert_eq!(stored["access_token"], "fresh");
    assert_eq!(stored["refresh_token"], "refresh-2");
}

// slow_down adds five seconds to the poll interval, so this test takes that long
#[tokio::test]
async fn pending_and_slow_down_keep_polling_until_granted() {
    let temp = TempDir::new().unwrap();
    let mut server = Server::new_async().await;
    let _device = server
        .mock("POST", "/device/code")
        .with_body(device_code_body())
        .create_async()
        .await;
    let pending = server
        .mock("POST", "/token")
        .with_status(428)
        .with_body(r#"{"error": "authorization_pending"}"#)
        .expect(1)
        .create_async()
        .await;
    let slow_down = server
        .mock("POST", "/token")
        .with_status(403)
        .with_body(r#"{"error": "slow_down"}"#)
        .expect(1)
        .create_async()
        .await;
    let granted = server
        .mock("POST", "/token")
        .with_body(r#"{"access_token": "late", "expires_in": 3600, "token_type": "Bearer"}"#)
        .expect(1)
        .create_async()
        .await;

    let started = std::time::Instant::now();
    let result = sign_in(&settings(&server, &temp.path().join("auth.json")))
        .await
        .unwrap();

    assert!(result.is_some());
    assert!(started.elapsed() >= std::time::Duration::from_secs(5));
    pending.assert_async().await;
    slow_down.assert_async().await;
    granted.assert_async().await;
}

#[tokio::test]
async fn expired_device_code_yields_no_client() {
    let temp = TempDir::new().unwrap();
    let mut server = Server::new_async().await;
    let _device = server
        .mock("POST", "/device/code")
        .with_body(device_code_body())
        .create_async()
        .await;
    let token = server
        .mock("POST", "/token")
        .with_status(400)
        .with_body(r#"{"error": "expired_token"}"#)
        .expect(1)
        .create_async()
        .await;

    let result = sign_in(&settings(&server, &temp.path().join("auth.json")))
        .await
        .unwrap();
    assert!(result.is_none());
    token.assert_async().await;
}

#[tokio::test]
async fn code_lifetime_elapsed_stops_without_polling() {
    let temp = TempDir::new().unwrap();
    let mut server = Server::new_async().await;
    let _device = server
        .mock("POST", "/device/code")
        .with_body(
            json!({
                "device_code": "dev-123",
                "user_code": "ABCD-EFGH",
                "verification_url": "https://www.google.com/device",
                "expires_in": 0,
                "interval": 0
            })
            .to_string(),
        )
        .create_async()
        .await;
    let token = server
        .mock("POST", "/token")
        .expect(0)
        .create_async()
        .await;

    let result = sign_in(&settings(&server, &temp.path().join("auth.json")))
        .await
        .unwrap();
    assert!(result.is_none());
    token.assert_async().await;
}
