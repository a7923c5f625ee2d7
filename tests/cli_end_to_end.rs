use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn nbdrive(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("nbdrive").unwrap();
    cmd.env("HOME", home.path())
        .env_remove("NBDRIVE_CLIENT_ID")
        .env_remove("NBDRIVE_CLIENT_SECRET")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_commands() {
    let home = TempDir::new().unwrap();
    nbdrive(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("zip"))
        .stdout(predicate::str::contains("mkdir"));
}

#[test]
fn zip_of_missing_folder_fails() {
    let home = TempDir::new().unwrap();
    nbdrive(&home)
        .current_dir(home.path())
        .args(["zip", "does-not-exist", "--no-export"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a directory"));
}

#[test]
fn zip_prints_archive_name() {
    if which::which("zip").is_err() {
        return;
    }

    let home = TempDir::new().unwrap();
    let exports = TempDir::new().unwrap();
    fs::create_dir_all(home.path().join("outputs")).unwrap();
    fs::write(home.path().join("outputs").join("r.txt"), "1").unwrap();

    nbdrive(&home)
        .current_dir(home.path())
        .args(["zip", "outputs", "--to"])
        .arg(exports.path())
        .assert()
        .success()
        .stdout(predicate::str::diff("outputs.zip\n"));

    assert!(exports.path().join("outputs.zip").exists());
}

#[test]
fn remote_commands_need_client_credentials() {
    let home = TempDir::new().unwrap();
    nbdrive(&home)
        .args(["find", "anything"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("OAuth client ID and secret are required"));
}

#[test]
fn malformed_config_file_exits_with_config_error() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("bad.toml");
    fs::write(&config, "this is = = not toml").unwrap();

    nbdrive(&home)
        .args(["sign-out", "--config"])
        .arg(&config)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Configuration problem"));
}
