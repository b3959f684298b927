//! End-to-end runs of the `vouch` binary against a mock API

use std::process::{Command, Output};

use crate::common::{availability_json, mount_availability, mount_status, mount_user, user_json};
use wiremock::MockServer;

/// Run `vouch` with an empty config file so the user's own config never leaks in.
async fn run(server: &MockServer, args: &[&str]) -> Output {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "").unwrap();

    let mut command = Command::new(env!("CARGO_BIN_EXE_vouch"));
    command
        .arg("--config")
        .arg(&config)
        .arg("--api-url")
        .arg(server.uri())
        .args(args)
        .env_remove("VOUCH_API_URL")
        .env_remove("VOUCH_SESSION_TOKEN")
        .env_remove("RUST_LOG");

    tokio::task::spawn_blocking(move || {
        let output = command.output().unwrap();
        drop(dir);
        output
    })
    .await
    .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[tokio::test(flavor = "multi_thread")]
async fn eligible_route_exits_zero() {
    let server = MockServer::start().await;
    mount_user(&server, 5, user_json(5, "ana", "FRIENDS")).await;
    mount_availability(&server, 5, availability_json(true, &[])).await;

    let output = run(&server, &["check", "/leave-reference/friend/5"]).await;

    assert_eq!(output.status.code(), Some(0), "{output:?}");
    let stdout = stdout(&output);
    let mut lines = stdout.lines();
    assert_eq!(lines.next(), Some("ELIGIBLE"));
    assert_eq!(
        lines.next(),
        Some("Write a friend reference for Ana Sousa (@ana), Lisbon")
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn flag_form_matches_path_form() {
    let server = MockServer::start().await;
    mount_user(&server, 5, user_json(5, "ana", "NOT_FRIENDS")).await;
    mount_availability(&server, 5, availability_json(false, &[(42, "hosted")])).await;

    let output = run(
        &server,
        &["check", "--type", "hosted", "--user", "5", "--host-request", "42"],
    )
    .await;

    assert_eq!(output.status.code(), Some(0), "{output:?}");
    assert!(stdout(&output).ends_with("(host request 42)\n"));
}

#[tokio::test(flavor = "multi_thread")]
async fn not_available_exits_one() {
    let server = MockServer::start().await;
    mount_user(&server, 5, user_json(5, "ana", "NOT_FRIENDS")).await;
    mount_availability(&server, 5, availability_json(true, &[])).await;

    let output = run(&server, &["check", "/leave-reference/friend/5"]).await;

    assert_eq!(output.status.code(), Some(1), "{output:?}");
    assert!(stdout(&output).starts_with("NOT_AVAILABLE\n"));
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_user_reports_data_unavailable() {
    let server = MockServer::start().await;
    mount_status(&server, "/api/users/5", 404).await;
    mount_availability(&server, 5, availability_json(true, &[])).await;

    let output = run(&server, &["check", "/leave-reference/friend/5"]).await;

    assert_eq!(output.status.code(), Some(1), "{output:?}");
    let stdout = stdout(&output);
    assert!(stdout.starts_with("DATA_UNAVAILABLE\n"));
    assert!(stdout.ends_with("error: This user's references couldn't be loaded.\n"));
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_type_exits_one() {
    let server = MockServer::start().await;

    let output = run(&server, &["check", "/leave-reference/stranger/5"]).await;

    assert_eq!(output.status.code(), Some(1), "{output:?}");
    assert_eq!(
        stdout(&output),
        "INVALID_TYPE\nerror: This is not a valid reference type.\n"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_route_exits_two() {
    let server = MockServer::start().await;

    let output = run(&server, &["check", "/leave-reference/friend/me"]).await;

    assert_eq!(output.status.code(), Some(2), "{output:?}");
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("user id \"me\" is not a number"));
}
