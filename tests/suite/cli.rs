//! The `staffdir` binary end to end against a mock API.

use std::path::Path;
use std::process::Output;
use std::time::Duration;

use tempfile::TempDir;
use wiremock::MockServer;

use crate::common;

fn write_config(dir: &TempDir, server: &MockServer) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    let body = format!(
        "[api]\nbase_url = \"{}\"\nallow_insecure_http = true\ntimeout_secs = 5\n\n\
         [directory]\nmax_concurrent_assets = 2\n",
        server.uri()
    );
    std::fs::write(&path, body).expect("write config");
    path
}

async fn run(config: &Path, workdir: &Path, args: &[&str]) -> Output {
    tokio::process::Command::new(env!("CARGO_BIN_EXE_staffdir"))
        .arg("--config")
        .arg(config)
        .args(args)
        .current_dir(workdir)
        .env_remove("STAFFDIR_BASE_URL")
        .env_remove("STAFFDIR_API_KEY")
        .env_remove("RUST_LOG")
        .output()
        .await
        .expect("run staffdir")
}

/// Pending avatar count from a rendered summary line.
fn pending_in(block: &str) -> usize {
    let summary = block.lines().last().expect("summary line");
    let count = summary
        .rsplit(", ")
        .next()
        .and_then(|part| part.strip_suffix(" pending"))
        .expect("pending count in summary");
    count.parse().expect("numeric pending count")
}

#[tokio::test]
async fn directory_command_renders_each_snapshot_until_settled() {
    let server = MockServer::start().await;
    common::mount_users(&server).await;
    common::mount_slow_avatar(&server, 1, 4, 4, Duration::from_millis(300)).await;
    common::mount_corrupt_avatar(&server, 2).await;
    common::mount_slow_avatar(&server, 3, 2, 2, Duration::from_millis(900)).await;
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, &server);

    let output = run(&config, dir.path(), &["directory", "--wait-secs", "10"]).await;

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let blocks: Vec<&str> = stdout.split("\n\n").collect();

    // Avatar 3 lands well after avatar 1, so at least the listing-era snapshot,
    // the one with only avatar 3 pending and the settled one are all observed.
    assert!(blocks.len() >= 3, "stdout: {stdout}");
    assert!(blocks.iter().all(|block| block.starts_with("Staff Directory\n")));
    assert!(blocks[0].contains("avatar pending"));
    let pending: Vec<usize> = blocks.iter().map(|block| pending_in(block)).collect();
    assert!(pending.windows(2).all(|w| w[0] > w[1]), "pending: {pending:?}");

    let last = blocks.last().unwrap();
    assert!(last.contains("George Bluth"));
    assert!(last.contains("avatar 4x4"));
    assert!(last.contains("avatar 2x2"));
    assert!(last.contains("avatar failed: Failed to decode bitmap"));
    assert!(last.ends_with("3 staff, 2 avatars loaded, 1 failed, 0 pending\n"));

    // Logs land next to the config file, never on stdout.
    assert!(dir.path().join("logs").join("staffdir.log").exists());
    assert!(!stdout.contains("INFO"));
}

#[tokio::test]
async fn directory_command_fails_on_listing_error() {
    let server = MockServer::start().await;
    common::mount_users_status(&server, 500).await;
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, &server);

    let output = run(&config, dir.path(), &["directory"]).await;

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error: HTTP 500"));
    assert!(output.stdout.is_empty());
}

#[tokio::test]
async fn login_command_reports_success() {
    let server = MockServer::start().await;
    common::mount_login_ok(&server).await;
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, &server);

    let output = run(
        &config,
        dir.path(),
        &["login", common::VALID_EMAIL, common::VALID_PASSWORD],
    )
    .await;

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        format!("Logged in as {}\n", common::VALID_EMAIL)
    );
}

#[tokio::test]
async fn login_command_rejects_invalid_password() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, &server);

    let output = run(&config, dir.path(), &["login", common::VALID_EMAIL, "abc"]).await;

    assert!(!output.status.success());
    assert!(
        String::from_utf8_lossy(&output.stderr)
            .contains("Password must be 6-10 alphanumeric characters")
    );
    let requests = server.received_requests().await.expect("recording enabled");
    assert!(requests.is_empty());
}

#[tokio::test]
async fn malformed_config_is_reported() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "[api\nbase_url = ").unwrap();

    let output = run(&config, dir.path(), &["directory"]).await;

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("loading configuration"));
}
