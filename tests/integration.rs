use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn rvw_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("rvw");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();

    // Unreachable adapter endpoints with a short timeout, so every live
    // fetch fails fast and the pipeline falls back to synthetic content.
    let config_content = format!(
        r#"[db]
path = "{}/data/rvw.sqlite"

[pipeline]
max_attempts = 2
retry_backoff_secs = 0
substep_pause_ms = 0
step2_pause_ms = 0

[adapters]
appstore_base = "http://127.0.0.1:9"
googleplay_base = "http://127.0.0.1:9"
timeout_secs = 1
"#,
        root.display()
    );

    let config_path = config_dir.join("rvw.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_rvw(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = rvw_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run rvw binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

/// Register a user and return the printed id.
fn register_user(config_path: &Path) -> String {
    let (stdout, stderr, success) = run_rvw(
        config_path,
        &[
            "register",
            "--email",
            "owner@example.com",
            "--website-url",
            "https://uber.com",
        ],
    );
    assert!(
        success,
        "register failed: stdout={}, stderr={}",
        stdout, stderr
    );
    stdout
        .lines()
        .find_map(|line| line.trim().strip_prefix("id: "))
        .expect("register output has no id line")
        .to_string()
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_rvw(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_rvw(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_rvw(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_register_and_status() {
    let (_tmp, config_path) = setup_test_env();

    run_rvw(&config_path, &["init"]);
    let user_id = register_user(&config_path);

    let (stdout, stderr, success) = run_rvw(&config_path, &["status", &user_id]);
    assert!(success, "status failed: stderr={}", stderr);

    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["onboarding_status"], "not_started");
    assert_eq!(json["current_step"], 1);
    assert_eq!(json["step_status"]["step1"], "pending");
    assert_eq!(json["step_status"]["step1_substeps"]["substep3"], "pending");
    assert_eq!(json["review_count"], 0);
}

#[test]
fn test_duplicate_email_rejected() {
    let (_tmp, config_path) = setup_test_env();

    run_rvw(&config_path, &["init"]);
    register_user(&config_path);

    let (_, _, success) = run_rvw(
        &config_path,
        &["register", "--email", "owner@example.com"],
    );
    assert!(!success, "duplicate email should fail");
}

#[test]
fn test_onboard_offline_completes_with_fallback() {
    let (_tmp, config_path) = setup_test_env();

    run_rvw(&config_path, &["init"]);
    let user_id = register_user(&config_path);

    let (stdout, stderr, success) = run_rvw(&config_path, &["onboard", &user_id]);
    assert!(
        success,
        "onboard failed: stdout={}, stderr={}",
        stdout, stderr
    );

    let (stdout, _, success) = run_rvw(&config_path, &["status", &user_id]);
    assert!(success);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["onboarding_status"], "completed");
    assert_eq!(json["current_step"], 3);
    assert_eq!(json["step_status"]["step1"], "completed");
    assert_eq!(json["step_status"]["step2"], "completed");
    assert_eq!(json["step_status"]["step1_substeps"]["substep1"], "completed");
    assert_eq!(json["step_status"]["step1_substeps"]["substep2"], "completed");
    assert_eq!(json["step_status"]["step1_substeps"]["substep3"], "completed");
    // 15 appstore + 10 googleplay + 8 trustpilot fallback reviews
    assert_eq!(json["review_count"], 33);
}

#[test]
fn test_onboard_rerun_is_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    run_rvw(&config_path, &["init"]);
    let user_id = register_user(&config_path);

    run_rvw(&config_path, &["onboard", &user_id]);
    run_rvw(&config_path, &["onboard", &user_id]);

    let (stdout, _, _) = run_rvw(&config_path, &["status", &user_id]);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["review_count"], 33, "rerun duplicated reviews");
}

#[test]
fn test_onboard_unknown_user_fails() {
    let (_tmp, config_path) = setup_test_env();

    run_rvw(&config_path, &["init"]);
    let (_, _, success) = run_rvw(&config_path, &["onboard", "no-such-user"]);
    assert!(!success);
}

#[test]
fn test_recover_ignores_completed_contexts() {
    let (_tmp, config_path) = setup_test_env();

    run_rvw(&config_path, &["init"]);
    let user_id = register_user(&config_path);
    run_rvw(&config_path, &["onboard", &user_id]);

    let (stdout, stderr, success) = run_rvw(&config_path, &["recover"]);
    assert!(success, "recover failed: stderr={}", stderr);
    assert!(stdout.contains("scanned: 0"), "got: {}", stdout);
    assert!(stdout.contains("repaired: 0"));
}

#[test]
fn test_complete_backfills_fresh_context() {
    let (_tmp, config_path) = setup_test_env();

    run_rvw(&config_path, &["init"]);
    let user_id = register_user(&config_path);

    let (stdout, stderr, success) = run_rvw(&config_path, &["complete", &user_id]);
    assert!(success, "complete failed: stderr={}", stderr);
    assert!(stdout.contains("reviews created: 33"), "got: {}", stdout);

    let (stdout, _, _) = run_rvw(&config_path, &["status", &user_id]);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["onboarding_status"], "completed");
    assert_eq!(json["review_count"], 33);
}

#[test]
fn test_complete_unknown_user_fails() {
    let (_tmp, config_path) = setup_test_env();

    run_rvw(&config_path, &["init"]);
    let (_, _, success) = run_rvw(&config_path, &["complete", "no-such-user"]);
    assert!(!success);
}

#[test]
fn test_profile_combines_identity_and_progress() {
    let (_tmp, config_path) = setup_test_env();

    run_rvw(&config_path, &["init"]);
    let user_id = register_user(&config_path);

    let (stdout, _, success) = run_rvw(&config_path, &["profile", &user_id]);
    assert!(success);

    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["user"]["id"], user_id.as_str());
    assert_eq!(json["user"]["email"], "owner@example.com");
    assert_eq!(json["user"]["website_url"], "https://uber.com");
    assert_eq!(json["user_data"]["onboarding_status"], "not_started");
}

#[test]
fn test_stats_reports_counts() {
    let (_tmp, config_path) = setup_test_env();

    run_rvw(&config_path, &["init"]);
    let user_id = register_user(&config_path);
    run_rvw(&config_path, &["onboard", &user_id]);

    let (stdout, stderr, success) = run_rvw(&config_path, &["stats"]);
    assert!(success, "stats failed: stderr={}", stderr);
    assert!(stdout.contains("Users:       1"), "got: {}", stdout);
    assert!(stdout.contains("Reviews:     33"));
    // Stage 2 labels every review during onboarding
    assert!(stdout.contains("Labeled:     33 / 33 (100%)"));
    assert!(stdout.contains("appstore"));
    assert!(stdout.contains("googleplay"));
    assert!(stdout.contains("trustpilot"));
}

#[test]
fn test_embed_pending_disabled_provider_fails() {
    let (_tmp, config_path) = setup_test_env();

    run_rvw(&config_path, &["init"]);
    let (_, stderr, success) = run_rvw(&config_path, &["embed", "pending"]);
    assert!(!success);
    assert!(stderr.contains("disabled"), "got: {}", stderr);
}

#[test]
fn test_enrich_without_service_url_fails() {
    let (_tmp, config_path) = setup_test_env();

    run_rvw(&config_path, &["init"]);
    let (_, stderr, success) = run_rvw(&config_path, &["enrich", "sentiment"]);
    assert!(!success);
    assert!(stderr.contains("service_url"), "got: {}", stderr);
}
