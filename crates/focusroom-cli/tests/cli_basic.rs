//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run and verify outputs. Each test
//! points HOME at its own directory so config and database stay isolated.

use std::path::PathBuf;
use std::process::Command;

fn home_for(test: &str) -> PathBuf {
    let dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(format!("cli-{test}"));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("Failed to create test HOME");
    dir
}

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &PathBuf, args: &[&str]) -> (String, String, i32) {
    let output = Command::new("cargo")
        .args(["run", "-q", "-p", "focusroom-cli", "--"])
        .args(args)
        .env("HOME", home)
        .env_remove("FOCUSROOM_ENV")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

#[test]
fn test_task_add_list_complete() {
    let home = home_for("task");
    let (out, _, code) = run_cli(&home, &["task", "add", "Write report", "--space", "Work"]);
    assert_eq!(code, 0, "task add failed");
    let task: serde_json::Value = serde_json::from_str(&out).unwrap();
    let id = task["id"].as_str().unwrap().to_string();
    assert_eq!(task["title"], "Write report");

    let (out, _, code) = run_cli(&home, &["task", "list"]);
    assert_eq!(code, 0);
    let tasks: Vec<serde_json::Value> = serde_json::from_str(&out).unwrap();
    assert_eq!(tasks.len(), 1);

    let (out, _, code) = run_cli(&home, &["task", "complete", &id]);
    assert_eq!(code, 0);
    assert!(out.contains("Task completed"));

    let (out, _, _) = run_cli(&home, &["task", "list"]);
    let tasks: Vec<serde_json::Value> = serde_json::from_str(&out).unwrap();
    assert!(tasks.is_empty());
    let (out, _, _) = run_cli(&home, &["task", "list", "--all"]);
    let tasks: Vec<serde_json::Value> = serde_json::from_str(&out).unwrap();
    assert_eq!(tasks[0]["completed"], true);
}

#[test]
fn test_task_complete_unknown_fails() {
    let home = home_for("task-unknown");
    let (_, err, code) = run_cli(&home, &["task", "complete", "missing"]);
    assert_eq!(code, 1);
    assert!(err.contains("error:"));
}

#[test]
fn test_stats_today_empty() {
    let home = home_for("stats");
    let (out, _, code) = run_cli(&home, &["stats", "today"]);
    assert_eq!(code, 0, "stats today failed");
    let stats: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(stats["total_focus_minutes"], 0);
    assert_eq!(stats["completed_focus_count"], 0);
    assert_eq!(stats["streak_days"], 0);
}

#[test]
fn test_session_list_empty() {
    let home = home_for("session");
    let (out, _, code) = run_cli(&home, &["session", "list", "--today"]);
    assert_eq!(code, 0);
    let sessions: Vec<serde_json::Value> = serde_json::from_str(&out).unwrap();
    assert!(sessions.is_empty());
}

#[test]
fn test_config_set_get_reset() {
    let home = home_for("config");
    let (out, _, code) = run_cli(&home, &["config", "get", "timer.focus_secs"]);
    assert_eq!(code, 0);
    assert_eq!(out.trim(), "1500");

    let (_, _, code) = run_cli(&home, &["config", "set", "timer.focus_secs", "3000"]);
    assert_eq!(code, 0);
    let (out, _, _) = run_cli(&home, &["config", "get", "timer.focus_secs"]);
    assert_eq!(out.trim(), "3000");

    let (_, _, code) = run_cli(&home, &["config", "reset"]);
    assert_eq!(code, 0);
    let (out, _, _) = run_cli(&home, &["config", "get", "timer.focus_secs"]);
    assert_eq!(out.trim(), "1500");
}

#[test]
fn test_config_rejects_zero_duration() {
    let home = home_for("config-zero");
    let (_, err, code) = run_cli(&home, &["config", "set", "timer.short_break_secs", "0"]);
    assert_eq!(code, 1);
    assert!(err.contains("error:"));
}

#[test]
fn test_config_unknown_key() {
    let home = home_for("config-unknown");
    let (_, err, code) = run_cli(&home, &["config", "get", "nope.nothing"]);
    assert_eq!(code, 1);
    assert!(err.contains("unknown key"));
}

#[test]
fn test_config_list_shows_effective_bindings() {
    let home = home_for("config-list");
    let (_, _, code) = run_cli(&home, &["config", "set", "timer.focus_secs", "3000"]);
    assert_eq!(code, 0);

    let (out, _, code) = run_cli(&home, &["config", "list"]);
    assert_eq!(code, 0);
    let view: serde_json::Value = serde_json::from_str(&out).expect("config list prints JSON");
    assert_eq!(view["config"]["timer"]["focus_secs"], 3000);
    assert_eq!(view["effective"]["durations"]["focus_min"], 50);
    assert_eq!(view["effective"]["bindings"]["toggle"], "space");
    assert_eq!(view["effective"]["bindings"]["mode.long_break"], "3");
}

#[test]
fn test_config_check_reports_durations() {
    let home = home_for("config-check");
    let (out, _, code) = run_cli(&home, &["config", "check"]);
    assert_eq!(code, 0);
    assert!(out.starts_with("ok:"));
    assert!(out.contains("focus 25 min"));
}

#[test]
fn test_timer_keys_lists_defaults() {
    let home = home_for("keys");
    let (out, _, code) = run_cli(&home, &["timer", "keys"]);
    assert_eq!(code, 0);
    assert!(out.contains("space"));
    assert!(out.contains("toggle"));
    assert!(out.contains("mode.long_break"));
}
