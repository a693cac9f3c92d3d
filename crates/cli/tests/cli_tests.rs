//! CLI integration tests

use std::process::Command;

fn lwctl(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_lwctl"))
        .args(args)
        .env_remove("LWCTL_API_URL")
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = lwctl(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("Lendwatch"), "Should show app name");
    for command in ["metrics", "check", "history", "status", "info", "ping"] {
        assert!(stdout.contains(command), "Should show {} command", command);
    }
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = lwctl(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("lwctl"), "Should show binary name");
}

/// Test history subcommand help
#[test]
fn test_history_help() {
    let output = lwctl(&["history", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "History help should succeed");
    assert!(stdout.contains("--limit"), "Should show limit option");
    assert!(stdout.contains("<KEY>"), "Should show key argument");
}

/// Test format and api-url options
#[test]
fn test_global_options() {
    let output = lwctl(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("--format"), "Should show format option");
    assert!(stdout.contains("table"), "Should show table format");
    assert!(stdout.contains("json"), "Should show json format");
    assert!(stdout.contains("--api-url"), "Should show api-url option");
    assert!(stdout.contains("LWCTL_API_URL"), "Should show env var");
}

/// Test invalid command error handling
#[test]
fn test_invalid_command() {
    let output = lwctl(&["invalid-command"]);

    assert!(!output.status.success(), "Invalid command should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error"), "Should show error message");
}

/// Test missing required argument error handling
#[test]
fn test_missing_argument() {
    let output = lwctl(&["check"]);

    assert!(!output.status.success(), "Missing argument should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("required") || stderr.contains("error"),
        "Should show error about missing argument"
    );
}

/// Test that an unreachable watcher is reported as a failure
#[test]
fn test_unreachable_api() {
    let output = lwctl(&["--api-url", "http://127.0.0.1:1", "ping"]);
    assert!(!output.status.success(), "Ping against a closed port should fail");
}
