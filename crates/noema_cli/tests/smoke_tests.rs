//! CLI smoke tests: basic binary behavior.

use std::io::Write;
use std::process::{Command, Stdio};

fn cli_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_noema"))
}

#[test]
fn test_help_flag() {
    let output = cli_bin().arg("--help").output().expect("failed to run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage"), "Expected usage info in --help output");
    assert!(stdout.contains("--ticks"));
}

#[test]
fn test_version_flag() {
    let output = cli_bin().arg("--version").output().expect("failed to run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("noema"), "Expected binary name in --version output");
}

#[test]
fn test_invalid_config_does_not_panic() {
    // A missing config file falls back to defaults
    let output = cli_bin()
        .args(["--config", "/tmp/nonexistent_noema_config_12345.toml"])
        .args(["--seed", "smoke", "--ticks", "3"])
        .output()
        .expect("failed to run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"totals\""), "Expected usage summary, got: {}", stdout);
}

#[test]
fn test_piped_session_replies_and_exits() {
    let mut child = cli_bin()
        .args(["--config", "/tmp/nonexistent_noema_config_12345.toml"])
        .args(["--interval-ms", "20"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("failed to spawn");

    {
        let stdin = child.stdin.as_mut().expect("stdin");
        writeln!(stdin, "hello there, how is the garden doing today?").unwrap();
        writeln!(stdin, "/act DANCE").unwrap();
    }
    // Give the loop a few ticks before quitting
    std::thread::sleep(std::time::Duration::from_millis(300));
    writeln!(child.stdin.as_mut().unwrap(), "/quit").unwrap();

    let output = child.wait_with_output().expect("failed to wait");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Noema: You said: hello there"), "stdout: {}", stdout);
    assert!(stdout.contains("DANCE"), "stdout: {}", stdout);
}
