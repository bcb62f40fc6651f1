//! CLI surface of the hostkeep binary
//!
//! Only flags that exit before touching the host are exercised here.

use std::process::Command;

fn hostkeep() -> Command {
    Command::new(env!("CARGO_BIN_EXE_hostkeep"))
}

#[test]
fn test_version_flag() {
    let output = hostkeep().arg("--version").output().expect("Failed to run hostkeep");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("hostkeep "), "unexpected version line: {}", stdout);
}

#[test]
fn test_help_flag() {
    let output = hostkeep().arg("--help").output().expect("Failed to run hostkeep");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Proxmox VE"));
    assert!(stdout.contains("--version"));
}
