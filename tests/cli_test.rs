//! Command-line surface of the watchtower binary

use std::process::Command;

fn watchtower(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_watchtower"))
        .args(args)
        .output()
        .expect("Failed to execute watchtower")
}

#[test]
fn help_lists_commands_and_run_flags() {
    let output = watchtower(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    for expected in ["replay", "demo", "--stop-on-loop", "--json", "--threshold", "--window-size"] {
        assert!(
            stdout.contains(expected),
            "help output should mention '{}':\n{}",
            expected,
            stdout
        );
    }
}

#[test]
fn out_of_range_threshold_exits_with_error() {
    let output = watchtower(&["--threshold", "1.5", "demo", "--iterations", "3"]);

    assert_eq!(output.status.code(), Some(1));
    // Nothing is monitored, so no report reaches stdout
    assert!(output.stdout.is_empty());
}

#[test]
fn missing_trace_file_exits_with_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.jsonl");

    let output = Command::new(env!("CARGO_BIN_EXE_watchtower"))
        .arg("replay")
        .arg(&missing)
        .output()
        .expect("Failed to execute watchtower replay");

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn version_matches_package() {
    let output = watchtower(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert_eq!(
        stdout.trim(),
        format!("watchtower {}", env!("CARGO_PKG_VERSION"))
    );
}
