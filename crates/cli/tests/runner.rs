// StackLab - Stack Overflow Research Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn write_temp_file(prefix: &str, contents: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push("stacklab-tests");
    let _ = std::fs::create_dir_all(&dir);

    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let path = dir.join(format!("{}-{}.yaml", prefix, nonce));
    std::fs::write(&path, contents).expect("Failed to write temp file");
    path
}

fn temp_output_dir(prefix: &str) -> PathBuf {
    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir()
        .join("stacklab-tests")
        .join(format!("{}-{}", prefix, nonce))
}

#[test]
fn test_cli_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_stacklab"))
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("StackLab Overflow Harness"));
}

#[test]
fn test_cli_version_flag() {
    let output = Command::new(env!("CARGO_BIN_EXE_stacklab"))
        .arg("--version")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("stacklab"));
}

#[test]
fn test_cli_clean_scenario_exit_0() {
    let scenario = write_temp_file(
        "scenario-clean",
        r#"
schema_version: "1.0"
name: "clean-copy"
input:
  text: "5ABCDE"
"#,
    );

    let output = Command::new(env!("CARGO_BIN_EXE_stacklab"))
        .args(["--scenario", scenario.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_cli_overflow_scenario_exit_1_and_result_json() {
    let scenario = write_temp_file(
        "scenario-overflow",
        r#"
schema_version: "1.0"
name: "dest-overflow"
input:
  bytes: [0x49,
          0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41,
          0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41,
          0x41, 0x41, 0x41, 0x41, 0x41]
"#,
    );
    let out_dir = temp_output_dir("overflow");

    let output = Command::new(env!("CARGO_BIN_EXE_stacklab"))
        .args([
            "--scenario",
            scenario.to_str().unwrap(),
            "--output-dir",
            out_dir.to_str().unwrap(),
        ])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(1));

    let result: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out_dir.join("result.json")).unwrap())
            .unwrap();
    assert_eq!(result["status"], "violation");
    assert_eq!(result["violations"][0]["region"], "dest");
    assert_eq!(result["violations"][0]["offset"], 20);
    assert_eq!(result["return_address_clobbered"], true);
}

#[test]
fn test_cli_bounded_mode_override_exit_0() {
    let output = Command::new(env!("CARGO_BIN_EXE_stacklab"))
        .args([
            "--input-hex",
            "49 41 41 41 41 41 41 41 41 41 41 41 41 41 41 41 41 41 41 41 41 41 41 41 41 41",
            "--copy-mode",
            "bounded",
            "--json",
        ])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(0));
    let result: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout must be the result JSON");
    assert_eq!(result["status"], "clean");
    assert_eq!(result["truncated"], true);
}

#[test]
fn test_cli_inline_input_exit_0() {
    let output = Command::new(env!("CARGO_BIN_EXE_stacklab"))
        .args(["--input", "5ABCDE", "--json"])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(0));
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["declared_length"], 5);
    assert_eq!(result["bytes_consumed"], 6);
}

#[test]
fn test_cli_exhausted_stream_exit_3() {
    // Declared length 5 but only two payload bytes on the line.
    let output = Command::new(env!("CARGO_BIN_EXE_stacklab"))
        .args(["--input", "5AB"])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn test_cli_missing_scenario_file_exit_2() {
    let output = Command::new(env!("CARGO_BIN_EXE_stacklab"))
        .args(["--scenario", "does-not-exist.yaml"])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_cli_invalid_scenario_exit_2() {
    let scenario = write_temp_file(
        "scenario-invalid",
        r#"
name: "bad"
buffers:
  input_capacity: 50
  copy_capacity: 0
"#,
    );

    let output = Command::new(env!("CARGO_BIN_EXE_stacklab"))
        .args(["--scenario", scenario.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_cli_no_input_exit_2() {
    let output = Command::new(env!("CARGO_BIN_EXE_stacklab"))
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_cli_invalid_flag() {
    let output = Command::new(env!("CARGO_BIN_EXE_stacklab"))
        .arg("--unknown-flag-xyz")
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("error: unexpected argument '--unknown-flag-xyz'"));
}
