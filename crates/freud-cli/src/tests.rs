//! Runtime tests that drive the CLI with injected streams and environment.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use rstest::{fixture, rstest};
use serde_json::Value;
use tempfile::TempDir;

use super::CliRunner;

const DESCRIPTOR: &str = r#"{
    // comments are allowed
    "commands": { "start": "sleep 60", "quux": "echo quux" },
    "stages": { "production": { "env": { "PORT": "8080" } } }
}"#;

struct Harness {
    _temp: TempDir,
    root: Utf8PathBuf,
    environment: BTreeMap<String, String>,
}

struct Outcome {
    exit_code: ExitCode,
    stdout: String,
    stderr: String,
}

impl Harness {
    fn run(&self, args: &[&str]) -> Outcome {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let argv = std::iter::once("freud")
            .chain(args.iter().copied())
            .map(OsString::from);
        let exit_code = CliRunner::new(
            &mut stdout,
            &mut stderr,
            self.environment.clone(),
            self.root.clone(),
        )
        .run(argv);
        Outcome {
            exit_code,
            stdout: String::from_utf8(stdout).expect("utf-8 stdout"),
            stderr: String::from_utf8(stderr).expect("utf-8 stderr"),
        }
    }
}

#[fixture]
fn harness() -> Harness {
    let temp = TempDir::new().expect("create temp dir");
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf-8 temp dir");
    fs::write(root.join("monkey.json"), DESCRIPTOR).expect("write descriptor");
    let environment = BTreeMap::from([
        ("HOME".to_owned(), "/home/ape".to_owned()),
        ("FREUD_SERVICE_PATH".to_owned(), root.join("services").to_string()),
    ]);
    Harness {
        _temp: temp,
        root,
        environment,
    }
}

#[rstest]
fn help_lists_descriptor_verbs(harness: Harness) {
    let outcome = harness.run(&["help", "monkey"]);
    assert_eq!(outcome.exit_code, ExitCode::SUCCESS);
    assert_eq!(
        outcome.stdout,
        "Valid commands: kill, quux, reload, restart, start, status, stop\n"
    );
}

#[rstest]
fn dump_config_renders_stage_overlay(harness: Harness) {
    let outcome = harness.run(&["dump-config", "monkey", "production"]);
    assert_eq!(outcome.exit_code, ExitCode::SUCCESS);
    let value: Value = serde_json::from_str(&outcome.stdout).expect("valid json");
    let env = value.get("env").expect("env present");
    assert_eq!(env.get("PORT").and_then(Value::as_str), Some("8080"));
    assert_eq!(env.get("FREUD_STAGE").and_then(Value::as_str), Some("production"));
}

#[rstest]
fn stage_defaults_to_environment(mut harness: Harness) {
    harness
        .environment
        .insert("FREUD_STAGE".to_owned(), "production".to_owned());
    let outcome = harness.run(&["dump-config", "monkey"]);
    let value: Value = serde_json::from_str(&outcome.stdout).expect("valid json");
    assert_eq!(value.get("stage").and_then(Value::as_str), Some("production"));
}

#[rstest]
fn controller_check_reports_down(harness: Harness) {
    let outcome = harness.run(&["@check", "monkey"]);
    assert_eq!(outcome.exit_code, ExitCode::SUCCESS);
    assert_eq!(outcome.stdout, "monkey down.\n");
}

#[rstest]
fn unknown_controller_verb_fails(harness: Harness) {
    let outcome = harness.run(&["@bogus", "monkey"]);
    assert_eq!(outcome.exit_code, ExitCode::FAILURE);
    assert!(outcome.stderr.starts_with("unknown command: @bogus"));
}

#[rstest]
fn unknown_descriptor_verb_fails(harness: Harness) {
    let outcome = harness.run(&["frobnicate", "monkey"]);
    assert_eq!(outcome.exit_code, ExitCode::FAILURE);
    assert!(outcome.stderr.starts_with("unknown command: frobnicate"));
}

#[rstest]
fn missing_descriptor_prints_usage(harness: Harness) {
    let outcome = harness.run(&["status"]);
    assert_eq!(outcome.exit_code, ExitCode::FAILURE);
    assert!(outcome.stderr.starts_with("usage: freud"));
}

#[rstest]
fn generate_writes_scaffold(harness: Harness) {
    let outcome = harness.run(&["g", "fresh"]);
    assert_eq!(outcome.exit_code, ExitCode::SUCCESS);
    assert!(harness.root.join("fresh.json").is_file());

    let again = harness.run(&["generate", "fresh"]);
    assert_eq!(again.exit_code, ExitCode::FAILURE);
    assert!(again.stderr.starts_with("file exists: "));
}

#[rstest]
fn version_goes_to_stdout(harness: Harness) {
    let outcome = harness.run(&["--version"]);
    assert_eq!(outcome.exit_code, ExitCode::SUCCESS);
    assert!(outcome.stdout.starts_with("freud "));
    assert!(outcome.stderr.is_empty());
}
