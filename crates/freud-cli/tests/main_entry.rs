//! Integration tests for the `freud` binary entry point.
//!
//! Each test writes a descriptor into a scratch directory and drives the
//! binary against it, checking exit codes and the user-facing streams.

use std::fs;
use std::process;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use rstest::{fixture, rstest};
use serde_json::Value;
use tempfile::TempDir;

const DESCRIPTOR: &str = r#"{
    "commands": {
        "start": "exec sleep 30",
        "quux": "echo quux"
    },
    "stages": {
        "production": { "env": { "PORT": "8080" } }
    }
}"#;

struct Scratch {
    dir: TempDir,
}

impl Scratch {
    fn freud(&self) -> Command {
        let mut command = cargo_bin_cmd!("freud");
        command
            .current_dir(self.dir.path())
            .env_remove("FREUD_CONFIG")
            .env_remove("FREUD_STAGE")
            .env("FREUD_SERVICE_PATH", self.dir.path().join("services"));
        command
    }

    fn write(&self, name: &str, body: &str) {
        fs::write(self.dir.path().join(name), body).expect("write file");
    }

    fn record_pid(&self, pid: u32) {
        let tmp = self.dir.path().join("tmp");
        fs::create_dir_all(&tmp).expect("create tmp dir");
        fs::write(tmp.join("monkey.pid"), pid.to_string()).expect("write pidfile");
    }
}

#[fixture]
fn scratch() -> Scratch {
    let scratch = Scratch {
        dir: TempDir::new().expect("create temp dir"),
    };
    scratch.write("monkey.json", DESCRIPTOR);
    scratch
}

#[rstest]
fn check_reports_live_process(scratch: Scratch) {
    scratch.record_pid(process::id());
    scratch
        .freud()
        .args(["@check", "monkey"])
        .assert()
        .success()
        .stdout(format!("monkey up with PID {}.\n", process::id()));
}

#[rstest]
fn check_reports_down_without_pidfile(scratch: Scratch) {
    scratch
        .freud()
        .args(["@check", "monkey.json"])
        .assert()
        .success()
        .stdout("monkey down.\n");
}

#[rstest]
fn quiet_check_prints_nothing(scratch: Scratch) {
    scratch
        .freud()
        .args(["-q", "@check", "monkey"])
        .assert()
        .success()
        .stdout("");
}

#[rstest]
fn descriptor_may_come_from_environment(scratch: Scratch) {
    scratch
        .freud()
        .env("FREUD_CONFIG", "monkey")
        .arg("@check")
        .assert()
        .success()
        .stdout("monkey down.\n");
}

#[rstest]
fn bare_names_are_found_in_service_path(scratch: Scratch) {
    let services = scratch.dir.path().join("services");
    fs::create_dir_all(&services).expect("create service dir");
    fs::write(services.join("gorilla.json"), "{}").expect("write descriptor");
    scratch
        .freud()
        .args(["@check", "gorilla"])
        .assert()
        .success()
        .stdout("gorilla down.\n");
}

#[rstest]
fn wait_up_times_out(scratch: Scratch) {
    scratch
        .freud()
        .args(["-t", "1", "@wait-up", "monkey"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("monkey not up within 1 seconds"));
}

#[rstest]
fn wait_down_returns_when_down(scratch: Scratch) {
    scratch
        .freud()
        .args(["@wait-down", "monkey"])
        .assert()
        .success()
        .stdout("monkey down.\n");
}

#[rstest]
fn signal_requires_running_service(scratch: Scratch) {
    scratch
        .freud()
        .args(["@signal-term", "monkey"])
        .assert()
        .failure()
        .stderr(contains("monkey is not running"));
}

#[rstest]
fn help_lists_descriptor_verbs(scratch: Scratch) {
    scratch
        .freud()
        .args(["help", "monkey"])
        .assert()
        .success()
        .stdout(contains("Valid commands:").and(contains("quux")));
}

#[rstest]
fn verbs_run_through_the_shell_with_arguments(scratch: Scratch) {
    scratch
        .freud()
        .args(["quux", "monkey", "--", "a", "b c"])
        .assert()
        .success()
        .stderr(contains("quux a b c"));
}

#[rstest]
fn default_status_verb_reenters_launcher(scratch: Scratch) {
    scratch
        .freud()
        .args(["status", "monkey"])
        .assert()
        .success()
        .stderr(contains("monkey down."));
}

#[rstest]
fn background_start_records_pid_once(scratch: Scratch) {
    scratch.write(
        "monkey.json",
        r#"{
            "background": true,
            "create_pidfile": true,
            "logfile": "monkey.log",
            "commands": { "start": "exec sleep 30" }
        }"#,
    );
    scratch.freud().args(["start", "monkey"]).assert().success();

    let pidfile = scratch.dir.path().join("tmp/monkey.pid");
    let recorded = fs::read_to_string(&pidfile).expect("read pidfile");
    assert!(recorded.parse::<u32>().is_ok(), "unexpected pidfile {recorded:?}");

    scratch
        .freud()
        .args(["start", "monkey"])
        .assert()
        .success()
        .stderr(contains("monkey already running"));

    scratch
        .freud()
        .args(["@signal-kill", "monkey"])
        .assert()
        .success()
        .stdout(format!("Sent SIGKILL to monkey (PID {recorded}).\n"));
}

#[rstest]
fn dump_config_prints_stage(scratch: Scratch) {
    let output = scratch
        .freud()
        .args(["dump-config", "monkey", "production"])
        .output()
        .expect("run freud");
    assert!(output.status.success());
    let value: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(
        value.pointer("/env/PORT").and_then(Value::as_str),
        Some("8080")
    );
    assert_eq!(
        value.pointer("/env/FREUD_STAGE").and_then(Value::as_str),
        Some("production")
    );
}

#[rstest]
fn generate_refuses_to_overwrite(scratch: Scratch) {
    scratch.freud().args(["generate", "fresh"]).assert().success();
    let written = fs::read_to_string(scratch.dir.path().join("fresh.json")).expect("read scaffold");
    let value: Value = serde_json::from_str(&written).expect("valid json");
    assert_eq!(value.get("name").and_then(Value::as_str), Some("fresh"));

    scratch
        .freud()
        .args(["g", "fresh.json"])
        .assert()
        .failure()
        .stderr(contains("file exists"));
}

#[rstest]
fn missing_command_prints_usage(scratch: Scratch) {
    scratch.freud().assert().failure().stderr(contains("Usage"));
}

#[rstest]
fn missing_descriptor_is_reported(scratch: Scratch) {
    scratch
        .freud()
        .args(["@check", "ghost"])
        .assert()
        .failure()
        .stderr(contains("can't open: ghost.json"));
}

#[rstest]
fn unknown_verb_lists_valid_commands(scratch: Scratch) {
    scratch
        .freud()
        .args(["frobnicate", "monkey"])
        .assert()
        .failure()
        .stderr(contains("unknown command: frobnicate").and(contains("quux")));
}
