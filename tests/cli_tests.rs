mod support;

use assert_cmd::Command;
use predicates::prelude::*;
use support::write_temp_config;

fn racetrack() -> Command {
    Command::cargo_bin("racetrack").expect("binary built")
}

#[test]
fn validate_accepts_a_good_config() {
    let file = write_temp_config("[race]\nduration_secs = 60\n");
    racetrack()
        .args(["config", "validate", "--config"])
        .arg(&file.path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration valid"));
}

#[test]
fn validate_fails_on_bad_config() {
    let file = write_temp_config("[race]\nseat_counts = [0]\n");
    racetrack()
        .args(["config", "validate", "--config"])
        .arg(&file.path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("seat_counts"));
}

#[test]
fn init_writes_a_valid_template() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    racetrack().args(["config", "init"]).arg(&path).assert().success();
    racetrack()
        .args(["config", "init"])
        .arg(&path)
        .assert()
        .failure();
    racetrack()
        .args(["config", "validate", "-c"])
        .arg(&path)
        .assert()
        .success();
}

#[test]
fn show_prints_sections() {
    let file = write_temp_config("[storage]\nbackend = \"sqlite\"\npath = \"x.db\"\n");
    racetrack()
        .args(["config", "show", "--config"])
        .arg(&file.path)
        .assert()
        .success()
        .stdout(predicate::str::contains("sqlite").and(predicate::str::contains("x.db")));
}

#[test]
fn run_fails_fast_without_config() {
    racetrack()
        .args(["run", "--config", "/nonexistent/racetrack.toml"])
        .assert()
        .failure();
}
