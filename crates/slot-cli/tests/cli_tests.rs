//! Integration tests for the `slots` CLI binary.
//!
//! These tests use `assert_cmd` and `predicates` to exercise every subcommand
//! through the actual binary, including stdin/stdout piping, file I/O and
//! error handling.

// `Command::cargo_bin` was deprecated in assert_cmd 2.1.2 in favor of
// `cargo::cargo_bin_cmd!`. Allow it until we migrate.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

const NOW: &str = "2025-06-01T00:00:00Z";

/// Helper: path to the scenario.json fixture.
fn scenario_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/scenario.json")
}

/// Helper: path to a scenario without a recurrence pattern.
fn no_pattern_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/no_pattern.json")
}

/// Helper: run `slots` with `args` and parse stdout as JSON.
fn run_json(args: &[&str]) -> Value {
    let output = Command::cargo_bin("slots")
        .unwrap()
        .args(args)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    serde_json::from_slice(&output).expect("stdout must be valid JSON")
}

// ─────────────────────────────────────────────────────────────────────────────
// occurrences
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn occurrences_include_the_end_date() {
    let value = run_json(&["occurrences", "-i", scenario_path(), "--zone", "court-1"]);
    let dates: Vec<&str> = value
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["date"].as_str().unwrap())
        .collect();
    assert_eq!(
        dates,
        vec!["2025-06-02", "2025-06-04", "2025-06-09", "2025-06-11", "2025-06-16"]
    );
    assert_eq!(value[0]["zone_id"], "court-1");
    assert_eq!(value[0]["duration_minutes"], 60);
}

#[test]
fn occurrences_from_stdin() {
    let scenario = std::fs::read_to_string(scenario_path()).unwrap();
    Command::cargo_bin("slots")
        .unwrap()
        .args(["occurrences", "--zone", "court-1", "--max", "2"])
        .write_stdin(scenario)
        .assert()
        .success()
        .stdout(predicate::str::contains("2025-06-04"))
        .stdout(predicate::str::contains("2025-06-09").not());
}

#[test]
fn occurrences_from_later_date() {
    let value = run_json(&[
        "occurrences",
        "-i",
        scenario_path(),
        "--zone",
        "court-1",
        "--from",
        "2025-06-10",
    ]);
    assert_eq!(value.as_array().unwrap().len(), 2);
    assert_eq!(value[0]["date"], "2025-06-11");
}

#[test]
fn occurrences_to_file() {
    let output_path = "/tmp/slots-test-occurrences.json";
    let _ = std::fs::remove_file(output_path);

    Command::cargo_bin("slots")
        .unwrap()
        .args([
            "occurrences",
            "-i",
            scenario_path(),
            "--zone",
            "court-1",
            "-o",
            output_path,
        ])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let content = std::fs::read_to_string(output_path).expect("output file must exist");
    let value: Value = serde_json::from_str(&content).unwrap();
    assert_eq!(value.as_array().unwrap().len(), 5);

    let _ = std::fs::remove_file(output_path);
}

#[test]
fn occurrences_without_pattern_fails() {
    Command::cargo_bin("slots")
        .unwrap()
        .args(["occurrences", "-i", no_pattern_path(), "--zone", "pool"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no 'pattern'"));
}

#[test]
fn occurrences_with_unknown_slot_fails() {
    let scenario = r#"{
        "pattern": {
            "type": "weekly",
            "weekdays": ["Mon"],
            "time_slots": ["03:00"],
            "start_date": "2025-06-02"
        }
    }"#;
    Command::cargo_bin("slots")
        .unwrap()
        .args(["occurrences", "--zone", "pool"])
        .write_stdin(scenario)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid recurrence pattern"));
}

// ─────────────────────────────────────────────────────────────────────────────
// availability
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn whole_facility_booking_blocks_court() {
    let value = run_json(&[
        "availability",
        "-i",
        scenario_path(),
        "--zone",
        "court-1",
        "--date",
        "2025-06-04",
        "--slot",
        "10:00",
        "--now",
        NOW,
    ]);
    let entry = &value[0];
    assert_eq!(entry["time_slot"], "10:00");
    assert_eq!(entry["status"], "busy");
    assert_eq!(entry["conflict"]["kind"], "booking");
    assert_eq!(entry["conflict"]["relation"], "ancestor");
    assert_eq!(entry["conflict"]["booking"]["id"], "bk-1");
}

#[test]
fn sibling_booking_does_not_block() {
    let value = run_json(&[
        "availability",
        "-i",
        scenario_path(),
        "--zone",
        "court-1",
        "--date",
        "2025-06-09",
        "--slot",
        "10:00",
        "--now",
        NOW,
    ]);
    assert_eq!(value[0]["status"], "available");

    let parent = run_json(&[
        "availability",
        "-i",
        scenario_path(),
        "--zone",
        "north",
        "--date",
        "2025-06-09",
        "--slot",
        "10:00",
        "--now",
        NOW,
    ]);
    assert_eq!(parent[0]["conflict"]["relation"], "descendant");
}

#[test]
fn whole_day_lists_every_slot() {
    let value = run_json(&[
        "availability",
        "-i",
        scenario_path(),
        "--zone",
        "hall",
        "--date",
        "2025-06-04",
        "--now",
        NOW,
    ]);
    let entries = value.as_array().unwrap();
    assert_eq!(entries.len(), 14);
    assert_eq!(entries[0]["time_slot"], "08:00");
    let busy: Vec<&str> = entries
        .iter()
        .filter(|e| e["status"] == "busy")
        .map(|e| e["time_slot"].as_str().unwrap())
        .collect();
    assert_eq!(busy, vec!["10:00"]);
}

#[test]
fn closed_days_and_holidays_are_unavailable() {
    let sunday = run_json(&[
        "availability",
        "-i",
        scenario_path(),
        "--zone",
        "hall",
        "--date",
        "2025-06-08",
        "--now",
        NOW,
    ]);
    assert!(sunday
        .as_array()
        .unwrap()
        .iter()
        .all(|e| e["status"] == "unavailable" && e["conflict"]["kind"] == "blackout"));

    let holiday = run_json(&[
        "availability",
        "-i",
        scenario_path(),
        "--zone",
        "hall",
        "--date",
        "2025-06-24",
        "--slot",
        "12:00",
        "--now",
        NOW,
    ]);
    assert_eq!(holiday[0]["conflict"]["reason"], "Sant Joan");
}

#[test]
fn past_slots_follow_facility_timezone() {
    // 07:30 UTC is 09:30 in Madrid.
    let value = run_json(&[
        "availability",
        "-i",
        scenario_path(),
        "--zone",
        "court-1",
        "--date",
        "2025-06-02",
        "--now",
        "2025-06-02T07:30:00Z",
    ]);
    assert_eq!(value[1]["time_slot"], "09:00");
    assert_eq!(value[1]["conflict"]["kind"], "past_slot");
    assert_eq!(value[2]["status"], "available");
}

#[test]
fn unknown_zone_is_reported_not_an_error() {
    let value = run_json(&[
        "availability",
        "-i",
        scenario_path(),
        "--zone",
        "roof",
        "--date",
        "2025-06-02",
        "--slot",
        "10:00",
        "--now",
        NOW,
    ]);
    assert_eq!(value[0]["status"], "unavailable");
    assert_eq!(value[0]["conflict"]["kind"], "unknown_zone");
}

#[test]
fn invalid_date_fails() {
    Command::cargo_bin("slots")
        .unwrap()
        .args([
            "availability",
            "-i",
            scenario_path(),
            "--zone",
            "hall",
            "--date",
            "06/04/2025",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid date"));
}

#[test]
fn invalid_now_fails() {
    Command::cargo_bin("slots")
        .unwrap()
        .args([
            "availability",
            "-i",
            scenario_path(),
            "--zone",
            "hall",
            "--date",
            "2025-06-04",
            "--now",
            "yesterday",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid --now"));
}

// ─────────────────────────────────────────────────────────────────────────────
// partition
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn partition_separates_the_conflicted_wednesday() {
    let value = run_json(&[
        "partition",
        "-i",
        scenario_path(),
        "--zone",
        "court-1",
        "--now",
        NOW,
    ]);
    assert_eq!(value["outcome"], "some_conflicted");
    assert_eq!(value["accepted"].as_array().unwrap().len(), 4);

    let conflicted = value["conflicted"].as_array().unwrap();
    assert_eq!(conflicted.len(), 1);
    assert_eq!(conflicted[0]["occurrence"]["date"], "2025-06-04");
    assert_eq!(conflicted[0]["status"], "busy");

    let substitutes = conflicted[0]["substitutes"].as_array().unwrap();
    assert!(!substitutes.is_empty());
    assert!(substitutes.iter().all(|s| s["slot"]["zone_id"].is_string()));
    let slot_moves = substitutes
        .iter()
        .filter(|s| s["kind"] == "alternative_time_slot")
        .count();
    assert!(slot_moves <= 2, "max_per_kind from config is 2");
}

#[test]
fn partition_marks_past_occurrences() {
    let value = run_json(&[
        "partition",
        "-i",
        scenario_path(),
        "--zone",
        "court-1",
        "--now",
        "2025-06-05T00:00:00Z",
    ]);
    assert_eq!(value["accepted"].as_array().unwrap().len(), 3);
    let kinds: Vec<&str> = value["conflicted"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["conflict"]["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["past_slot", "past_slot"]);
}

#[test]
fn partition_with_nothing_generated() {
    let value = run_json(&[
        "partition",
        "-i",
        scenario_path(),
        "--zone",
        "court-1",
        "--from",
        "2025-07-01",
        "--now",
        NOW,
    ]);
    assert_eq!(value["outcome"], "no_candidates");
    assert!(value["accepted"].as_array().unwrap().is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// rrule and general
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn rrule_export() {
    Command::cargo_bin("slots")
        .unwrap()
        .args(["rrule", "-i", scenario_path()])
        .assert()
        .success()
        .stdout("FREQ=WEEKLY;BYDAY=MO,WE;WKST=MO;UNTIL=20250616T235959Z\n");
}

#[test]
fn invalid_scenario_json_fails() {
    Command::cargo_bin("slots")
        .unwrap()
        .args(["occurrences", "--zone", "hall"])
        .write_stdin("{not json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse scenario JSON"));
}

#[test]
fn bad_timezone_fails() {
    Command::cargo_bin("slots")
        .unwrap()
        .args(["availability", "--zone", "hall", "--date", "2025-06-04"])
        .write_stdin(r#"{"config": {"timezone": "Mars/Olympus"}}"#)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid scenario config"));
}

#[test]
fn missing_input_file_fails() {
    Command::cargo_bin("slots")
        .unwrap()
        .args(["rrule", "-i", "/nonexistent/scenario.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read file"));
}

#[test]
fn help_flag_shows_usage() {
    Command::cargo_bin("slots")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("occurrences"))
        .stdout(predicate::str::contains("availability"))
        .stdout(predicate::str::contains("partition"));
}

#[test]
fn unknown_subcommand_fails() {
    Command::cargo_bin("slots")
        .unwrap()
        .arg("book")
        .assert()
        .failure();
}
