//! End-to-end tests for the `atlantis` binary.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::process::Command;

const RAW: &str = r#"Here are the events:
```json
{"pins": [
  {"event_id": "evt_1", "title": "A", "date": "2024-01-01", "lat": 10, "lng": 20, "location_label": "X", "category": "politics", "significance_score": 0.9, "one_liner": "x", "confidence": 0.8, "positivity_scale": 0.5},
  {"event_id": "evt_0", "title": "B", "date": "2023-12-31", "lat": 10, "lng": 20, "location_label": "X", "category": "politics", "significance_score": 0.9, "one_liner": "x", "confidence": 0.8, "positivity_scale": 0.5},
  {"event_id": "evt_2", "title": "C", "date": "2024-01-02", "lat": 1"#;

fn atlantis() -> Command {
    Command::new(env!("CARGO_BIN_EXE_atlantis"))
}

#[test]
fn extract_prints_pins_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("raw.txt");
    std::fs::write(&input, RAW).unwrap();

    let output = atlantis()
        .args(["extract", "--start", "2024-01-01", "--end", "2024-01-03", "--input"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let pins = json["pins"].as_array().unwrap();
    assert_eq!(pins.len(), 1);
    assert_eq!(pins[0]["event_id"], "evt_1");
    assert_eq!(json["report"]["method"], "document");
    assert_eq!(json["report"]["rejected"]["outside_window"], 1);
}

#[test]
fn extract_rejects_reversed_window() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("raw.txt");
    std::fs::write(&input, RAW).unwrap();

    let output = atlantis()
        .args(["extract", "--start", "2024-02-01", "--end", "2024-01-01", "--input"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn repair_prints_parseable_candidate() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("raw.txt");
    std::fs::write(&input, RAW).unwrap();

    let output = atlantis().arg("repair").arg("--input").arg(&input).output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["pins"].as_array().unwrap().len(), 2);
}

#[test]
fn config_writes_loadable_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("atlantis").join("config.toml");

    let output = atlantis().arg("config").arg("--output").arg(&path).output().unwrap();
    assert!(output.status.success());

    let loaded = atlantis::AtlantisConfig::from_file(&path).unwrap();
    assert_eq!(loaded, atlantis::AtlantisConfig::default());

    let output = atlantis().arg("--config").arg(&path).arg("config").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("pins_ttl_seconds = 3600"));
}
