use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to create an ip2mmdb command
fn ip2mmdb_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("ip2mmdb"))
}

#[test]
fn test_help() {
    ip2mmdb_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Convert IP2Location LITE CSV exports",
        ));
}

#[test]
fn test_version() {
    ip2mmdb_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ip2mmdb"));
}

#[test]
fn test_convert_help() {
    ip2mmdb_cmd()
        .arg("convert")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Convert a CSV export"));
}

#[test]
fn test_convert_country_csv() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("ranges.csv");
    fs::write(
        &input,
        "16777216,16777471,\"US\",\"United States\"\n16777472,16778239,\"CN\",\"China\"\n",
    )
    .unwrap();

    ip2mmdb_cmd()
        .arg("convert")
        .arg(&input)
        .arg("--quiet")
        .assert()
        .success()
        .stdout(predicate::str::contains("Database built"));

    let output = dir.path().join("ranges.csv.MMDB");
    assert!(output.exists());

    // The produced file must satisfy an independent reader
    let reader = maxminddb::Reader::open_readfile(&output).unwrap();
    assert_eq!(reader.metadata.database_type, "IP2LITE-Country");
    let v: serde_json::Value = reader.lookup("1.0.1.1".parse().unwrap()).unwrap();
    assert_eq!(v["country"]["iso_code"], "CN");
}

#[test]
fn test_convert_verbose_prints_stats() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("ranges.csv");
    fs::write(&input, "0,255,\"US\",\"United States\"\n").unwrap();

    ip2mmdb_cmd()
        .arg("convert")
        .arg(&input)
        .arg("--quiet")
        .arg("--verbose")
        .assert()
        .success()
        .stdout(predicate::str::contains("Payload records: 1"));
}

#[test]
fn test_convert_rejects_non_csv() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("ranges.txt");
    fs::write(&input, "0,255,\"US\",\"United States\"\n").unwrap();

    ip2mmdb_cmd()
        .arg("convert")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains(".csv"));
}

#[test]
fn test_convert_rejects_missing_file() {
    ip2mmdb_cmd()
        .arg("convert")
        .arg("/nonexistent/ranges.csv")
        .assert()
        .failure();
}

#[test]
fn test_convert_rejects_malformed_row() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("ranges.csv");
    fs::write(&input, "0,255,\"US\",\"United States\"\nnot-a-number,9,\"CA\",\"Canada\"\n")
        .unwrap();

    ip2mmdb_cmd()
        .arg("convert")
        .arg(&input)
        .arg("--quiet")
        .assert()
        .failure()
        .stderr(predicate::str::contains("row 2"));

    // No partial database may be left behind
    assert!(!dir.path().join("ranges.csv.MMDB").exists());
}
