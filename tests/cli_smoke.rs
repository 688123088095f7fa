use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

#[test]
fn generate_then_verify_round_trip_succeeds() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;

    Command::cargo_bin("disktest")?
        .args([
            dir.path().to_str().unwrap(),
            "--size",
            "2MB",
            "--maxparallel",
            "2",
        ])
        .assert()
        .success();

    let entries: Vec<_> = fs::read_dir(dir.path())?.collect();
    assert!(!entries.is_empty());

    Ok(())
}

#[test]
fn generate_only_skips_verification() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;

    Command::cargo_bin("disktest")?
        .args([dir.path().to_str().unwrap(), "--size", "500KB", "--verify", "none"])
        .assert()
        .success();

    let entries: Vec<_> = fs::read_dir(dir.path())?.collect();
    assert!(!entries.is_empty());

    Ok(())
}

#[test]
fn missing_root_argument_fails() {
    Command::cargo_bin("disktest")
        .unwrap()
        .assert()
        .failure()
        .stderr(predicate::str::contains("required").or(predicate::str::contains("usage")));
}

#[test]
fn invalid_verify_mode_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;

    Command::cargo_bin("disktest")?
        .args([dir.path().to_str().unwrap(), "--verify", "bogus"])
        .assert()
        .failure();

    Ok(())
}
