//! CLI tests for the offline subcommands

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// `pf` with logs, config and credentials isolated under `home`
fn pf(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("pf").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_DATA_HOME", home.path().join("data"))
        .env("XDG_CONFIG_HOME", home.path().join("config"));
    cmd
}

#[test]
fn test_classify_from_stdin() {
    let home = TempDir::new().unwrap();
    pf(&home)
        .args(["classify", "-"])
        .write_stdin("Submit button at the bottom\nPage title up top")
        .assert()
        .success()
        .stdout(predicate::str::contains("Header").and(predicate::str::contains("Button")));
}

#[test]
fn test_classify_json_keeps_priority_order() {
    let home = TempDir::new().unwrap();
    let plan = home.path().join("plan.txt");
    std::fs::write(&plan, "제출 버튼\n제목: 우리의 하루").unwrap();

    let output = pf(&home)
        .args(["classify", "--format", "json"])
        .arg(&plan)
        .output()
        .unwrap();
    assert!(output.status.success());

    let sections: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(sections[0]["name"], "Header");
    assert_eq!(sections[1]["name"], "Button");
}

#[test]
fn test_repair_strips_fences_and_commas() {
    let home = TempDir::new().unwrap();
    let output = pf(&home)
        .args(["repair", "-"])
        .write_stdin("```json\n[{\"type\": \"text\", \"content\": \"Hi\",},]\n```")
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value[0]["content"], "Hi");
}

#[test]
fn test_repair_object() {
    let home = TempDir::new().unwrap();
    pf(&home)
        .args(["repair", "--object", "-"])
        .write_stdin("Result: {\"ok\": true}")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"ok\": true"));
}

#[test]
fn test_repair_failure_exits_nonzero() {
    let home = TempDir::new().unwrap();
    pf(&home)
        .args(["repair", "-"])
        .write_stdin("nothing to see here")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no JSON"));
}

#[test]
fn test_auth_rejects_bad_key() {
    let home = TempDir::new().unwrap();
    pf(&home).args(["auth", "not-a-key"]).assert().failure();
}

#[test]
fn test_auth_stores_key() {
    let home = TempDir::new().unwrap();
    let creds = home.path().join("creds.json");
    let config = home.path().join("planframe.yml");
    std::fs::write(&config, format!("storage:\n  credentials: {}\n", creds.display())).unwrap();

    pf(&home)
        .arg("--config")
        .arg(&config)
        .args(["auth", "sk-test-123"])
        .assert()
        .success();
    assert!(std::fs::read_to_string(&creds).unwrap().contains("sk-test-123"));
}
