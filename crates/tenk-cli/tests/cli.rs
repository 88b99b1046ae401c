use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// `tenk` with config lookups confined to `home`.
fn tenk(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tenk").unwrap();
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env_remove("GEMINI_API_KEY");
    cmd
}

#[test]
fn schema_prints_json_schema() {
    let home = TempDir::new().unwrap();
    let output = tenk(&home).arg("schema").assert().success().get_output().stdout.clone();

    let schema: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(schema["title"], "AnnualReport");
    assert_eq!(schema["required"], serde_json::json!(["company_name", "filing_date"]));
    assert!(schema["properties"]["free_cash_flow_per_share"].is_object());
}

#[test]
fn schema_lists_fields() {
    let home = TempDir::new().unwrap();
    tenk(&home)
        .args(["schema", "--fields"])
        .assert()
        .success()
        .stdout(predicate::str::contains("filing_date"))
        .stdout(predicate::str::contains("risk_factors"));
}

#[test]
fn config_init_get_set() {
    let home = TempDir::new().unwrap();

    tenk(&home)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not created"));

    tenk(&home)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created configuration file"));

    tenk(&home)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    tenk(&home)
        .args(["config", "get", "model.name"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gemini-2.0-flash"));

    tenk(&home)
        .args(["config", "set", "model.max_retries", "5"])
        .assert()
        .success();

    tenk(&home)
        .args(["config", "get", "model.max_retries"])
        .assert()
        .success()
        .stdout(predicate::str::diff("5\n"));
}

#[test]
fn config_set_rejects_unknown_key() {
    let home = TempDir::new().unwrap();
    tenk(&home)
        .args(["config", "set", "model.no_such_key", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn batch_on_empty_directory_succeeds() {
    let home = TempDir::new().unwrap();
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();

    tenk(&home)
        .arg("batch")
        .arg("--input-dir")
        .arg(input.path())
        .arg("--output-dir")
        .arg(output.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No documents to process"));
}

#[test]
fn batch_missing_input_directory_fails() {
    let home = TempDir::new().unwrap();
    tenk(&home)
        .args(["batch", "--input-dir", "/definitely/not/here"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input directory not found"));
}

#[test]
fn batch_without_api_key_fails() {
    let home = TempDir::new().unwrap();
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    std::fs::write(input.path().join("report.pdf"), b"%PDF-1.5").unwrap();

    tenk(&home)
        .arg("batch")
        .arg("--input-dir")
        .arg(input.path())
        .arg("--output-dir")
        .arg(output.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("GEMINI_API_KEY"));
}

#[test]
fn process_missing_file_fails() {
    let home = TempDir::new().unwrap();
    tenk(&home)
        .args(["process", "missing.pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}
