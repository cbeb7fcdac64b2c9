//! Integration tests running the `logagent` binary

use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const SETTINGS_MODULE: &str = "import json\n\n\ndef load_settings(path):\n    with open(path) as handle:\n        settings = json.load(handle)\n    return settings[\"database_url\"]\n";

const TRACEBACK: &str = "INFO starting\nTraceback (most recent call last):\n  File \"settings.py\", line 7, in load_settings\n    return settings[\"database_url\"]\nKeyError: 'database_url'\n";

fn create_project(dir: &Path) -> Result<()> {
    fs::write(dir.join("settings.py"), SETTINGS_MODULE)?;
    fs::write(dir.join("util.py"), "def add(a, b):\n    return a + b\n")?;
    Ok(())
}

fn logagent(home: &Path) -> Result<Command> {
    let mut cmd = Command::cargo_bin("logagent")?;
    cmd.current_dir(home)
        .env_remove("ANTHROPIC_API_KEY")
        .env("LOGAGENT_USE_LLM", "false")
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("NO_COLOR", "1");
    Ok(cmd)
}

#[test]
fn test_no_subcommand_prints_help() -> Result<()> {
    let temp = TempDir::new()?;
    logagent(temp.path())?
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("analyze"));
    Ok(())
}

#[test]
fn test_invalid_subcommand_fails() -> Result<()> {
    let temp = TempDir::new()?;
    logagent(temp.path())?
        .arg("frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
    Ok(())
}

#[test]
fn test_index_reports_files_and_chunks() -> Result<()> {
    let temp = TempDir::new()?;
    create_project(temp.path())?;

    logagent(temp.path())?
        .args(["index", "."])
        .assert()
        .success()
        .stdout(predicate::str::contains("Indexing complete"))
        .stdout(predicate::str::contains("Files indexed:   2"));
    Ok(())
}

#[test]
fn test_index_missing_path_is_error() -> Result<()> {
    let temp = TempDir::new()?;
    logagent(temp.path())?
        .args(["index", "does-not-exist"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Error:"));
    Ok(())
}

#[test]
fn test_analyze_log_file_rule_based() -> Result<()> {
    let temp = TempDir::new()?;
    create_project(temp.path())?;
    fs::write(temp.path().join("error.log"), TRACEBACK)?;

    logagent(temp.path())?
        .args([
            "analyze",
            "--codebase",
            ".",
            "--log",
            "error.log",
            "--min-score",
            "-1",
            "--no-llm",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("ERROR ANALYSIS REPORT (RULE-BASED)"))
        .stdout(predicate::str::contains("KeyError: 'database_url'"))
        .stdout(predicate::str::contains("Validate dictionary keys before access"))
        .stdout(predicate::str::contains("RELEVANT CODE DETAILS:"));
    Ok(())
}

#[test]
fn test_analyze_reads_stdin_as_json() -> Result<()> {
    let temp = TempDir::new()?;
    create_project(temp.path())?;

    let output = logagent(temp.path())?
        .args([
            "analyze",
            "--codebase",
            ".",
            "--min-score",
            "-1",
            "-n",
            "2",
            "--no-llm",
            "--format",
            "json",
        ])
        .write_stdin(TRACEBACK)
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout)?;
    assert_eq!(json["used_llm"], false);
    assert_eq!(json["relevant_chunks"].as_array().map(Vec::len), Some(2));
    assert!(json["error_summary"]
        .as_str()
        .is_some_and(|s| s.contains("KeyError")));
    Ok(())
}

#[test]
fn test_analyze_empty_log_is_error() -> Result<()> {
    let temp = TempDir::new()?;
    create_project(temp.path())?;

    logagent(temp.path())?
        .args(["analyze", "--codebase", ".", "--no-llm"])
        .write_stdin("   \n")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("the error log is empty"));
    Ok(())
}

#[test]
fn test_search_json_output() -> Result<()> {
    let temp = TempDir::new()?;
    create_project(temp.path())?;

    let output = logagent(temp.path())?
        .args([
            "search",
            "--codebase",
            ".",
            "load_settings database_url",
            "--min-score",
            "-1",
            "--format",
            "json",
        ])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let results: Vec<serde_json::Value> = serde_json::from_str(&stdout)?;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["rank"], 1);
    assert!(results
        .windows(2)
        .all(|w| w[0]["similarity_score"].as_f64() >= w[1]["similarity_score"].as_f64()));
    Ok(())
}

#[test]
fn test_search_table_output() -> Result<()> {
    let temp = TempDir::new()?;
    create_project(temp.path())?;

    logagent(temp.path())?
        .args(["search", "--codebase", ".", "add", "--min-score", "-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rank"))
        .stdout(predicate::str::contains("util.py"));
    Ok(())
}

#[test]
fn test_doctor_warns_without_ai() -> Result<()> {
    let temp = TempDir::new()?;
    logagent(temp.path())?
        .arg("doctor")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("LogAgent Doctor"))
        .stdout(predicate::str::contains("Embedding engine"))
        .stdout(predicate::str::contains("rule-based"));
    Ok(())
}

#[test]
fn test_invalid_config_file_is_error() -> Result<()> {
    let temp = TempDir::new()?;
    create_project(temp.path())?;
    fs::write(temp.path().join("bad.yaml"), "default_num_results: 0\n")?;

    logagent(temp.path())?
        .args(["--config", "bad.yaml", "index", "."])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("default_num_results"));
    Ok(())
}
