//! Integration tests for the ragwire binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn ragwire_cmd(config: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("ragwire").unwrap();
    cmd.env_remove("RAGWIRE_LLM_URL")
        .env_remove("RAGWIRE_CONFIG")
        .arg("--config")
        .arg(config);
    cmd
}

fn write_config(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("config.yml");
    fs::write(&path, body).unwrap();
    path
}

fn simple_config(dir: &TempDir) -> PathBuf {
    write_config(
        dir,
        "rag:\n  max_results: 5\nvector_store:\n  provider: simple\n  date_field: report_generated_date\n",
    )
}

#[test]
fn test_search_with_preloaded_files() {
    let dir = TempDir::new().unwrap();
    let config = simple_config(&dir);
    let report = dir.path().join("weekly.md");
    fs::write(&report, "APAC revenue grew 4%.\nEMEA was flat.").unwrap();

    ragwire_cmd(&config)
        .args(["search", "APAC", "revenue", "--ingest"])
        .arg(&report)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Found 1 relevant context(s) for 'APAC revenue':",
        ))
        .stdout(predicate::str::contains("Source: weekly.md (score: 1.00)"))
        .stdout(predicate::str::contains("Highlights: APAC revenue grew 4%"));
}

#[test]
fn test_search_without_results() {
    let dir = TempDir::new().unwrap();
    let config = simple_config(&dir);

    ragwire_cmd(&config)
        .args(["search", "anything"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "No relevant context found for query: 'anything'",
        ));
}

#[test]
fn test_invalid_date_degrades() {
    let dir = TempDir::new().unwrap();
    let config = simple_config(&dir);

    ragwire_cmd(&config)
        .args(["search", "anything", "--date", "2025-13-45"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No relevant context found"));
}

#[test]
fn test_blank_query_is_invalid_input() {
    let dir = TempDir::new().unwrap();
    let config = simple_config(&dir);

    ragwire_cmd(&config)
        .args(["search", "   "])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("parameter query cannot be empty"));
}

#[test]
fn test_ingest_and_json_output() {
    let dir = TempDir::new().unwrap();
    let config = simple_config(&dir);
    let file = dir.path().join("notes.md");
    fs::write(&file, "notes").unwrap();

    ragwire_cmd(&config)
        .args(["--format", "json", "ingest", "--meta", "team=sales"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"tool\": \"rag_ingest\""))
        .stdout(predicate::str::contains("Successfully ingested file:"));
}

#[test]
fn test_ingest_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    let config = simple_config(&dir);

    ragwire_cmd(&config)
        .arg("ingest")
        .arg(dir.path().join("missing.md"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_stats() {
    let dir = TempDir::new().unwrap();
    let config = simple_config(&dir);

    ragwire_cmd(&config)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "RAG Vector Store Statistics:\nTotal Files: 0\n",
        ));
}

#[test]
fn test_unknown_provider_is_config_error() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "vector_store:\n  provider: pinecone\n");

    ragwire_cmd(&config)
        .arg("stats")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("pinecone"))
        .stderr(predicate::str::contains("s3, simple"));
}

#[test]
fn test_missing_config_file() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.yml");

    ragwire_cmd(&missing)
        .arg("stats")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn test_mcp_tools_list() {
    let dir = TempDir::new().unwrap();
    let config = simple_config(&dir);

    ragwire_cmd(&config)
        .arg("mcp")
        .write_stdin(concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            "\n"
        ))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\":\"ragwire\""))
        .stdout(predicate::str::contains("rag_search"))
        .stdout(predicate::str::contains("rag_ingest"))
        .stdout(predicate::str::contains("rag_stats"));
}
