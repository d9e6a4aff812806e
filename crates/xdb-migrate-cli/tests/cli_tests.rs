//! CLI integration tests for xdb-migrate.
//!
//! These tests verify command-line argument parsing, help output, script
//! generation from a model file and exit codes for error conditions. None
//! of them need a database.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Get a command for the xdb-migrate binary.
fn cmd() -> Command {
    Command::cargo_bin("xdb-migrate").unwrap()
}

const MODEL: &str = r#"{
  "catalogs": [{
    "schemas": [{
      "name": "app",
      "tables": [{
        "schema": "app",
        "name": "users",
        "columns": [
          {"name": "id", "type_code": 4, "nullable": false},
          {"name": "email", "type_code": 12, "size": 255}
        ],
        "primary_key": {"name": "pk_users", "columns": ["id"]},
        "indexes": [{"name": "ix_users_email", "columns": ["email"], "unique": true}]
      }]
    }]
  }]
}"#;

fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("schema"))
        .stdout(predicate::str::contains("dump"))
        .stdout(predicate::str::contains("load"));
}

#[test]
fn test_schema_subcommand_help() {
    cmd()
        .args(["schema", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--model"))
        .stdout(predicate::str::contains("--dialect"))
        .stdout(predicate::str::contains("--drop"))
        .stdout(predicate::str::contains("--execute"));
}

#[test]
fn test_load_subcommand_help() {
    cmd()
        .args(["load", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--input-dir"))
        .stdout(predicate::str::contains("--create-schema"))
        .stdout(predicate::str::contains("--fail-fast"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("xdb-migrate"));
}

// =============================================================================
// Global Flags Tests
// =============================================================================

#[test]
fn test_log_format_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--log-format"))
        .stdout(predicate::str::contains("[default: text]"));
}

#[test]
fn test_verbosity_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--verbosity"))
        .stdout(predicate::str::contains("[default: info]"));
}

#[test]
fn test_output_json_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--output-json"));
}

// =============================================================================
// Schema Generation Tests
// =============================================================================

#[test]
fn test_schema_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_file(dir.path(), "model.json", MODEL);

    cmd()
        .args(["schema", "--model"])
        .arg(&model)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "CREATE TABLE \"app\".\"users\" (\"id\" INTEGER NOT NULL, \"email\" VARCHAR(255), CONSTRAINT \"pk_users\" PRIMARY KEY (\"id\"));",
        ))
        .stdout(predicate::str::contains(
            "CREATE UNIQUE INDEX \"ix_users_email\" ON \"app\".\"users\" (\"email\");",
        ));
}

#[test]
fn test_schema_dialect_override() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_file(dir.path(), "model.json", MODEL);

    cmd()
        .args(["schema", "--dialect", "mysql", "--model"])
        .arg(&model)
        .assert()
        .success()
        .stdout(predicate::str::contains("CREATE TABLE `app`.`users`"))
        .stdout(predicate::str::contains("`email` VARCHAR(255)"));
}

#[test]
fn test_schema_drop_scripts_come_first() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_file(dir.path(), "model.json", MODEL);

    let output = cmd()
        .args(["schema", "--drop", "--model"])
        .arg(&model)
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let drop = stdout.find("DROP TABLE").unwrap();
    let create = stdout.find("CREATE TABLE").unwrap();
    assert!(drop < create);
}

#[test]
fn test_schema_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_file(dir.path(), "model.json", MODEL);
    let output = dir.path().join("schema.sql");

    cmd()
        .args(["schema", "--model"])
        .arg(&model)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("CREATE TABLE").not());

    let scripts = std::fs::read_to_string(&output).unwrap();
    assert!(scripts.starts_with("CREATE TABLE \"app\".\"users\""));
    assert!(scripts.ends_with(";\n"));
}

#[test]
fn test_schema_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_file(dir.path(), "model.json", MODEL);
    let config = write_file(
        dir.path(),
        "config.yaml",
        r#"
schema:
  dialect: sqlserver
  target_schema: dbo
  object_types: [table, column]
"#,
    );

    cmd()
        .arg("--config")
        .arg(&config)
        .args(["schema", "--model"])
        .arg(&model)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "CREATE TABLE [dbo].[users] ([id] INT NOT NULL, [email] VARCHAR(255));",
        ))
        .stdout(predicate::str::contains("INDEX").not());
}

// =============================================================================
// Exit Code Tests
// =============================================================================

#[test]
fn test_unknown_dialect_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_file(dir.path(), "model.json", MODEL);

    cmd()
        .args(["schema", "--dialect", "oracle", "--model"])
        .arg(&model)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown database dialect"));
}

#[test]
fn test_invalid_model_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_file(
        dir.path(),
        "model.json",
        r#"{"catalogs": [{"schemas": [{"tables": [{"name": "t", "columns": [{"name": "a", "type_code": 4}], "primary_key": {"columns": ["missing"]}}]}]}]}"#,
    );

    cmd()
        .args(["schema", "--model"])
        .arg(&model)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown column missing"));
}

#[test]
fn test_empty_model_fails() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_file(dir.path(), "model.json", "{}");

    cmd()
        .args(["schema", "--model"])
        .arg(&model)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No scripts generated"));
}

#[test]
fn test_missing_model_file_is_io_error() {
    cmd()
        .args(["schema", "--model", "/nonexistent/model.json"])
        .assert()
        .code(7);
}

#[test]
fn test_malformed_model_is_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_file(dir.path(), "model.json", "{ not json");

    cmd()
        .args(["schema", "--model"])
        .arg(&model)
        .assert()
        .code(8);
}

#[test]
fn test_missing_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_file(dir.path(), "model.json", MODEL);

    cmd()
        .args(["--config", "/nonexistent/config.yaml", "schema", "--model"])
        .arg(&model)
        .assert()
        .failure();
}

#[test]
fn test_invalid_yaml_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_file(dir.path(), "config.yaml", "schema: [not: valid: yaml");
    let model = write_file(dir.path(), "model.json", MODEL);

    cmd()
        .arg("--config")
        .arg(&config)
        .args(["schema", "--model"])
        .arg(&model)
        .assert()
        .code(1);
}

#[test]
fn test_dump_requires_source() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_file(dir.path(), "model.json", MODEL);

    cmd()
        .args(["dump", "--model"])
        .arg(&model)
        .arg("--output-dir")
        .arg(dir.path().join("backup"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("source connection"));
}

#[test]
fn test_load_requires_directory() {
    cmd()
        .arg("load")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No backup directory"));
}

#[test]
fn test_execute_against_unsupported_target() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_file(dir.path(), "model.json", MODEL);
    let config = write_file(
        dir.path(),
        "config.yaml",
        r#"
target:
  dialect: mysql
  host: localhost
  port: 3306
  database: app
  user: app
"#,
    );

    cmd()
        .arg("--config")
        .arg(&config)
        .args(["schema", "--execute", "--model"])
        .arg(&model)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("live sessions"));
}

#[test]
fn test_invalid_dump_format() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_file(dir.path(), "model.json", MODEL);

    cmd()
        .args(["dump", "--format", "xml", "--model"])
        .arg(&model)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown backup format"));
}
