//! Backups: the manifest, row-set descriptors and data files.
//!
//! A backup is a directory holding `backup.json` and one or more data
//! files per table. The manifest records the format, tool version, source
//! [`DatabaseInfo`] with a fingerprint of the schema model, the DDL scripts
//! and a [`RowSet`] per table.

pub mod format;
mod writer;

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::core::schema::{Database, DatabaseInfo, TableRef};
use crate::core::types::TypeDesc;
use crate::error::{MigrateError, Result};

pub use format::{FormatKind, InputFormat, OutputFormat, OutputOptions};
pub use writer::{BackupWriter, DumpOptions};

/// Manifest file name inside a backup directory.
pub const MANIFEST_FILE: &str = "backup.json";

/// Version recorded in backups produced by this build.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Backup manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backup {
    pub format: FormatKind,
    pub version: String,
    pub database_info: DatabaseInfo,

    /// SHA-256 of the serialized schema model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,

    /// Hash of the configuration that produced the backup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,

    pub created_at: DateTime<Utc>,

    /// DDL for the backed-up tables, in execution order.
    #[serde(default)]
    pub scripts: Vec<Script>,

    #[serde(default)]
    pub row_sets: Vec<RowSet>,

    /// Schema model used to recreate tables and constraints on load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<Database>,
}

impl Backup {
    pub fn new(format: FormatKind, database_info: DatabaseInfo) -> Self {
        Self {
            format,
            version: TOOL_VERSION.to_string(),
            database_info,
            fingerprint: None,
            config_hash: None,
            created_at: Utc::now(),
            scripts: Vec::new(),
            row_sets: Vec::new(),
            database: None,
        }
    }

    /// Attach the schema model and record its fingerprint.
    pub fn with_database(mut self, database: Database) -> Result<Self> {
        self.fingerprint = Some(fingerprint(&database)?);
        self.database = Some(database);
        Ok(self)
    }

    /// Check that the embedded model still matches its fingerprint.
    pub fn verify(&self) -> Result<()> {
        if let (Some(expected), Some(database)) = (&self.fingerprint, &self.database) {
            let actual = fingerprint(database)?;
            if &actual != expected {
                return Err(MigrateError::Format(format!(
                    "schema fingerprint mismatch: manifest has {}, model hashes to {}",
                    expected, actual
                )));
            }
        }
        Ok(())
    }
}

/// Raw DDL statement recorded in a backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    pub sql: String,
}

impl From<String> for Script {
    fn from(sql: String) -> Self {
        Self { sql }
    }
}

/// Column of a row-set: name plus declared type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSetColumn {
    pub name: String,
    #[serde(flatten)]
    pub type_desc: TypeDesc,
}

/// Backed-up data of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSet {
    pub table: TableRef,
    pub columns: Vec<RowSetColumn>,

    /// Data file names relative to the backup directory, in write order.
    pub files: Vec<String>,

    #[serde(default)]
    pub rows: u64,
}

impl RowSet {
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// SHA-256 fingerprint of a schema model.
pub fn fingerprint(database: &Database) -> Result<String> {
    let json = serde_json::to_vec(database)?;
    let mut hasher = Sha256::new();
    hasher.update(&json);
    Ok(format!("{:x}", hasher.finalize()))
}

/// File-level operations on a backup directory.
#[derive(Debug, Clone)]
pub struct BackupOps {
    dir: PathBuf,
}

impl BackupOps {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    /// Write the manifest, replacing any previous one.
    pub fn write(&self, backup: &Backup) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(backup)?;
        let tmp = self.dir.join(format!("{}.tmp", MANIFEST_FILE));
        fs::write(&tmp, json)?;
        fs::rename(&tmp, self.manifest_path())?;
        debug!("Wrote backup manifest {}", self.manifest_path().display());
        Ok(())
    }

    /// Read and verify the manifest.
    pub fn read(&self) -> Result<Backup> {
        let json = fs::read_to_string(self.manifest_path())?;
        let backup: Backup = serde_json::from_str(&json)?;
        backup.verify()?;
        Ok(backup)
    }

    /// Name of the `index`-th data file of the `ordinal`-th row-set:
    /// `<ordinal>-<table>.<n>.<ext>`. The table part is only readable; the
    /// ordinal keeps names of tables that map to the same stem apart.
    pub fn data_file_name(
        ordinal: usize,
        table: &TableRef,
        index: usize,
        format: FormatKind,
    ) -> String {
        let stem: String = table
            .to_string()
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("{}-{}.{}.{}", ordinal, stem, index, format.extension())
    }

    /// Create a data file for writing, truncating an existing one.
    pub fn create_data_file(&self, name: &str) -> Result<File> {
        fs::create_dir_all(&self.dir)?;
        Ok(File::create(self.dir.join(name))?)
    }

    /// Open a data file and read its header.
    pub fn open_data_file(&self, name: &str, format: FormatKind) -> Result<Box<dyn InputFormat>> {
        let file = File::open(self.dir.join(name))?;
        let mut input = format.input(Box::new(file));
        input.open()?;
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{Column, Table};
    use crate::core::types::codes;

    fn model() -> Database {
        let mut db = Database::default();
        db.add_table(
            Table::new("users")
                .with_schema(None, Some("app"))
                .with_column(Column::new("id", TypeDesc::new(codes::INTEGER, "int4"))),
        );
        db
    }

    #[test]
    fn test_manifest_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let ops = BackupOps::new(dir.path());
        let mut backup = Backup::new(FormatKind::Binary, DatabaseInfo::default())
            .with_database(model())
            .unwrap();
        backup.row_sets.push(RowSet {
            table: TableRef::new(None, Some("app"), "users"),
            columns: vec![RowSetColumn {
                name: "id".into(),
                type_desc: TypeDesc::new(codes::INTEGER, "int4"),
            }],
            files: vec!["app.users.0.bin".into()],
            rows: 3,
        });
        ops.write(&backup).unwrap();

        let read = ops.read().unwrap();
        assert_eq!(read, backup);
        assert_eq!(read.version, TOOL_VERSION);
    }

    #[test]
    fn test_manifest_field_names() {
        let backup = Backup::new(FormatKind::Text, DatabaseInfo::default());
        let json = serde_json::to_value(&backup).unwrap();
        assert_eq!(json["format"], "text");
        assert!(json.get("row_sets").is_some());
        assert!(json.get("database_info").is_some());
    }

    #[test]
    fn test_fingerprint_mismatch_detected() {
        let dir = tempfile::tempdir().unwrap();
        let ops = BackupOps::new(dir.path());
        let mut backup = Backup::new(FormatKind::Binary, DatabaseInfo::default())
            .with_database(model())
            .unwrap();
        backup.fingerprint = Some("0".repeat(64));
        ops.write(&backup).unwrap();
        assert!(matches!(ops.read(), Err(MigrateError::Format(_))));
    }

    #[test]
    fn test_data_file_name() {
        let table = TableRef::new(None, Some("app"), "order items");
        assert_eq!(
            BackupOps::data_file_name(4, &table, 2, FormatKind::Binary),
            "4-app.order_items.2.bin"
        );
    }

    #[test]
    fn test_data_file_names_of_similar_tables_differ() {
        let pairs = [
            (TableRef::new(None, None, "a$b"), TableRef::new(None, None, "a_b")),
            (TableRef::new(None, Some("x"), "y"), TableRef::new(None, None, "x.y")),
        ];
        for (first, second) in pairs {
            assert_ne!(
                BackupOps::data_file_name(0, &first, 0, FormatKind::Binary),
                BackupOps::data_file_name(1, &second, 0, FormatKind::Binary)
            );
        }
    }

    #[test]
    fn test_missing_manifest_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let ops = BackupOps::new(dir.path().join("nope"));
        assert!(matches!(ops.read(), Err(MigrateError::Io(_))));
    }
}
