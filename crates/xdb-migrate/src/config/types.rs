//! Configuration type definitions.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::backup::format::{FormatKind, DEFAULT_BUFFER_SIZE};
use crate::core::identifier::{IdentifierNormalizer, IdentifierQuoting};
use crate::dialect::TypeSpec;
use crate::drivers::SslMode;
use crate::generator::{GroupScriptsBy, InsertType, ObjectType, ScriptKind};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Database read by `dump`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ConnectionConfig>,

    /// Database written by `load`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ConnectionConfig>,

    /// Script generation settings.
    #[serde(default)]
    pub schema: SchemaConfig,

    #[serde(default)]
    pub dump: DumpConfig,

    #[serde(default)]
    pub load: LoadConfig,
}

/// Database connection settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Dialect spoken by the database (default: "postgres").
    #[serde(default = "default_postgres")]
    pub dialect: String,

    pub host: String,

    /// Database port (default: 5432).
    #[serde(default = "default_pg_port")]
    pub port: u16,

    pub database: String,

    pub user: String,

    #[serde(default)]
    pub password: String,

    /// Catalog holding the migrated tables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,

    /// Schema holding the migrated tables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// SSL mode (default: disable).
    #[serde(default)]
    pub ssl_mode: SslMode,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("dialect", &self.dialect)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("catalog", &self.catalog)
            .field("schema", &self.schema)
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

/// Script generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Target dialect name or alias (default: "postgres").
    #[serde(default = "default_postgres")]
    pub dialect: String,

    #[serde(default)]
    pub quoting: IdentifierQuoting,

    #[serde(default)]
    pub normalizer: IdentifierNormalizer,

    /// Object types to script (default: all).
    #[serde(default = "default_object_types")]
    pub object_types: Vec<ObjectType>,

    /// Script kinds to produce (default: create).
    #[serde(default = "default_script_kinds")]
    pub script_kinds: Vec<ScriptKind>,

    #[serde(default)]
    pub group_scripts_by: GroupScriptsBy,

    /// Qualify names with catalog and schema (default: true).
    #[serde(default = "default_true")]
    pub qualify_names: bool,

    /// Fail when no scripts are generated (default: true).
    #[serde(default = "default_true")]
    pub fail_on_empty_scripts: bool,

    /// Only script tables from this catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_catalog: Option<String>,

    /// Only script tables from this schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_schema: Option<String>,

    /// Catalog used in generated names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_catalog: Option<String>,

    /// Schema used in generated names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_schema: Option<String>,

    /// Script file; scripts go to stdout when unset and no target is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    /// DDL type name overrides.
    #[serde(default)]
    pub type_specs: Vec<TypeSpec>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            dialect: default_postgres(),
            quoting: IdentifierQuoting::default(),
            normalizer: IdentifierNormalizer::default(),
            object_types: default_object_types(),
            script_kinds: default_script_kinds(),
            group_scripts_by: GroupScriptsBy::default(),
            qualify_names: true,
            fail_on_empty_scripts: true,
            source_catalog: None,
            source_schema: None,
            target_catalog: None,
            target_schema: None,
            output: None,
            type_specs: Vec::new(),
        }
    }
}

/// Dump settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpConfig {
    /// Backup directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    /// Data file format (default: bin).
    #[serde(default)]
    pub format: FormatKind,

    /// Maximum bytes per data file; unbounded when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,

    /// Write buffer per data file (default: 64 KiB).
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Tables dumped in parallel (default: 4).
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Zone of naive timestamps in the source (default: UTC).
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            format: FormatKind::default(),
            max_size: None,
            buffer_size: default_buffer_size(),
            threads: default_threads(),
            time_zone: default_time_zone(),
        }
    }
}

/// Load settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    /// Backup directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_dir: Option<PathBuf>,

    /// Row-sets loaded in parallel (default: 4).
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Rows per insert batch (default: 1000).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Zone of naive timestamps in the target (default: UTC).
    #[serde(default = "default_time_zone")]
    pub time_zone: String,

    /// Stop at the first row-set or constraint failure (default: false).
    #[serde(default)]
    pub fail_fast: bool,

    /// Create tables before loading (default: false).
    #[serde(default)]
    pub create_schema: bool,

    #[serde(default)]
    pub insert_type: InsertType,

    /// Insert type per table name, overriding `insert_type`.
    #[serde(default)]
    pub table_insert_types: HashMap<String, InsertType>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            input_dir: None,
            threads: default_threads(),
            batch_size: default_batch_size(),
            time_zone: default_time_zone(),
            fail_fast: false,
            create_schema: false,
            insert_type: InsertType::default(),
            table_insert_types: HashMap::new(),
        }
    }
}

fn default_postgres() -> String {
    "postgres".to_string()
}

fn default_pg_port() -> u16 {
    5432
}

fn default_true() -> bool {
    true
}

fn default_object_types() -> Vec<ObjectType> {
    ObjectType::ALL.to_vec()
}

fn default_script_kinds() -> Vec<ScriptKind> {
    vec![ScriptKind::Create]
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

fn default_threads() -> usize {
    4
}

fn default_batch_size() -> usize {
    1000
}

fn default_time_zone() -> String {
    "UTC".to_string()
}
