//! # xdb-migrate
//!
//! Cross-database schema translation and backup/restore engine.
//!
//! This library provides:
//!
//! - **Script generation**: dialect-aware DDL from a neutral schema model
//! - **Value access**: typed get/set of column values through a handler registry
//! - **Backups**: a JSON manifest plus size-bounded binary or text data files
//! - **Dump**: parallel table reads from a source database into a backup
//! - **Load**: parallel row-set replay with deferred constraint phases
//!
//! ## Example
//!
//! ```rust,no_run
//! use xdb_migrate::{BackupOps, Config, DialectResolver, LoadOrchestrator};
//!
//! #[tokio::main]
//! async fn main() -> xdb_migrate::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let resolver = DialectResolver::with_builtins();
//!     let Some(target) = config.target.as_ref() else {
//!         return Ok(());
//!     };
//!     let factory = xdb_migrate::drivers::connect(target, &resolver, 4).await?;
//!
//!     let ops = BackupOps::new("backup");
//!     let backup = ops.read()?;
//!     let ctx = config.schema.context(&resolver)?;
//!     let result = LoadOrchestrator::new(factory, ctx, config.load.clone())?
//!         .run(&backup, &ops)
//!         .await?;
//!     println!("Loaded {} rows", result.rows_loaded);
//!     Ok(())
//! }
//! ```

pub mod access;
pub mod backup;
pub mod config;
pub mod core;
pub mod dialect;
pub mod drivers;
pub mod error;
pub mod generator;
pub mod orchestrator;
pub mod session;

// Re-exports for convenient access
pub use access::{ValueAccessProvider, ValueCodec};
pub use backup::{Backup, BackupOps, BackupWriter, DumpOptions, FormatKind, RowSet};
pub use config::{Config, ConnectionConfig, DumpConfig, LoadConfig, SchemaConfig};
pub use crate::core::{Database, Dialect, DialectResolver, Session, SessionFactory, Table, Value};
pub use error::{MigrateError, Result};
pub use generator::{SchemaJob, SchemaObject, ScriptExporter, ScriptGeneratorContext};
pub use orchestrator::{LoadOrchestrator, LoadResult, RowSetStatus, RunStatus};
