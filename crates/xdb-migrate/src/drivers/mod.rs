//! Database driver implementations.
//!
//! Each driver module provides a [`Dialect`](crate::core::Dialect)
//! strategy for its engine; the PostgreSQL driver also provides a live
//! [`Session`](crate::core::Session) factory.
//!
//! - [`postgres`]: PostgreSQL dialect and sessions
//! - [`mysql`]: MySQL/MariaDB dialect
//! - [`mssql`]: Microsoft SQL Server dialect
//! - [`nuodb`]: NuoDB dialect
//! - [`ansi`]: generic SQL dialect for portable scripts
//!
//! # Adding New Databases
//!
//! 1. Create a new module under `drivers/`
//! 2. Implement the `Dialect` trait
//! 3. Register it in `DialectResolver::with_builtins()`

pub mod ansi;
pub mod mssql;
pub mod mysql;
pub mod nuodb;
pub mod postgres;

pub use ansi::AnsiDialect;
pub use mssql::MssqlDialect;
pub use mysql::MysqlDialect;
pub use nuodb::NuodbDialect;
pub use postgres::{PgSession, PgSessionFactory, PostgresDialect, SslMode};

use std::sync::Arc;

use crate::config::ConnectionConfig;
use crate::core::{DialectResolver, SessionFactory};
use crate::error::{MigrateError, Result};

/// Open a session factory for a configured connection.
///
/// Only PostgreSQL has a live session driver; other dialects generate
/// scripts but cannot be connected to.
pub async fn connect(
    config: &ConnectionConfig,
    resolver: &DialectResolver,
    max_sessions: usize,
) -> Result<Arc<dyn SessionFactory>> {
    let dialect = resolver.require(&config.dialect)?;
    match dialect.name() {
        "postgres" => Ok(Arc::new(PgSessionFactory::connect(config, max_sessions).await?)),
        other => Err(MigrateError::unsupported("live sessions", other)),
    }
}
