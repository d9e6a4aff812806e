//! Core traits for dialect-aware generation and database sessions.
//!
//! - [`Dialect`]: per-database-family SQL capabilities (Strategy)
//! - [`Session`]: one scoped connection owned by a single worker
//! - [`SessionFactory`]: hands out sessions to workers

use std::fmt;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::access::RowCursor;
use crate::dialect::TypeNameMap;
use crate::error::{MigrateError, Result};

use super::identifier::IdentifierCase;
use super::schema::ReferentialAction;
use super::value::Value;

/// How a dialect drops a foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropForeignKeySyntax {
    /// `ALTER TABLE t <clause> <constraint name>`; requires a named key.
    ByName(&'static str),
    /// `ALTER TABLE t <clause> (cols) REFERENCES target`.
    ByReference(&'static str),
    /// The dialect has no drop syntax for foreign keys.
    Unsupported,
}

/// SQL syntax strategy for a database family.
///
/// Everything the script generator needs from a target is behind this
/// trait; a capability the dialect lacks is reported as
/// [`MigrateError::Unsupported`] rather than skipped.
pub trait Dialect: Send + Sync + fmt::Debug {
    /// Canonical dialect name (e.g., "postgres").
    fn name(&self) -> &str;

    /// Quote an identifier unconditionally.
    fn quote_ident(&self, name: &str) -> String;

    /// Whether `word` is reserved and must be quoted even under minimal quoting.
    fn is_reserved_word(&self, word: &str) -> bool {
        COMMON_RESERVED_WORDS
            .iter()
            .any(|w| w.eq_ignore_ascii_case(word))
    }

    /// Case the engine folds unquoted identifiers to.
    fn identifier_case(&self) -> IdentifierCase {
        IdentifierCase::Preserve
    }

    /// Whether names may be qualified with a catalog.
    fn supports_catalogs(&self) -> bool {
        false
    }

    fn drop_foreign_key(&self) -> DropForeignKeySyntax;

    /// Whether a primary key is dropped as a named constraint
    /// (`DROP CONSTRAINT pk`) rather than with `DROP PRIMARY KEY`.
    fn drop_primary_key_by_name(&self) -> bool {
        false
    }

    /// Keyword for an ON UPDATE action, `None` to omit the clause.
    fn update_action(&self, action: ReferentialAction) -> Result<Option<&'static str>> {
        self.referential_action(action)
    }

    /// Keyword for an ON DELETE action, `None` to omit the clause.
    fn delete_action(&self, action: ReferentialAction) -> Result<Option<&'static str>> {
        self.referential_action(action)
    }

    /// Shared mapping used by both update and delete actions.
    fn referential_action(&self, action: ReferentialAction) -> Result<Option<&'static str>> {
        match action {
            ReferentialAction::NoAction => Ok(None),
            other => Ok(Some(other.keyword())),
        }
    }

    /// Clause used by `INSERT INTO t <clause>` when no columns are listed.
    fn no_columns_insert(&self) -> Option<&'static str>;

    /// Keyword replacing `INSERT` for insert-or-replace loads.
    fn replace_keyword(&self) -> Option<&'static str> {
        None
    }

    /// Parameter placeholder for a 1-based position.
    fn param_placeholder(&self, index: usize) -> String;

    /// Whether `DROP INDEX` must name the owning table (`DROP INDEX i ON t`).
    fn drop_index_on_table(&self) -> bool {
        false
    }

    /// Built-in mapping from declared types to DDL type names.
    fn type_names(&self) -> &TypeNameMap;

    /// Build an unsupported-capability error for this dialect.
    fn unsupported(&self, operation: &str) -> MigrateError {
        MigrateError::unsupported(operation, self.name())
    }
}

/// Reserved words shared by the supported engines.
const COMMON_RESERVED_WORDS: &[&str] = &[
    "ALL", "ALTER", "AND", "ANY", "AS", "ASC", "BETWEEN", "BY", "CASE", "CHECK", "COLUMN",
    "CONSTRAINT", "CREATE", "CROSS", "DEFAULT", "DELETE", "DESC", "DISTINCT", "DROP", "ELSE",
    "END", "EXISTS", "FOREIGN", "FROM", "FULL", "GRANT", "GROUP", "HAVING", "IN", "INDEX",
    "INNER", "INSERT", "INTO", "IS", "JOIN", "KEY", "LEFT", "LIKE", "NOT", "NULL", "ON", "OR",
    "ORDER", "OUTER", "PRIMARY", "REFERENCES", "RIGHT", "SELECT", "SET", "TABLE", "THEN", "TO",
    "UNION", "UNIQUE", "UPDATE", "USER", "VALUES", "WHEN", "WHERE", "WITH",
];

/// Warning reported by the database while executing a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlWarning {
    pub code: Option<String>,
    pub message: String,
}

/// Rows returned by [`Session::query`].
pub type RowStream = BoxStream<'static, Result<Box<dyn RowCursor>>>;

/// A single database connection owned by one worker.
///
/// Sessions are never shared between workers. Dropping a session releases
/// its connection, so release happens on every exit path.
#[async_trait]
pub trait Session: Send {
    /// Name of the dialect spoken by this session.
    fn dialect_name(&self) -> &str;

    /// Execute one statement, returning any warnings it raised.
    async fn execute(&mut self, sql: &str) -> Result<Vec<SqlWarning>>;

    /// Execute a parameterized statement once per row, atomically per batch.
    ///
    /// Returns the number of rows written.
    async fn execute_batch(&mut self, sql: &str, rows: Vec<Vec<Value>>) -> Result<u64>;

    /// Run a query and stream its rows.
    async fn query(&mut self, sql: &str) -> Result<RowStream>;
}

/// Source of scoped sessions.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self) -> Result<Box<dyn Session>>;
}
