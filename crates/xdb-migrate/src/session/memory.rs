//! In-memory database session.
//!
//! Records every statement it is asked to execute and keeps inserted rows
//! per table so dump and load can run end to end without a server.
//! Failures can be injected per table (inserts and selects) or per
//! statement fragment, and warnings can be attached to exact statements.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;

use crate::access::{MemoryRow, RowCursor};
use crate::core::traits::{RowStream, Session, SessionFactory, SqlWarning};
use crate::core::value::Value;
use crate::error::{MigrateError, Result};

#[derive(Debug, Default)]
struct State {
    log: Vec<String>,
    tables: HashMap<String, Vec<Vec<Value>>>,
    table_failures: HashMap<String, String>,
    statement_failures: Vec<(String, String)>,
    warnings: HashMap<String, Vec<SqlWarning>>,
    active_sessions: usize,
    peak_sessions: usize,
    opened_sessions: usize,
}

/// Shared in-memory database. Clones share the same state.
#[derive(Debug, Clone)]
pub struct MemoryDatabase {
    dialect: String,
    state: Arc<Mutex<State>>,
}

impl MemoryDatabase {
    pub fn new(dialect: impl Into<String>) -> Self {
        Self {
            dialect: dialect.into(),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    pub fn factory(&self) -> Arc<dyn SessionFactory> {
        Arc::new(MemorySessionFactory { db: self.clone() })
    }

    /// Seed rows for a table, as read back by `SELECT .. FROM table`.
    pub fn insert_rows(&self, table: &str, rows: Vec<Vec<Value>>) {
        self.state
            .lock()
            .tables
            .entry(table_key(table))
            .or_default()
            .extend(rows);
    }

    pub fn rows(&self, table: &str) -> Vec<Vec<Value>> {
        self.state
            .lock()
            .tables
            .get(&table_key(table))
            .cloned()
            .unwrap_or_default()
    }

    /// Make inserts into and selects from `table` fail.
    pub fn fail_table(&self, table: &str, message: &str) {
        self.state
            .lock()
            .table_failures
            .insert(table_key(table), message.to_string());
    }

    /// Make any executed statement containing `fragment` fail.
    pub fn fail_statement(&self, fragment: &str, message: &str) {
        self.state
            .lock()
            .statement_failures
            .push((fragment.to_string(), message.to_string()));
    }

    /// Attach a warning to an exact statement.
    pub fn add_warning(&self, sql: &str, message: &str) {
        self.state
            .lock()
            .warnings
            .entry(sql.to_string())
            .or_default()
            .push(SqlWarning {
                code: None,
                message: message.to_string(),
            });
    }

    /// Every statement received, in order. Batches appear once per batch.
    pub fn executed(&self) -> Vec<String> {
        self.state.lock().log.clone()
    }

    /// Highest number of sessions open at the same time.
    pub fn peak_sessions(&self) -> usize {
        self.state.lock().peak_sessions
    }

    pub fn active_sessions(&self) -> usize {
        self.state.lock().active_sessions
    }

    pub fn opened_sessions(&self) -> usize {
        self.state.lock().opened_sessions
    }
}

/// Key for a table named in SQL text: last dotted part, unquoted, lowercase.
fn table_key(name: &str) -> String {
    let unquoted: String = name
        .chars()
        .filter(|c| !matches!(c, '"' | '`' | '[' | ']'))
        .collect();
    unquoted
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Table named after `keyword` in a statement, e.g. `INTO` or `FROM`.
fn table_after(sql: &str, keyword: &str) -> Option<String> {
    let mut tokens = sql.split_whitespace();
    tokens.find(|t| t.eq_ignore_ascii_case(keyword))?;
    tokens.next().map(table_key)
}

pub struct MemorySessionFactory {
    db: MemoryDatabase,
}

#[async_trait]
impl SessionFactory for MemorySessionFactory {
    async fn open(&self) -> Result<Box<dyn Session>> {
        {
            let mut state = self.db.state.lock();
            state.active_sessions += 1;
            state.opened_sessions += 1;
            state.peak_sessions = state.peak_sessions.max(state.active_sessions);
        }
        Ok(Box::new(MemorySession {
            db: self.db.clone(),
        }))
    }
}

pub struct MemorySession {
    db: MemoryDatabase,
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.db.state.lock().active_sessions -= 1;
    }
}

impl MemorySession {
    fn check_table(state: &State, table: &Option<String>) -> Result<()> {
        match table.as_ref().and_then(|t| state.table_failures.get(t)) {
            Some(message) => Err(MigrateError::Session(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Session for MemorySession {
    fn dialect_name(&self) -> &str {
        &self.db.dialect
    }

    async fn execute(&mut self, sql: &str) -> Result<Vec<SqlWarning>> {
        let mut state = self.db.state.lock();
        state.log.push(sql.to_string());
        if let Some((_, message)) = state
            .statement_failures
            .iter()
            .find(|(fragment, _)| sql.contains(fragment.as_str()))
        {
            return Err(MigrateError::Session(message.clone()));
        }
        Ok(state.warnings.get(sql).cloned().unwrap_or_default())
    }

    async fn execute_batch(&mut self, sql: &str, rows: Vec<Vec<Value>>) -> Result<u64> {
        let table = table_after(sql, "INTO");
        let mut state = self.db.state.lock();
        state.log.push(sql.to_string());
        Self::check_table(&state, &table)?;

        let table = table.ok_or_else(|| {
            MigrateError::Session(format!("no target table in statement: {}", sql))
        })?;
        let count = rows.len() as u64;
        state.tables.entry(table).or_default().extend(rows);
        Ok(count)
    }

    async fn query(&mut self, sql: &str) -> Result<RowStream> {
        let table = table_after(sql, "FROM");
        let rows = {
            let mut state = self.db.state.lock();
            state.log.push(sql.to_string());
            Self::check_table(&state, &table)?;
            table
                .and_then(|t| state.tables.get(&t).cloned())
                .unwrap_or_default()
        };
        let cursors = rows
            .into_iter()
            .map(|row| Ok(Box::new(MemoryRow::new(row)) as Box<dyn RowCursor>));
        Ok(stream::iter(cursors).boxed())
    }
}
