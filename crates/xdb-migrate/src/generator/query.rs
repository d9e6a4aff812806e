//! Parameterized DML used by dump and load.

use serde::{Deserialize, Serialize};

use crate::core::schema::TableRef;
use crate::error::Result;

use super::context::ScriptGeneratorContext;

/// Statement used to write loaded rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertType {
    #[default]
    Insert,
    /// Insert or replace rows with a matching key, where the dialect has it.
    Replace,
}

/// `INSERT INTO t (cols) VALUES (placeholders)`.
#[derive(Debug, Clone)]
pub struct InsertQuery<'a> {
    pub table: &'a TableRef,
    pub columns: &'a [String],
    pub insert_type: InsertType,
}

impl<'a> InsertQuery<'a> {
    pub fn new(table: &'a TableRef, columns: &'a [String]) -> Self {
        Self {
            table,
            columns,
            insert_type: InsertType::Insert,
        }
    }

    pub fn with_insert_type(mut self, insert_type: InsertType) -> Self {
        self.insert_type = insert_type;
        self
    }

    pub fn to_sql(&self, ctx: &ScriptGeneratorContext) -> Result<String> {
        let dialect = ctx.dialect();
        let keyword = match self.insert_type {
            InsertType::Insert => "INSERT",
            InsertType::Replace => dialect
                .replace_keyword()
                .ok_or_else(|| dialect.unsupported("REPLACE INTO"))?,
        };

        let mut sql = format!("{} INTO {}", keyword, ctx.table_ref_name(self.table)?);
        if self.columns.is_empty() {
            let clause = dialect
                .no_columns_insert()
                .ok_or_else(|| dialect.unsupported("INSERT without columns"))?;
            sql.push(' ');
            sql.push_str(clause);
        } else {
            let placeholders: Vec<String> = (1..=self.columns.len())
                .map(|i| dialect.param_placeholder(i))
                .collect();
            sql.push_str(&format!(
                " ({}) VALUES ({})",
                ctx.identifiers(self.columns)?,
                placeholders.join(", ")
            ));
        }
        Ok(sql)
    }
}

/// `SELECT cols FROM t`, reading columns in model order.
#[derive(Debug, Clone)]
pub struct SelectQuery<'a> {
    pub table: &'a TableRef,
    pub columns: &'a [String],
}

impl<'a> SelectQuery<'a> {
    pub fn new(table: &'a TableRef, columns: &'a [String]) -> Self {
        Self { table, columns }
    }

    pub fn to_sql(&self, ctx: &ScriptGeneratorContext) -> Result<String> {
        let columns = if self.columns.is_empty() {
            "*".to_string()
        } else {
            ctx.identifiers(self.columns)?
        };
        Ok(format!(
            "SELECT {} FROM {}",
            columns,
            ctx.table_ref_name(self.table)?
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::drivers::{AnsiDialect, MssqlDialect, MysqlDialect, PostgresDialect};
    use crate::error::MigrateError;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_insert_placeholders_per_dialect() {
        let table = TableRef::new(None, Some("app"), "users");
        let columns = cols(&["id", "name"]);
        let query = InsertQuery::new(&table, &columns);

        let pg = ScriptGeneratorContext::new(Arc::new(PostgresDialect::new()));
        assert_eq!(
            query.to_sql(&pg).unwrap(),
            "INSERT INTO \"app\".\"users\" (\"id\", \"name\") VALUES ($1, $2)"
        );
        let mssql = ScriptGeneratorContext::new(Arc::new(MssqlDialect::new()));
        assert_eq!(
            query.to_sql(&mssql).unwrap(),
            "INSERT INTO [app].[users] ([id], [name]) VALUES (@P1, @P2)"
        );
    }

    #[test]
    fn test_insert_without_columns() {
        let table = TableRef::new(None, None, "t");
        let query = InsertQuery::new(&table, &[]);
        let pg = ScriptGeneratorContext::new(Arc::new(PostgresDialect::new()));
        assert_eq!(query.to_sql(&pg).unwrap(), "INSERT INTO \"t\" DEFAULT VALUES");
        let mysql = ScriptGeneratorContext::new(Arc::new(MysqlDialect::new()));
        assert_eq!(query.to_sql(&mysql).unwrap(), "INSERT INTO `t` () VALUES ()");
        let ansi = ScriptGeneratorContext::new(Arc::new(AnsiDialect::new()));
        assert!(matches!(
            query.to_sql(&ansi),
            Err(MigrateError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_replace_insert_type() {
        let table = TableRef::new(None, None, "t");
        let columns = cols(&["a"]);
        let query = InsertQuery::new(&table, &columns).with_insert_type(InsertType::Replace);
        let mysql = ScriptGeneratorContext::new(Arc::new(MysqlDialect::new()));
        assert_eq!(query.to_sql(&mysql).unwrap(), "REPLACE INTO `t` (`a`) VALUES (?)");
        let pg = ScriptGeneratorContext::new(Arc::new(PostgresDialect::new()));
        assert!(query.to_sql(&pg).is_err());
    }

    #[test]
    fn test_select_query() {
        let table = TableRef::new(None, Some("app"), "users");
        let columns = cols(&["id", "name"]);
        let pg = ScriptGeneratorContext::new(Arc::new(PostgresDialect::new()));
        assert_eq!(
            SelectQuery::new(&table, &columns).to_sql(&pg).unwrap(),
            "SELECT \"id\", \"name\" FROM \"app\".\"users\""
        );
    }
}
