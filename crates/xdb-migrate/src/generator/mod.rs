//! Dialect-aware DDL script generation.
//!
//! [`SchemaObject`] dispatches each kind of schema object to its create,
//! drop and inline constraint scripts. Every name goes through the
//! [`ScriptGeneratorContext`], which owns quoting, normalization and
//! qualification. Generation is pure given the object and the context.
//!
//! Statements are returned without terminators; exporters add them.

mod constraint;
mod context;
mod database;
mod exporter;
mod job;
mod query;
mod table;

pub use context::{GroupScriptsBy, ObjectType, ScriptGeneratorContext, ScriptKind};
pub use exporter::{
    CompositeScriptExporter, FileScriptExporter, ScriptExporter, SessionScriptExporter,
    WriterScriptExporter,
};
pub use job::SchemaJob;
pub use query::{InsertQuery, InsertType, SelectQuery};

use crate::core::schema::{Check, Column, Database, ForeignKey, Index, PrimaryKey, Table};
use crate::error::Result;

/// A schema object paired with the table that owns it.
#[derive(Debug, Clone, Copy)]
pub enum SchemaObject<'a> {
    Database(&'a Database),
    Table(&'a Table),
    Column(&'a Table, &'a Column),
    Index(&'a Table, &'a Index),
    PrimaryKey(&'a Table, &'a PrimaryKey),
    ForeignKey(&'a Table, &'a ForeignKey),
    Check(&'a Table, &'a Check),
}

impl SchemaObject<'_> {
    /// Ordered statements creating this object.
    pub fn create_scripts(&self, ctx: &ScriptGeneratorContext) -> Result<Vec<String>> {
        Ok(match *self {
            SchemaObject::Database(db) => return database::create_database(db, ctx),
            SchemaObject::Table(t) => vec![table::create_table(t, ctx)?],
            SchemaObject::Column(t, c) => vec![table::add_column(t, c, ctx)?],
            SchemaObject::Index(t, i) => vec![constraint::create_index(t, i, ctx)?],
            SchemaObject::PrimaryKey(t, pk) => vec![constraint::create_primary_key(t, pk, ctx)?],
            SchemaObject::ForeignKey(t, fk) => vec![constraint::create_foreign_key(t, fk, ctx)?],
            SchemaObject::Check(t, check) => vec![format!(
                "ALTER TABLE {} ADD {}",
                ctx.table_name(t)?,
                constraint::check_constraint(check, ctx)?
            )],
        })
    }

    /// Ordered statements dropping this object.
    pub fn drop_scripts(&self, ctx: &ScriptGeneratorContext) -> Result<Vec<String>> {
        Ok(match *self {
            SchemaObject::Database(db) => return database::drop_database(db, ctx),
            SchemaObject::Table(t) => vec![table::drop_table(t, ctx)?],
            SchemaObject::Column(t, c) => vec![table::drop_column(t, c, ctx)?],
            SchemaObject::Index(t, i) => vec![constraint::drop_index(t, i, ctx)?],
            SchemaObject::PrimaryKey(t, pk) => vec![constraint::drop_primary_key(t, pk, ctx)?],
            SchemaObject::ForeignKey(t, fk) => vec![constraint::drop_foreign_key(t, fk, ctx)?],
            SchemaObject::Check(t, check) => {
                let name = check
                    .name
                    .as_deref()
                    .ok_or_else(|| ctx.dialect().unsupported("DROP unnamed CHECK"))?;
                vec![format!(
                    "ALTER TABLE {} DROP CONSTRAINT {}",
                    ctx.table_name(t)?,
                    ctx.identifier(name)?
                )]
            }
        })
    }

    /// Bare constraint clause for embedding in `CREATE TABLE`.
    ///
    /// `None` for objects that are not constraints.
    pub fn constraint_script(&self, ctx: &ScriptGeneratorContext) -> Result<Option<String>> {
        match *self {
            SchemaObject::PrimaryKey(_, pk) => constraint::primary_key_constraint(pk, ctx).map(Some),
            SchemaObject::ForeignKey(t, fk) => {
                constraint::foreign_key_constraint(t, fk, ctx).map(Some)
            }
            SchemaObject::Check(_, check) => constraint::check_constraint(check, ctx).map(Some),
            _ => Ok(None),
        }
    }

    /// Drop and create statements for the script kinds the context requests.
    pub fn scripts(&self, ctx: &ScriptGeneratorContext) -> Result<Vec<String>> {
        let mut scripts = Vec::new();
        if ctx.wants(ScriptKind::Drop) {
            scripts.extend(self.drop_scripts(ctx)?);
        }
        if ctx.wants(ScriptKind::Create) {
            scripts.extend(self.create_scripts(ctx)?);
        }
        Ok(scripts)
    }
}
