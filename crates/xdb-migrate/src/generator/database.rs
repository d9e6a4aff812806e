//! Database-level script ordering.

use crate::core::schema::{Database, Table};
use crate::error::Result;

use super::constraint::{create_foreign_key, create_index, create_primary_key, drop_foreign_key};
use super::context::{GroupScriptsBy, ObjectType, ScriptGeneratorContext};
use super::table::{create_table, drop_table};

fn included<'a>(database: &'a Database, ctx: &ScriptGeneratorContext) -> Vec<&'a Table> {
    database.tables().filter(|t| ctx.includes_table(t)).collect()
}

/// Drops in dependency order: foreign keys, then tables in reverse.
pub fn drop_database(database: &Database, ctx: &ScriptGeneratorContext) -> Result<Vec<String>> {
    let tables = included(database, ctx);
    let mut scripts = Vec::new();

    if ctx.is_requested(ObjectType::ForeignKey) {
        for table in &tables {
            for fk in &table.foreign_keys {
                scripts.push(drop_foreign_key(table, fk, ctx)?);
            }
        }
    }
    if ctx.is_requested(ObjectType::Table) {
        for table in tables.iter().rev() {
            scripts.push(drop_table(table, ctx)?);
        }
    }
    Ok(scripts)
}

/// `CREATE TABLE`, or the primary key alone when tables are not requested.
fn table_scripts(table: &Table, ctx: &ScriptGeneratorContext) -> Result<Vec<String>> {
    if ctx.is_requested(ObjectType::Table) {
        return Ok(vec![create_table(table, ctx)?]);
    }
    match (&table.primary_key, ctx.is_requested(ObjectType::PrimaryKey)) {
        (Some(pk), true) => Ok(vec![create_primary_key(table, pk, ctx)?]),
        _ => Ok(Vec::new()),
    }
}

fn index_scripts(table: &Table, ctx: &ScriptGeneratorContext) -> Result<Vec<String>> {
    if !ctx.is_requested(ObjectType::Index) {
        return Ok(Vec::new());
    }
    table
        .indexes
        .iter()
        .map(|index| create_index(table, index, ctx))
        .collect()
}

/// Creates: tables, indexes, then foreign keys.
///
/// Foreign keys always come last so every referenced table exists,
/// whichever grouping is requested.
pub fn create_database(database: &Database, ctx: &ScriptGeneratorContext) -> Result<Vec<String>> {
    let tables = included(database, ctx);
    let mut scripts = Vec::new();

    match ctx.group_scripts_by {
        GroupScriptsBy::Table => {
            for table in &tables {
                scripts.extend(table_scripts(table, ctx)?);
                scripts.extend(index_scripts(table, ctx)?);
            }
        }
        GroupScriptsBy::ObjectType => {
            for table in &tables {
                scripts.extend(table_scripts(table, ctx)?);
            }
            for table in &tables {
                scripts.extend(index_scripts(table, ctx)?);
            }
        }
    }

    if ctx.is_requested(ObjectType::ForeignKey) {
        for table in &tables {
            for fk in &table.foreign_keys {
                scripts.push(create_foreign_key(table, fk, ctx)?);
            }
        }
    }
    Ok(scripts)
}
