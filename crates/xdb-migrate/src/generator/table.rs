//! Table and column scripts.

use crate::core::identifier::validate_check_expression;
use crate::core::schema::{Column, Table};
use crate::error::Result;

use super::constraint::{check_constraint, primary_key_constraint};
use super::context::{ObjectType, ScriptGeneratorContext};

/// Column definition as it appears inside `CREATE TABLE` or `ADD`.
pub fn column_definition(column: &Column, ctx: &ScriptGeneratorContext) -> Result<String> {
    let mut sql = format!("{} {}", ctx.identifier(&column.name)?, ctx.column_type(column)?);

    if let Some(default) = &column.default_value {
        sql.push_str(" DEFAULT ");
        sql.push_str(default);
    }
    if !column.nullable {
        sql.push_str(" NOT NULL");
    }
    if ctx.is_requested(ObjectType::Check) {
        if let Some(check) = &column.check {
            validate_check_expression(check)?;
            sql.push_str(&format!(" CHECK ({})", check));
        }
    }
    Ok(sql)
}

/// `CREATE TABLE` with inline primary key and checks when requested.
pub fn create_table(table: &Table, ctx: &ScriptGeneratorContext) -> Result<String> {
    let mut parts = table
        .columns
        .iter()
        .map(|c| column_definition(c, ctx))
        .collect::<Result<Vec<_>>>()?;

    if ctx.is_requested(ObjectType::PrimaryKey) {
        if let Some(pk) = &table.primary_key {
            parts.push(primary_key_constraint(pk, ctx)?);
        }
    }
    if ctx.is_requested(ObjectType::Check) {
        for check in &table.checks {
            parts.push(check_constraint(check, ctx)?);
        }
    }

    Ok(format!(
        "CREATE TABLE {} ({})",
        ctx.table_name(table)?,
        parts.join(", ")
    ))
}

pub fn drop_table(table: &Table, ctx: &ScriptGeneratorContext) -> Result<String> {
    Ok(format!("DROP TABLE {}", ctx.table_name(table)?))
}

pub fn add_column(table: &Table, column: &Column, ctx: &ScriptGeneratorContext) -> Result<String> {
    Ok(format!(
        "ALTER TABLE {} ADD {}",
        ctx.table_name(table)?,
        column_definition(column, ctx)?
    ))
}

pub fn drop_column(table: &Table, column: &Column, ctx: &ScriptGeneratorContext) -> Result<String> {
    Ok(format!(
        "ALTER TABLE {} DROP COLUMN {}",
        ctx.table_name(table)?,
        ctx.identifier(&column.name)?
    ))
}
