//! Index, primary key, foreign key and check scripts.
//!
//! Foreign keys are added without a constraint name so the statement is
//! accepted by every target, including those that mishandle named
//! constraints added after table creation. A foreign key that points into
//! another catalog or schema resolves the referenced table through a
//! derived context targeting that namespace, while the owning table keeps
//! the caller's context.

use crate::core::identifier::validate_check_expression;
use crate::core::schema::{Check, ForeignKey, Index, PrimaryKey, Table};
use crate::core::traits::DropForeignKeySyntax;
use crate::error::Result;

use super::context::ScriptGeneratorContext;

pub fn create_index(table: &Table, index: &Index, ctx: &ScriptGeneratorContext) -> Result<String> {
    let unique = if index.unique { "UNIQUE " } else { "" };
    Ok(format!(
        "CREATE {}INDEX {} ON {} ({})",
        unique,
        ctx.identifier(&index.name)?,
        ctx.table_name(table)?,
        ctx.identifiers(&index.columns)?
    ))
}

pub fn drop_index(table: &Table, index: &Index, ctx: &ScriptGeneratorContext) -> Result<String> {
    if ctx.dialect().drop_index_on_table() {
        Ok(format!(
            "DROP INDEX {} ON {}",
            ctx.identifier(&index.name)?,
            ctx.table_name(table)?
        ))
    } else {
        // Index names live in the table's schema
        Ok(format!(
            "DROP INDEX {}",
            ctx.qualified_name(table.catalog.as_deref(), table.schema.as_deref(), &index.name)?
        ))
    }
}

/// `[CONSTRAINT name] PRIMARY KEY (cols)`.
pub fn primary_key_constraint(pk: &PrimaryKey, ctx: &ScriptGeneratorContext) -> Result<String> {
    let mut sql = String::new();
    if let Some(name) = &pk.name {
        sql.push_str(&format!("CONSTRAINT {} ", ctx.identifier(name)?));
    }
    sql.push_str(&format!("PRIMARY KEY ({})", ctx.identifiers(&pk.columns)?));
    Ok(sql)
}

pub fn create_primary_key(
    table: &Table,
    pk: &PrimaryKey,
    ctx: &ScriptGeneratorContext,
) -> Result<String> {
    Ok(format!(
        "ALTER TABLE {} ADD {}",
        ctx.table_name(table)?,
        primary_key_constraint(pk, ctx)?
    ))
}

pub fn drop_primary_key(
    table: &Table,
    pk: &PrimaryKey,
    ctx: &ScriptGeneratorContext,
) -> Result<String> {
    let clause = if ctx.dialect().drop_primary_key_by_name() {
        let name = pk
            .name
            .as_deref()
            .ok_or_else(|| ctx.dialect().unsupported("DROP unnamed PRIMARY KEY"))?;
        format!("DROP CONSTRAINT {}", ctx.identifier(name)?)
    } else {
        "DROP PRIMARY KEY".to_string()
    };
    Ok(format!("ALTER TABLE {} {}", ctx.table_name(table)?, clause))
}

/// Name of the referenced table, qualified in its own namespace when it
/// differs from the owning table's.
fn referenced_table_name(
    table: &Table,
    fk: &ForeignKey,
    ctx: &ScriptGeneratorContext,
) -> Result<String> {
    let target = &fk.referenced_table;
    if target.same_namespace(&table.table_ref()) {
        ctx.table_ref_name(target)
    } else {
        ctx.with_target(target.catalog.as_deref(), target.schema.as_deref())
            .table_ref_name(target)
    }
}

/// `FOREIGN KEY (cols) REFERENCES target (cols) [ON UPDATE a] [ON DELETE b]`.
pub fn foreign_key_constraint(
    table: &Table,
    fk: &ForeignKey,
    ctx: &ScriptGeneratorContext,
) -> Result<String> {
    let dialect = ctx.dialect();
    let mut sql = format!(
        "FOREIGN KEY ({}) REFERENCES {} ({})",
        ctx.identifiers(&fk.columns)?,
        referenced_table_name(table, fk, ctx)?,
        ctx.identifiers(&fk.referenced_columns)?
    );
    if let Some(action) = dialect.update_action(fk.on_update)? {
        sql.push_str(" ON UPDATE ");
        sql.push_str(action);
    }
    if let Some(action) = dialect.delete_action(fk.on_delete)? {
        sql.push_str(" ON DELETE ");
        sql.push_str(action);
    }
    Ok(sql)
}

pub fn create_foreign_key(
    table: &Table,
    fk: &ForeignKey,
    ctx: &ScriptGeneratorContext,
) -> Result<String> {
    Ok(format!(
        "ALTER TABLE {} ADD {}",
        ctx.table_name(table)?,
        foreign_key_constraint(table, fk, ctx)?
    ))
}

pub fn drop_foreign_key(
    table: &Table,
    fk: &ForeignKey,
    ctx: &ScriptGeneratorContext,
) -> Result<String> {
    let dialect = ctx.dialect();
    let clause = match dialect.drop_foreign_key() {
        DropForeignKeySyntax::ByName(keyword) => {
            let name = fk
                .name
                .as_deref()
                .ok_or_else(|| dialect.unsupported("DROP unnamed FOREIGN KEY"))?;
            format!("{} {}", keyword, ctx.identifier(name)?)
        }
        DropForeignKeySyntax::ByReference(keyword) => format!(
            "{} ({}) REFERENCES {}",
            keyword,
            ctx.identifiers(&fk.columns)?,
            referenced_table_name(table, fk, ctx)?
        ),
        DropForeignKeySyntax::Unsupported => return Err(dialect.unsupported("DROP FOREIGN KEY")),
    };
    Ok(format!("ALTER TABLE {} {}", ctx.table_name(table)?, clause))
}

/// `[CONSTRAINT name] CHECK (expr)`.
pub fn check_constraint(check: &Check, ctx: &ScriptGeneratorContext) -> Result<String> {
    validate_check_expression(&check.expression)?;
    let mut sql = String::new();
    if let Some(name) = &check.name {
        sql.push_str(&format!("CONSTRAINT {} ", ctx.identifier(name)?));
    }
    sql.push_str(&format!("CHECK ({})", check.expression));
    Ok(sql)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::schema::{Column, ReferentialAction, TableRef};
    use crate::core::types::{codes, TypeDesc};
    use crate::drivers::{AnsiDialect, MssqlDialect, MysqlDialect, NuodbDialect, PostgresDialect};
    use crate::error::MigrateError;

    fn unqualified_pg() -> ScriptGeneratorContext {
        let mut ctx = ScriptGeneratorContext::new(Arc::new(PostgresDialect::new()));
        ctx.qualify_names = false;
        ctx
    }

    fn table1() -> Table {
        Table::new("table1").with_column(Column::new("column1", TypeDesc::code(codes::INTEGER)))
    }

    fn fk_to(target: TableRef) -> ForeignKey {
        ForeignKey {
            name: None,
            columns: vec!["column1".into()],
            referenced_table: target,
            referenced_columns: vec!["column2".into()],
            on_update: ReferentialAction::NoAction,
            on_delete: ReferentialAction::NoAction,
        }
    }

    #[test]
    fn test_foreign_key_create_script() {
        let mut fk = fk_to(TableRef::new(None, None, "table2"));
        fk.on_update = ReferentialAction::Cascade;
        assert_eq!(
            create_foreign_key(&table1(), &fk, &unqualified_pg()).unwrap(),
            "ALTER TABLE \"table1\" ADD FOREIGN KEY (\"column1\") REFERENCES \"table2\" (\"column2\") ON UPDATE CASCADE"
        );
    }

    #[test]
    fn test_foreign_key_name_is_not_emitted() {
        let mut fk = fk_to(TableRef::new(None, None, "table2"));
        fk.name = Some("fk_t1_t2".into());
        let sql = create_foreign_key(&table1(), &fk, &unqualified_pg()).unwrap();
        assert!(!sql.contains("fk_t1_t2"));
        assert!(!sql.contains("CONSTRAINT"));
    }

    #[test]
    fn test_cross_schema_reference_uses_foreign_schema() {
        let mut ctx = ScriptGeneratorContext::new(Arc::new(PostgresDialect::new()));
        ctx.target_schema = Some("target".into());

        let table = table1().with_schema(None, Some("sales"));
        let fk = fk_to(TableRef::new(None, Some("hr"), "table2"));
        assert_eq!(
            create_foreign_key(&table, &fk, &ctx).unwrap(),
            "ALTER TABLE \"target\".\"table1\" ADD FOREIGN KEY (\"column1\") REFERENCES \"hr\".\"table2\" (\"column2\")"
        );
        // The caller's context is not modified
        assert_eq!(ctx.target_schema.as_deref(), Some("target"));
    }

    #[test]
    fn test_cross_catalog_reference() {
        let ctx = ScriptGeneratorContext::new(Arc::new(MssqlDialect::new()));
        let table = table1().with_schema(Some("sales"), Some("dbo"));
        let fk = fk_to(TableRef::new(Some("hr"), Some("dbo"), "table2"));
        let sql = create_foreign_key(&table, &fk, &ctx).unwrap();
        assert!(sql.starts_with("ALTER TABLE [sales].[dbo].[table1]"));
        assert!(sql.contains("REFERENCES [hr].[dbo].[table2]"));
    }

    #[test]
    fn test_same_schema_reference_follows_target_override() {
        let mut ctx = ScriptGeneratorContext::new(Arc::new(PostgresDialect::new()));
        ctx.target_schema = Some("target".into());
        let table = table1().with_schema(None, Some("sales"));
        let fk = fk_to(TableRef::new(None, Some("sales"), "table2"));
        let sql = create_foreign_key(&table, &fk, &ctx).unwrap();
        assert!(sql.contains("REFERENCES \"target\".\"table2\""));
    }

    #[test]
    fn test_unsupported_referential_action_errors() {
        let mut ctx = ScriptGeneratorContext::new(Arc::new(MysqlDialect::new()));
        ctx.qualify_names = false;
        let mut fk = fk_to(TableRef::new(None, None, "table2"));
        fk.on_delete = ReferentialAction::SetDefault;
        let err = create_foreign_key(&table1(), &fk, &ctx).unwrap_err();
        assert!(matches!(err, MigrateError::Unsupported { .. }));
    }

    #[test]
    fn test_drop_foreign_key_variants() {
        let table = table1();
        let mut fk = fk_to(TableRef::new(None, None, "table2"));

        // By name requires a name
        let err = drop_foreign_key(&table, &fk, &unqualified_pg()).unwrap_err();
        assert!(matches!(err, MigrateError::Unsupported { .. }));
        fk.name = Some("fk1".into());
        assert_eq!(
            drop_foreign_key(&table, &fk, &unqualified_pg()).unwrap(),
            "ALTER TABLE \"table1\" DROP CONSTRAINT \"fk1\""
        );

        let mut ctx = ScriptGeneratorContext::new(Arc::new(NuodbDialect::new()));
        ctx.qualify_names = false;
        assert_eq!(
            drop_foreign_key(&table, &fk, &ctx).unwrap(),
            "ALTER TABLE \"table1\" DROP FOREIGN KEY (\"column1\") REFERENCES \"table2\""
        );

        let ctx = ScriptGeneratorContext::new(Arc::new(AnsiDialect::new()));
        let err = drop_foreign_key(&table, &fk, &ctx).unwrap_err();
        assert!(err.to_string().contains("DROP FOREIGN KEY"));
    }

    #[test]
    fn test_index_scripts() {
        let table = table1();
        let index = Index {
            name: "ix_c1".into(),
            columns: vec!["column1".into()],
            unique: true,
        };
        assert_eq!(
            create_index(&table, &index, &unqualified_pg()).unwrap(),
            "CREATE UNIQUE INDEX \"ix_c1\" ON \"table1\" (\"column1\")"
        );
        assert_eq!(
            drop_index(&table, &index, &unqualified_pg()).unwrap(),
            "DROP INDEX \"ix_c1\""
        );

        let mut ctx = ScriptGeneratorContext::new(Arc::new(MysqlDialect::new()));
        ctx.qualify_names = false;
        assert_eq!(
            drop_index(&table, &index, &ctx).unwrap(),
            "DROP INDEX `ix_c1` ON `table1`"
        );
    }

    #[test]
    fn test_primary_key_scripts() {
        let table = table1();
        let pk = PrimaryKey {
            name: None,
            columns: vec!["column1".into()],
        };
        assert_eq!(
            create_primary_key(&table, &pk, &unqualified_pg()).unwrap(),
            "ALTER TABLE \"table1\" ADD PRIMARY KEY (\"column1\")"
        );
        assert!(drop_primary_key(&table, &pk, &unqualified_pg()).is_err());

        let mut ctx = ScriptGeneratorContext::new(Arc::new(MysqlDialect::new()));
        ctx.qualify_names = false;
        assert_eq!(
            drop_primary_key(&table, &pk, &ctx).unwrap(),
            "ALTER TABLE `table1` DROP PRIMARY KEY"
        );
    }
}
