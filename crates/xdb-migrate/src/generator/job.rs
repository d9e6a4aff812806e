//! Schema generation job: generate scripts for a model and export them.

use tracing::info;

use crate::core::schema::Database;
use crate::error::{MigrateError, Result};

use super::context::ScriptGeneratorContext;
use super::exporter::ScriptExporter;
use super::SchemaObject;

pub struct SchemaJob {
    database: Database,
    context: ScriptGeneratorContext,
    exporter: Box<dyn ScriptExporter>,
    fail_on_empty_scripts: bool,
}

impl SchemaJob {
    pub fn new(
        database: Database,
        context: ScriptGeneratorContext,
        exporter: Box<dyn ScriptExporter>,
    ) -> Self {
        Self {
            database,
            context,
            exporter,
            fail_on_empty_scripts: true,
        }
    }

    pub fn fail_on_empty_scripts(mut self, fail: bool) -> Self {
        self.fail_on_empty_scripts = fail;
        self
    }

    /// Generate and export, returning the number of statements exported.
    ///
    /// The exporter is closed on every path once opened.
    pub async fn run(mut self) -> Result<usize> {
        self.database.validate()?;
        let scripts = SchemaObject::Database(&self.database).scripts(&self.context)?;

        if scripts.is_empty() && self.fail_on_empty_scripts {
            return Err(MigrateError::Config(
                "No scripts generated for the selected object types".into(),
            ));
        }

        self.exporter.open().await?;
        let exported = self.exporter.export(&scripts).await;
        let closed = self.exporter.close().await;
        exported?;
        closed?;

        info!(
            "Exported {} {} scripts",
            scripts.len(),
            self.context.dialect().name()
        );
        Ok(scripts.len())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::schema::{Column, Table};
    use crate::core::types::{codes, TypeDesc};
    use crate::drivers::PostgresDialect;
    use crate::generator::{FileScriptExporter, ObjectType};

    fn model() -> Database {
        let mut db = Database::default();
        db.add_table(Table::new("t").with_column(Column::new("id", TypeDesc::code(codes::INTEGER))));
        db
    }

    #[tokio::test]
    async fn test_job_writes_scripts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.sql");
        let ctx = ScriptGeneratorContext::new(Arc::new(PostgresDialect::new()));
        let job = SchemaJob::new(model(), ctx, Box::new(FileScriptExporter::new(&path)));
        assert_eq!(job.run().await.unwrap(), 1);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "CREATE TABLE \"t\" (\"id\" INTEGER);\n"
        );
    }

    #[tokio::test]
    async fn test_empty_scripts_fail_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.sql");
        let ctx = ScriptGeneratorContext::new(Arc::new(PostgresDialect::new()))
            .with_object_types([ObjectType::ForeignKey]);

        let job = SchemaJob::new(model(), ctx.clone(), Box::new(FileScriptExporter::new(&path)));
        assert!(matches!(job.run().await, Err(MigrateError::Config(_))));

        let job = SchemaJob::new(model(), ctx, Box::new(FileScriptExporter::new(&path)))
            .fail_on_empty_scripts(false);
        assert_eq!(job.run().await.unwrap(), 0);
    }
}
