//! Dump: read tables through source sessions into a backup directory.

use std::sync::Arc;
use std::time::Instant;

use futures::TryStreamExt;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::access::{ValueAccessProvider, ValueCodec};
use crate::config::DumpConfig;
use crate::core::schema::{Database, Table};
use crate::core::traits::SessionFactory;
use crate::error::{MigrateError, Result};
use crate::generator::{ObjectType, SchemaObject, ScriptGeneratorContext, SelectQuery};

use super::format::{FormatKind, OutputFormat, OutputOptions};
use super::{Backup, BackupOps, RowSet, RowSetColumn, Script};

/// Settings for one dump.
#[derive(Debug, Clone)]
pub struct DumpOptions {
    pub format: FormatKind,
    pub output: OutputOptions,

    /// Tables dumped in parallel.
    pub threads: usize,

    pub codec: ValueCodec,

    /// Hash of the configuration, recorded in the manifest.
    pub config_hash: Option<String>,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            format: FormatKind::default(),
            output: OutputOptions::default(),
            threads: 4,
            codec: ValueCodec::default(),
            config_hash: None,
        }
    }
}

impl DumpOptions {
    pub fn from_config(config: &DumpConfig) -> Result<Self> {
        Ok(Self {
            format: config.format,
            output: OutputOptions {
                buffer_size: config.buffer_size,
                max_size: config.max_size,
            },
            threads: config.threads.max(1),
            codec: ValueCodec::for_zone(&config.time_zone)?,
            config_hash: None,
        })
    }
}

/// Writes a backup of a schema model and its rows.
pub struct BackupWriter {
    factory: Arc<dyn SessionFactory>,
    source_ctx: ScriptGeneratorContext,
    script_ctx: ScriptGeneratorContext,
    provider: Arc<ValueAccessProvider>,
    options: DumpOptions,
    cancel: CancellationToken,
}

impl BackupWriter {
    /// `source_ctx` renders the `SELECT` statements in the source dialect.
    /// Create scripts recorded in the manifest use the same dialect with
    /// tables only, unless [`BackupWriter::with_script_context`] is set.
    pub fn new(
        factory: Arc<dyn SessionFactory>,
        source_ctx: ScriptGeneratorContext,
        options: DumpOptions,
    ) -> Self {
        let script_ctx = source_ctx.clone().with_object_types([
            ObjectType::Table,
            ObjectType::Column,
            ObjectType::Check,
        ]);
        Self {
            factory,
            source_ctx,
            script_ctx,
            provider: Arc::new(ValueAccessProvider::default()),
            options,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_script_context(mut self, ctx: ScriptGeneratorContext) -> Self {
        self.script_ctx = ctx;
        self
    }

    pub fn with_provider(mut self, provider: Arc<ValueAccessProvider>) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Dump every table of `database` the source context includes.
    pub async fn dump(&self, database: &Database, ops: &BackupOps) -> Result<Backup> {
        database.validate()?;
        let started = Instant::now();
        let tables: Vec<Table> = database
            .tables()
            .filter(|t| self.source_ctx.includes_table(t))
            .cloned()
            .collect();

        info!(
            "Dumping {} tables to {} with {} workers",
            tables.len(),
            ops.dir().display(),
            self.options.threads
        );

        let semaphore = Arc::new(Semaphore::new(self.options.threads.max(1)));
        let mut handles = Vec::with_capacity(tables.len());

        for (ordinal, table) in tables.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                info!("Cancellation requested, stopping new dumps");
                break;
            }
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| MigrateError::State("dump worker pool closed".into()))?;

            let job = TableDump {
                ordinal,
                factory: self.factory.clone(),
                ctx: self.source_ctx.clone(),
                provider: self.provider.clone(),
                options: self.options.clone(),
                ops: ops.clone(),
                cancel: self.cancel.clone(),
            };
            let name = table.full_name();
            let handle = tokio::spawn(async move {
                let _permit = permit;
                job.run(table).await
            });
            handles.push((name, handle));
        }

        let mut row_sets = Vec::with_capacity(handles.len());
        let mut first_error = None;
        for (name, handle) in handles {
            match handle.await {
                Ok(Ok(row_set)) => row_sets.push(row_set),
                Ok(Err(e)) => {
                    error!("{}: dump failed - {}", name, e);
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    error!("{}: task panicked - {}", name, e);
                    first_error.get_or_insert(MigrateError::load(name, format!("task panicked: {}", e)));
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }
        if self.cancel.is_cancelled() {
            return Err(MigrateError::Cancelled);
        }

        let scripts = SchemaObject::Database(database)
            .create_scripts(&self.script_ctx)?
            .into_iter()
            .map(Script::from)
            .collect();

        let mut backup = Backup::new(self.options.format, database.info.clone())
            .with_database(database.clone())?;
        backup.config_hash = self.options.config_hash.clone();
        backup.scripts = scripts;
        backup.row_sets = row_sets;
        ops.write(&backup)?;

        let rows: u64 = backup.row_sets.iter().map(|r| r.rows).sum();
        info!(
            "Dump complete: {} tables, {} rows in {:.1}s",
            backup.row_sets.len(),
            rows,
            started.elapsed().as_secs_f64()
        );
        Ok(backup)
    }
}

/// Everything one worker needs to dump one table.
struct TableDump {
    ordinal: usize,
    factory: Arc<dyn SessionFactory>,
    ctx: ScriptGeneratorContext,
    provider: Arc<ValueAccessProvider>,
    options: DumpOptions,
    ops: BackupOps,
    cancel: CancellationToken,
}

impl TableDump {
    fn open_file(&self, row_set: &mut RowSet, names: &[String]) -> Result<Box<dyn OutputFormat>> {
        let name = BackupOps::data_file_name(
            self.ordinal,
            &row_set.table,
            row_set.files.len(),
            self.options.format,
        );
        let file = self.ops.create_data_file(&name)?;
        let mut output = self.options.format.output(Box::new(file), self.options.output);
        output.open(names)?;
        debug!("{}: writing {}", row_set.table, name);
        row_set.files.push(name);
        Ok(output)
    }

    async fn run(self, table: Table) -> Result<RowSet> {
        let table_ref = table.table_ref();
        let names: Vec<String> = table.columns.iter().map(|c| c.name.clone()).collect();
        let descs: Vec<_> = table.columns.iter().map(|c| c.type_desc.clone()).collect();
        let sql = SelectQuery::new(&table_ref, &names).to_sql(&self.ctx)?;

        let mut row_set = RowSet {
            table: table_ref,
            columns: table
                .columns
                .iter()
                .map(|c| RowSetColumn {
                    name: c.name.clone(),
                    type_desc: c.type_desc.clone(),
                })
                .collect(),
            files: Vec::new(),
            rows: 0,
        };

        let mut session = self.factory.open().await?;
        let mut rows = session.query(&sql).await?;
        let mut output = self.open_file(&mut row_set, &names)?;

        while let Some(cursor) = rows.try_next().await? {
            if self.cancel.is_cancelled() {
                output.close()?;
                return Err(MigrateError::Cancelled);
            }
            if !output.can_write_values() {
                output.close()?;
                output = self.open_file(&mut row_set, &names)?;
            }

            let fields = descs
                .iter()
                .enumerate()
                .map(|(i, desc)| {
                    let value = self.provider.get_value(cursor.as_ref(), i, desc)?;
                    self.options.codec.encode(&value)
                })
                .collect::<Result<Vec<_>>>()?;
            output.write_row(&fields)?;
            row_set.rows += 1;
        }
        output.close()?;

        info!(
            "{}: dumped {} rows in {} file(s)",
            row_set.table,
            row_set.rows,
            row_set.files.len()
        );
        Ok(row_set)
    }
}
