//! Load orchestrator: replays a backup into a target database.
//!
//! Row-sets are loaded by a fixed pool of workers, each owning one target
//! session. Constraints are collected while tables load and applied after
//! the load barrier, phase by phase: indexes, primary keys, foreign keys.

mod constraints;
mod result;

pub use constraints::{ConstraintPhase, DeferredConstraint, LoadConstraint, LoadConstraints};
pub use result::{
    ConstraintFailure, ConstraintSummary, LoadResult, RowSetReport, RowSetStatus, RunStatus,
};

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::access::{ParameterRow, ValueAccessProvider, ValueCodec};
use crate::backup::{Backup, BackupOps, FormatKind, RowSet};
use crate::config::LoadConfig;
use crate::core::schema::{Database, Table, TableRef};
use crate::core::traits::{Session, SessionFactory};
use crate::error::{MigrateError, Result};
use crate::generator::{
    InsertQuery, ObjectType, SchemaObject, ScriptExporter, ScriptGeneratorContext, ScriptKind,
    SessionScriptExporter,
};

/// Load orchestrator.
pub struct LoadOrchestrator {
    factory: Arc<dyn SessionFactory>,
    ctx: ScriptGeneratorContext,
    provider: Arc<ValueAccessProvider>,
    codec: ValueCodec,
    options: LoadConfig,
    cancel: CancellationToken,
}

impl LoadOrchestrator {
    /// `ctx` renders statements in the target dialect and namespace.
    pub fn new(
        factory: Arc<dyn SessionFactory>,
        ctx: ScriptGeneratorContext,
        options: LoadConfig,
    ) -> Result<Self> {
        Ok(Self {
            factory,
            ctx,
            provider: Arc::new(ValueAccessProvider::default()),
            codec: ValueCodec::for_zone(&options.time_zone)?,
            options,
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_provider(mut self, provider: Arc<ValueAccessProvider>) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Load every row-set of `backup`, then apply the deferred constraints.
    ///
    /// Row-set and constraint failures are reported in the result rather
    /// than returned, unless `fail_fast` is set. Errors before any row is
    /// loaded (schema creation, unreadable model) are returned.
    pub async fn run(&self, backup: &Backup, ops: &BackupOps) -> Result<LoadResult> {
        let started_at = Utc::now();
        let timer = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        info!("Starting load run: {}", run_id);

        if backup.version != crate::backup::TOOL_VERSION {
            warn!(
                "Backup was written by version {}, loading with {}",
                backup.version,
                crate::backup::TOOL_VERSION
            );
        }

        if let Some(database) = &backup.database {
            database.validate()?;
        }

        // Phase 1: schema
        if self.options.create_schema {
            info!("Phase 1: Creating target tables");
            self.create_schema(backup).await?;
        }

        // Phase 2: row-sets
        info!("Phase 2: Loading {} row-sets", backup.row_sets.len());
        let run_cancel = self.cancel.child_token();
        let constraints = Arc::new(LoadConstraints::new());
        let reports = self
            .load_row_sets(backup, ops, constraints.clone(), run_cancel.clone())
            .await;

        let rows_loaded = reports.iter().map(|r| r.rows).sum();
        let unloaded: HashSet<TableRef> = reports
            .iter()
            .filter(|r| r.status != RowSetStatus::Loaded)
            .map(|r| r.table.clone())
            .collect();

        // Constraints of tables that did not load were never collected
        let mut summary = ConstraintSummary::default();
        if let Some(database) = &backup.database {
            summary.skipped += unloaded
                .iter()
                .filter_map(|t| database.find_table(t))
                .map(|t| LoadConstraints::of_table(&Arc::new(t.clone()), &self.ctx).len())
                .sum::<usize>();
        }

        // Phase 3: constraints, strictly after every worker has returned
        if self.cancel.is_cancelled() {
            info!("Cancellation requested, skipping constraint phases");
            summary.skipped += constraints.len();
        } else if self.options.fail_fast && !unloaded.is_empty() {
            warn!("Row-set failures with fail_fast set, skipping constraint phases");
            summary.skipped += constraints.len();
        } else {
            info!("Phase 3: Applying {} deferred constraints", constraints.len());
            self.apply_constraints(&constraints, &unloaded, &mut summary)
                .await;
        }

        let status = if self.cancel.is_cancelled() {
            RunStatus::Cancelled
        } else if unloaded.is_empty() && summary.failed == 0 {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        };

        let completed_at = Utc::now();
        let result = LoadResult {
            run_id,
            status,
            started_at,
            completed_at,
            duration_seconds: timer.elapsed().as_secs_f64(),
            rows_loaded,
            row_sets: reports,
            constraints: summary,
        };

        info!(
            "Load {:?}: {} rows, {} of {} row-sets failed, constraints {} applied / {} failed / {} skipped in {:.1}s",
            result.status,
            result.rows_loaded,
            result.failed_row_sets().count(),
            result.row_sets.len(),
            result.constraints.applied,
            result.constraints.failed,
            result.constraints.skipped,
            result.duration_seconds
        );
        Ok(result)
    }

    /// Create target tables without indexes, primary keys or foreign keys.
    ///
    /// Without a schema model the backup's raw scripts are executed.
    async fn create_schema(&self, backup: &Backup) -> Result<usize> {
        let scripts = match &backup.database {
            Some(database) => {
                let table_ctx = self
                    .ctx
                    .clone()
                    .with_object_types([ObjectType::Table, ObjectType::Column, ObjectType::Check])
                    .with_script_kinds([ScriptKind::Create]);
                SchemaObject::Database(database).create_scripts(&table_ctx)?
            }
            None => backup.scripts.iter().map(|s| s.sql.clone()).collect(),
        };

        let mut exporter = SessionScriptExporter::new(self.factory.clone());
        exporter.open().await?;
        let exported = exporter.export(&scripts).await;
        let closed = exporter.close().await;
        exported?;
        closed?;

        info!("Created schema with {} statements", scripts.len());
        Ok(scripts.len())
    }

    async fn load_row_sets(
        &self,
        backup: &Backup,
        ops: &BackupOps,
        constraints: Arc<LoadConstraints>,
        cancel: CancellationToken,
    ) -> Vec<RowSetReport> {
        let reports = Arc::new(Mutex::new(
            backup
                .row_sets
                .iter()
                .map(|rs| RowSetReport {
                    table: rs.table.clone(),
                    status: RowSetStatus::Pending,
                    rows: 0,
                    error: None,
                })
                .collect::<Vec<_>>(),
        ));
        let queue: VecDeque<(usize, RowSet)> =
            backup.row_sets.iter().cloned().enumerate().collect();
        let workers = self.options.threads.max(1).min(queue.len());

        let shared = Arc::new(RowSetLoader {
            factory: self.factory.clone(),
            ctx: self.ctx.clone(),
            provider: self.provider.clone(),
            codec: self.codec,
            options: self.options.clone(),
            ops: ops.clone(),
            format: backup.format,
            model: backup.database.clone().map(Arc::new),
            constraints,
            queue: Mutex::new(queue),
            reports: reports.clone(),
            cancel,
        });

        info!("Loading with {} workers", workers);
        let mut handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let shared = shared.clone();
            let handle = tokio::spawn(async move { shared.work(worker_id).await });
            handles.push((worker_id, handle));
        }

        // Barrier: nothing below runs until every worker has returned
        let mut worker_error = None;
        for (worker_id, handle) in handles {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!("Worker {}: failed - {}", worker_id, e);
                    worker_error.get_or_insert_with(|| e.to_string());
                }
                Err(e) => {
                    error!("Worker {}: task panicked - {}", worker_id, e);
                    worker_error.get_or_insert_with(|| format!("Task panicked: {}", e));
                }
            }
        }

        let mut reports = std::mem::take(&mut *reports.lock());
        if !self.cancel.is_cancelled() {
            // Row-sets no worker got to, or one left mid-load by a panic
            for report in reports
                .iter_mut()
                .filter(|r| matches!(r.status, RowSetStatus::Pending | RowSetStatus::Loading))
            {
                if shared.cancel.is_cancelled() {
                    report.error = Some("not loaded: run stopped after a failure".into());
                } else {
                    report.error = Some(
                        worker_error
                            .clone()
                            .unwrap_or_else(|| "not loaded: no worker available".into()),
                    );
                }
                report.status = RowSetStatus::Failed;
            }
        }
        reports
    }

    async fn apply_constraints(
        &self,
        constraints: &LoadConstraints,
        unloaded: &HashSet<TableRef>,
        summary: &mut ConstraintSummary,
    ) {
        let unloaded = Arc::new(unloaded.clone());
        let stop = CancellationToken::new();

        for phase in ConstraintPhase::ORDER {
            let groups = constraints.phase(phase);
            if groups.is_empty() {
                continue;
            }
            if stop.is_cancelled() || self.cancel.is_cancelled() {
                summary.skipped += groups.iter().map(|(_, c)| c.len()).sum::<usize>();
                continue;
            }

            let max_tasks = self.options.threads.max(1);
            info!(
                "Creating {} constraints on {} tables with up to {} concurrent tasks",
                phase,
                groups.len(),
                max_tasks
            );
            let semaphore = Arc::new(Semaphore::new(max_tasks));
            let mut handles = Vec::with_capacity(groups.len());

            for (table, items) in groups {
                let count = items.len();
                let permit = match semaphore.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        warn!("{}: constraint pool closed - {}", table, e);
                        summary.skipped += count;
                        continue;
                    }
                };
                let applier = ConstraintApplier {
                    factory: self.factory.clone(),
                    ctx: self.ctx.clone(),
                    unloaded: unloaded.clone(),
                    fail_fast: self.options.fail_fast,
                    stop: stop.clone(),
                    cancel: self.cancel.clone(),
                };
                let handle = tokio::spawn(async move {
                    let _permit = permit;
                    applier.apply(items).await
                });
                handles.push((table, count, handle));
            }

            // Phases never overlap
            for (table, count, handle) in handles {
                match handle.await {
                    Ok(outcome) => summary.merge(outcome),
                    Err(e) => {
                        warn!("{}: constraint task panicked - {}", table, e);
                        summary.failed += count;
                        summary.failures.push(ConstraintFailure {
                            table,
                            constraint: phase.to_string(),
                            error: format!("Task panicked: {}", e),
                        });
                    }
                }
            }
        }
    }
}

/// State shared by the row-set workers.
struct RowSetLoader {
    factory: Arc<dyn SessionFactory>,
    ctx: ScriptGeneratorContext,
    provider: Arc<ValueAccessProvider>,
    codec: ValueCodec,
    options: LoadConfig,
    ops: BackupOps,
    format: FormatKind,
    model: Option<Arc<Database>>,
    constraints: Arc<LoadConstraints>,
    queue: Mutex<VecDeque<(usize, RowSet)>>,
    reports: Arc<Mutex<Vec<RowSetReport>>>,
    cancel: CancellationToken,
}

impl RowSetLoader {
    fn set_status(&self, index: usize, status: RowSetStatus, rows: u64, error: Option<String>) {
        if let Some(report) = self.reports.lock().get_mut(index) {
            report.status = status;
            report.rows = rows;
            report.error = error;
        }
    }

    /// Take row-sets off the queue until it is empty or the run stops.
    async fn work(&self, worker_id: usize) -> Result<()> {
        let mut session = self.factory.open().await?;
        debug!("Worker {}: session opened", worker_id);

        loop {
            if self.cancel.is_cancelled() {
                debug!("Worker {}: stopping", worker_id);
                break;
            }
            let next = self.queue.lock().pop_front();
            let Some((index, row_set)) = next else {
                break;
            };

            self.set_status(index, RowSetStatus::Loading, 0, None);
            match self.load(session.as_mut(), &row_set).await {
                Ok(rows) => {
                    info!("{}: loaded {} rows", row_set.table, rows);
                    self.set_status(index, RowSetStatus::Loaded, rows, None);
                    if let Some(table) = self.model_table(&row_set.table) {
                        let count = self.constraints.collect(&table, &self.ctx);
                        debug!("{}: deferred {} constraints", row_set.table, count);
                    }
                }
                Err(e) => {
                    error!("{}: failed - {}", row_set.table, e);
                    self.set_status(index, RowSetStatus::Failed, 0, Some(e.to_string()));
                    if self.options.fail_fast {
                        self.cancel.cancel();
                    }
                }
            }
        }
        Ok(())
    }

    fn model_table(&self, table: &TableRef) -> Option<Arc<Table>> {
        self.model
            .as_ref()
            .and_then(|db| db.find_table(table))
            .map(|t| Arc::new(t.clone()))
    }

    /// Load one row-set fully, in batches of `batch_size` rows.
    async fn load(&self, session: &mut dyn Session, row_set: &RowSet) -> Result<u64> {
        let names = row_set.column_names();
        let insert_type = self.options.insert_type_for(&row_set.table.name);
        let sql = InsertQuery::new(&row_set.table, &names)
            .with_insert_type(insert_type)
            .to_sql(&self.ctx)?;
        let classes = row_set
            .columns
            .iter()
            .map(|c| self.provider.value_class(&c.type_desc))
            .collect::<Result<Vec<_>>>()?;

        let batch_size = self.options.batch_size.max(1);
        let mut batch = Vec::with_capacity(batch_size);
        let mut rows = 0;

        for file in &row_set.files {
            let mut input = self.ops.open_data_file(file, self.format)?;
            if input.columns()? != names.as_slice() {
                return Err(MigrateError::Format(format!(
                    "{}: columns of {} do not match the backup manifest",
                    row_set.table, file
                )));
            }

            while input.has_next_row()? {
                let fields = input.read_row()?;
                if fields.len() != classes.len() {
                    return Err(MigrateError::Format(format!(
                        "{}: row has {} fields, expected {}",
                        file,
                        fields.len(),
                        classes.len()
                    )));
                }

                let mut params = ParameterRow::with_columns(classes.len());
                for (i, (field, class)) in fields.into_iter().zip(&classes).enumerate() {
                    let value = self.codec.decode(field, *class)?;
                    self.provider
                        .set_value(&mut params, i, &row_set.columns[i].type_desc, value)?;
                }
                batch.push(params.into_values());

                if batch.len() >= batch_size {
                    if self.cancel.is_cancelled() {
                        return Err(MigrateError::Cancelled);
                    }
                    let full = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
                    rows += session.execute_batch(&sql, full).await?;
                }
            }
            input.close();
        }

        if !batch.is_empty() {
            rows += session.execute_batch(&sql, batch).await?;
        }
        Ok(rows)
    }
}

/// Applies one table's constraints of one phase on its own session.
struct ConstraintApplier {
    factory: Arc<dyn SessionFactory>,
    ctx: ScriptGeneratorContext,
    unloaded: Arc<HashSet<TableRef>>,
    fail_fast: bool,
    stop: CancellationToken,
    cancel: CancellationToken,
}

impl ConstraintApplier {
    async fn apply(&self, items: Vec<LoadConstraint>) -> ConstraintSummary {
        let mut summary = ConstraintSummary::default();
        let mut session = None;

        for item in items {
            let table = item.table.table_ref();
            if self.stop.is_cancelled() || self.cancel.is_cancelled() {
                summary.skipped += 1;
                continue;
            }
            if item.is_blocked(&self.unloaded) {
                debug!("{}: skipping {}, a table it depends on did not load", table, item.describe());
                summary.skipped += 1;
                continue;
            }

            match self.apply_one(&mut session, &item).await {
                Ok(()) => {
                    debug!("{}: created {}", table, item.describe());
                    summary.applied += 1;
                }
                Err(e) => {
                    warn!("{}: failed to create {} - {}", table, item.describe(), e);
                    summary.failed += 1;
                    summary.failures.push(ConstraintFailure {
                        table,
                        constraint: item.describe(),
                        error: e.to_string(),
                    });
                    if self.fail_fast {
                        self.stop.cancel();
                    }
                }
            }
        }
        summary
    }

    async fn apply_one(
        &self,
        session: &mut Option<Box<dyn Session>>,
        item: &LoadConstraint,
    ) -> Result<()> {
        let scripts = item.scripts(&self.ctx)?;
        if session.is_none() {
            *session = Some(self.factory.open().await?);
        }
        if let Some(session) = session.as_mut() {
            for sql in &scripts {
                for warning in session.execute(sql).await? {
                    warn!("SQL warning on {}: {}", item.describe(), warning.message);
                }
            }
        }
        Ok(())
    }
}

impl ConstraintSummary {
    fn merge(&mut self, other: ConstraintSummary) {
        self.applied += other.applied;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.failures.extend(other.failures);
    }
}
