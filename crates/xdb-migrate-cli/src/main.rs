//! xdb-migrate CLI - schema translation, dump and load across databases.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;
use xdb_migrate::generator::{
    CompositeScriptExporter, FileScriptExporter, ScriptKind, SessionScriptExporter,
    WriterScriptExporter,
};
use xdb_migrate::{
    BackupOps, BackupWriter, Config, Database, DialectResolver, DumpOptions, FormatKind,
    LoadOrchestrator, MigrateError, RunStatus, SchemaJob, ScriptGeneratorContext,
};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "xdb-migrate")]
#[command(about = "Cross-database schema translation and backup/restore")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate DDL scripts from a schema model
    Schema {
        /// Schema model (JSON)
        #[arg(short, long)]
        model: PathBuf,

        /// Override target dialect
        #[arg(long)]
        dialect: Option<String>,

        /// Write scripts to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also generate drop scripts
        #[arg(long)]
        drop: bool,

        /// Execute the scripts against the configured target
        #[arg(long)]
        execute: bool,
    },

    /// Back up tables from the source database
    Dump {
        /// Schema model of the tables to back up (JSON)
        #[arg(short, long)]
        model: PathBuf,

        /// Backup directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Data file format: bin or text
        #[arg(long)]
        format: Option<FormatKind>,

        /// Override number of parallel tables
        #[arg(long)]
        threads: Option<usize>,
    },

    /// Restore a backup into the target database
    Load {
        /// Backup directory
        #[arg(short, long)]
        input_dir: Option<PathBuf>,

        /// Override number of workers
        #[arg(long)]
        threads: Option<usize>,

        /// Create tables before loading
        #[arg(long)]
        create_schema: bool,

        /// Stop at the first failure
        #[arg(long)]
        fail_fast: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(|e| MigrateError::Config(e.to_string()))?;

    let mut config = match &cli.config {
        Some(path) => {
            let config = Config::load(path)?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => Config::default(),
    };
    let resolver = DialectResolver::with_builtins();

    let cancel_token = setup_signal_handler().await?;

    match cli.command {
        Commands::Schema {
            model,
            dialect,
            output,
            drop,
            execute,
        } => {
            if let Some(dialect) = dialect {
                config.schema.dialect = dialect;
            }
            if drop {
                config.schema.script_kinds = vec![ScriptKind::Drop, ScriptKind::Create];
            }
            let database = read_model(&model)?;
            let ctx = config.schema.context(&resolver)?;

            let mut exporter = CompositeScriptExporter::new();
            match output.or_else(|| config.schema.output.clone()) {
                Some(path) => exporter.push(Box::new(FileScriptExporter::new(path))),
                None if !execute => exporter.push(Box::new(WriterScriptExporter::stdout())),
                None => {}
            }
            if execute {
                let target = config.target.as_ref().ok_or_else(|| {
                    MigrateError::Config("--execute requires a target connection".into())
                })?;
                let factory = xdb_migrate::drivers::connect(target, &resolver, 1).await?;
                exporter.push(Box::new(SessionScriptExporter::new(factory)));
            }

            let count = SchemaJob::new(database, ctx, Box::new(exporter))
                .fail_on_empty_scripts(config.schema.fail_on_empty_scripts)
                .run()
                .await?;
            info!("Generated {} statements", count);
        }

        Commands::Dump {
            model,
            output_dir,
            format,
            threads,
        } => {
            if let Some(format) = format {
                config.dump.format = format;
            }
            if let Some(t) = threads {
                config.dump.threads = t;
            }
            let dir = output_dir
                .or_else(|| config.dump.output_dir.clone())
                .ok_or_else(|| MigrateError::Config("No backup directory given".into()))?;
            let source = config
                .source
                .as_ref()
                .ok_or_else(|| MigrateError::Config("Dump requires a source connection".into()))?;

            let database = read_model(&model)?;
            let mut ctx = ScriptGeneratorContext::new(resolver.require(&source.dialect)?);
            ctx.quoting = config.schema.quoting;
            ctx.source_catalog = config.schema.source_catalog.clone();
            ctx.source_schema = config.schema.source_schema.clone();

            let mut options = DumpOptions::from_config(&config.dump)?;
            options.config_hash = Some(config.hash());
            let factory =
                xdb_migrate::drivers::connect(source, &resolver, options.threads).await?;

            let backup = BackupWriter::new(factory, ctx, options)
                .with_cancellation(cancel_token)
                .dump(&database, &BackupOps::new(&dir))
                .await?;
            let rows: u64 = backup.row_sets.iter().map(|r| r.rows).sum();

            if cli.output_json {
                let summary = serde_json::json!({
                    "directory": dir,
                    "format": backup.format,
                    "fingerprint": backup.fingerprint,
                    "tables": backup.row_sets.len(),
                    "rows": rows,
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("\nDump completed!");
                println!("  Directory: {}", dir.display());
                println!("  Tables: {}", backup.row_sets.len());
                println!("  Rows: {}", rows);
            }
        }

        Commands::Load {
            input_dir,
            threads,
            create_schema,
            fail_fast,
        } => {
            if let Some(t) = threads {
                config.load.threads = t;
            }
            config.load.create_schema |= create_schema;
            config.load.fail_fast |= fail_fast;
            let dir = input_dir
                .or_else(|| config.load.input_dir.clone())
                .ok_or_else(|| MigrateError::Config("No backup directory given".into()))?;
            let target = config
                .target
                .as_ref()
                .ok_or_else(|| MigrateError::Config("Load requires a target connection".into()))?;

            let ops = BackupOps::new(&dir);
            let backup = ops.read()?;
            info!(
                "Read backup from {} ({} row-sets)",
                dir.display(),
                backup.row_sets.len()
            );

            config.schema.dialect = target.dialect.clone();
            let ctx = config.schema.context(&resolver)?;
            let factory =
                xdb_migrate::drivers::connect(target, &resolver, config.load.threads).await?;

            let result = LoadOrchestrator::new(Arc::clone(&factory), ctx, config.load.clone())?
                .with_cancellation(cancel_token)
                .run(&backup, &ops)
                .await?;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                println!("\nLoad finished: {:?}", result.status);
                println!("  Run ID: {}", result.run_id);
                println!("  Duration: {:.2}s", result.duration_seconds);
                println!("  Rows: {}", result.rows_loaded);
                println!(
                    "  Constraints: {} applied, {} failed, {} skipped",
                    result.constraints.applied,
                    result.constraints.failed,
                    result.constraints.skipped
                );
                for failed in result.failed_row_sets() {
                    println!(
                        "  Failed: {} - {}",
                        failed.table,
                        failed.error.as_deref().unwrap_or("unknown error")
                    );
                }
                for failure in &result.constraints.failures {
                    println!(
                        "  Failed: {} {} - {}",
                        failure.table, failure.constraint, failure.error
                    );
                }
            }

            match result.status {
                RunStatus::Completed => {}
                RunStatus::Cancelled => return Err(MigrateError::Cancelled),
                RunStatus::Failed => {
                    return Err(MigrateError::load(
                        dir.display().to_string(),
                        "one or more row-sets or constraints failed",
                    ))
                }
            }
        }
    }

    Ok(())
}

/// Read a schema model from a JSON file.
fn read_model(path: &Path) -> Result<Database, MigrateError> {
    let content = std::fs::read_to_string(path)?;
    let database: Database = serde_json::from_str(&content)?;
    database.validate()?;
    Ok(database)
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr so scripts and JSON on stdout stay clean
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}

/// Cancel the returned token on SIGINT or SIGTERM.
#[cfg(unix)]
async fn setup_signal_handler() -> Result<CancellationToken, MigrateError> {
    let cancel_token = CancellationToken::new();

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => eprintln!("\nReceived SIGINT. Shutting down gracefully..."),
            _ = sigterm.recv() => eprintln!("\nReceived SIGTERM. Shutting down gracefully..."),
        }
        token.cancel();
    });

    Ok(cancel_token)
}

/// Cancel the returned token on Ctrl-C.
#[cfg(not(unix))]
async fn setup_signal_handler() -> Result<CancellationToken, MigrateError> {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C. Shutting down gracefully...");
            token.cancel();
        }
    });

    Ok(cancel_token)
}
