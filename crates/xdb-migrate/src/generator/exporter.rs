//! Script sinks.
//!
//! Every exporter follows the same three-call contract: `open`, then
//! `export` zero or more times, then `close`. Exporting before `open`
//! is a state error.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, warn};

use crate::core::traits::{Session, SessionFactory};
use crate::error::{MigrateError, Result};

#[async_trait]
pub trait ScriptExporter: Send {
    async fn open(&mut self) -> Result<()>;

    async fn export(&mut self, scripts: &[String]) -> Result<()>;

    async fn close(&mut self) -> Result<()>;
}

/// Writes statements to an async writer, one per line, each terminated
/// with `;`.
pub struct WriterScriptExporter<W> {
    writer: W,
    opened: bool,
    lines: usize,
}

impl WriterScriptExporter<tokio::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W: AsyncWrite + Unpin + Send> WriterScriptExporter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            opened: false,
            lines: 0,
        }
    }

    /// Number of statements written so far.
    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> ScriptExporter for WriterScriptExporter<W> {
    async fn open(&mut self) -> Result<()> {
        self.opened = true;
        Ok(())
    }

    async fn export(&mut self, scripts: &[String]) -> Result<()> {
        if !self.opened {
            return Err(MigrateError::not_opened());
        }
        for script in scripts {
            if self.lines > 0 {
                self.writer.write_all(b"\n").await?;
            }
            self.lines += 1;
            self.writer.write_all(script.as_bytes()).await?;
            if !script.trim_end().ends_with(';') {
                self.writer.write_all(b";").await?;
            }
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if !self.opened {
            return Ok(());
        }
        if self.lines > 0 {
            self.writer.write_all(b"\n").await?;
        }
        self.writer.flush().await?;
        self.opened = false;
        Ok(())
    }
}

/// Writes statements to a file created on `open`.
pub struct FileScriptExporter {
    path: PathBuf,
    inner: Option<WriterScriptExporter<BufWriter<File>>>,
}

impl FileScriptExporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            inner: None,
        }
    }
}

#[async_trait]
impl ScriptExporter for FileScriptExporter {
    async fn open(&mut self) -> Result<()> {
        let file = File::create(&self.path).await?;
        let mut inner = WriterScriptExporter::new(BufWriter::new(file));
        inner.open().await?;
        self.inner = Some(inner);
        debug!("Writing scripts to {}", self.path.display());
        Ok(())
    }

    async fn export(&mut self, scripts: &[String]) -> Result<()> {
        match self.inner.as_mut() {
            Some(inner) => inner.export(scripts).await,
            None => Err(MigrateError::not_opened()),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut inner) = self.inner.take() {
            inner.close().await?;
        }
        Ok(())
    }
}

/// Executes statements against a live session.
///
/// Warnings raised by the database are drained and logged, never
/// treated as failures.
pub struct SessionScriptExporter {
    factory: Arc<dyn SessionFactory>,
    session: Option<Box<dyn Session>>,
}

impl SessionScriptExporter {
    pub fn new(factory: Arc<dyn SessionFactory>) -> Self {
        Self {
            factory,
            session: None,
        }
    }
}

#[async_trait]
impl ScriptExporter for SessionScriptExporter {
    async fn open(&mut self) -> Result<()> {
        self.session = Some(self.factory.open().await?);
        Ok(())
    }

    async fn export(&mut self, scripts: &[String]) -> Result<()> {
        let session = self.session.as_mut().ok_or_else(MigrateError::not_opened)?;
        for script in scripts {
            debug!("Executing: {}", script);
            for warning in session.execute(script).await? {
                match &warning.code {
                    Some(code) => warn!("SQL warning [{}]: {}", code, warning.message),
                    None => warn!("SQL warning: {}", warning.message),
                }
            }
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.session = None;
        Ok(())
    }
}

/// Fans statements out to several exporters.
#[derive(Default)]
pub struct CompositeScriptExporter {
    exporters: Vec<Box<dyn ScriptExporter>>,
}

impl CompositeScriptExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, exporter: Box<dyn ScriptExporter>) {
        self.exporters.push(exporter);
    }

    pub fn len(&self) -> usize {
        self.exporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exporters.is_empty()
    }
}

#[async_trait]
impl ScriptExporter for CompositeScriptExporter {
    async fn open(&mut self) -> Result<()> {
        for exporter in &mut self.exporters {
            exporter.open().await?;
        }
        Ok(())
    }

    async fn export(&mut self, scripts: &[String]) -> Result<()> {
        for exporter in &mut self.exporters {
            exporter.export(scripts).await?;
        }
        Ok(())
    }

    /// Closes every exporter, returning the first failure.
    async fn close(&mut self) -> Result<()> {
        let mut first_error = None;
        for exporter in &mut self.exporters {
            if let Err(e) = exporter.close().await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemoryDatabase;

    fn scripts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_writer_terminates_and_separates() {
        let mut exporter = WriterScriptExporter::new(Vec::new());
        exporter.open().await.unwrap();
        exporter
            .export(&scripts(&["CREATE TABLE a (x INT)", "DROP TABLE b;"]))
            .await
            .unwrap();
        exporter.export(&[]).await.unwrap();
        exporter.export(&scripts(&["DROP TABLE c"])).await.unwrap();
        exporter.close().await.unwrap();

        let text = String::from_utf8(exporter.into_inner()).unwrap();
        assert_eq!(
            text,
            "CREATE TABLE a (x INT);\nDROP TABLE b;\nDROP TABLE c;\n"
        );
    }

    #[tokio::test]
    async fn test_export_before_open_fails() {
        let mut exporter = WriterScriptExporter::new(Vec::new());
        let err = exporter.export(&scripts(&["x"])).await.unwrap_err();
        assert!(err.to_string().contains("not opened"));

        let mut file = FileScriptExporter::new("/nonexistent/never-written.sql");
        assert!(file.export(&scripts(&["x"])).await.is_err());
    }

    #[tokio::test]
    async fn test_file_exporter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.sql");
        let mut exporter = FileScriptExporter::new(&path);
        exporter.open().await.unwrap();
        exporter.export(&scripts(&["SELECT 1"])).await.unwrap();
        exporter.close().await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "SELECT 1;\n");
    }

    #[tokio::test]
    async fn test_session_exporter_executes_statements() {
        let db = MemoryDatabase::new("postgres");
        db.add_warning("CREATE TABLE a (x INT)", "table a already exists");
        let mut exporter = SessionScriptExporter::new(db.factory());
        exporter.open().await.unwrap();
        exporter
            .export(&scripts(&["CREATE TABLE a (x INT)", "CREATE INDEX i ON a (x)"]))
            .await
            .unwrap();
        exporter.close().await.unwrap();
        assert_eq!(
            db.executed(),
            vec!["CREATE TABLE a (x INT)", "CREATE INDEX i ON a (x)"]
        );
    }

    #[tokio::test]
    async fn test_composite_fans_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.sql");
        let db = MemoryDatabase::new("postgres");

        let mut composite = CompositeScriptExporter::new();
        composite.push(Box::new(FileScriptExporter::new(&path)));
        composite.push(Box::new(SessionScriptExporter::new(db.factory())));
        assert_eq!(composite.len(), 2);

        composite.open().await.unwrap();
        composite.export(&scripts(&["DROP TABLE t"])).await.unwrap();
        composite.close().await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "DROP TABLE t;\n");
        assert_eq!(db.executed(), vec!["DROP TABLE t"]);
    }
}
