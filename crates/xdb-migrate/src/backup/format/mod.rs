//! Row-set data file formats.
//!
//! A data file holds one table's rows as nullable text or byte fields.
//! Two interchangeable encodings are provided: a length-framed binary
//! stream ([`binary`]) and tab-delimited text ([`text`]).
//!
//! Output is layered as `BufWriter<CountingWriter<destination>>`: the
//! counting decorator sits next to the destination and the buffer on the
//! outside. [`OutputStream::bytes_written`] adds the bytes still held in
//! the buffer, so size checks see every byte handed to the encoder.

pub mod binary;
pub mod text;

use std::fmt;
use std::io::{self, BufWriter, Read, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::access::FieldValue;
use crate::error::{MigrateError, Result};

pub use binary::{BinaryInputFormat, BinaryOutputFormat};
pub use text::{TextInputFormat, TextOutputFormat};

/// Default write buffer for data files.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Data file encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FormatKind {
    #[default]
    #[serde(rename = "bin")]
    Binary,
    #[serde(rename = "text")]
    Text,
}

impl FormatKind {
    /// Format identifier recorded in backups.
    pub fn name(&self) -> &'static str {
        match self {
            FormatKind::Binary => "bin",
            FormatKind::Text => "text",
        }
    }

    /// File extension of data files.
    pub fn extension(&self) -> &'static str {
        match self {
            FormatKind::Binary => "bin",
            FormatKind::Text => "txt",
        }
    }

    /// Create a writer for this format over `destination`.
    pub fn output(
        &self,
        destination: Box<dyn Write + Send>,
        options: OutputOptions,
    ) -> Box<dyn OutputFormat> {
        match self {
            FormatKind::Binary => Box::new(BinaryOutputFormat::new(destination, options)),
            FormatKind::Text => Box::new(TextOutputFormat::new(destination, options)),
        }
    }

    /// Create a reader for this format over `source`.
    pub fn input(&self, source: Box<dyn Read + Send>) -> Box<dyn InputFormat> {
        match self {
            FormatKind::Binary => Box::new(BinaryInputFormat::new(source)),
            FormatKind::Text => Box::new(TextInputFormat::new(source)),
        }
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FormatKind {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "bin" | "binary" => Ok(FormatKind::Binary),
            "text" | "txt" => Ok(FormatKind::Text),
            other => Err(MigrateError::Config(format!(
                "Unknown backup format: '{}'. Supported formats: bin, text",
                other
            ))),
        }
    }
}

/// Buffering and size limit for a data file writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputOptions {
    /// Write buffer capacity; 0 disables buffering.
    pub buffer_size: usize,
    /// Size after which [`OutputFormat::can_write_values`] turns false.
    pub max_size: Option<u64>,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_size: None,
        }
    }
}

/// Write side of a data file.
///
/// Every operation other than `open` fails with a "not opened" state error
/// until `open` has written the header.
pub trait OutputFormat: Send {
    /// Write the header naming the row-set's columns.
    fn open(&mut self, columns: &[String]) -> Result<()>;

    /// True while the configured maximum size has not been reached.
    fn can_write_values(&self) -> bool;

    fn write_row(&mut self, row: &[FieldValue]) -> Result<()>;

    /// Bytes handed to the encoder so far, header included.
    fn bytes_written(&self) -> u64;

    /// Write any trailer and flush. Closing twice is a no-op.
    fn close(&mut self) -> Result<()>;
}

/// Read side of a data file: a forward-only, single-pass row sequence.
pub trait InputFormat: Send {
    /// Read the header.
    fn open(&mut self) -> Result<()>;

    fn columns(&self) -> Result<&[String]>;

    /// Whether another row is available. Repeated calls before
    /// `read_row` return the same answer without consuming input.
    fn has_next_row(&mut self) -> Result<bool>;

    /// Consume the next row; fails with "no more rows" at the end.
    fn read_row(&mut self) -> Result<Vec<FieldValue>>;

    fn close(&mut self);
}

/// Write decorator counting the bytes that pass through it.
#[derive(Debug)]
pub struct CountingWriter<W> {
    inner: W,
    count: u64,
}

impl<W: Write> CountingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, count: 0 }
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.count += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Counting, buffered destination shared by the output formats.
pub struct OutputStream {
    writer: BufWriter<CountingWriter<Box<dyn Write + Send>>>,
    max_size: Option<u64>,
}

impl OutputStream {
    pub fn new(destination: Box<dyn Write + Send>, options: OutputOptions) -> Self {
        Self {
            writer: BufWriter::with_capacity(options.buffer_size, CountingWriter::new(destination)),
            max_size: options.max_size,
        }
    }

    /// Bytes written, including those still buffered.
    pub fn bytes_written(&self) -> u64 {
        self.writer.get_ref().count() + self.writer.buffer().len() as u64
    }

    pub fn can_write(&self) -> bool {
        self.max_size
            .map_or(true, |max| self.bytes_written() < max)
    }

    pub fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes).map_err(format_io)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(format_io)
    }
}

/// Map a transport failure to a format error naming the cause.
pub(crate) fn format_io(err: io::Error) -> MigrateError {
    MigrateError::Format(format!("data file I/O failed: {}", err))
}
