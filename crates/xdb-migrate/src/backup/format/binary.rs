//! Length-framed binary data files.
//!
//! Layout:
//!
//! ```text
//! "XDBR" version:u8
//! header_len:u32 header:json {"columns": [...]}
//! ( 0x01 field* )*     one row; per field a tag (0 null, 1 text, 2 binary)
//!                      followed by len:u32 and the bytes for tags 1 and 2
//! 0x00                 end of row-set
//! ```
//!
//! Integers are big-endian.

use std::io::{self, BufReader, Read, Write};

use serde::{Deserialize, Serialize};

use crate::access::FieldValue;
use crate::error::{MigrateError, Result};

use super::{format_io, InputFormat, OutputFormat, OutputOptions, OutputStream};

const MAGIC: &[u8; 4] = b"XDBR";
const VERSION: u8 = 1;

const ROW_MARKER: u8 = 1;
const END_MARKER: u8 = 0;

const TAG_NULL: u8 = 0;
const TAG_TEXT: u8 = 1;
const TAG_BINARY: u8 = 2;

/// Largest field or header accepted by the reader (1 GiB).
const MAX_FIELD_LEN: u32 = 1 << 30;

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    columns: Vec<String>,
}

/// Binary data file writer.
pub struct BinaryOutputFormat {
    destination: Option<Box<dyn Write + Send>>,
    options: OutputOptions,
    stream: Option<OutputStream>,
    columns: usize,
    closed: bool,
}

impl BinaryOutputFormat {
    pub fn new(destination: Box<dyn Write + Send>, options: OutputOptions) -> Self {
        Self {
            destination: Some(destination),
            options,
            stream: None,
            columns: 0,
            closed: false,
        }
    }

    fn stream(&mut self) -> Result<&mut OutputStream> {
        if self.closed {
            return Err(MigrateError::State("data file already closed".into()));
        }
        self.stream.as_mut().ok_or_else(MigrateError::not_opened)
    }
}

impl OutputFormat for BinaryOutputFormat {
    fn open(&mut self, columns: &[String]) -> Result<()> {
        let destination = self
            .destination
            .take()
            .ok_or_else(|| MigrateError::State("data file already opened".into()))?;
        let mut stream = OutputStream::new(destination, self.options);

        let header = serde_json::to_vec(&Header {
            columns: columns.to_vec(),
        })?;
        stream.write_all(MAGIC)?;
        stream.write_all(&[VERSION])?;
        stream.write_all(&(header.len() as u32).to_be_bytes())?;
        stream.write_all(&header)?;

        self.columns = columns.len();
        self.stream = Some(stream);
        Ok(())
    }

    fn can_write_values(&self) -> bool {
        self.stream.as_ref().is_some_and(OutputStream::can_write)
    }

    fn write_row(&mut self, row: &[FieldValue]) -> Result<()> {
        let columns = self.columns;
        let stream = self.stream()?;
        if row.len() != columns {
            return Err(MigrateError::Format(format!(
                "row has {} fields but the row-set has {} columns",
                row.len(),
                columns
            )));
        }
        stream.write_all(&[ROW_MARKER])?;
        for field in row {
            match field {
                FieldValue::Null => stream.write_all(&[TAG_NULL])?,
                FieldValue::Text(text) => write_field(stream, TAG_TEXT, text.as_bytes())?,
                FieldValue::Binary(bytes) => write_field(stream, TAG_BINARY, bytes)?,
            }
        }
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.stream.as_ref().map_or(0, OutputStream::bytes_written)
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let stream = self.stream()?;
        stream.write_all(&[END_MARKER])?;
        stream.flush()?;
        self.closed = true;
        Ok(())
    }
}

fn write_field(stream: &mut OutputStream, tag: u8, bytes: &[u8]) -> Result<()> {
    let len = u32::try_from(bytes.len())
        .map_err(|_| MigrateError::Format(format!("field of {} bytes is too large", bytes.len())))?;
    stream.write_all(&[tag])?;
    stream.write_all(&len.to_be_bytes())?;
    stream.write_all(bytes)
}

/// Binary data file reader.
pub struct BinaryInputFormat {
    source: Option<Box<dyn Read + Send>>,
    reader: Option<BufReader<Box<dyn Read + Send>>>,
    columns: Vec<String>,
    lookahead: Option<Vec<FieldValue>>,
    exhausted: bool,
}

impl BinaryInputFormat {
    pub fn new(source: Box<dyn Read + Send>) -> Self {
        Self {
            source: Some(source),
            reader: None,
            columns: Vec::new(),
            lookahead: None,
            exhausted: false,
        }
    }

    fn read_next(&mut self) -> Result<Option<Vec<FieldValue>>> {
        let count = self.columns.len();
        let reader = self.reader.as_mut().ok_or_else(MigrateError::not_opened)?;
        match read_u8(reader)? {
            END_MARKER => return Ok(None),
            ROW_MARKER => {}
            other => {
                return Err(MigrateError::Format(format!(
                    "unexpected row marker 0x{:02x}",
                    other
                )))
            }
        }
        let mut row = Vec::with_capacity(count);
        for _ in 0..count {
            let field = match read_u8(reader)? {
                TAG_NULL => FieldValue::Null,
                TAG_TEXT => {
                    let bytes = read_block(reader)?;
                    FieldValue::Text(String::from_utf8(bytes).map_err(|e| {
                        MigrateError::Format(format!("text field is not UTF-8: {}", e))
                    })?)
                }
                TAG_BINARY => FieldValue::Binary(read_block(reader)?),
                other => {
                    return Err(MigrateError::Format(format!(
                        "unknown field tag 0x{:02x}",
                        other
                    )))
                }
            };
            row.push(field);
        }
        Ok(Some(row))
    }
}

impl InputFormat for BinaryInputFormat {
    fn open(&mut self) -> Result<()> {
        let source = self
            .source
            .take()
            .ok_or_else(|| MigrateError::State("data file already opened".into()))?;
        let mut reader = BufReader::new(source);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic).map_err(truncated)?;
        if &magic != MAGIC {
            return Err(MigrateError::Format("not a binary row-set file".into()));
        }
        let version = read_u8(&mut reader)?;
        if version != VERSION {
            return Err(MigrateError::Format(format!(
                "unsupported binary row-set version {}",
                version
            )));
        }
        let header: Header = serde_json::from_slice(&read_block(&mut reader)?)?;

        self.columns = header.columns;
        self.reader = Some(reader);
        Ok(())
    }

    fn columns(&self) -> Result<&[String]> {
        if self.reader.is_none() {
            return Err(MigrateError::not_opened());
        }
        Ok(&self.columns)
    }

    fn has_next_row(&mut self) -> Result<bool> {
        if self.reader.is_none() {
            return Err(MigrateError::not_opened());
        }
        if self.lookahead.is_some() {
            return Ok(true);
        }
        if self.exhausted {
            return Ok(false);
        }
        match self.read_next()? {
            Some(row) => {
                self.lookahead = Some(row);
                Ok(true)
            }
            None => {
                self.exhausted = true;
                Ok(false)
            }
        }
    }

    fn read_row(&mut self) -> Result<Vec<FieldValue>> {
        if !self.has_next_row()? {
            return Err(MigrateError::no_more_rows());
        }
        self.lookahead.take().ok_or_else(MigrateError::no_more_rows)
    }

    fn close(&mut self) {
        self.reader = None;
        self.lookahead = None;
        self.exhausted = true;
    }
}

fn truncated(err: io::Error) -> MigrateError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        MigrateError::Format("truncated binary row-set file".into())
    } else {
        format_io(err)
    }
}

fn read_u8(reader: &mut impl Read) -> Result<u8> {
    let mut byte = [0u8; 1];
    reader.read_exact(&mut byte).map_err(truncated)?;
    Ok(byte[0])
}

fn read_block(reader: &mut impl Read) -> Result<Vec<u8>> {
    let mut len = [0u8; 4];
    reader.read_exact(&mut len).map_err(truncated)?;
    let len = u32::from_be_bytes(len);
    if len > MAX_FIELD_LEN {
        return Err(MigrateError::Format(format!(
            "field length {} exceeds limit",
            len
        )));
    }
    let mut bytes = vec![0u8; len as usize];
    reader.read_exact(&mut bytes).map_err(truncated)?;
    Ok(bytes)
}
