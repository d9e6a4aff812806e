//! Tab-delimited text data files.
//!
//! The first line names the columns; the format records no column types,
//! so readers treat every column as text until the value codec decodes it
//! with the row-set's declared types. Fields use COPY text conventions:
//! `\N` is NULL, backslash, tab, newline and carriage return are escaped,
//! and binary fields are written as `\x` followed by hex.

use std::io::{BufRead, BufReader, Read, Write};

use crate::access::FieldValue;
use crate::error::{MigrateError, Result};

use super::{format_io, InputFormat, OutputFormat, OutputOptions, OutputStream};

const NULL_FIELD: &str = "\\N";
const BINARY_PREFIX: &str = "\\x";

/// Text data file writer.
pub struct TextOutputFormat {
    destination: Option<Box<dyn Write + Send>>,
    options: OutputOptions,
    stream: Option<OutputStream>,
    columns: usize,
    lines: u64,
    closed: bool,
}

impl TextOutputFormat {
    pub fn new(destination: Box<dyn Write + Send>, options: OutputOptions) -> Self {
        Self {
            destination: Some(destination),
            options,
            stream: None,
            columns: 0,
            lines: 0,
            closed: false,
        }
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        if self.closed {
            return Err(MigrateError::State("data file already closed".into()));
        }
        let stream = self.stream.as_mut().ok_or_else(MigrateError::not_opened)?;
        if self.lines > 0 {
            stream.write_all(b"\n")?;
        }
        self.lines += 1;
        stream.write_all(line.as_bytes())
    }
}

impl OutputFormat for TextOutputFormat {
    fn open(&mut self, columns: &[String]) -> Result<()> {
        let destination = self
            .destination
            .take()
            .ok_or_else(|| MigrateError::State("data file already opened".into()))?;
        self.stream = Some(OutputStream::new(destination, self.options));
        self.columns = columns.len();
        let header: Vec<String> = columns.iter().map(|c| escape_copy_text(c)).collect();
        self.write_line(&header.join("\t"))
    }

    fn can_write_values(&self) -> bool {
        self.stream.as_ref().is_some_and(OutputStream::can_write)
    }

    fn write_row(&mut self, row: &[FieldValue]) -> Result<()> {
        if self.stream.is_none() {
            return Err(MigrateError::not_opened());
        }
        if row.len() != self.columns {
            return Err(MigrateError::Format(format!(
                "row has {} fields but the row-set has {} columns",
                row.len(),
                self.columns
            )));
        }
        let fields: Vec<String> = row
            .iter()
            .map(|field| match field {
                FieldValue::Null => NULL_FIELD.to_string(),
                FieldValue::Text(text) => escape_copy_text(text),
                FieldValue::Binary(bytes) => format!("{}{}", BINARY_PREFIX, hex::encode(bytes)),
            })
            .collect();
        self.write_line(&fields.join("\t"))
    }

    fn bytes_written(&self) -> u64 {
        self.stream.as_ref().map_or(0, OutputStream::bytes_written)
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let stream = self.stream.as_mut().ok_or_else(MigrateError::not_opened)?;
        stream.write_all(b"\n")?;
        stream.flush()?;
        self.closed = true;
        Ok(())
    }
}

/// Escape special characters for COPY text format.
fn escape_copy_text(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '\t' => result.push_str("\\t"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            _ => result.push(c),
        }
    }
    result
}

fn unescape_copy_text(s: &str) -> Result<String> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => result.push('\\'),
            Some('t') => result.push('\t'),
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            other => {
                return Err(MigrateError::Format(format!(
                    "invalid escape sequence \\{} in text row-set",
                    other.map(String::from).unwrap_or_default()
                )))
            }
        }
    }
    Ok(result)
}

fn parse_field(raw: &str) -> Result<FieldValue> {
    if raw == NULL_FIELD {
        return Ok(FieldValue::Null);
    }
    if let Some(hex_text) = raw.strip_prefix(BINARY_PREFIX) {
        return hex::decode(hex_text)
            .map(FieldValue::Binary)
            .map_err(|e| MigrateError::Format(format!("invalid binary field: {}", e)));
    }
    unescape_copy_text(raw).map(FieldValue::Text)
}

/// Text data file reader.
pub struct TextInputFormat {
    source: Option<Box<dyn Read + Send>>,
    reader: Option<BufReader<Box<dyn Read + Send>>>,
    columns: Vec<String>,
    lookahead: Option<Vec<FieldValue>>,
    exhausted: bool,
    line: String,
}

impl TextInputFormat {
    pub fn new(source: Box<dyn Read + Send>) -> Self {
        Self {
            source: Some(source),
            reader: None,
            columns: Vec::new(),
            lookahead: None,
            exhausted: false,
            line: String::new(),
        }
    }

    /// Read one line without its terminator; `None` at end of input.
    fn next_line(&mut self) -> Result<Option<&str>> {
        let reader = self.reader.as_mut().ok_or_else(MigrateError::not_opened)?;
        self.line.clear();
        if reader.read_line(&mut self.line).map_err(format_io)? == 0 {
            return Ok(None);
        }
        let line = self.line.strip_suffix('\n').unwrap_or(&self.line);
        Ok(Some(line.strip_suffix('\r').unwrap_or(line)))
    }

    fn read_next(&mut self) -> Result<Option<Vec<FieldValue>>> {
        let count = self.columns.len();
        let Some(line) = self.next_line()? else {
            return Ok(None);
        };
        if count == 0 {
            return Ok(Some(Vec::new()));
        }
        let row = line.split('\t').map(parse_field).collect::<Result<Vec<_>>>()?;
        if row.len() != count {
            return Err(MigrateError::Format(format!(
                "row has {} fields but the row-set has {} columns",
                row.len(),
                count
            )));
        }
        Ok(Some(row))
    }
}

impl InputFormat for TextInputFormat {
    fn open(&mut self) -> Result<()> {
        let source = self
            .source
            .take()
            .ok_or_else(|| MigrateError::State("data file already opened".into()))?;
        self.reader = Some(BufReader::new(source));
        let header = self
            .next_line()?
            .ok_or_else(|| MigrateError::Format("text row-set has no header line".into()))?
            .to_string();
        self.columns = if header.is_empty() {
            Vec::new()
        } else {
            header
                .split('\t')
                .map(unescape_copy_text)
                .collect::<Result<Vec<_>>>()?
        };
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_escape_copy_text() {
        assert_eq!(escape_copy_text("a\tb\nc\\d"), "a\\tb\\nc\\\\d");
        assert_eq!(unescape_copy_text("a\\tb\\nc\\\\d").unwrap(), "a\tb\nc\\d");
        assert!(unescape_copy_text("bad\\q").is_err());
    }

    #[test]
    fn test_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.0.txt");
        let mut out = TextOutputFormat::new(
            Box::new(File::create(&path).unwrap()),
            OutputOptions::default(),
        );
        out.open(&["id".to_string(), "note".to_string()]).unwrap();
        out.write_row(&[FieldValue::Text("1".into()), FieldValue::Null])
            .unwrap();
        out.write_row(&[FieldValue::Text("2".into()), FieldValue::Binary(vec![1, 2])])
            .unwrap();
        out.close().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "id\tnote\n1\t\\N\n2\t\\x0102\n");
    }

    #[test]
    fn test_rows_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.0.txt");
        let rows = vec![
            vec![FieldValue::Text("".into())],
            vec![FieldValue::Text("back\\slash \\x41".into())],
            vec![FieldValue::Null],
            vec![FieldValue::Text("".into())],
        ];
        let mut out = TextOutputFormat::new(
            Box::new(File::create(&path).unwrap()),
            OutputOptions::default(),
        );
        out.open(&["v".to_string()]).unwrap();
        for row in &rows {
            out.write_row(row).unwrap();
        }
        out.close().unwrap();

        let mut input = TextInputFormat::new(Box::new(File::open(&path).unwrap()));
        input.open().unwrap();
        assert_eq!(input.columns().unwrap(), ["v".to_string()]);
        let mut read = Vec::new();
        while input.has_next_row().unwrap() {
            read.push(input.read_row().unwrap());
        }
        assert_eq!(read, rows);
        assert!(input
            .read_row()
            .unwrap_err()
            .to_string()
            .contains("no more rows"));
    }

    #[test]
    fn test_field_count_mismatch() {
        let mut input = TextInputFormat::new(Box::new("a\tb\n1\n".as_bytes()));
        input.open().unwrap();
        assert!(matches!(input.read_row(), Err(MigrateError::Format(_))));
    }

    #[test]
    fn test_write_before_open() {
        let mut out = TextOutputFormat::new(Box::new(std::io::sink()), OutputOptions::default());
        assert!(out
            .write_row(&[])
            .unwrap_err()
            .to_string()
            .contains("not opened"));
    }
}
