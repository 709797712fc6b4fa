//! Field quoting and record assembly.

use crate::common::{Error, Result};
use crate::dialect::{Dialect, EscapeMode};
use crate::io::{CharSink, WriterSink};
use encoding_rs::Encoding;
use std::fs::File;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

#[inline]
fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Streaming encoder writing records to a [`CharSink`].
///
/// Fields are written one at a time; the delimiter is inserted before every
/// field but the first of a record, and [`EncodeEngine::end_record`] writes
/// the terminator. A sink failure is fatal: the engine closes and every later
/// call returns [`Error::Closed`].
pub struct EncodeEngine<K: CharSink> {
    sink: Option<K>,
    dialect: Dialect,
    first_field: bool,
    scratch: String,
}

impl<K: CharSink> EncodeEngine<K> {
    pub fn new(sink: K, dialect: Dialect) -> Result<Self> {
        dialect.validate()?;
        debug!(delimiter = ?dialect.delimiter, "encode engine opened");
        Ok(EncodeEngine {
            sink: Some(sink),
            dialect,
            first_field: true,
            scratch: String::new(),
        })
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Replace the dialect. The change applies from the next field on.
    pub fn set_dialect(&mut self, dialect: Dialect) -> Result<()> {
        self.ensure_open()?;
        dialect.validate()?;
        self.dialect = dialect;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.sink.is_none()
    }

    /// Write one field as-is.
    pub fn write(&mut self, value: &str) -> Result<()> {
        self.write_field(value, false)
    }

    /// Write one field, quoting it when it has leading or trailing blanks so
    /// a trimming decoder keeps them.
    pub fn write_preserving(&mut self, value: &str) -> Result<()> {
        self.write_field(value, true)
    }

    /// Write one field with leading and trailing spaces and tabs removed.
    pub fn write_trimmed(&mut self, value: &str) -> Result<()> {
        self.write_field(value.trim_matches([' ', '\t']), false)
    }

    /// Write an empty field.
    pub fn write_null(&mut self) -> Result<()> {
        self.write_field("", false)
    }

    /// Write one field, preceded by the delimiter unless it is the first
    /// field of the record.
    pub fn write_field(&mut self, value: &str, preserve_whitespace: bool) -> Result<()> {
        self.ensure_open()?;

        let mut out = std::mem::take(&mut self.scratch);
        out.clear();
        if !self.first_field {
            out.push(self.dialect.delimiter);
        }
        self.encode_into(&mut out, value, preserve_whitespace);
        self.first_field = false;

        let result = self.emit(&out);
        self.scratch = out;
        result
    }

    /// Write every value as a field, then end the record. Nothing is written
    /// for an empty input.
    pub fn write_record<I>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.ensure_open()?;
        let mut wrote = false;
        for value in values {
            self.write(value.as_ref())?;
            wrote = true;
        }
        if wrote {
            self.end_record()?;
        }
        Ok(())
    }

    /// Like [`Self::write_record`] with every value trimmed.
    pub fn write_record_trimmed<I>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.ensure_open()?;
        let mut wrote = false;
        for value in values {
            self.write_trimmed(value.as_ref())?;
            wrote = true;
        }
        if wrote {
            self.end_record()?;
        }
        Ok(())
    }

    /// Write the terminator and start a new record.
    pub fn end_record(&mut self) -> Result<()> {
        self.ensure_open()?;
        let mut out = std::mem::take(&mut self.scratch);
        out.clear();
        self.dialect.terminator.push_to(&mut out);
        self.first_field = true;

        let result = self.emit(&out);
        self.scratch = out;
        result
    }

    /// Write a comment line: the comment character, `text` and the
    /// terminator. The next field starts a new record.
    pub fn write_comment(&mut self, text: &str) -> Result<()> {
        self.ensure_open()?;
        let mut out = std::mem::take(&mut self.scratch);
        out.clear();
        out.push(self.dialect.comment);
        out.push_str(text);
        self.dialect.terminator.push_to(&mut out);
        self.first_field = true;

        let result = self.emit(&out);
        self.scratch = out;
        result
    }

    pub fn flush(&mut self) -> Result<()> {
        let Some(sink) = self.sink.as_mut() else {
            return Err(Error::Closed);
        };
        sink.flush().map_err(|e| self.fail(e))
    }

    /// Flush and close the engine and its sink. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        self.close_with(true)
    }

    /// Close the engine. The sink is closed when `close_sink` is set and
    /// only flushed otherwise.
    pub fn close_with(&mut self, close_sink: bool) -> Result<()> {
        let Some(mut sink) = self.sink.take() else {
            return Ok(());
        };
        self.scratch = String::new();

        debug!(close_sink, "encode engine closed");
        let result = if close_sink {
            sink.close()
        } else {
            sink.flush()
        };
        result.map_err(|e| {
            warn!(error = %e, "sink failed while closing");
            Error::Io(e)
        })
    }

    /// Flush and hand back the sink.
    pub fn into_inner(mut self) -> Result<K> {
        let Some(mut sink) = self.sink.take() else {
            return Err(Error::Closed);
        };
        if let Err(e) = sink.flush() {
            warn!(error = %e, "sink flush failed");
            return Err(Error::Io(e));
        }
        Ok(sink)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.sink.is_none() {
            return Err(Error::Closed);
        }
        Ok(())
    }

    fn emit(&mut self, text: &str) -> Result<()> {
        let Some(sink) = self.sink.as_mut() else {
            return Err(Error::Closed);
        };
        sink.write_str(text).map_err(|e| self.fail(e))
    }

    /// Drop the sink after a write failure.
    fn fail(&mut self, e: io::Error) -> Error {
        warn!(error = %e, "sink write failed, closing encoder");
        if let Some(mut sink) = self.sink.take() {
            if let Err(close_err) = sink.close() {
                debug!(error = %close_err, "closing the failed sink also failed");
            }
        }
        self.scratch = String::new();
        Error::Io(e)
    }

    fn needs_qualifier(&self, value: &str, qualifier: char, preserve_whitespace: bool) -> bool {
        let dialect = &self.dialect;
        if dialect.force_qualifier {
            return true;
        }
        if self.first_field && (value.is_empty() || value.starts_with(dialect.comment)) {
            return true;
        }
        if preserve_whitespace && (value.starts_with(is_blank) || value.ends_with(is_blank)) {
            return true;
        }
        value
            .chars()
            .any(|c| c == qualifier || c == dialect.delimiter || dialect.terminator.contains(c))
    }

    fn encode_into(&self, out: &mut String, value: &str, preserve_whitespace: bool) {
        let dialect = &self.dialect;
        let backslash = matches!(dialect.escape_mode, EscapeMode::Backslash);

        match dialect.qualifier {
            Some(q) if self.needs_qualifier(value, q, preserve_whitespace) => {
                out.reserve(value.len() + 2);
                out.push(q);
                for c in value.chars() {
                    if backslash && (c == q || c == '\\') {
                        out.push('\\');
                    } else if !backslash && c == q {
                        out.push(q);
                    }
                    out.push(c);
                }
                out.push(q);
            },
            _ if backslash => {
                for (i, c) in value.chars().enumerate() {
                    let leading_comment = i == 0 && self.first_field && c == dialect.comment;
                    if c == '\\'
                        || c == dialect.delimiter
                        || dialect.terminator.contains(c)
                        || leading_comment
                    {
                        out.push('\\');
                    }
                    out.push(c);
                }
            },
            // No escape mechanism exists here; the value goes out verbatim
            _ => out.push_str(value),
        }
    }
}

impl EncodeEngine<String> {
    /// Encode into an in-memory string, retrieved with
    /// [`EncodeEngine::into_inner`].
    pub fn to_string_sink(dialect: Dialect) -> Result<Self> {
        Self::new(String::new(), dialect)
    }
}

impl EncodeEngine<WriterSink<File>> {
    /// Create (or truncate) the file at `path` and encode into it.
    pub fn create<P: AsRef<Path>>(
        path: P,
        encoding: &'static Encoding,
        dialect: Dialect,
    ) -> Result<Self> {
        dialect.validate()?;
        let file = File::create(path)?;
        Self::new(WriterSink::with_encoding(file, encoding), dialect)
    }
}

impl<K: CharSink> Drop for EncodeEngine<K> {
    fn drop(&mut self) {
        let _ = self.close_with(false);
    }
}
