//! Character-driven decode state machine.

use super::escape::{self, EscapeStart, NumericEscape};
use super::headers::HeaderIndex;
use super::record::RecordCursor;
use crate::common::{Error, GrowableBuffer, Result, SafetyLimitKind};
use crate::dialect::{Dialect, Terminator};
use crate::io::{CharSource, ReaderSource, StrSource};
use encoding_rs::Encoding;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, trace, warn};

/// Working buffer size in characters.
pub const DEFAULT_BUFFER_CAPACITY: usize = 1024;

/// An escape sequence in progress.
#[derive(Debug, Clone, Copy)]
enum Escape {
    /// A backslash was just seen
    Backslash,
    /// Collecting the digits of a numeric escape
    Numeric(NumericEscape),
}

/// Scanner state within one record.
#[derive(Debug, Clone, Copy)]
enum Scan {
    /// Before the first significant character of a field
    FieldStart,
    /// Inside a qualified field. `closing` is set right after an unescaped
    /// qualifier, which either ends the field or (doubled mode) starts a
    /// literal qualifier.
    Qualified {
        backslash: bool,
        escape: Option<Escape>,
        closing: bool,
    },
    /// Inside an unqualified field
    Unqualified {
        backslash: bool,
        escape: Option<Escape>,
    },
    /// Discarding characters between a closing qualifier and the next
    /// delimiter or terminator
    TrailingJunk,
    /// Discarding a comment line
    Comment,
}

/// What the scan loop does after a character was handled.
enum Step {
    /// Consume the character
    Next,
    /// Handle the same character again in the new state
    Again,
    /// Consume the character; the record is complete
    EndOfRecord,
}

enum TerminatorMatch {
    Complete,
    Head,
    Miss,
}

#[inline]
fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Streaming decoder producing records from a [`CharSource`].
///
/// The engine owns a fixed-size working buffer that is refilled from the
/// source whenever the scanner exhausts it. Field characters are referenced
/// in place where possible and copied into a column accumulator when a field
/// spans a refill or contains decoded escapes.
///
/// Irregular input is resolved rather than rejected: an unterminated quote
/// runs to the end of the stream, characters after a closing qualifier are
/// dropped up to the next delimiter or terminator, and unknown escapes stand
/// for themselves. Only source failures and safety-ceiling violations are
/// fatal; both close the engine before the error is returned.
pub struct DecodeEngine<S: CharSource> {
    source: Option<S>,
    dialect: Dialect,

    // Working buffer and its markers
    data: Vec<char>,
    len: usize,
    pos: usize,
    column_start: usize,
    line_start: usize,

    column: GrowableBuffer,
    raw: GrowableBuffer,
    raw_record: String,
    record: RecordCursor,
    headers: HeaderIndex,
    records_read: u64,

    has_more_data: bool,
    started_column: bool,
    started_with_qualifier: bool,
    last_was_delimiter: bool,
    // First character of a two-character terminator seen, second not yet
    head_pending: bool,
    // The pending head was copied into `column` by a refill
    head_flushed: bool,
}

impl<S: CharSource> DecodeEngine<S> {
    /// Create a decoder with the default working buffer size.
    pub fn new(source: S, dialect: Dialect) -> Result<Self> {
        Self::with_buffer_capacity(source, dialect, DEFAULT_BUFFER_CAPACITY)
    }

    /// Create a decoder whose working buffer holds `capacity` characters.
    pub fn with_buffer_capacity(source: S, dialect: Dialect, capacity: usize) -> Result<Self> {
        dialect.validate()?;
        if capacity == 0 {
            return Err(Error::Configuration(
                "buffer capacity must be positive".to_string(),
            ));
        }

        debug!(capacity, delimiter = ?dialect.delimiter, "decode engine opened");
        Ok(DecodeEngine {
            source: Some(source),
            dialect,
            data: vec!['\0'; capacity],
            len: 0,
            pos: 0,
            column_start: 0,
            line_start: 0,
            column: GrowableBuffer::new(),
            raw: GrowableBuffer::new(),
            raw_record: String::new(),
            record: RecordCursor::new(dialect.empty_cell_policy),
            headers: HeaderIndex::new(),
            records_read: 0,
            has_more_data: true,
            started_column: false,
            started_with_qualifier: false,
            last_was_delimiter: false,
            head_pending: false,
            head_flushed: false,
        })
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Replace the dialect. The change applies from the next record on.
    pub fn set_dialect(&mut self, dialect: Dialect) -> Result<()> {
        self.ensure_open()?;
        dialect.validate()?;
        self.dialect = dialect;
        self.record.set_policy(dialect.empty_cell_policy);
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.source.is_none()
    }

    /// Advance to the next record. Returns `false` at the end of the stream,
    /// and keeps returning `false` on later calls.
    pub fn read_record(&mut self) -> Result<bool> {
        self.ensure_open()?;
        self.record.clear();
        self.column.clear();
        self.raw.clear();
        self.raw_record.clear();
        self.started_column = false;
        self.started_with_qualifier = false;
        self.last_was_delimiter = false;
        self.head_pending = false;
        self.head_flushed = false;

        if !self.has_more_data {
            return Ok(false);
        }
        self.scan_record()
    }

    /// Read one record without counting it toward the record index.
    ///
    /// Unlike [`Self::skip_line`] this honors qualifiers, so terminators
    /// embedded in qualified fields do not end the skip early.
    pub fn skip_record(&mut self) -> Result<bool> {
        let skipped = self.read_record()?;
        if skipped {
            self.records_read -= 1;
            self.record.clear();
        }
        Ok(skipped)
    }

    /// Discard characters up to and including the next terminator character,
    /// ignoring qualifiers. Returns whether anything was consumed.
    pub fn skip_line(&mut self) -> Result<bool> {
        self.ensure_open()?;
        self.record.clear();
        self.started_column = false;

        let end = self.dialect.terminator.last();
        let mut skipped = false;
        while self.has_more_data {
            if self.pos == self.len {
                self.refill()?;
                continue;
            }
            skipped = true;
            let c = self.data[self.pos];
            self.pos += 1;
            if c == end {
                break;
            }
        }

        self.line_start = self.pos;
        self.raw.clear();
        self.head_pending = false;
        self.head_flushed = false;
        Ok(skipped)
    }

    /// Read one record and install it as the header set. The header record
    /// does not count toward the record index.
    pub fn read_headers(&mut self) -> Result<bool> {
        let read = self.read_record()?;
        if read {
            self.records_read -= 1;
        }

        let result = self
            .headers
            .set(self.record.iter().map(|name| name.unwrap_or_default().to_owned()));
        self.record.clear();

        match result {
            Ok(()) => {
                debug!(count = self.headers.len(), "headers read");
                Ok(read)
            },
            Err(e) => {
                warn!(error = %e, "header record rejected");
                Err(e)
            },
        }
    }

    /// Install an explicit header set.
    pub fn set_headers<I, T>(&mut self, names: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.ensure_open()?;
        let result = self.headers.set(names);
        match &result {
            Ok(()) => debug!(count = self.headers.len(), "headers set"),
            Err(e) => warn!(error = %e, "header set rejected"),
        }
        result
    }

    pub fn headers(&self) -> Result<&HeaderIndex> {
        self.ensure_open()?;
        Ok(&self.headers)
    }

    pub fn header(&self, i: usize) -> Result<Option<&str>> {
        self.ensure_open()?;
        Ok(self.headers.name(i))
    }

    pub fn header_count(&self) -> Result<usize> {
        self.ensure_open()?;
        Ok(self.headers.len())
    }

    /// Position of the header called `name`.
    pub fn index_of(&self, name: &str) -> Result<Option<usize>> {
        self.ensure_open()?;
        Ok(self.headers.index_of(name))
    }

    /// The most recently decoded record.
    pub fn record(&self) -> Result<&RecordCursor> {
        self.ensure_open()?;
        Ok(&self.record)
    }

    /// Owned copy of the current record's fields.
    pub fn values(&self) -> Result<Vec<Option<String>>> {
        self.ensure_open()?;
        Ok(self.record.to_vec())
    }

    pub fn field_count(&self) -> Result<usize> {
        self.ensure_open()?;
        Ok(self.record.len())
    }

    /// Field `i` of the current record; the dialect's empty value when out
    /// of range.
    pub fn field(&self, i: usize) -> Result<Option<&str>> {
        self.ensure_open()?;
        Ok(self.record.get(i))
    }

    /// Field under header `name`; the dialect's empty value when no such
    /// header exists.
    pub fn field_by_name(&self, name: &str) -> Result<Option<&str>> {
        self.ensure_open()?;
        Ok(match self.headers.index_of(name) {
            Some(i) => self.record.get(i),
            None => self.record.empty_value(),
        })
    }

    pub fn is_qualified(&self, i: usize) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.record.is_qualified(i))
    }

    /// Zero-based index of the current record.
    pub fn current_record(&self) -> Result<Option<u64>> {
        self.ensure_open()?;
        Ok(self.records_read.checked_sub(1))
    }

    /// Verbatim text of the current record, without its terminator.
    /// `None` unless raw capture is enabled.
    pub fn raw_record(&self) -> Result<Option<&str>> {
        self.ensure_open()?;
        Ok(self
            .dialect
            .capture_raw_record
            .then_some(self.raw_record.as_str()))
    }

    /// Iterate over the remaining records as owned values.
    pub fn records(&mut self) -> Records<'_, S> {
        Records {
            engine: self,
            done: false,
        }
    }

    /// Close the engine and its source. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        self.close_with(true)
    }

    /// Close the engine, closing the source only when `close_source` is set.
    ///
    /// An owned source is dropped either way, so leaving it open only matters
    /// for a borrowed `&mut S` source. Use [`DecodeEngine::into_inner`] to
    /// take an owned source back.
    pub fn close_with(&mut self, close_source: bool) -> Result<()> {
        let Some(mut source) = self.source.take() else {
            return Ok(());
        };

        self.release_buffers();
        debug!(records = self.records_read, close_source, "decode engine closed");
        if close_source {
            source.close()?;
        }
        Ok(())
    }

    /// Close the engine and return its source without closing it. Chars the
    /// engine has already buffered are not handed back.
    pub fn into_inner(mut self) -> Result<S> {
        let source = self.source.take().ok_or(Error::Closed)?;
        self.release_buffers();
        debug!(records = self.records_read, "decode engine released its source");
        Ok(source)
    }

    fn release_buffers(&mut self) {
        self.data = Vec::new();
        self.len = 0;
        self.pos = 0;
        self.column.release();
        self.raw.release();
        self.raw_record = String::new();
        self.record.release();
        self.headers.clear();
        self.has_more_data = false;
    }

    fn ensure_open(&self) -> Result<()> {
        if self.source.is_none() {
            return Err(Error::Closed);
        }
        Ok(())
    }

    fn shutdown(&mut self) {
        if let Err(e) = self.close_with(true) {
            warn!(error = %e, "closing the source after a fatal error failed");
        }
    }

    fn fatal_limit(&mut self, kind: SafetyLimitKind, limit: usize) -> Error {
        let record = self.records_read;
        warn!(%kind, limit, record, "safety limit exceeded, closing decoder");
        self.shutdown();
        Error::SafetyLimitExceeded {
            kind,
            limit,
            record,
        }
    }

    fn scan_record(&mut self) -> Result<bool> {
        let mut scan = Scan::FieldStart;
        loop {
            if self.pos == self.len {
                if !self.has_more_data {
                    break;
                }
                self.refill()?;
                continue;
            }

            let c = self.data[self.pos];
            self.last_was_delimiter = false;
            let step = match scan {
                Scan::FieldStart => self.field_start(&mut scan, c)?,
                Scan::Qualified {
                    backslash,
                    escape,
                    closing,
                } => self.qualified(&mut scan, backslash, escape, closing, c)?,
                Scan::Unqualified { backslash, escape } => {
                    self.unqualified(&mut scan, backslash, escape, c)?
                },
                Scan::TrailingJunk => self.trailing_junk(&mut scan, c)?,
                Scan::Comment => self.comment(&mut scan, c),
            };

            match step {
                Step::Next => self.pos += 1,
                Step::Again => {},
                Step::EndOfRecord => {
                    self.pos += 1;
                    return Ok(true);
                },
            }
        }

        self.finish_stream(scan)
    }

    fn field_start(&mut self, scan: &mut Scan, c: char) -> Result<Step> {
        let dialect = self.dialect;

        if self.head_pending && !self.completes_terminator(c) {
            self.promote_head();
            *scan = self.unqualified_scan();
            return Ok(Step::Again);
        }

        if dialect.qualifier == Some(c) {
            self.started_column = true;
            self.started_with_qualifier = true;
            self.column_start = self.pos + 1;
            *scan = Scan::Qualified {
                backslash: dialect.backslash_escapes(),
                escape: None,
                closing: false,
            };
            return Ok(Step::Next);
        }

        if c == dialect.delimiter {
            self.end_field(self.pos)?;
            self.last_was_delimiter = true;
            return Ok(Step::Next);
        }

        match self.match_terminator(c) {
            TerminatorMatch::Complete => {
                let end = self.take_head();
                if dialect.skip_empty_records && self.record.is_empty() && !self.started_column {
                    debug!(record = self.records_read, "skipping blank line");
                    self.discard_line();
                    return Ok(Step::Next);
                }
                self.end_field(end)?;
                return Ok(self.end_record());
            },
            TerminatorMatch::Head => return Ok(Step::Next),
            TerminatorMatch::Miss => {},
        }

        if dialect.use_comments && c == dialect.comment && self.record.is_empty() {
            self.started_column = false;
            *scan = Scan::Comment;
            return Ok(Step::Next);
        }

        if dialect.trim_whitespace && is_blank(c) {
            self.started_column = true;
            self.column_start = self.pos + 1;
            return Ok(Step::Next);
        }

        self.started_column = true;
        self.column_start = self.pos;
        *scan = self.unqualified_scan();
        Ok(Step::Again)
    }

    fn qualified(
        &mut self,
        scan: &mut Scan,
        backslash: bool,
        escape: Option<Escape>,
        closing: bool,
        c: char,
    ) -> Result<Step> {
        if let Some(escape) = escape {
            *scan = Scan::Qualified {
                backslash,
                escape: self.continue_escape(escape, c),
                closing: false,
            };
            return Ok(Step::Next);
        }

        let dialect = self.dialect;
        if closing {
            if !backslash && dialect.qualifier == Some(c) {
                // Second half of a doubled qualifier, already in place as data
                *scan = Scan::Qualified {
                    backslash,
                    escape: None,
                    closing: false,
                };
                return Ok(Step::Next);
            }
            if c == dialect.delimiter {
                self.end_field(self.pos)?;
                self.last_was_delimiter = true;
                *scan = Scan::FieldStart;
                return Ok(Step::Next);
            }
            if let TerminatorMatch::Complete = self.match_terminator(c) {
                let end = self.take_head();
                self.end_field(end)?;
                return Ok(self.end_record());
            }
            self.column_start = self.pos + 1;
            *scan = Scan::TrailingJunk;
            return Ok(Step::Next);
        }

        if dialect.qualifier == Some(c) {
            self.flush_column(self.pos);
            self.column_start = self.pos + 1;
            *scan = Scan::Qualified {
                backslash,
                escape: None,
                closing: true,
            };
        } else if backslash && c == '\\' {
            self.flush_column(self.pos);
            self.column_start = self.pos + 1;
            *scan = Scan::Qualified {
                backslash,
                escape: Some(Escape::Backslash),
                closing: false,
            };
        }
        Ok(Step::Next)
    }

    fn unqualified(
        &mut self,
        scan: &mut Scan,
        backslash: bool,
        escape: Option<Escape>,
        c: char,
    ) -> Result<Step> {
        if let Some(escape) = escape {
            *scan = Scan::Unqualified {
                backslash,
                escape: self.continue_escape(escape, c),
            };
            return Ok(Step::Next);
        }

        match self.match_terminator(c) {
            TerminatorMatch::Complete => {
                let end = self.take_head();
                self.end_field(end)?;
                return Ok(self.end_record());
            },
            TerminatorMatch::Head => return Ok(Step::Next),
            TerminatorMatch::Miss => {},
        }

        if backslash && c == '\\' {
            self.flush_column(self.pos);
            self.column_start = self.pos + 1;
            *scan = Scan::Unqualified {
                backslash,
                escape: Some(Escape::Backslash),
            };
        } else if c == self.dialect.delimiter {
            self.end_field(self.pos)?;
            self.last_was_delimiter = true;
            *scan = Scan::FieldStart;
        }
        Ok(Step::Next)
    }

    fn trailing_junk(&mut self, scan: &mut Scan, c: char) -> Result<Step> {
        match self.match_terminator(c) {
            TerminatorMatch::Complete => {
                let end = self.take_head();
                self.end_field(end)?;
                return Ok(self.end_record());
            },
            TerminatorMatch::Head => {
                self.column_start = self.pos + 1;
                return Ok(Step::Next);
            },
            TerminatorMatch::Miss => {},
        }

        if c == self.dialect.delimiter {
            self.end_field(self.pos)?;
            self.last_was_delimiter = true;
            *scan = Scan::FieldStart;
        } else {
            self.column_start = self.pos + 1;
        }
        Ok(Step::Next)
    }

    fn comment(&mut self, scan: &mut Scan, c: char) -> Step {
        if c == self.dialect.terminator.last() {
            debug!(record = self.records_read, "skipping comment line");
            self.discard_line();
            *scan = Scan::FieldStart;
        }
        Step::Next
    }

    /// Handle the character after a backslash, or the next digit of a
    /// numeric escape. Returns the escape still in progress, if any.
    fn continue_escape(&mut self, escape: Escape, c: char) -> Option<Escape> {
        match escape {
            Escape::Numeric(mut numeric) => {
                self.column_start = self.pos + 1;
                match numeric.push(c) {
                    Some(decoded) => {
                        self.column.push(decoded);
                        None
                    },
                    None => Some(Escape::Numeric(numeric)),
                }
            },
            Escape::Backslash => match escape::begin(c) {
                // `column_start` already points here, so `c` stays as data
                EscapeStart::Literal => None,
                EscapeStart::Decoded(decoded) => {
                    self.column.push(decoded);
                    self.column_start = self.pos + 1;
                    None
                },
                EscapeStart::Numeric(numeric) => {
                    self.column_start = self.pos + 1;
                    Some(Escape::Numeric(numeric))
                },
            },
        }
    }

    fn unqualified_scan(&self) -> Scan {
        Scan::Unqualified {
            backslash: self.dialect.backslash_escapes(),
            escape: None,
        }
    }

    #[inline]
    fn completes_terminator(&self, c: char) -> bool {
        matches!(self.dialect.terminator, Terminator::Pair(_, tail) if c == tail)
    }

    /// Match `c` against the terminator, tracking the first character of a
    /// two-character terminator across calls.
    fn match_terminator(&mut self, c: char) -> TerminatorMatch {
        match self.dialect.terminator {
            Terminator::Single(t) if c == t => TerminatorMatch::Complete,
            Terminator::Single(_) => TerminatorMatch::Miss,
            Terminator::Pair(_, tail) if self.head_pending && c == tail => TerminatorMatch::Complete,
            Terminator::Pair(head, _) => {
                self.head_flushed = false;
                self.head_pending = c == head;
                if self.head_pending {
                    TerminatorMatch::Head
                } else {
                    TerminatorMatch::Miss
                }
            },
        }
    }

    /// Clear a pending terminator head and return where the field data
    /// before it ends.
    fn take_head(&mut self) -> usize {
        if !std::mem::take(&mut self.head_pending) {
            return self.pos;
        }
        if std::mem::take(&mut self.head_flushed) {
            self.column.pop();
            return self.pos;
        }
        self.pos.saturating_sub(1)
    }

    /// A pending terminator head turned out to be data: start an unqualified
    /// field with it.
    fn promote_head(&mut self) {
        self.head_pending = false;
        if !std::mem::take(&mut self.head_flushed) {
            if self.pos > 0 {
                self.column_start = self.pos - 1;
            } else {
                if let Terminator::Pair(head, _) = self.dialect.terminator {
                    self.column.push(head);
                }
                self.column_start = self.pos;
            }
        }
        self.started_column = true;
    }

    fn discard_line(&mut self) {
        self.line_start = self.pos + 1;
        self.raw.clear();
        self.head_pending = false;
        self.head_flushed = false;
    }

    fn flush_column(&mut self, end: usize) {
        if self.column_start < end {
            self.column
                .extend_from_slice(&self.data[self.column_start..end]);
        }
    }

    /// Materialize the current field, whose in-buffer part ends at `end`.
    fn end_field(&mut self, end: usize) -> Result<()> {
        let dialect = self.dialect;
        if dialect.safety_limit && self.record.len() >= dialect.max_fields {
            return Err(self.fatal_limit(SafetyLimitKind::FieldCount, dialect.max_fields));
        }

        let qualified = self.started_with_qualifier;
        let value = self.record.next_value();
        if self.started_column {
            value.extend(self.column.iter());
            if self.column_start < end {
                value.extend(&self.data[self.column_start..end]);
            }
            if dialect.trim_whitespace && !qualified {
                let kept = value.trim_end_matches([' ', '\t']).len();
                value.truncate(kept);
            }
        }
        // Byte length bounds char count from above
        let too_long = dialect.safety_limit
            && value.len() > dialect.max_field_length
            && value.chars().count() > dialect.max_field_length;
        if too_long {
            return Err(self.fatal_limit(SafetyLimitKind::FieldLength, dialect.max_field_length));
        }
        self.record.commit(qualified);

        self.column.clear();
        self.started_column = false;
        self.started_with_qualifier = false;
        self.column_start = self.pos + 1;
        Ok(())
    }

    fn end_record(&mut self) -> Step {
        if self.dialect.capture_raw_record {
            let end = match self.dialect.terminator {
                Terminator::Single(_) => self.pos,
                Terminator::Pair(..) if self.pos > self.line_start => self.pos - 1,
                Terminator::Pair(..) => {
                    // The head went into the raw accumulator with the last refill
                    self.raw.pop();
                    self.pos
                },
            };
            self.capture_raw(end);
        }
        self.record.set_index(Some(self.records_read));
        self.records_read += 1;
        self.line_start = self.pos + 1;
        Step::EndOfRecord
    }

    fn capture_raw(&mut self, end: usize) {
        self.raw_record.clear();
        self.raw_record.extend(self.raw.iter());
        if self.line_start < end {
            self.raw_record.extend(&self.data[self.line_start..end]);
        }
        self.raw.clear();
    }

    /// The source is exhausted: close out a field or delimiter still pending.
    fn finish_stream(&mut self, scan: Scan) -> Result<bool> {
        if matches!(scan, Scan::FieldStart) && self.head_pending {
            self.promote_head();
        }
        // An unfinished escape is dropped, a head after a closing qualifier is junk
        self.head_pending = false;
        self.head_flushed = false;

        if !(self.started_column || self.last_was_delimiter) {
            debug!(records = self.records_read, "end of stream");
            return Ok(false);
        }

        self.end_field(self.pos)?;
        if self.dialect.capture_raw_record {
            self.capture_raw(self.pos);
        }
        self.record.set_index(Some(self.records_read));
        self.records_read += 1;
        Ok(true)
    }

    /// Chars of the accumulated column that end-of-field keeps for certain:
    /// a flushed terminator head and blanks that trimming would drop are
    /// not counted.
    fn settled_column_len(&self) -> usize {
        let mut chars = self.column.as_slice();
        if self.head_flushed {
            chars = &chars[..chars.len().saturating_sub(1)];
        }
        if self.dialect.trim_whitespace && !self.started_with_qualifier {
            let blanks = chars.iter().rev().take_while(|c| is_blank(**c)).count();
            chars = &chars[..chars.len() - blanks];
        }
        chars.len()
    }

    fn refill(&mut self) -> Result<()> {
        if self.started_column && self.column_start < self.len {
            self.column
                .extend_from_slice(&self.data[self.column_start..self.len]);
            self.head_flushed = self.head_pending;
        }

        let dialect = self.dialect;
        if dialect.safety_limit && self.settled_column_len() > dialect.max_field_length {
            return Err(self.fatal_limit(SafetyLimitKind::FieldLength, dialect.max_field_length));
        }

        if dialect.capture_raw_record && self.line_start < self.len {
            self.raw
                .extend_from_slice(&self.data[self.line_start..self.len]);
        }

        let Some(source) = self.source.as_mut() else {
            return Err(Error::Closed);
        };
        match source.read_chars(&mut self.data) {
            Ok(Some(n)) => {
                self.len = n.min(self.data.len());
                trace!(chars = self.len, "refilled working buffer");
            },
            Ok(None) => {
                self.has_more_data = false;
                self.len = 0;
                debug!(records = self.records_read, "source exhausted");
            },
            Err(e) => {
                warn!(error = %e, "source read failed, closing decoder");
                self.shutdown();
                return Err(Error::Io(e));
            },
        }

        self.pos = 0;
        self.line_start = 0;
        self.column_start = 0;
        Ok(())
    }
}

impl DecodeEngine<StrSource> {
    /// Decode an in-memory string.
    pub fn from_text(text: impl Into<String>, dialect: Dialect) -> Result<Self> {
        Self::new(StrSource::new(text), dialect)
    }
}

impl<R: Read> DecodeEngine<ReaderSource<R>> {
    /// Decode a byte reader in the given encoding. A byte-order mark, if
    /// present, overrides `encoding`.
    pub fn from_reader(reader: R, encoding: &'static Encoding, dialect: Dialect) -> Result<Self> {
        Self::new(ReaderSource::with_encoding(reader, encoding), dialect)
    }
}

impl DecodeEngine<ReaderSource<File>> {
    /// Decode the file at `path` in the given encoding.
    pub fn open<P: AsRef<Path>>(
        path: P,
        encoding: &'static Encoding,
        dialect: Dialect,
    ) -> Result<Self> {
        dialect.validate()?;
        let file = File::open(path)?;
        Self::from_reader(file, encoding, dialect)
    }
}

impl<S: CharSource> Drop for DecodeEngine<S> {
    fn drop(&mut self) {
        // Dropping releases buffers only; the source is closed by its own drop
        let _ = self.close_with(false);
    }
}

/// Iterator over owned copies of the remaining records.
///
/// Stops after the first error, which is yielded once.
pub struct Records<'a, S: CharSource> {
    engine: &'a mut DecodeEngine<S>,
    done: bool,
}

impl<S: CharSource> Iterator for Records<'_, S> {
    type Item = Result<Vec<Option<String>>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.engine.read_record() {
            Ok(true) => Some(Ok(self.engine.record.to_vec())),
            Ok(false) => {
                self.done = true;
                None
            },
            Err(e) => {
                self.done = true;
                Some(Err(e))
            },
        }
    }
}
