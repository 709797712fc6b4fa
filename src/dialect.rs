//! Dialect configuration shared by the decoder and encoder.
//!
//! A [`Dialect`] is a plain value: every option is a public field with a
//! `with_*` builder method. Engines copy the dialect at construction and
//! validate it before any I/O happens.
//!
//! # Example
//!
//! ```
//! use csv_dialect::{Dialect, EscapeMode, Terminator};
//!
//! let dialect = Dialect::tsv()
//!     .with_terminator(Terminator::Single('\n'))
//!     .with_escape_mode(EscapeMode::Backslash)
//!     .with_comments(true);
//!
//! assert!(dialect.validate().is_ok());
//! ```
//!
//! Dialects also load from YAML; omitted keys keep their defaults:
//!
//! ```
//! use csv_dialect::{Dialect, Terminator};
//!
//! # fn main() -> csv_dialect::Result<()> {
//! let dialect = Dialect::from_yaml("delimiter: ';'\nterminator: \"\\n\"\n")?;
//! assert_eq!(dialect.delimiter, ';');
//! assert_eq!(dialect.terminator, Terminator::Single('\n'));
//! assert_eq!(dialect.qualifier, Some('"'));
//! # Ok(())
//! # }
//! ```

use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How special characters are escaped inside field values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscapeMode {
    /// A qualifier inside a qualified field is written twice
    #[default]
    Doubled,
    /// A backslash introduces an escape sequence, in qualified and
    /// unqualified fields alike
    Backslash,
}

/// How a zero-length field is represented after decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyCellPolicy {
    /// Always null
    AlwaysNull,
    /// Always an empty string
    AlwaysEmpty,
    /// Empty string when the field was qualified (`""`), null otherwise
    #[default]
    NullUnlessQualified,
}

impl EmptyCellPolicy {
    /// Whether a zero-length field with the given qualification is null.
    #[inline]
    pub fn is_null(self, qualified: bool) -> bool {
        match self {
            EmptyCellPolicy::AlwaysNull => true,
            EmptyCellPolicy::AlwaysEmpty => false,
            EmptyCellPolicy::NullUnlessQualified => !qualified,
        }
    }
}

/// Record terminator: one character, or an exact two-character sequence.
///
/// A lone first character of a two-character terminator is ordinary data.
/// In YAML a terminator is written with escapes (`"\\r\\n"`, `"\\n"`) or by
/// name (`crlf`, `lf`, `cr`). Unescaped one- or two-character strings are
/// accepted too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Terminator {
    Single(char),
    Pair(char, char),
}

impl Terminator {
    /// `\r\n`
    pub const CRLF: Terminator = Terminator::Pair('\r', '\n');
    /// `\n`
    pub const LF: Terminator = Terminator::Single('\n');

    /// The character that completes a match.
    #[inline]
    pub fn last(self) -> char {
        match self {
            Terminator::Single(c) | Terminator::Pair(_, c) => c,
        }
    }

    /// Whether `c` occurs anywhere in the terminator.
    #[inline]
    pub fn contains(self, c: char) -> bool {
        match self {
            Terminator::Single(t) => c == t,
            Terminator::Pair(head, tail) => c == head || c == tail,
        }
    }

    /// Append the terminator to `out`.
    pub fn push_to(self, out: &mut String) {
        match self {
            Terminator::Single(c) => out.push(c),
            Terminator::Pair(head, tail) => {
                out.push(head);
                out.push(tail);
            },
        }
    }
}

impl Default for Terminator {
    fn default() -> Self {
        Terminator::CRLF
    }
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut text = String::with_capacity(2);
        self.push_to(&mut text);
        f.write_str(&text)
    }
}

impl TryFrom<String> for Terminator {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        match value.to_ascii_lowercase().as_str() {
            "crlf" => return Ok(Terminator::CRLF),
            "lf" => return Ok(Terminator::LF),
            "cr" => return Ok(Terminator::Single('\r')),
            _ => {},
        }

        let chars = unescape_terminator(&value)?;
        match chars.as_slice() {
            [c] => Ok(Terminator::Single(*c)),
            [head, tail] => Ok(Terminator::Pair(*head, *tail)),
            _ => Err(format!(
                "terminator must be one or two characters, got {value:?}"
            )),
        }
    }
}

impl From<Terminator> for String {
    fn from(value: Terminator) -> Self {
        let mut text = String::with_capacity(4);
        match value {
            Terminator::Single(c) => escape_terminator_char(c, &mut text),
            Terminator::Pair(head, tail) => {
                escape_terminator_char(head, &mut text);
                escape_terminator_char(tail, &mut text);
            },
        }
        if matches!(text.to_ascii_lowercase().as_str(), "cr" | "lf") {
            // Literal letters that spell a name
            let first = text.remove(0);
            text.insert_str(0, &format!("\\u{{{:x}}}", first as u32));
        }
        text
    }
}

/// Written form of one terminator character. Control characters never appear
/// literally, so YAML emitters cannot turn the value into a block scalar.
fn escape_terminator_char(c: char, out: &mut String) {
    match c {
        '\r' => out.push_str("\\r"),
        '\n' => out.push_str("\\n"),
        '\t' => out.push_str("\\t"),
        '\\' => out.push_str("\\\\"),
        c if c.is_control() => out.push_str(&format!("\\u{{{:x}}}", c as u32)),
        c => out.push(c),
    }
}

fn unescape_terminator(text: &str) -> std::result::Result<Vec<char>, String> {
    let mut out = Vec::with_capacity(2);
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            // A lone trailing backslash is itself
            None => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some('u') => {
                let rest = chars.as_str();
                let code = rest
                    .strip_prefix('{')
                    .and_then(|r| r.split_once('}'))
                    .and_then(|(hex, _)| u32::from_str_radix(hex, 16).ok().map(|v| (hex.len(), v)))
                    .and_then(|(len, v)| char::from_u32(v).map(|c| (len, c)));
                let Some((len, decoded)) = code else {
                    return Err(format!("invalid unicode escape in terminator {text:?}"));
                };
                out.push(decoded);
                chars = rest[len + 2..].chars();
            },
            Some(other) => {
                return Err(format!("unknown escape \\{other} in terminator {text:?}"));
            },
        }
    }
    Ok(out)
}

/// Complete set of characters and policies governing decode and encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dialect {
    /// Field delimiter character
    pub delimiter: char,
    /// Record terminator
    pub terminator: Terminator,
    /// Text qualifier, `None` to disable qualified fields
    pub qualifier: Option<char>,
    /// Escape style inside field values
    pub escape_mode: EscapeMode,
    /// Representation of zero-length fields (decode only)
    pub empty_cell_policy: EmptyCellPolicy,
    /// Trim spaces and tabs around unqualified fields (decode only)
    pub trim_whitespace: bool,
    /// Skip lines whose first character is `comment`
    pub use_comments: bool,
    /// Comment character
    pub comment: char,
    /// Skip physical lines with no content (decode only)
    pub skip_empty_records: bool,
    /// Enforce `max_fields` and `max_field_length` (decode only)
    pub safety_limit: bool,
    /// Most fields one record may hold
    pub max_fields: usize,
    /// Most characters one field may hold
    pub max_field_length: usize,
    /// Keep the verbatim text of each record (decode only)
    pub capture_raw_record: bool,
    /// Qualify every field (encode only)
    pub force_qualifier: bool,
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            delimiter: ',',                                    // CSV default
            terminator: Terminator::CRLF,                      // RFC 4180 line ending
            qualifier: Some('"'),                              // Standard CSV quoting
            escape_mode: EscapeMode::Doubled,                  // `""` inside quotes
            empty_cell_policy: EmptyCellPolicy::NullUnlessQualified,
            trim_whitespace: false,                            // Preserve whitespace by default
            use_comments: false,                               // Comments are opt-in
            comment: '#',                                      // Common comment character
            skip_empty_records: true,                          // Blank lines carry no record
            safety_limit: true,                                // Guard against runaway input
            max_fields: 1000,                                  // Fields per record
            max_field_length: 100_000,                         // Characters per field
            capture_raw_record: false,                         // Raw text costs a copy
            force_qualifier: false,                            // Quote only when needed
        }
    }
}

impl Dialect {
    /// Create a new default dialect
    pub fn new() -> Self {
        Self::default()
    }

    /// Create comma-separated dialect with CRLF terminators
    pub fn csv() -> Self {
        Self::new()
    }

    /// Create TSV (tab-separated) dialect
    pub fn tsv() -> Self {
        Self::new().with_delimiter('\t')
    }

    /// Create pipe-separated dialect
    pub fn pipe() -> Self {
        Self::new().with_delimiter('|')
    }

    /// Create the Unix-tool dialect: `\n` terminators and backslash escapes
    pub fn unix() -> Self {
        Self::new()
            .with_terminator(Terminator::LF)
            .with_escape_mode(EscapeMode::Backslash)
    }

    /// Set the field delimiter
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set the record terminator
    pub fn with_terminator(mut self, terminator: Terminator) -> Self {
        self.terminator = terminator;
        self
    }

    /// Set the text qualifier
    pub fn with_qualifier(mut self, qualifier: char) -> Self {
        self.qualifier = Some(qualifier);
        self
    }

    /// Disable qualified fields
    pub fn without_qualifier(mut self) -> Self {
        self.qualifier = None;
        self
    }

    /// Set the escape mode
    pub fn with_escape_mode(mut self, mode: EscapeMode) -> Self {
        self.escape_mode = mode;
        self
    }

    /// Set the empty-cell policy
    pub fn with_empty_cell_policy(mut self, policy: EmptyCellPolicy) -> Self {
        self.empty_cell_policy = policy;
        self
    }

    /// Enable/disable whitespace trimming
    pub fn with_trim_whitespace(mut self, trim: bool) -> Self {
        self.trim_whitespace = trim;
        self
    }

    /// Enable/disable comment lines
    pub fn with_comments(mut self, use_comments: bool) -> Self {
        self.use_comments = use_comments;
        self
    }

    /// Set the comment character
    pub fn with_comment(mut self, comment: char) -> Self {
        self.comment = comment;
        self
    }

    /// Enable/disable skipping of blank lines
    pub fn with_skip_empty_records(mut self, skip: bool) -> Self {
        self.skip_empty_records = skip;
        self
    }

    /// Enable/disable the safety ceilings
    pub fn with_safety_limit(mut self, enabled: bool) -> Self {
        self.safety_limit = enabled;
        self
    }

    /// Set the most fields one record may hold
    pub fn with_max_fields(mut self, max: usize) -> Self {
        self.max_fields = max;
        self
    }

    /// Set the most characters one field may hold
    pub fn with_max_field_length(mut self, max: usize) -> Self {
        self.max_field_length = max;
        self
    }

    /// Enable/disable raw record capture
    pub fn with_capture_raw_record(mut self, capture: bool) -> Self {
        self.capture_raw_record = capture;
        self
    }

    /// Enable/disable qualifying every written field
    pub fn with_force_qualifier(mut self, force: bool) -> Self {
        self.force_qualifier = force;
        self
    }

    #[inline]
    pub(crate) fn backslash_escapes(&self) -> bool {
        self.escape_mode == EscapeMode::Backslash
    }

    /// Check that the dialect describes an unambiguous grammar.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(Error::Configuration(msg));

        if self.terminator.contains(self.delimiter) {
            return fail(format!(
                "delimiter {:?} is part of the terminator {:?}",
                self.delimiter,
                self.terminator.to_string()
            ));
        }
        if let Some(qualifier) = self.qualifier {
            if qualifier == self.delimiter {
                return fail(format!("qualifier and delimiter are both {qualifier:?}"));
            }
            if self.terminator.contains(qualifier) {
                return fail(format!("qualifier {qualifier:?} is part of the terminator"));
            }
        }
        if self.backslash_escapes()
            && (self.delimiter == '\\'
                || self.qualifier == Some('\\')
                || self.terminator.contains('\\'))
        {
            return fail("backslash escaping reserves '\\' as the escape character".into());
        }
        if self.use_comments && self.comment == self.delimiter {
            return fail(format!("comment and delimiter are both {:?}", self.comment));
        }
        if self.safety_limit && (self.max_fields == 0 || self.max_field_length == 0) {
            return fail("safety ceilings must be positive".into());
        }
        Ok(())
    }

    /// Load a dialect from YAML. Keys that are absent keep their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let dialect: Dialect = serde_saphyr::from_str(yaml)
            .map_err(|e| Error::Configuration(format!("Failed to parse dialect YAML: {e}")))?;
        dialect.validate()?;
        Ok(dialect)
    }

    /// Serialize the dialect to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_saphyr::to_string(self)
            .map_err(|e| Error::Configuration(format!("Failed to serialize dialect to YAML: {e}")))
    }
}
