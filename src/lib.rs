//! csv-dialect - streaming decoder and encoder for CSV-family delimited text
//!
//! This library reads and writes delimited text under a configurable
//! [`Dialect`]: delimiter, record terminator, text qualifier, escape style,
//! comment lines and a handful of trimming and empty-cell policies.
//!
//! # Features
//!
//! - **Streaming decode**: a character-driven scanner over a fixed-size
//!   working buffer, so arbitrarily large inputs decode in bounded memory
//! - **Tolerant recovery**: unterminated quotes, stray qualifiers and trailing
//!   junk after a closing quote are resolved, never raised
//! - **Raw capture**: the verbatim source text of every record is available
//!   on request
//! - **Round-trip encoding**: the encoder quotes and escapes so that decoding
//!   its output under the same dialect reproduces the original values
//! - **Safety ceilings**: configurable limits on fields per record and
//!   characters per field guard against runaway input
//! - **Charset support**: byte-oriented readers and writers are transcoded
//!   through `encoding_rs`, with BOM sniffing on input
//!
//! # Example - Reading records
//!
//! ```
//! use csv_dialect::{DecodeEngine, Dialect};
//!
//! # fn main() -> csv_dialect::Result<()> {
//! let mut reader = DecodeEngine::from_text("name,age\r\n\"Smith, J\",42\r\n", Dialect::default())?;
//! reader.read_headers()?;
//!
//! while reader.read_record()? {
//!     println!("{:?} is {:?}", reader.field_by_name("name")?, reader.field(1)?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Writing records
//!
//! ```
//! use csv_dialect::{Dialect, EncodeEngine};
//!
//! # fn main() -> csv_dialect::Result<()> {
//! let mut writer = EncodeEngine::new(String::new(), Dialect::default())?;
//! writer.write_record(["id", "note"])?;
//! writer.write_record(["1", "says \"hi\", twice"])?;
//!
//! let text = writer.into_inner()?;
//! assert_eq!(text, "id,note\r\n1,\"says \"\"hi\"\", twice\"\r\n");
//! # Ok(())
//! # }
//! ```

/// Shared building blocks: the crate error type, the growable character
/// accumulator and byte-order-mark helpers.
pub mod common;

/// Dialect configuration: delimiter, terminator, qualifier and policies.
pub mod dialect;

/// Character source and sink abstractions with string and byte-stream
/// implementations.
pub mod io;

/// Streaming decode engine and its record, header and escape helpers.
pub mod reader;

/// Encode engine mirroring the decoder's quoting and escaping rules.
pub mod writer;

// Re-export commonly used types for convenience
pub use common::{Error, Result, SafetyLimitKind};
pub use dialect::{Dialect, EmptyCellPolicy, EscapeMode, Terminator};
pub use io::{CharSink, CharSource, ReaderSource, StrSource, WriterSink};
pub use reader::{DecodeEngine, HeaderIndex, RecordCursor, Records};
pub use writer::EncodeEngine;
