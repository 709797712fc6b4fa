//! Streaming decode engine.
//!
//! [`DecodeEngine`] scans a [`CharSource`](crate::io::CharSource) one
//! character at a time over a fixed-size working buffer and produces records
//! of fields according to a [`Dialect`](crate::Dialect).
//!
//! # Features
//!
//! - **Bounded memory**: only the working buffer, the current field and the
//!   current record are held, whatever the input size
//! - **Qualified fields**: delimiters and terminators inside a qualified
//!   field are data; `""` or `\"` escapes the qualifier
//! - **Backslash escapes**: `\n \r \t \b \f \e \v \a`, plus numeric `\d065`,
//!   `\101`, `\o101`, `\x41` and `\u0041` forms
//! - **Headers**: name-based field access after [`DecodeEngine::read_headers`]
//! - **Raw capture**: the verbatim text of each record
//!
//! # Example
//!
//! ```
//! use csv_dialect::{DecodeEngine, Dialect};
//!
//! # fn main() -> csv_dialect::Result<()> {
//! let mut reader = DecodeEngine::from_text("\"a,b\",c\r\n", Dialect::default())?;
//! assert!(reader.read_record()?);
//! assert_eq!(reader.field(0)?, Some("a,b"));
//! assert_eq!(reader.field(1)?, Some("c"));
//! assert!(!reader.read_record()?);
//! # Ok(())
//! # }
//! ```

mod engine;
mod escape;
mod headers;
mod record;

pub use engine::{DEFAULT_BUFFER_CAPACITY, DecodeEngine, Records};
pub use headers::HeaderIndex;
pub use record::RecordCursor;

#[cfg(test)]
mod tests;
