//! Streaming encode engine.
//!
//! [`EncodeEngine`] turns field values into dialect-conformant text on a
//! [`CharSink`](crate::io::CharSink). Quoting and escaping are chosen per
//! field so that a [`DecodeEngine`](crate::DecodeEngine) configured with the
//! same dialect reads back exactly the values that were written.
//!
//! # Quoting
//!
//! With a qualifier configured, a field is quoted when the dialect forces it,
//! when it contains the qualifier, the delimiter or a terminator character,
//! when it is an empty or comment-like first field, or when whitespace
//! preservation was requested and the value has leading or trailing blanks.
//!
//! # Example
//!
//! ```
//! use csv_dialect::{Dialect, EncodeEngine};
//!
//! # fn main() -> csv_dialect::Result<()> {
//! let mut writer = EncodeEngine::to_string_sink(Dialect::unix().without_qualifier())?;
//! writer.write_record(["a,b", "c"])?;
//! assert_eq!(writer.into_inner()?, "a\\,b,c\n");
//! # Ok(())
//! # }
//! ```

mod engine;

pub use engine::EncodeEngine;
