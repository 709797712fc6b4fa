//! Blocking character streams.
//!
//! The decoder pulls characters from a [`CharSource`] one chunk at a time and
//! the encoder pushes text into a [`CharSink`]. String-backed and byte-backed
//! implementations are provided; byte streams are transcoded with
//! `encoding_rs`.

mod sink;
mod source;

pub use sink::{CharSink, WriterSink};
pub use source::{CharSource, ReaderSource, StrSource};
