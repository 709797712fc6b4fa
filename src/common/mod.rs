//! Common types and utilities shared by the decoder and encoder.
//!
//! This module provides the unified error type, the growable character
//! accumulator used for field and raw-record storage, and byte-order-mark
//! helpers for byte-backed streams.

// Submodule declarations
pub mod bom;
pub mod buffer;
pub mod error;

// Re-exports for convenience
pub use bom::BomKind;
pub use buffer::GrowableBuffer;
pub use error::{Error, Result, SafetyLimitKind};
