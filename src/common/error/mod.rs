//! Unified error types for csv-dialect.
//!
//! Every fallible operation of the decoder and encoder reports through the
//! single [`Error`] enum defined here. Irregular input never shows up as an
//! error: only configuration problems, closed engines, I/O failures and
//! safety-ceiling violations do.

// Submodule declarations
pub mod types;

// Re-exports
pub use types::{Error, Result, SafetyLimitKind};
