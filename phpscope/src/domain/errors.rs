//! Structured error types for phpscope
//!
//! Using thiserror for automatic Display implementation and error chaining.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("truncated probe record: got {got} bytes, expected {expected}")]
    TruncatedRecord { got: usize, expected: usize },

    #[error("unknown probe point id {0}")]
    UnknownProbe(u32),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
