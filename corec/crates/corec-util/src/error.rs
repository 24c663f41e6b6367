//! Infrastructure error types.
//!
//! These are `Result`-propagated failures in the compiler's own plumbing —
//! never surfaced to the user as a compile error (those are [`crate::diagnostic::Diagnostic`]s).
//! A `CoreError` escaping the pipeline is always a bug or a resource limit,
//! matching spec §7's "Fatal conditions": only internal invariant violations
//! abort, user-input errors never do.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("index {index} out of bounds for table of length {length}")]
    IndexOutOfBounds { index: usize, length: usize },

    #[error("type interner exceeded its maximum id space")]
    InternerExhausted,

    #[error("definition id generator overflowed u32")]
    DefIdOverflow,

    #[error("malformed extra-data reference at offset {offset}")]
    MalformedExtraData { offset: usize },
}

pub type CoreResult<T> = Result<T, CoreError>;
