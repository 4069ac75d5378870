//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while decoding changeset primitives.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The input ended before the value was complete.
    #[error("unexpected end of input while decoding {context}")]
    UnexpectedEof {
        /// What was being decoded.
        context: &'static str,
    },

    /// The decoded integer does not fit the target width.
    #[error("integer overflow")]
    IntegerOverflow,
}

impl CodecError {
    /// Create an unexpected end of input error.
    pub fn unexpected_eof(context: &'static str) -> Self {
        Self::UnexpectedEof { context }
    }
}
