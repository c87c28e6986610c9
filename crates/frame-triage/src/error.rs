//! Frame Triage Error Types

use thiserror::Error;

/// Errors raised while configuring triage or decoding forwarded frames
#[derive(Debug, Error)]
pub enum TriageError {
    /// Delimiter sequence has no bytes
    #[error("Frame delimiter must not be empty")]
    EmptyDelimiter,

    /// Delimiter can never be matched alongside a payload
    #[error("Delimiter of {len} bytes does not fit a {capacity}-byte receive buffer")]
    DelimiterTooLong { len: usize, capacity: usize },

    /// Fixed frame length outside what the receive buffer can hold
    #[error("Expected frame length {len} is outside 1..={capacity}")]
    InvalidLength { len: usize, capacity: usize },

    /// Frame queue must hold at least one frame
    #[error("Frame queue depth must be at least 1")]
    ZeroQueueDepth,

    /// Decoded frame disagrees with itself
    #[error("Frame declares {declared} bytes but carries {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    /// Compact frame encoding failed
    #[error("Frame encoding error: {0}")]
    Encoding(#[from] postcard::Error),
}
