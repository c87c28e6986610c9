//! Driver Error Types

use frame_triage::TriageError;
use thiserror::Error;

/// Errors raised while setting up the receive driver
#[derive(Debug, Error)]
pub enum DriverError {
    /// Invalid framing configuration
    #[error("Triage configuration error: {0}")]
    Triage(#[from] TriageError),

    /// Settings could not be loaded
    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    /// Replay burst would let the DMA counter lap between polls
    #[error("Replay burst {burst} must be between 1 and {buffer} - 1 bytes")]
    InvalidReplayBurst { burst: usize, buffer: usize },

    /// DMA transfer length and receive buffer disagree
    #[error("DMA transfer length {dma} does not match receive buffer of {buffer} bytes")]
    CapacityMismatch { dma: usize, buffer: usize },
}
