//! Extracted frame type

use crate::error::TriageError;
use serde::{Deserialize, Serialize};

/// One complete message cut out of the receive stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Payload bytes, delimiters excluded
    payload: Vec<u8>,
    /// Cached payload length
    length: usize,
    /// Capture time in ticks
    timestamp: u64,
}

impl Frame {
    /// Create a frame from an owned payload
    pub fn new(payload: Vec<u8>, timestamp: u64) -> Self {
        Self {
            length: payload.len(),
            payload,
            timestamp,
        }
    }

    /// Get the payload bytes
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get the payload length
    pub fn len(&self) -> usize {
        self.length
    }

    /// Check if the payload is empty
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Capture time in ticks
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Take ownership of the payload
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Encode with postcard for forwarding to a host
    pub fn to_bytes(&self) -> Result<Vec<u8>, TriageError> {
        Ok(postcard::to_allocvec(self)?)
    }

    /// Decode a postcard-encoded frame, rejecting inconsistent lengths
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TriageError> {
        let frame: Frame = postcard::from_bytes(bytes)?;
        if frame.length != frame.payload.len() {
            return Err(TriageError::LengthMismatch {
                declared: frame.length,
                actual: frame.payload.len(),
            });
        }
        Ok(frame)
    }
}
