//! Triage configuration

use crate::error::TriageError;
use serde::{Deserialize, Serialize};

/// Default number of frames held before the oldest is dropped
pub const DEFAULT_FRAME_QUEUE_DEPTH: usize = 32;

/// Framing strategy, selected from whichever configuration has priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FramingMode {
    /// Frames are the bytes between consecutive start delimiters
    StartOfFrame,
    /// Frames end at each end delimiter
    EndOfFrame,
    /// Frames are exactly this many bytes
    FixedLength(usize),
    /// No framing; bytes are consumed raw
    Passthrough,
}

/// Framing configuration.
///
/// Several fields may be set at once; the effective mode is chosen by
/// priority: start-of-frame, then end-of-frame, then fixed length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    /// Start-of-frame delimiter
    pub start_of_frame: Option<Vec<u8>>,
    /// End-of-frame delimiter
    pub end_of_frame: Option<Vec<u8>>,
    /// Fixed frame length in bytes
    pub expected_len: Option<usize>,
    /// Maximum queued frames
    pub frame_queue_depth: usize,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            start_of_frame: None,
            end_of_frame: None,
            expected_len: None,
            frame_queue_depth: DEFAULT_FRAME_QUEUE_DEPTH,
        }
    }
}

impl TriageConfig {
    /// Start-of-frame framing
    pub fn start_of_frame(delimiter: &[u8]) -> Self {
        Self {
            start_of_frame: Some(delimiter.to_vec()),
            ..Default::default()
        }
    }

    /// End-of-frame framing
    pub fn end_of_frame(delimiter: &[u8]) -> Self {
        Self {
            end_of_frame: Some(delimiter.to_vec()),
            ..Default::default()
        }
    }

    /// Fixed-length framing
    pub fn fixed_length(len: usize) -> Self {
        Self {
            expected_len: Some(len),
            ..Default::default()
        }
    }

    /// Effective framing mode
    pub fn mode(&self) -> FramingMode {
        if self.start_of_frame.is_some() {
            FramingMode::StartOfFrame
        } else if self.end_of_frame.is_some() {
            FramingMode::EndOfFrame
        } else if let Some(len) = self.expected_len {
            FramingMode::FixedLength(len)
        } else {
            FramingMode::Passthrough
        }
    }

    /// Check every configured field against a receive buffer of `capacity` bytes
    pub fn validate(&self, capacity: usize) -> Result<(), TriageError> {
        if let Some(delimiter) = &self.start_of_frame {
            validate_delimiter(delimiter, capacity)?;
        }
        if let Some(delimiter) = &self.end_of_frame {
            validate_delimiter(delimiter, capacity)?;
        }
        if let Some(len) = self.expected_len {
            validate_expected_len(len, capacity)?;
        }
        if self.frame_queue_depth == 0 {
            return Err(TriageError::ZeroQueueDepth);
        }
        Ok(())
    }
}

pub(crate) fn validate_delimiter(delimiter: &[u8], capacity: usize) -> Result<(), TriageError> {
    if delimiter.is_empty() {
        return Err(TriageError::EmptyDelimiter);
    }
    // Need room for the delimiter plus at least one payload byte
    if delimiter.len() >= capacity {
        return Err(TriageError::DelimiterTooLong {
            len: delimiter.len(),
            capacity,
        });
    }
    Ok(())
}

pub(crate) fn validate_expected_len(len: usize, capacity: usize) -> Result<(), TriageError> {
    if len == 0 || len > capacity {
        return Err(TriageError::InvalidLength { len, capacity });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_priority() {
        let mut config = TriageConfig {
            start_of_frame: Some(b"sof".to_vec()),
            end_of_frame: Some(b"eof".to_vec()),
            expected_len: Some(4),
            ..Default::default()
        };
        assert_eq!(config.mode(), FramingMode::StartOfFrame);

        config.start_of_frame = None;
        assert_eq!(config.mode(), FramingMode::EndOfFrame);

        config.end_of_frame = None;
        assert_eq!(config.mode(), FramingMode::FixedLength(4));

        config.expected_len = None;
        assert_eq!(config.mode(), FramingMode::Passthrough);
    }

    #[test]
    fn test_validate() {
        assert!(TriageConfig::end_of_frame(b"\r\n").validate(64).is_ok());
        assert!(matches!(
            TriageConfig::start_of_frame(b"").validate(64),
            Err(TriageError::EmptyDelimiter)
        ));
        assert!(matches!(
            TriageConfig::end_of_frame(b"long").validate(4),
            Err(TriageError::DelimiterTooLong { len: 4, capacity: 4 })
        ));
        assert!(matches!(
            TriageConfig::fixed_length(65).validate(64),
            Err(TriageError::InvalidLength { len: 65, .. })
        ));
        assert!(matches!(
            TriageConfig {
                frame_queue_depth: 0,
                ..Default::default()
            }
            .validate(64),
            Err(TriageError::ZeroQueueDepth)
        ));
    }
}
