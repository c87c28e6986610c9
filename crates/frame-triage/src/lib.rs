//! Frame Triage
//!
//! Scans bytes accumulated in a receive [`RingBuffer`](ring_buffer::RingBuffer)
//! and splits them into discrete [`Frame`]s using a start-of-frame delimiter,
//! an end-of-frame delimiter or a fixed frame length. Incomplete trailing
//! bytes stay buffered until a later scan can complete them.

mod clock;
mod config;
mod error;
mod frame;
mod triage;

pub use clock::{ManualClock, MonotonicClock, TickSource};
pub use config::{FramingMode, TriageConfig};
pub use error::TriageError;
pub use frame::Frame;
pub use triage::FrameTriage;
