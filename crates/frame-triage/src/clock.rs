//! Tick sources for frame timestamps

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Source of capture-time ticks
pub trait TickSource {
    /// Current tick count
    fn now_ticks(&self) -> u64;
}

/// Milliseconds elapsed since the clock was created
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Start counting from now
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSource for MonotonicClock {
    fn now_ticks(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Shared, manually advanced tick counter.
///
/// Clones observe the same counter, so a test or replay tool can keep one
/// handle while the triage engine owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    ticks: Arc<AtomicU64>,
}

impl ManualClock {
    /// Clock starting at tick zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by `ticks`
    pub fn advance(&self, ticks: u64) {
        self.ticks.fetch_add(ticks, Ordering::Relaxed);
    }

    /// Set the absolute tick count
    pub fn set(&self, ticks: u64) {
        self.ticks.store(ticks, Ordering::Relaxed);
    }
}

impl TickSource for ManualClock {
    fn now_ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }
}
