//! Receive DMA channel abstraction

use std::collections::VecDeque;
use tracing::debug;

/// Circular peripheral-to-memory DMA channel.
///
/// The channel writes into the receive buffer's backing region on its own and
/// exposes progress only through a transfer-remaining counter that counts
/// down from [`capacity`](RxDma::capacity) and reloads after reaching zero.
pub trait RxDma {
    /// Transfer length of one DMA cycle
    fn capacity(&self) -> usize;

    /// Current transfer-remaining counter register
    fn remaining(&self) -> usize;

    /// Re-arm the transfer at the start of the region
    fn restart(&mut self);

    /// Give the channel a chance to move data into `target`.
    ///
    /// Hardware channels write memory independently and keep the default no-op.
    fn service(&mut self, _target: &mut [u8]) {}
}

/// Simulated DMA channel replaying queued bytes into the receive region
#[derive(Debug, Clone)]
pub struct LoopbackDma {
    capacity: usize,
    /// Next region offset to write
    cursor: usize,
    /// Emulated counter register
    remaining: usize,
    /// Maximum bytes moved per service call
    burst: usize,
    /// Bytes waiting to be "received"
    pending: VecDeque<u8>,
}

impl LoopbackDma {
    /// Channel that moves as many pending bytes per service call as the
    /// counter can report without lapping
    pub fn new(capacity: usize) -> Self {
        Self::with_burst(capacity, usize::MAX)
    }

    /// Channel that moves at most `burst` bytes per service call.
    ///
    /// The burst is capped below one full cycle: a complete lap between two
    /// polls would leave the counter where it started.
    pub fn with_burst(capacity: usize, burst: usize) -> Self {
        Self {
            capacity,
            cursor: 0,
            remaining: capacity,
            burst: burst.min(capacity.saturating_sub(1)).max(1),
            pending: VecDeque::new(),
        }
    }

    /// Queue bytes as if they arrived on the wire
    pub fn feed(&mut self, bytes: &[u8]) {
        self.pending.extend(bytes);
    }

    /// Bytes queued but not yet written
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl RxDma for LoopbackDma {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn remaining(&self) -> usize {
        self.remaining
    }

    fn restart(&mut self) {
        self.cursor = 0;
        self.remaining = self.capacity;
    }

    fn service(&mut self, target: &mut [u8]) {
        let cycle = target.len().min(self.capacity);
        if cycle == 0 {
            return;
        }

        let count = self
            .pending
            .len()
            .min(self.burst)
            .min(cycle.saturating_sub(1).max(1));
        for byte in self.pending.drain(..count) {
            target[self.cursor] = byte;
            self.cursor = (self.cursor + 1) % cycle;
            self.remaining -= 1;
            if self.remaining == 0 {
                self.remaining = cycle;
            }
        }

        if count > 0 {
            debug!(count, remaining = self.remaining, "Loopback DMA transfer");
        }
    }
}
