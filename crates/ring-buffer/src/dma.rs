//! DMA Write-Counter Reconciliation
//!
//! A circular DMA transfer writes straight into the buffer's backing region
//! and exposes only a "remaining" counter that counts down from the region
//! length to zero and then reloads. Software learns about new data by
//! polling that counter and diffing it against the value seen last time.

use crate::RingBuffer;
use tracing::{debug, warn};

impl<T> RingBuffer<T> {
    /// Account for elements the DMA engine wrote since the previous call.
    ///
    /// `remaining` is the raw transfer-remaining register. Returns the number
    /// of newly written elements. If the engine lapped the reader, the oldest
    /// unread elements are discarded so that `len() == capacity()`.
    ///
    /// Must be polled at least once per DMA cycle: a full lap between two
    /// calls is indistinguishable from no progress.
    pub fn dma_counter(&mut self, remaining: usize) -> usize {
        if self.capacity == 0 {
            return 0;
        }

        let capacity = self.capacity as i64;
        if remaining as i64 > capacity {
            debug!(remaining, capacity, "DMA counter above capacity, clamping");
        }

        let written = capacity - (remaining as i64).min(capacity);
        let mut last = self.last_dma_counter as i64;
        if written < last {
            // Counter reloaded since the last poll
            last -= capacity;
        }

        let diff = (written - last) as usize;
        self.last_dma_counter = written as usize;
        if diff == 0 {
            return 0;
        }

        self.write_pos = (self.write_pos + diff) % self.capacity;
        self.size += diff;
        self.total_written += diff;

        if self.size > self.capacity {
            let overrun = self.size - self.capacity;
            self.read_pos = (self.read_pos + overrun) % self.capacity;
            self.size = self.capacity;
            self.overrun_count += 1;
            self.dropped_count += overrun;
            warn!(
                overrun,
                capacity = self.capacity,
                "DMA overrun, discarded oldest unread elements"
            );
        }

        diff
    }
}

#[cfg(test)]
mod tests {
    use crate::RingBuffer;

    /// Stand-in for a circular DMA channel writing into the buffer region
    struct FakeDma {
        cursor: usize,
        remaining: usize,
    }

    impl FakeDma {
        fn new(buffer: &RingBuffer<u8>) -> Self {
            Self {
                cursor: 0,
                remaining: buffer.capacity(),
            }
        }

        fn write(&mut self, buffer: &mut RingBuffer<u8>, bytes: &[u8]) {
            let region = buffer.dma_region_mut();
            for &byte in bytes {
                region[self.cursor] = byte;
                self.cursor = (self.cursor + 1) % region.len();
                self.remaining -= 1;
                if self.remaining == 0 {
                    self.remaining = region.len();
                }
            }
        }
    }

    #[test]
    fn test_no_progress_is_idempotent() {
        let mut buffer = RingBuffer::<u8>::new(5);
        for _ in 0..4 {
            assert_eq!(buffer.dma_counter(5), 0);
        }
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_counter_wraparound() {
        let mut buffer = RingBuffer::<u8>::new(5);

        assert_eq!(buffer.dma_counter(5), 0);
        assert_eq!(buffer.dma_counter(0), 5);
        assert_eq!(buffer.len(), 5);

        buffer.pop_n(5);
        assert_eq!(buffer.dma_counter(3), 2);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.overrun_count(), 0);
    }

    #[test]
    fn test_dma_bytes_visible_in_order() {
        let mut buffer = RingBuffer::<u8>::new(8);
        let mut dma = FakeDma::new(&buffer);

        dma.write(&mut buffer, b"hello");
        assert_eq!(buffer.dma_counter(dma.remaining), 5);

        let mut out = [0u8; 3];
        buffer.read(&mut out);
        assert_eq!(&out, b"hel");

        dma.write(&mut buffer, b" world");
        assert_eq!(buffer.dma_counter(dma.remaining), 6);
        assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), b"lo world");
        assert!(buffer.is_full());
    }

    #[test]
    fn test_overrun_discards_oldest() {
        let mut buffer = RingBuffer::<u8>::new(4);
        let mut dma = FakeDma::new(&buffer);

        dma.write(&mut buffer, b"abc");
        assert_eq!(buffer.dma_counter(dma.remaining), 3);

        dma.write(&mut buffer, b"def");
        assert_eq!(buffer.dma_counter(dma.remaining), 3);

        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), b"cdef");
        assert_eq!(buffer.overrun_count(), 1);
        assert_eq!(buffer.dropped_count(), 2);
        assert_eq!(buffer.write_pos(), buffer.read_pos());
    }

    #[test]
    fn test_reset_restarts_dma_cycle() {
        let mut buffer = RingBuffer::<u8>::new(4);
        buffer.dma_counter(1);
        buffer.reset();

        assert_eq!(buffer.dma_counter(4), 0);
        assert_eq!(buffer.dma_counter(2), 2);
    }

    #[test]
    fn test_zero_capacity_ignores_counter() {
        let mut buffer = RingBuffer::<u8>::new(0);
        assert_eq!(buffer.dma_counter(0), 0);
        assert_eq!(buffer.dma_counter(7), 0);
    }
}
