//! Circular Buffer Implementation

use std::ops::Index;
use tracing::debug;

/// Fixed-capacity circular buffer with independent read/write cursors.
///
/// Pushing never overwrites unread data; a full buffer rejects the element.
/// The only path that discards unread elements is a DMA overrun detected by
/// [`RingBuffer::dma_counter`].
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    /// Pre-allocated storage, sized to the maximum capacity
    pub(crate) storage: Box<[T]>,
    /// Active capacity (`<= storage.len()`)
    pub(crate) capacity: usize,
    /// Read cursor, in `[0, capacity)`
    pub(crate) read_pos: usize,
    /// Write cursor, in `[0, capacity)`
    pub(crate) write_pos: usize,
    /// Number of unread elements
    pub(crate) size: usize,
    /// Value returned for logical reads at or past `size`
    pub(crate) empty: T,
    /// Elements the DMA engine had written in its current cycle at the last reconcile
    pub(crate) last_dma_counter: usize,
    /// Reconciliations that had to discard unread data
    pub(crate) overrun_count: usize,
    /// Total elements lost to overruns
    pub(crate) dropped_count: usize,
    /// Total elements written (for statistics)
    pub(crate) total_written: usize,
}

impl<T: Clone + Default> RingBuffer<T> {
    /// Create an empty buffer using `T::default()` as the empty sentinel
    pub fn new(capacity: usize) -> Self {
        Self::with_sentinel(capacity, T::default())
    }

    /// Create a buffer pre-filled with up to `capacity` elements of `init`
    pub fn from_slice(capacity: usize, init: &[T]) -> Self {
        let mut buffer = Self::new(capacity);
        buffer.push_slice(init);
        buffer
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Create an empty buffer with an explicit empty sentinel
    pub fn with_sentinel(capacity: usize, empty: T) -> Self {
        Self {
            storage: vec![empty.clone(); capacity].into_boxed_slice(),
            capacity,
            read_pos: 0,
            write_pos: 0,
            size: 0,
            empty,
            last_dma_counter: 0,
            overrun_count: 0,
            dropped_count: 0,
            total_written: 0,
        }
    }

    /// Push one element. Returns `false` without writing if the buffer is full.
    pub fn push(&mut self, value: T) -> bool {
        if self.is_full() {
            return false;
        }

        self.storage[self.write_pos] = value;
        self.write_pos = self.wrap(self.write_pos + 1);
        self.size += 1;
        self.total_written += 1;
        true
    }

    /// Push elements in order, stopping at the first one that does not fit.
    ///
    /// Returns the number of elements pushed.
    pub fn push_slice(&mut self, values: &[T]) -> usize {
        let mut pushed = 0;
        for value in values {
            if !self.push(value.clone()) {
                break;
            }
            pushed += 1;
        }
        pushed
    }

    /// Remove and return the oldest element
    pub fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }

        let value = self.storage[self.read_pos].clone();
        self.read_pos = self.wrap(self.read_pos + 1);
        self.size -= 1;
        Some(value)
    }

    /// Discard up to `n` of the oldest elements. Returns how many were removed.
    pub fn pop_n(&mut self, n: usize) -> usize {
        let n = n.min(self.size);
        self.read_pos = self.wrap(self.read_pos + n);
        self.size -= n;
        n
    }

    /// Copy up to `out.len()` of the oldest elements into `out` and remove them
    pub fn read(&mut self, out: &mut [T]) -> usize {
        let n = self.peek_into(out);
        self.pop_n(n)
    }

    /// Copy up to `out.len()` of the oldest elements into `out` without removing them
    pub fn peek_into(&self, out: &mut [T]) -> usize {
        let n = out.len().min(self.size);
        let (head, tail) = self.as_slices();
        let from_head = n.min(head.len());

        out[..from_head].clone_from_slice(&head[..from_head]);
        out[from_head..n].clone_from_slice(&tail[..n - from_head]);
        n
    }

    /// Move the read cursor and recompute the unread count from the write cursor.
    ///
    /// Returns `false` and leaves the buffer untouched if `pos` is outside
    /// `[0, capacity)`.
    pub fn set_read_pos(&mut self, pos: usize) -> bool {
        if pos >= self.capacity {
            return false;
        }

        self.read_pos = pos;
        self.size = (self.write_pos + self.capacity - pos) % self.capacity;
        true
    }

    /// Change the active capacity within the backing storage.
    ///
    /// Growing past the storage allocated at construction is rejected and
    /// leaves the buffer unchanged. An applied resize keeps the oldest unread
    /// elements that still fit, moved to the start of storage, and restarts
    /// the DMA shadow counter.
    pub fn resize(&mut self, new_capacity: usize) -> bool {
        if new_capacity > self.storage.len() {
            debug!(
                requested = new_capacity,
                max = self.storage.len(),
                "Rejected resize beyond backing storage"
            );
            return false;
        }

        if new_capacity == self.capacity {
            return true;
        }

        self.storage[..self.capacity].rotate_left(self.read_pos);

        let kept = self.size.min(new_capacity);
        if kept < self.size {
            debug!(discarded = self.size - kept, "Resize truncated unread elements");
        }

        self.capacity = new_capacity;
        self.read_pos = 0;
        self.size = kept;
        self.write_pos = self.wrap(kept);
        self.last_dma_counter = 0;
        true
    }

    /// Drop all unread elements and rewind both cursors
    pub fn clear(&mut self) {
        self.read_pos = 0;
        self.write_pos = 0;
        self.size = 0;
    }

    /// Clear, forget DMA progress and overwrite storage with the empty sentinel
    pub fn reset(&mut self) {
        self.clear();
        self.last_dma_counter = 0;
        self.storage.fill(self.empty.clone());
    }
}

impl<T> RingBuffer<T> {
    /// Oldest unread element, without removing it
    pub fn peek(&self) -> Option<&T> {
        self.get(0)
    }

    /// The `i`-th unread element counted from the read cursor
    pub fn get(&self, i: usize) -> Option<&T> {
        if i < self.size {
            Some(&self.storage[(self.read_pos + i) % self.capacity])
        } else {
            None
        }
    }

    /// Unread elements as up to two contiguous segments in logical order
    pub fn as_slices(&self) -> (&[T], &[T]) {
        if self.size == 0 {
            return (&[], &[]);
        }

        let end = self.read_pos + self.size;
        if end <= self.capacity {
            (&self.storage[self.read_pos..end], &[])
        } else {
            (
                &self.storage[self.read_pos..self.capacity],
                &self.storage[..end - self.capacity],
            )
        }
    }

    /// Iterate over unread elements, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let (head, tail) = self.as_slices();
        head.iter().chain(tail.iter())
    }

    /// Backing region a DMA engine writes into (active capacity only)
    pub fn dma_region_mut(&mut self) -> &mut [T] {
        &mut self.storage[..self.capacity]
    }

    /// Number of unread elements
    pub fn len(&self) -> usize {
        self.size
    }

    /// Check if there is nothing to read
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Check if a push would be rejected
    pub fn is_full(&self) -> bool {
        self.size == self.capacity
    }

    /// Active capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Largest capacity `resize` accepts
    pub fn max_capacity(&self) -> usize {
        self.storage.len()
    }

    /// Get the read cursor
    pub fn read_pos(&self) -> usize {
        self.read_pos
    }

    /// Get the write cursor
    pub fn write_pos(&self) -> usize {
        self.write_pos
    }

    /// Get fill ratio (0.0 to 1.0)
    pub fn fill_ratio(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.size as f64 / self.capacity as f64
    }

    /// Number of DMA reconciliations that discarded unread data
    pub fn overrun_count(&self) -> usize {
        self.overrun_count
    }

    /// Total elements discarded by DMA overruns
    pub fn dropped_count(&self) -> usize {
        self.dropped_count
    }

    /// Total elements written, by software or DMA
    pub fn total_written(&self) -> usize {
        self.total_written
    }

    fn wrap(&self, pos: usize) -> usize {
        if self.capacity == 0 {
            0
        } else {
            pos % self.capacity
        }
    }
}

impl<T: PartialEq> RingBuffer<T> {
    /// Logical index of the first complete occurrence of `pattern` starting at
    /// or after `from`.
    ///
    /// A pattern only partially present at the tail is not a match; it may
    /// complete once more elements arrive.
    pub fn find(&self, pattern: &[T], from: usize) -> Option<usize> {
        if pattern.is_empty() || pattern.len() > self.size {
            return None;
        }

        let last_start = self.size - pattern.len();
        (from..=last_start).find(|&start| {
            pattern
                .iter()
                .enumerate()
                .all(|(k, expected)| self[start + k] == *expected)
        })
    }
}

/// Logical indexing from the read cursor.
///
/// Indices at or past `len()` yield the empty sentinel rather than stale
/// storage contents.
impl<T> Index<usize> for RingBuffer<T> {
    type Output = T;

    fn index(&self, i: usize) -> &T {
        self.get(i).unwrap_or(&self.empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::VecDeque;

    #[test]
    fn test_capacity_enforced() {
        let mut buffer = RingBuffer::<u32>::new(5);
        for i in 0..5 {
            assert!(buffer.push(i));
        }

        assert!(!buffer.push(5));
        assert_eq!(buffer.len(), 5);
        assert!(buffer.is_full());
        assert_eq!(buffer.pop(), Some(0));
    }

    #[test]
    fn test_turnover() {
        let mut buffer = RingBuffer::from_slice(5, &[0u32, 1, 2, 3, 4]);

        for i in 5..10 {
            buffer.pop();
            assert!(buffer.push(i));
        }

        let logical: Vec<u32> = (0..5).map(|i| buffer[i]).collect();
        assert_eq!(logical, vec![5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_push_slice_stops_when_full() {
        let mut buffer = RingBuffer::<u8>::new(4);
        assert_eq!(buffer.push_slice(b"abcdef"), 4);
        assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), b"abcd");
    }

    #[test]
    fn test_read_across_wrap() {
        let mut buffer = RingBuffer::<u8>::new(6);
        buffer.push_slice(b"xxxx");
        buffer.pop_n(4);
        buffer.push_slice(b"hello");

        let (head, tail) = buffer.as_slices();
        assert_eq!(head, b"he");
        assert_eq!(tail, b"llo");

        let mut out = [0u8; 8];
        assert_eq!(buffer.read(&mut out), 5);
        assert_eq!(&out[..5], b"hello");
        assert!(buffer.is_empty());
        assert_eq!(buffer.pop(), None);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut buffer = RingBuffer::<u8>::new(8);
        buffer.push_slice(b"abc");

        let mut out = [0u8; 2];
        assert_eq!(buffer.peek_into(&mut out), 2);
        assert_eq!(&out, b"ab");
        assert_eq!(buffer.peek(), Some(&b'a'));
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_pop_n_clamped() {
        let mut buffer = RingBuffer::<u8>::new(8);
        buffer.push_slice(b"abc");
        assert_eq!(buffer.pop_n(10), 3);
        assert_eq!(buffer.read_pos(), buffer.write_pos());
    }

    #[test]
    fn test_reset_exposes_sentinel() {
        let mut buffer = RingBuffer::with_sentinel(4, 0xFFu8);
        buffer.push_slice(&[1, 2, 3]);
        buffer.reset();

        assert_eq!(buffer.len(), 0);
        assert_eq!(buffer[0], 0xFF);
        assert_eq!(buffer[3], 0xFF);
        assert!(buffer.dma_region_mut().iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_index_past_len_is_sentinel() {
        let mut buffer = RingBuffer::<u8>::new(4);
        buffer.push_slice(b"ab");
        assert_eq!(buffer[1], b'b');
        assert_eq!(buffer[2], 0);
    }

    #[test]
    fn test_set_read_pos_recomputes_size() {
        let mut buffer = RingBuffer::<u8>::new(8);
        buffer.push_slice(b"abcdef");

        assert!(buffer.set_read_pos(4));
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.pop(), Some(b'e'));

        assert!(!buffer.set_read_pos(8));
        assert_eq!(buffer.read_pos(), 5);
    }

    #[test]
    fn test_resize_within_backing_storage() {
        let mut buffer = RingBuffer::<u8>::new(6);
        buffer.push_slice(b"xxxx");
        buffer.pop_n(4);
        buffer.push_slice(b"abcd");

        assert!(buffer.resize(3));
        assert_eq!(buffer.capacity(), 3);
        assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), b"abc");
        assert!(!buffer.push(b'z'));

        assert!(buffer.resize(6));
        assert!(buffer.push(b'd'));
        assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), b"abcd");
    }

    #[test]
    fn test_resize_beyond_storage_rejected() {
        let mut buffer = RingBuffer::<u8>::new(4);
        buffer.push_slice(b"ab");

        assert!(!buffer.resize(5));
        assert_eq!(buffer.capacity(), 4);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.peek(), Some(&b'a'));
    }

    #[test]
    fn test_zero_capacity() {
        let mut buffer = RingBuffer::<u8>::new(0);
        assert!(buffer.is_empty());
        assert!(buffer.is_full());
        assert!(!buffer.push(1));
        assert_eq!(buffer.pop(), None);
        assert_eq!(buffer[0], 0);
        assert_eq!(buffer.fill_ratio(), 0.0);
    }

    #[test]
    fn test_find_requires_complete_pattern() {
        let mut buffer = RingBuffer::<u8>::new(16);
        buffer.push_slice(b"abceo");

        assert_eq!(buffer.find(b"eof", 0), None);
        buffer.push(b'f');
        assert_eq!(buffer.find(b"eof", 0), Some(3));
        assert_eq!(buffer.find(b"eof", 4), None);
        assert_eq!(buffer.find(b"", 0), None);
    }

    proptest! {
        #[test]
        fn prop_fifo_matches_model(ops in proptest::collection::vec(any::<Option<u8>>(), 0..200)) {
            let mut buffer = RingBuffer::<u8>::new(7);
            let mut model = VecDeque::new();

            for op in ops {
                match op {
                    Some(value) => {
                        let accepted = buffer.push(value);
                        prop_assert_eq!(accepted, model.len() < 7);
                        if accepted {
                            model.push_back(value);
                        }
                    }
                    None => prop_assert_eq!(buffer.pop(), model.pop_front()),
                }
                prop_assert_eq!(buffer.len(), model.len());
                prop_assert_eq!(buffer.write_pos(), (buffer.read_pos() + buffer.len()) % 7);
            }

            prop_assert!(buffer.iter().eq(model.iter()));
        }
    }
}
