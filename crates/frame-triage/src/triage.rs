//! Frame Triage Engine
//!
//! Every [`FrameTriage::run`] scans the receive buffer to exhaustion and
//! queues each complete frame it finds. Bytes that cannot be classified yet,
//! such as a delimiter split across two DMA bursts, stay in the buffer and
//! are looked at again on the next scan.

use crate::clock::{MonotonicClock, TickSource};
use crate::config::{validate_delimiter, validate_expected_len, FramingMode, TriageConfig};
use crate::error::TriageError;
use crate::frame::Frame;
use ring_buffer::RingBuffer;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// Frame triage engine owning its receive buffer and output queue
pub struct FrameTriage<C = MonotonicClock> {
    /// Raw receive bytes
    rx: RingBuffer<u8>,
    /// Completed frames, oldest first
    frames: VecDeque<Frame>,
    /// Active configuration
    config: TriageConfig,
    /// Start-of-frame mode: a delimiter has been consumed and a frame is open
    in_frame: bool,
    /// End-of-frame mode: the head of the current message was discarded
    resyncing: bool,
    /// Timestamp source
    clock: C,
    /// Latest timestamp handed out
    last_timestamp: u64,
    /// Frames dropped because the queue was full
    dropped_frames: usize,
}

impl FrameTriage<MonotonicClock> {
    /// Create an engine with a `capacity`-byte receive buffer
    pub fn new(capacity: usize, config: TriageConfig) -> Result<Self, TriageError> {
        Self::with_clock(capacity, config, MonotonicClock::new())
    }
}

impl<C: TickSource> FrameTriage<C> {
    /// Create an engine timestamping frames from `clock`
    pub fn with_clock(capacity: usize, config: TriageConfig, clock: C) -> Result<Self, TriageError> {
        config.validate(capacity)?;
        info!(capacity, mode = ?config.mode(), "Creating frame triage");

        Ok(Self {
            rx: RingBuffer::new(capacity),
            frames: VecDeque::new(),
            config,
            in_frame: false,
            resyncing: false,
            clock,
            last_timestamp: 0,
            dropped_frames: 0,
        })
    }

    /// Extract every complete frame currently buffered.
    ///
    /// Returns the number of frames queued by this scan.
    pub fn run(&mut self) -> usize {
        let queued_before = self.frames.len() + self.dropped_frames;

        match self.config.mode() {
            FramingMode::StartOfFrame => self.triage_start_of_frame(),
            FramingMode::EndOfFrame => self.triage_end_of_frame(),
            FramingMode::FixedLength(len) => self.triage_fixed_length(len),
            FramingMode::Passthrough => {}
        }

        let queued = self.frames.len() + self.dropped_frames - queued_before;
        if queued > 0 {
            debug!(queued, pending = self.rx.len(), "Triage scan complete");
        }
        queued
    }

    /// Push bytes received outside of DMA. Returns how many fit.
    pub fn inject(&mut self, bytes: &[u8]) -> usize {
        let accepted = self.rx.push_slice(bytes);
        if accepted < bytes.len() {
            warn!(
                rejected = bytes.len() - accepted,
                "Receive buffer full, bytes rejected"
            );
        }
        accepted
    }

    /// Reconcile DMA progress from the transfer-remaining register
    pub fn sync_dma(&mut self, remaining: usize) -> usize {
        self.rx.dma_counter(remaining)
    }

    /// Number of queued frames
    pub fn available_frames(&self) -> usize {
        self.frames.len()
    }

    /// Number of buffered bytes not yet part of a frame
    pub fn available_bytes(&self) -> usize {
        self.rx.len()
    }

    /// Take the oldest queued frame
    pub fn receive(&mut self) -> Option<Frame> {
        self.frames.pop_front()
    }

    /// Read buffered bytes directly, bypassing framing
    pub fn receive_raw(&mut self, out: &mut [u8]) -> usize {
        self.rx.read(out)
    }

    /// Switch to start-of-frame framing from the next scan
    pub fn set_start_of_frame_sequence(&mut self, sequence: &[u8]) -> Result<(), TriageError> {
        validate_delimiter(sequence, self.rx.capacity())?;
        debug!(?sequence, "Start-of-frame sequence set");
        self.config.start_of_frame = Some(sequence.to_vec());
        self.in_frame = false;
        Ok(())
    }

    /// Stop start-of-frame framing
    pub fn clear_start_of_frame_sequence(&mut self) {
        self.config.start_of_frame = None;
        self.in_frame = false;
    }

    /// Use end-of-frame framing when no start-of-frame sequence is set
    pub fn set_end_of_frame_sequence(&mut self, sequence: &[u8]) -> Result<(), TriageError> {
        validate_delimiter(sequence, self.rx.capacity())?;
        debug!(?sequence, "End-of-frame sequence set");
        self.config.end_of_frame = Some(sequence.to_vec());
        self.resyncing = false;
        Ok(())
    }

    /// Stop end-of-frame framing
    pub fn clear_end_of_frame_sequence(&mut self) {
        self.config.end_of_frame = None;
        self.resyncing = false;
    }

    /// Use fixed-length framing when no delimiter is set
    pub fn set_expected_rx_len(&mut self, len: usize) -> Result<(), TriageError> {
        validate_expected_len(len, self.rx.capacity())?;
        debug!(len, "Expected frame length set");
        self.config.expected_len = Some(len);
        Ok(())
    }

    /// Stop fixed-length framing
    pub fn clear_expected_rx_len(&mut self) {
        self.config.expected_len = None;
    }

    /// Effective framing mode for the next scan
    pub fn mode(&self) -> FramingMode {
        self.config.mode()
    }

    /// Active configuration
    pub fn config(&self) -> &TriageConfig {
        &self.config
    }

    /// Receive buffer
    pub fn rx_buffer(&self) -> &RingBuffer<u8> {
        &self.rx
    }

    /// Mutable receive buffer, for DMA setup and resynchronization
    pub fn rx_buffer_mut(&mut self) -> &mut RingBuffer<u8> {
        &mut self.rx
    }

    /// Frames discarded because the queue was full
    pub fn dropped_frames(&self) -> usize {
        self.dropped_frames
    }

    /// Drop buffered bytes and queued frames
    pub fn reset(&mut self) {
        self.discard_pending();
        self.frames.clear();
    }

    /// Drop buffered bytes, keeping queued frames.
    ///
    /// Cursors and DMA accounting are left alone, so a running DMA transfer
    /// stays aligned with the receive buffer.
    pub fn discard_pending(&mut self) {
        let pending = self.rx.len();
        self.rx.pop_n(pending);
        self.in_frame = false;
        self.resyncing = false;
    }

    /// Timestamp source used for frames
    pub fn clock(&self) -> &C {
        &self.clock
    }

    fn triage_start_of_frame(&mut self) {
        let delimiter = std::mem::take(&mut self.config.start_of_frame).unwrap_or_default();

        loop {
            if !self.in_frame {
                let Some(pos) = self.rx.find(&delimiter, 0) else {
                    self.discard_if_stalled(delimiter.len());
                    break;
                };
                if pos > 0 {
                    debug!(discarded = pos, "Skipping bytes ahead of start-of-frame");
                }
                self.rx.pop_n(pos + delimiter.len());
                self.in_frame = true;
            }

            let Some(end) = self.rx.find(&delimiter, 0) else {
                if self.discard_if_stalled(delimiter.len()) {
                    // Frame start is gone; wait for the next delimiter
                    self.in_frame = false;
                }
                break;
            };
            if end > 0 {
                self.extract(end);
            }
            self.rx.pop_n(delimiter.len());
        }

        self.config.start_of_frame = Some(delimiter);
    }

    fn triage_end_of_frame(&mut self) {
        let delimiter = std::mem::take(&mut self.config.end_of_frame).unwrap_or_default();

        while let Some(pos) = self.rx.find(&delimiter, 0) {
            if self.resyncing {
                debug!(discarded = pos, "Dropping tail of truncated message");
                self.rx.pop_n(pos);
                self.resyncing = false;
            } else if pos > 0 {
                self.extract(pos);
            }
            self.rx.pop_n(delimiter.len());
        }
        if self.discard_if_stalled(delimiter.len()) {
            self.resyncing = true;
        }

        self.config.end_of_frame = Some(delimiter);
    }

    fn triage_fixed_length(&mut self, len: usize) {
        while self.rx.len() >= len {
            self.extract(len);
        }
    }

    /// A full buffer without a delimiter can never make progress. Keep only
    /// the bytes that could still be the start of a split delimiter.
    fn discard_if_stalled(&mut self, delimiter_len: usize) -> bool {
        if !self.rx.is_full() {
            return false;
        }

        let discard = self.rx.len() - (delimiter_len - 1);
        warn!(
            discard,
            "Receive buffer full without a delimiter, discarding"
        );
        self.rx.pop_n(discard);
        true
    }

    fn extract(&mut self, len: usize) {
        let mut payload = vec![0u8; len];
        self.rx.read(&mut payload);

        let timestamp = self.clock.now_ticks().max(self.last_timestamp);
        self.last_timestamp = timestamp;

        if self.frames.len() >= self.config.frame_queue_depth {
            self.frames.pop_front();
            self.dropped_frames += 1;
            warn!(
                depth = self.config.frame_queue_depth,
                "Frame queue full, dropped oldest frame"
            );
        }
        self.frames.push_back(Frame::new(payload, timestamp));
    }
}
