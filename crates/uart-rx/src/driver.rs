//! UART receive driver

use crate::dma::RxDma;
use crate::error::DriverError;
use crate::settings::RxSettings;
use frame_triage::{Frame, FrameTriage, MonotonicClock, TickSource};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Outcome of a single poll
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Bytes the DMA channel delivered since the previous poll
    pub new_bytes: usize,
    /// Frames completed by this poll
    pub new_frames: usize,
    /// The receive watchdog discarded pending bytes
    pub timed_out: bool,
}

/// DMA-driven UART receiver
pub struct UartRx<D, C = MonotonicClock> {
    /// Receive DMA channel
    dma: D,
    /// Frame triage over the DMA receive buffer
    triage: FrameTriage<C>,
    /// Watchdog deadline in clock ticks (ms)
    rx_timeout: Option<u64>,
    /// Tick of the last completed frame or empty buffer
    last_activity: u64,
    /// Number of watchdog resets
    timeouts: usize,
}

impl<D: RxDma> UartRx<D, MonotonicClock> {
    /// Create a receiver timestamping frames with a monotonic millisecond clock
    pub fn new(dma: D, settings: &RxSettings) -> Result<Self, DriverError> {
        Self::with_clock(dma, settings, MonotonicClock::new())
    }
}

impl<D: RxDma, C: TickSource> UartRx<D, C> {
    /// Create a receiver with an explicit tick source (ticks are milliseconds)
    pub fn with_clock(mut dma: D, settings: &RxSettings, clock: C) -> Result<Self, DriverError> {
        if dma.capacity() != settings.rx_buffer_size {
            return Err(DriverError::CapacityMismatch {
                dma: dma.capacity(),
                buffer: settings.rx_buffer_size,
            });
        }

        let triage = FrameTriage::with_clock(settings.rx_buffer_size, settings.triage.clone(), clock)?;
        dma.restart();

        info!(
            buffer = settings.rx_buffer_size,
            mode = ?triage.mode(),
            timeout_ms = ?settings.rx_timeout_ms,
            "UART receiver started"
        );

        let last_activity = triage.clock().now_ticks();
        Ok(Self {
            dma,
            triage,
            rx_timeout: settings.rx_timeout_ms,
            last_activity,
            timeouts: 0,
        })
    }

    /// Reconcile DMA progress, then extract every complete frame
    pub fn poll(&mut self) -> PollReport {
        self.dma.service(self.triage.rx_buffer_mut().dma_region_mut());
        let new_bytes = self.triage.sync_dma(self.dma.remaining());
        let new_frames = self.triage.run();
        let timed_out = self.check_watchdog(new_frames);

        PollReport {
            new_bytes,
            new_frames,
            timed_out,
        }
    }

    /// Poll every `period` and forward frames until the receiver is dropped
    pub async fn run(&mut self, period: Duration, frame_tx: mpsc::Sender<Frame>) {
        info!("Starting UART receive loop");

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !frame_tx.is_closed() {
            ticker.tick().await;
            self.poll();

            while let Some(frame) = self.triage.receive() {
                match frame_tx.try_send(frame) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        warn!("Frame channel full, dropping frame");
                    }
                    Err(TrySendError::Closed(_)) => break,
                }
            }
        }

        info!("UART receive loop stopped");
    }

    /// Take the oldest completed frame
    pub fn receive(&mut self) -> Option<Frame> {
        self.triage.receive()
    }

    /// Number of completed frames waiting
    pub fn available_frames(&self) -> usize {
        self.triage.available_frames()
    }

    /// Number of buffered bytes not yet part of a frame
    pub fn available_bytes(&self) -> usize {
        self.triage.available_bytes()
    }

    /// Number of times the watchdog discarded pending bytes
    pub fn timeouts(&self) -> usize {
        self.timeouts
    }

    /// Frame triage engine
    pub fn triage(&self) -> &FrameTriage<C> {
        &self.triage
    }

    /// Mutable frame triage engine
    pub fn triage_mut(&mut self) -> &mut FrameTriage<C> {
        &mut self.triage
    }

    /// Receive DMA channel
    pub fn dma(&self) -> &D {
        &self.dma
    }

    /// Mutable receive DMA channel
    pub fn dma_mut(&mut self) -> &mut D {
        &mut self.dma
    }

    /// Discard pending bytes and re-arm the DMA transfer
    pub fn restart(&mut self) {
        self.triage.discard_pending();
        // Buffer cursors and the channel start over together
        self.triage.rx_buffer_mut().reset();
        self.dma.restart();
        self.last_activity = self.triage.clock().now_ticks();
    }

    fn check_watchdog(&mut self, new_frames: usize) -> bool {
        let now = self.triage.clock().now_ticks();
        if new_frames > 0 || self.triage.available_bytes() == 0 {
            self.last_activity = now;
            return false;
        }

        let Some(timeout) = self.rx_timeout else {
            return false;
        };

        if now.saturating_sub(self.last_activity) < timeout {
            return false;
        }

        warn!(
            pending = self.triage.available_bytes(),
            timeout_ms = timeout,
            "No frame within receive timeout, restarting reception"
        );
        self.timeouts += 1;
        self.restart();
        debug!("Receive DMA re-armed");
        true
    }
}
