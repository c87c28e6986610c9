//! UART Receive Driver
//!
//! Couples a circular DMA receive channel to the frame triage engine. Each
//! poll reconciles the channel's transfer-remaining counter into the receive
//! buffer and then scans for complete frames.

mod dma;
mod driver;
mod error;
mod settings;

pub use dma::{LoopbackDma, RxDma};
pub use driver::{PollReport, UartRx};
pub use error::DriverError;
pub use frame_triage::{Frame, FramingMode, TriageConfig};
pub use settings::RxSettings;

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Initialize logging
pub fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}
