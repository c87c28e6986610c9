//! Circular Buffer
//!
//! Fixed-capacity FIFO storage with wrap-around indexing. The buffer can be
//! fed by software (`push`) or by a DMA engine that writes the backing memory
//! directly and is only observed through its transfer-remaining counter
//! (`dma_counter`).

mod buffer;
mod dma;

pub use buffer::RingBuffer;

/// Default receive buffer capacity in elements
pub const DEFAULT_CAPACITY: usize = 256;
