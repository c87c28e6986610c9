//! rx-replay: feeds a captured UART byte stream through the receive pipeline
//!
//! Usage: `rx-replay <capture-file> [settings.toml]`

use anyhow::Context;
use std::path::PathBuf;
use tracing::info;
use uart_rx::{init_logging, FramingMode, LoopbackDma, RxSettings, UartRx};

fn main() -> anyhow::Result<()> {
    init_logging();

    let mut args = std::env::args().skip(1);
    let capture = args
        .next()
        .map(PathBuf::from)
        .context("usage: rx-replay <capture-file> [settings.toml]")?;
    let settings_path = args.next().map(PathBuf::from);

    let settings = RxSettings::load(settings_path.as_deref())?;
    let bytes = std::fs::read(&capture)
        .with_context(|| format!("failed to read capture {}", capture.display()))?;

    info!(
        "Replaying {} bytes from {} ({:?})",
        bytes.len(),
        capture.display(),
        settings.triage.mode()
    );

    let dma = LoopbackDma::with_burst(settings.rx_buffer_size, settings.replay_burst);
    let mut rx = UartRx::new(dma, &settings)?;
    rx.dma_mut().feed(&bytes);

    let passthrough = settings.triage.mode() == FramingMode::Passthrough;
    let mut raw = vec![0u8; settings.rx_buffer_size];
    let mut frame_count = 0usize;

    loop {
        let report = rx.poll();

        while let Some(frame) = rx.receive() {
            frame_count += 1;
            println!("{:>8} {:>5}  {}", frame.timestamp(), frame.len(), hex(frame.payload()));
        }

        if passthrough {
            let n = rx.triage_mut().receive_raw(&mut raw);
            if n > 0 {
                println!("{:>8} {:>5}  {}", "raw", n, hex(&raw[..n]));
            }
        }

        if rx.dma().pending() == 0 && report.new_bytes == 0 {
            break;
        }
    }

    info!(
        frames = frame_count,
        leftover = rx.available_bytes(),
        overruns = rx.triage().rx_buffer().overrun_count(),
        dropped_frames = rx.triage().dropped_frames(),
        "Replay finished"
    );
    Ok(())
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
