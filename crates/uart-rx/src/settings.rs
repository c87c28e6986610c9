//! Receive driver settings

use crate::error::DriverError;
use config::{Config, Environment, File};
use frame_triage::TriageConfig;
use ring_buffer::DEFAULT_CAPACITY;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Receive driver settings, loadable from a TOML file and `UART_RX__*` variables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RxSettings {
    /// Receive buffer size, equal to the DMA transfer length
    pub rx_buffer_size: usize,
    /// Poll period of the run loop (ms)
    pub poll_interval_ms: u64,
    /// Reset reception when bytes sit this long without completing a frame (ms)
    pub rx_timeout_ms: Option<u64>,
    /// Bytes moved per poll when replaying a capture
    pub replay_burst: usize,
    /// Framing configuration
    pub triage: TriageConfig,
}

impl Default for RxSettings {
    fn default() -> Self {
        Self {
            rx_buffer_size: DEFAULT_CAPACITY,
            poll_interval_ms: 10,
            rx_timeout_ms: None,
            replay_burst: 32,
            triage: TriageConfig::default(),
        }
    }
}

impl RxSettings {
    /// Load settings from an optional file, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, DriverError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let settings: RxSettings = builder
            .add_source(
                Environment::with_prefix("UART_RX")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.triage.validate(settings.rx_buffer_size)?;
        if settings.replay_burst == 0 || settings.replay_burst >= settings.rx_buffer_size {
            return Err(DriverError::InvalidReplayBurst {
                burst: settings.replay_burst,
                buffer: settings.rx_buffer_size,
            });
        }
        Ok(settings)
    }

    /// Poll period of the run loop
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Receive watchdog deadline, if enabled
    pub fn rx_timeout(&self) -> Option<Duration> {
        self.rx_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frame_triage::FramingMode;
    use std::path::PathBuf;

    fn write_settings(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("{}-{}.toml", name, std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_defaults_without_file() {
        let settings = RxSettings::load(None).unwrap();
        assert_eq!(settings.rx_buffer_size, DEFAULT_CAPACITY);
        assert_eq!(settings.triage.mode(), FramingMode::Passthrough);
        assert_eq!(settings.rx_timeout(), None);
    }

    #[test]
    fn test_load_from_toml() {
        let path = write_settings(
            "uart-rx-settings",
            r#"
rx_buffer_size = 128
rx_timeout_ms = 250

[triage]
end_of_frame = [13, 10]
frame_queue_depth = 8
"#,
        );

        let settings = RxSettings::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(settings.rx_buffer_size, 128);
        assert_eq!(settings.poll_interval(), Duration::from_millis(10));
        assert_eq!(settings.rx_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(settings.triage.end_of_frame.as_deref(), Some(&b"\r\n"[..]));
        assert_eq!(settings.triage.frame_queue_depth, 8);
        assert_eq!(settings.triage.mode(), FramingMode::EndOfFrame);
    }

    #[test]
    fn test_invalid_triage_rejected() {
        let path = write_settings(
            "uart-rx-bad-settings",
            r#"
rx_buffer_size = 16

[triage]
expected_len = 32
"#,
        );

        let result = RxSettings::load(Some(&path));
        std::fs::remove_file(&path).ok();

        assert!(matches!(result, Err(DriverError::Triage(_))));
    }

    #[test]
    fn test_replay_burst_must_not_lap() {
        let path = write_settings(
            "uart-rx-burst-settings",
            r#"
rx_buffer_size = 16
replay_burst = 16
"#,
        );

        let result = RxSettings::load(Some(&path));
        std::fs::remove_file(&path).ok();

        assert!(matches!(
            result,
            Err(DriverError::InvalidReplayBurst { burst: 16, buffer: 16 })
        ));
    }
}
