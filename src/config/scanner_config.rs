use std::time::Duration;

use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::core::bluetooth::{DEFAULT_ADAPTER_WAIT_TIMEOUT_SECS, DEFAULT_SCAN_DURATION_SECS};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// How long the binary keeps discovery running before stopping it.
    pub scan_duration_secs: u64,

    /// Upper bound on waiting for the adapter to power up.
    pub adapter_wait_timeout_secs: u64,

    /// Log filter (`error`, `warn`, `info`, `debug`, `trace`). `RUST_LOG` wins.
    pub log_level: String,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        ScannerConfig {
            scan_duration_secs: DEFAULT_SCAN_DURATION_SECS,
            adapter_wait_timeout_secs: DEFAULT_ADAPTER_WAIT_TIMEOUT_SECS,
            log_level: "info".to_string(),
        }
    }
}

impl ScannerConfig {
    pub fn scan_duration(&self) -> Duration {
        Duration::from_secs(self.scan_duration_secs)
    }

    /// Unknown level names fall back to `Info`.
    pub fn level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Info)
    }
}
