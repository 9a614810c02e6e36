//! Classic Discovery Bridge library
//! Runs Bluetooth discovery and reports every named device it finds.

// Module declarations
pub mod commands;
pub mod config;
pub mod core;
pub mod error;
pub mod events;
pub mod state;
mod utils;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use log::{LevelFilter, info};

use crate::config::AppConfig;
use crate::core::bluetooth::{
    BluestHost, DEFAULT_CONFIG_FILE, DiscoveredDevice, DiscoveryHost, MemoryHost,
};
use crate::events::StdoutSink;
use crate::state::AppState;

pub use crate::error::{ScanError, ScanResult};

// Initialize logging; RUST_LOG overrides the configured level
fn setup_logging(level: LevelFilter) {
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
    info!("Logging initialized");
}

/// Devices replayed by `--emulate`, including the partial ones that get dropped
fn emulated_devices() -> Vec<DiscoveredDevice> {
    vec![
        DiscoveredDevice::named("Movesense 175130000124", "0C:8C:DC:3F:A1:02"),
        DiscoveredDevice::new(None, None, Some("11:22:33:44:55:66".to_string())),
        DiscoveredDevice::new(Some("Device X".to_string()), None, None),
        DiscoveredDevice::new(
            Some("Pixel 7".to_string()),
            Some("Phone".to_string()),
            Some("AA:BB:CC:DD:EE:FF".to_string()),
        ),
    ]
}

/// Entry point of the binary: `[config.json] [--emulate]`.
pub async fn run(args: Vec<String>) -> Result<()> {
    let emulate = args.iter().any(|arg| arg == "--emulate");
    let config_path = args
        .iter()
        .find(|arg| !arg.starts_with("--"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let config = AppConfig::load_config(&config_path).await?;
    setup_logging(config.scanner.level_filter());

    let host: Arc<dyn DiscoveryHost> = if emulate {
        info!("Using emulated discovery host.");
        Arc::new(MemoryHost::with_script(emulated_devices()))
    } else {
        Arc::new(BluestHost::new(&config.scanner).await?)
    };
    let app_state = AppState::new(host, Arc::new(StdoutSink));

    commands::scan(&app_state).await.map_err(anyhow::Error::msg)?;

    tokio::select! {
        _ = tokio::time::sleep(config.scanner.scan_duration()) => {
            info!("Scan window of {}s elapsed.", config.scanner.scan_duration_secs);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, stopping scan.");
        }
    }

    commands::stop_scan(&app_state).await.map_err(anyhow::Error::msg)?;
    Ok(())
}
