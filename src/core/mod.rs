//! Core functionality for the Classic Discovery Bridge

pub mod bluetooth;

// Re-export commonly used types
pub use bluetooth::{DiscoveredDevice, ScanController, ScanListener};
