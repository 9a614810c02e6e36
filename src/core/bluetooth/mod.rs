//! Bluetooth discovery for the Classic Discovery Bridge
//! This module handles starting and stopping discovery on a host and
//! forwarding the devices it finds to a listener.

mod bluest_host;
mod constants;
mod device;
mod host;
mod memory_host;
mod scanner;

// Re-export types that should be publicly accessible
pub use bluest_host::{BluestAdapter, BluestHost};
pub use constants::*; // Re-export all constants
pub use device::{DiscoveredDevice, extract_mac_address};
pub use host::{
    DeviceEvent, DiscoveryAdapter, DiscoveryHost, EventFilter, EventKind, EventReceiver,
    ReceiverRegistry,
};
pub use memory_host::{MemoryAdapter, MemoryHost};
pub use scanner::{DeviceFoundReceiver, ScanController, ScanListener};
