//! Constants used throughout the application
//! Event names, timeouts and patterns shared by the scanner and its hosts.

/// Event emitted to the module's consumers for every forwarded device
pub const NEW_SCANNED_DEVICE_EVENT: &str = "newScannedDevice";

/// Matches a colon or dash separated MAC address inside a platform device id
pub const MAC_ADDRESS_PATTERN: &str = r"([0-9A-Fa-f]{2}[:-]){5}([0-9A-Fa-f]{2})";

/// Length of a classic inquiry window in seconds (10.24s rounded up)
pub const DEFAULT_SCAN_DURATION_SECS: u64 = 12;

/// Time allowed for the adapter to report itself available
pub const DEFAULT_ADAPTER_WAIT_TIMEOUT_SECS: u64 = 10;

/// Config file looked up when none is given on the command line
pub const DEFAULT_CONFIG_FILE: &str = "scanner_config.json";
