//! Module commands
//! The operations the module exposes to its callers.

use crate::state::AppState;

/// Starts discovery.
///
/// # Arguments
/// * `app_state` - The application state
///
/// # Returns
/// Nothing, but emits a "newScannedDevice" event with `{ name, address }`
/// for every device found until `stop_scan` is called.
pub async fn scan(app_state: &AppState) -> Result<(), String> {
    let scanner = app_state.scanner().await;
    scanner.scan().map_err(|e| e.to_string())
}

/// Stops discovery. Calling it when no scan is running is not an error.
pub async fn stop_scan(app_state: &AppState) -> Result<(), String> {
    let scanner = app_state.scanner().await;
    scanner.stop_scan().map_err(|e| e.to_string())
}
