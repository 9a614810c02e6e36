//! Application state management
//! Holds the host, the event sink and the lazily created scanner.

use std::sync::Arc;

use log::info;
use tokio::sync::Mutex;

use crate::core::bluetooth::{DiscoveryHost, ScanController};
use crate::events::{EventSink, ScannedDeviceEmitter};

/// Global application state
pub struct AppState {
    host: Arc<dyn DiscoveryHost>,
    sink: Arc<dyn EventSink>,
    /// Created on first use, then shared by every scan and stop call
    scanner: Mutex<Option<Arc<ScanController>>>,
}

impl AppState {
    pub fn new(host: Arc<dyn DiscoveryHost>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            host,
            sink,
            scanner: Mutex::new(None),
        }
    }

    /// Returns the scanner, creating it on the first call.
    pub async fn scanner(&self) -> Arc<ScanController> {
        let mut guard = self.scanner.lock().await;
        if let Some(scanner) = guard.as_ref() {
            return scanner.clone();
        }

        info!("Initializing ScanController...");
        let listener = Arc::new(ScannedDeviceEmitter::new(self.sink.clone()));
        let scanner = Arc::new(ScanController::new(self.host.clone(), listener));
        *guard = Some(scanner.clone());
        scanner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bluetooth::MemoryHost;
    use crate::events::tests::RecordingSink;

    #[tokio::test]
    async fn scanner_is_created_once() {
        let state = AppState::new(
            Arc::new(MemoryHost::new()),
            Arc::new(RecordingSink::default()),
        );

        let first = state.scanner().await;
        let second = state.scanner().await;

        assert!(Arc::ptr_eq(&first, &second));
    }
}
