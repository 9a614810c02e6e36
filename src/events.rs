//! Module events
//! Found devices leave the crate as named JSON events, one per device.

use std::sync::Arc;

use log::error;
use serde::Serialize;
use serde_json::{Value, json};

use crate::core::bluetooth::{NEW_SCANNED_DEVICE_EVENT, ScanListener};

/// Destination for events raised by the module
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &str, payload: Value);
}

/// Payload of the `newScannedDevice` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScannedDevicePayload {
    pub name: String,
    pub address: String,
}

/// Listener that turns every forwarded device into a `newScannedDevice` event
pub struct ScannedDeviceEmitter {
    sink: Arc<dyn EventSink>,
}

impl ScannedDeviceEmitter {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }
}

impl ScanListener for ScannedDeviceEmitter {
    fn on_device_found(&self, name: &str, address: &str) {
        let payload = ScannedDevicePayload {
            name: name.to_string(),
            address: address.to_string(),
        };
        match serde_json::to_value(&payload) {
            Ok(value) => self.sink.emit(NEW_SCANNED_DEVICE_EVENT, value),
            Err(e) => error!("Failed to serialize {} payload: {}", NEW_SCANNED_DEVICE_EVENT, e),
        }
    }
}

/// Writes each event to stdout as a single JSON line
pub struct StdoutSink;

impl EventSink for StdoutSink {
    fn emit(&self, event: &str, payload: Value) {
        println!("{}", json!({ "event": event, "payload": payload }));
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub(crate) events: Mutex<Vec<(String, Value)>>,
    }

    impl EventSink for RecordingSink {
        fn emit(&self, event: &str, payload: Value) {
            self.events.lock().unwrap().push((event.to_string(), payload));
        }
    }

    #[test]
    fn emits_name_and_address_payload() {
        let sink = Arc::new(RecordingSink::default());
        let emitter = ScannedDeviceEmitter::new(sink.clone());

        emitter.on_device_found("Pixel 7", "AA:BB:CC:DD:EE:FF");

        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, "newScannedDevice");
        assert_eq!(
            events[0].1,
            json!({ "name": "Pixel 7", "address": "AA:BB:CC:DD:EE:FF" })
        );
    }
}
