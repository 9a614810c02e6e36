//! In-process discovery host
//! Keeps registrations in memory and delivers events on the caller's thread.
//! Backs the test suite and the `--emulate` mode of the binary.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use log::info;

use crate::core::bluetooth::device::DiscoveredDevice;
use crate::core::bluetooth::host::{
    DeviceEvent, DiscoveryAdapter, DiscoveryHost, EventFilter, EventReceiver, ReceiverRegistry,
};
use crate::error::{ScanError, ScanResult};

/// Adapter whose discovery replays a fixed list of devices
pub struct MemoryAdapter {
    receivers: ReceiverRegistry,
    script: Vec<DiscoveredDevice>,
    discovering: AtomicBool,
    starts: AtomicUsize,
    start_fault: Mutex<Option<ScanError>>,
}

impl MemoryAdapter {
    fn new(receivers: ReceiverRegistry, script: Vec<DiscoveredDevice>) -> Self {
        Self {
            receivers,
            script,
            discovering: AtomicBool::new(false),
            starts: AtomicUsize::new(0),
            start_fault: Mutex::new(None),
        }
    }

    pub fn is_discovering(&self) -> bool {
        self.discovering.load(Ordering::SeqCst)
    }

    /// Number of accepted `start_discovery` calls
    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    /// Makes the next `start_discovery` fail with `error`.
    pub fn fail_next_start(&self, error: ScanError) {
        *self.start_fault.lock().unwrap_or_else(PoisonError::into_inner) = Some(error);
    }
}

impl DiscoveryAdapter for MemoryAdapter {
    fn start_discovery(&self) -> ScanResult<()> {
        if let Some(error) = self
            .start_fault
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            return Err(error);
        }

        self.discovering.store(true, Ordering::SeqCst);
        self.starts.fetch_add(1, Ordering::SeqCst);
        info!("Emulated discovery started, replaying {} device(s)", self.script.len());

        for device in &self.script {
            if !self.is_discovering() {
                break;
            }
            self.receivers.dispatch(&DeviceEvent::DeviceFound(device.clone()));
        }
        Ok(())
    }

    fn cancel_discovery(&self) -> ScanResult<()> {
        self.discovering.store(false, Ordering::SeqCst);
        Ok(())
    }
}

struct MemoryHostInner {
    receivers: ReceiverRegistry,
    adapter: Option<Arc<MemoryAdapter>>,
    unregister_fault: Mutex<Option<ScanError>>,
}

/// Discovery host living entirely in memory. Clones share state.
#[derive(Clone)]
pub struct MemoryHost {
    inner: Arc<MemoryHostInner>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    /// A host with an idle adapter
    pub fn new() -> Self {
        Self::with_script(Vec::new())
    }

    /// A host whose adapter reports `script` each time discovery starts
    pub fn with_script(script: Vec<DiscoveredDevice>) -> Self {
        let receivers = ReceiverRegistry::new();
        let adapter = Arc::new(MemoryAdapter::new(receivers.clone(), script));
        Self::build(receivers, Some(adapter))
    }

    /// A host without any radio adapter
    pub fn without_adapter() -> Self {
        Self::build(ReceiverRegistry::new(), None)
    }

    fn build(receivers: ReceiverRegistry, adapter: Option<Arc<MemoryAdapter>>) -> Self {
        Self {
            inner: Arc::new(MemoryHostInner {
                receivers,
                adapter,
                unregister_fault: Mutex::new(None),
            }),
        }
    }

    /// Delivers a found-device event to the registered receivers.
    pub fn broadcast(&self, device: DiscoveredDevice) -> usize {
        self.inner.receivers.dispatch(&DeviceEvent::DeviceFound(device))
    }

    pub fn receiver_count(&self) -> usize {
        self.inner.receivers.len()
    }

    pub fn memory_adapter(&self) -> Option<Arc<MemoryAdapter>> {
        self.inner.adapter.clone()
    }

    /// Makes the next `unregister_receiver` fail with `error`.
    pub fn fail_next_unregister(&self, error: ScanError) {
        *self
            .inner
            .unregister_fault
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(error);
    }
}

impl DiscoveryHost for MemoryHost {
    fn default_adapter(&self) -> Option<Arc<dyn DiscoveryAdapter>> {
        self.inner
            .adapter
            .clone()
            .map(|adapter| adapter as Arc<dyn DiscoveryAdapter>)
    }

    fn register_receiver(
        &self,
        receiver: Arc<dyn EventReceiver>,
        filter: EventFilter,
    ) -> ScanResult<()> {
        self.inner.receivers.register(receiver, filter);
        Ok(())
    }

    fn unregister_receiver(&self, receiver: &Arc<dyn EventReceiver>) -> ScanResult<()> {
        if let Some(error) = self
            .inner
            .unregister_fault
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            return Err(error);
        }
        self.inner.receivers.unregister(receiver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bluetooth::host::EventKind;

    struct Noop;

    impl EventReceiver for Noop {
        fn on_receive(&self, _event: &DeviceEvent) {}
    }

    #[test]
    fn scripted_adapter_replays_devices_on_start() {
        let host = MemoryHost::with_script(vec![
            DiscoveredDevice::named("A", "00:00:00:00:00:01"),
            DiscoveredDevice::named("B", "00:00:00:00:00:02"),
        ]);
        let seen = Arc::new(Mutex::new(Vec::new()));

        struct Recorder(Arc<Mutex<Vec<DeviceEvent>>>);
        impl EventReceiver for Recorder {
            fn on_receive(&self, event: &DeviceEvent) {
                self.0.lock().unwrap().push(event.clone());
            }
        }

        host.register_receiver(
            Arc::new(Recorder(seen.clone())),
            EventFilter::new().with(EventKind::DeviceFound),
        )
        .unwrap();
        host.default_adapter().unwrap().start_discovery().unwrap();

        assert_eq!(seen.lock().unwrap().len(), 2);
        assert_eq!(host.memory_adapter().unwrap().start_count(), 1);
    }

    #[test]
    fn clones_share_registrations() {
        let host = MemoryHost::new();
        let other = host.clone();
        let receiver: Arc<dyn EventReceiver> = Arc::new(Noop);

        host.register_receiver(receiver.clone(), EventFilter::new())
            .unwrap();

        assert_eq!(other.receiver_count(), 1);
        other.unregister_receiver(&receiver).unwrap();
        assert_eq!(host.receiver_count(), 0);
    }

    #[test]
    fn host_without_adapter_has_none() {
        assert!(MemoryHost::without_adapter().default_adapter().is_none());
    }
}
