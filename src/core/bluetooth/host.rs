//! Host capabilities the scanner runs on
//! A host owns receiver registration and hands out the discovery adapter.
//! `BluestHost` drives real hardware, `MemoryHost` runs in-process.

use std::sync::{Arc, Mutex, PoisonError};

use log::trace;

use crate::core::bluetooth::device::DiscoveredDevice;
use crate::error::{ScanError, ScanResult};

/// Category of a host event, used to filter receivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    DeviceFound,
}

/// Event delivered by a host to its registered receivers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    DeviceFound(DiscoveredDevice),
}

impl DeviceEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::DeviceFound(_) => EventKind::DeviceFound,
        }
    }
}

/// The set of event kinds a receiver wants to hear about
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    kinds: Vec<EventKind>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: EventKind) -> Self {
        if !self.kinds.contains(&kind) {
            self.kinds.push(kind);
        }
        self
    }

    pub fn matches(&self, kind: EventKind) -> bool {
        self.kinds.contains(&kind)
    }
}

/// Callback registered with a host. Hosts may call it from any thread.
pub trait EventReceiver: Send + Sync {
    fn on_receive(&self, event: &DeviceEvent);
}

/// Handle to the local radio adapter.
///
/// `start_discovery` is fire-and-forget: it returns once the host has accepted
/// the request, not when discovery has actually started. `cancel_discovery`
/// returns once the adapter's own discovery work has ended.
pub trait DiscoveryAdapter: Send + Sync {
    fn start_discovery(&self) -> ScanResult<()>;
    fn cancel_discovery(&self) -> ScanResult<()>;
}

/// Registration context and adapter lookup provided by the platform
pub trait DiscoveryHost: Send + Sync {
    /// The system default adapter, if the host has one
    fn default_adapter(&self) -> Option<Arc<dyn DiscoveryAdapter>>;

    /// Registers `receiver` for the kinds in `filter`. Registering a receiver
    /// that is already registered replaces its filter.
    fn register_receiver(
        &self,
        receiver: Arc<dyn EventReceiver>,
        filter: EventFilter,
    ) -> ScanResult<()>;

    /// Fails with [`ScanError::ReceiverNotRegistered`] if `receiver` is unknown.
    fn unregister_receiver(&self, receiver: &Arc<dyn EventReceiver>) -> ScanResult<()>;
}

struct Registration {
    receiver: Arc<dyn EventReceiver>,
    filter: EventFilter,
}

fn same_receiver(a: &Arc<dyn EventReceiver>, b: &Arc<dyn EventReceiver>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Receiver bookkeeping shared by the hosts and their discovery tasks
#[derive(Clone, Default)]
pub struct ReceiverRegistry {
    registrations: Arc<Mutex<Vec<Registration>>>,
}

impl ReceiverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, receiver: Arc<dyn EventReceiver>, filter: EventFilter) {
        let mut registrations = self.lock();
        match registrations
            .iter_mut()
            .find(|r| same_receiver(&r.receiver, &receiver))
        {
            Some(existing) => existing.filter = filter,
            None => registrations.push(Registration { receiver, filter }),
        }
    }

    pub fn unregister(&self, receiver: &Arc<dyn EventReceiver>) -> ScanResult<()> {
        let mut registrations = self.lock();
        let before = registrations.len();
        registrations.retain(|r| !same_receiver(&r.receiver, receiver));
        if registrations.len() == before {
            return Err(ScanError::ReceiverNotRegistered);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delivers `event` to every matching receiver and returns how many got it.
    /// Receivers run outside the lock so they may re-enter the host.
    pub fn dispatch(&self, event: &DeviceEvent) -> usize {
        let kind = event.kind();
        let targets: Vec<Arc<dyn EventReceiver>> = self
            .lock()
            .iter()
            .filter(|r| r.filter.matches(kind))
            .map(|r| r.receiver.clone())
            .collect();

        trace!("Dispatching {:?} to {} receiver(s)", kind, targets.len());
        for receiver in &targets {
            receiver.on_receive(event);
        }
        targets.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Registration>> {
        self.registrations.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingReceiver {
        hits: AtomicUsize,
    }

    impl EventReceiver for CountingReceiver {
        fn on_receive(&self, _event: &DeviceEvent) {
            self.hits.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn found() -> DeviceEvent {
        DeviceEvent::DeviceFound(DiscoveredDevice::named("Pixel 7", "AA:BB:CC:DD:EE:FF"))
    }

    #[test]
    fn unregistering_unknown_receiver_reports_not_registered() {
        let registry = ReceiverRegistry::new();
        let receiver: Arc<dyn EventReceiver> = Arc::new(CountingReceiver::default());
        assert_eq!(
            registry.unregister(&receiver),
            Err(ScanError::ReceiverNotRegistered)
        );
    }

    #[test]
    fn re_registering_replaces_filter() {
        let registry = ReceiverRegistry::new();
        let counting = Arc::new(CountingReceiver::default());
        let receiver: Arc<dyn EventReceiver> = counting.clone();

        registry.register(receiver.clone(), EventFilter::new());
        registry.register(receiver.clone(), EventFilter::new().with(EventKind::DeviceFound));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.dispatch(&found()), 1);
        assert_eq!(counting.hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dispatch_skips_receivers_with_non_matching_filter() {
        let registry = ReceiverRegistry::new();
        let counting = Arc::new(CountingReceiver::default());
        registry.register(counting.clone(), EventFilter::new());

        assert_eq!(registry.dispatch(&found()), 0);
        assert_eq!(counting.hits.load(Ordering::SeqCst), 0);
    }
}
