use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, info, trace, warn};

use crate::core::bluetooth::device::DiscoveredDevice;
use crate::core::bluetooth::host::{
    DeviceEvent, DiscoveryAdapter, DiscoveryHost, EventFilter, EventKind, EventReceiver,
};
use crate::error::{ScanError, ScanResult};

/// Receives the devices forwarded by a [`ScanController`].
/// Called from whichever thread the host delivers events on.
pub trait ScanListener: Send + Sync {
    fn on_device_found(&self, name: &str, address: &str);
}

impl<F> ScanListener for F
where
    F: Fn(&str, &str) + Send + Sync,
{
    fn on_device_found(&self, name: &str, address: &str) {
        self(name, address)
    }
}

/// Receiver registered with the host while a scan is running.
///
/// Deliveries hold the gate's read lock for the whole listener call, and
/// closing the gate takes the write lock. Once [`DeviceFoundReceiver::close`]
/// returns, no callback is running and none will start until the gate is
/// opened again. A listener must therefore not stop its own scan from inside
/// `on_device_found`.
pub struct DeviceFoundReceiver {
    listener: Arc<dyn ScanListener>,
    open: RwLock<bool>,
}

impl DeviceFoundReceiver {
    pub fn new(listener: Arc<dyn ScanListener>) -> Self {
        Self {
            listener,
            open: RwLock::new(false),
        }
    }

    pub fn is_open(&self) -> bool {
        *self.open.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn open(&self) {
        *self.open.write().unwrap_or_else(PoisonError::into_inner) = true;
    }

    /// Waits for in-flight deliveries, then rejects new ones.
    fn close(&self) {
        *self.open.write().unwrap_or_else(PoisonError::into_inner) = false;
    }

    /// Forwards the device only when both its name and address are known.
    fn handle_device_found(&self, device: &DiscoveredDevice) {
        let open = self.open.read().unwrap_or_else(PoisonError::into_inner);
        if !*open {
            trace!("Scan stopped, dropping device event: {:?}", device);
            return;
        }
        match (device.name.as_deref(), device.address.as_deref()) {
            (Some(name), Some(address)) => {
                debug!(
                    "Found device - Name: {}, Address: {}, Alias: {:?}",
                    name, address, device.alias
                );
                self.listener.on_device_found(name, address);
            }
            _ => trace!("Dropping partial device event: {:?}", device),
        }
    }
}

impl EventReceiver for DeviceFoundReceiver {
    fn on_receive(&self, event: &DeviceEvent) {
        match event {
            DeviceEvent::DeviceFound(device) => self.handle_device_found(device),
        }
    }
}

/// Runs discovery on a host and forwards found devices to one listener.
///
/// The receiver is created once and reused by every scan/stop cycle. Neither
/// operation guards against being called twice in a row.
pub struct ScanController {
    host: Arc<dyn DiscoveryHost>,
    adapter: Option<Arc<dyn DiscoveryAdapter>>,
    receiver: Arc<DeviceFoundReceiver>,
    /// The same receiver as handed to the host
    registration: Arc<dyn EventReceiver>,
}

impl ScanController {
    pub fn new(host: Arc<dyn DiscoveryHost>, listener: Arc<dyn ScanListener>) -> Self {
        let adapter = host.default_adapter();
        if adapter.is_none() {
            warn!("No Bluetooth adapter available; scans will fail");
        }
        let receiver = Arc::new(DeviceFoundReceiver::new(listener));
        Self {
            host,
            adapter,
            registration: receiver.clone(),
            receiver,
        }
    }

    /// Registers the receiver, then starts discovery.
    ///
    /// If discovery cannot be started the error is returned. A registration
    /// made by this call is rolled back; one left by an earlier successful
    /// scan stays, since that discovery may still be running.
    pub fn scan(&self) -> ScanResult<()> {
        let already_scanning = self.receiver.is_open();
        let filter = EventFilter::new().with(EventKind::DeviceFound);
        self.host.register_receiver(self.registration.clone(), filter)?;
        self.receiver.open();

        info!("Starting device discovery.");
        let started = match &self.adapter {
            Some(adapter) => adapter.start_discovery(),
            None => Err(ScanError::AdapterUnavailable),
        };
        if let Err(e) = started {
            if !already_scanning {
                self.receiver.close();
                if let Err(unregister_err) = self.host.unregister_receiver(&self.registration) {
                    debug!("Rollback after failed start: {}", unregister_err);
                }
            }
            return Err(e);
        }
        Ok(())
    }

    /// Cancels discovery, then unregisters the receiver.
    ///
    /// The listener is not called again once this returns. A receiver that
    /// is not registered is not an error; any other failure from the host is.
    pub fn stop_scan(&self) -> ScanResult<()> {
        match &self.adapter {
            Some(adapter) => adapter.cancel_discovery()?,
            None => debug!("No adapter, nothing to cancel"),
        }
        self.receiver.close();

        match self.host.unregister_receiver(&self.registration) {
            Ok(()) => {}
            Err(ScanError::ReceiverNotRegistered) => {
                debug!("Receiver was not registered; ignoring");
            }
            Err(e) => return Err(e),
        }

        info!("Device discovery stopped.");
        Ok(())
    }
}
