use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Result, anyhow};
use bluest::{Adapter, AdvertisingDevice};
use futures_util::StreamExt;
use log::{debug, error, info, warn};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::task::{self, JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::config::scanner_config::ScannerConfig;
use crate::core::bluetooth::device::{DiscoveredDevice, extract_mac_address};
use crate::core::bluetooth::host::{
    DeviceEvent, DiscoveryAdapter, DiscoveryHost, EventFilter, EventReceiver, ReceiverRegistry,
};
use crate::error::ScanResult;

struct DiscoverySession {
    cancel_token: CancellationToken,
    task_handle: JoinHandle<()>,
}

impl DiscoverySession {
    /// Cancels the task and waits for it to end, so no dispatch is still
    /// running when this returns.
    fn cancel(self, runtime: &Handle) {
        self.cancel_token.cancel();
        if self.task_handle.is_finished() {
            debug!("Discovery task had already ended.");
            return;
        }

        info!("Waiting for discovery task to finish...");
        let joined = match Handle::try_current() {
            Ok(current) if current.runtime_flavor() == RuntimeFlavor::CurrentThread => {
                warn!("Cannot wait for the discovery task on a current-thread runtime.");
                return;
            }
            Ok(_) => task::block_in_place(|| runtime.block_on(self.task_handle)),
            Err(_) => runtime.block_on(self.task_handle),
        };
        match joined {
            Ok(()) => info!("Discovery task finished after cancellation."),
            Err(e) if e.is_cancelled() => info!("Discovery task was cancelled."),
            Err(e) => error!("Discovery task ended with an unexpected join error: {:?}", e),
        }
    }
}

/// Discovery adapter on top of the system adapter exposed by bluest
pub struct BluestAdapter {
    adapter: Adapter,
    receivers: ReceiverRegistry,
    runtime: Handle,
    session: Mutex<Option<DiscoverySession>>,
}

impl BluestAdapter {
    fn new(adapter: Adapter, receivers: ReceiverRegistry, runtime: Handle) -> Self {
        Self {
            adapter,
            receivers,
            runtime,
            session: Mutex::new(None),
        }
    }

    /// Streams advertisements into the receivers until cancelled
    async fn discovery_task(
        adapter: Adapter,
        receivers: ReceiverRegistry,
        cancel_token: CancellationToken,
    ) {
        info!("Starting bluetooth discovery");
        let mut scan_stream = match adapter.scan(&[]).await {
            Ok(stream) => stream,
            Err(e) => {
                error!("Failed to start bluetooth discovery: {}", e);
                return;
            }
        };

        loop {
            tokio::select! {
                result = scan_stream.next() => {
                    match result {
                        Some(advertising_device) => {
                            let device = Self::to_discovered_device(&advertising_device);
                            debug!("Advertisement - Device: {:?}, RSSI: {:?}", device, advertising_device.rssi);
                            receivers.dispatch(&DeviceEvent::DeviceFound(device));
                        }
                        None => {
                            info!("Bluetooth scan stream has ended.");
                            break;
                        }
                    }
                }
                _ = cancel_token.cancelled() => {
                    info!("Bluetooth discovery cancelled.");
                    break;
                }
            }
        }
    }

    fn to_discovered_device(advertising_device: &AdvertisingDevice) -> DiscoveredDevice {
        let device = &advertising_device.device;
        let id = device.id().to_string();
        DiscoveredDevice::new(
            device.name().ok(),
            advertising_device.adv_data.local_name.clone(),
            extract_mac_address(&id),
        )
    }

    fn take_session(&self) -> Option<DiscoverySession> {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl DiscoveryAdapter for BluestAdapter {
    fn start_discovery(&self) -> ScanResult<()> {
        if let Some(previous) = self.take_session() {
            info!("Discovery already running, restarting it.");
            previous.cancel(&self.runtime);
        }

        let cancel_token = CancellationToken::new();
        let task_handle = self.runtime.spawn(Self::discovery_task(
            self.adapter.clone(),
            self.receivers.clone(),
            cancel_token.clone(),
        ));

        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = Some(DiscoverySession {
            cancel_token,
            task_handle,
        });
        Ok(())
    }

    fn cancel_discovery(&self) -> ScanResult<()> {
        match self.take_session() {
            Some(session) => session.cancel(&self.runtime),
            None => debug!("No active discovery to cancel."),
        }
        Ok(())
    }
}

/// Host backed by the platform Bluetooth stack
pub struct BluestHost {
    receivers: ReceiverRegistry,
    adapter: Option<Arc<BluestAdapter>>,
}

impl BluestHost {
    /// Looks up the default adapter and waits for it to become available.
    ///
    /// A machine without an adapter still yields a host; scanning on it fails.
    pub async fn new(config: &ScannerConfig) -> Result<Self> {
        let receivers = ReceiverRegistry::new();
        let adapter = match Adapter::default().await {
            Some(adapter) => {
                tokio::time::timeout(
                    Duration::from_secs(config.adapter_wait_timeout_secs),
                    adapter.wait_available(),
                )
                .await
                .map_err(|_| anyhow!("Timed out waiting for the Bluetooth adapter"))??;
                info!("Bluetooth adapter is available.");
                Some(Arc::new(BluestAdapter::new(
                    adapter,
                    receivers.clone(),
                    Handle::current(),
                )))
            }
            None => {
                warn!("No Bluetooth adapter found");
                None
            }
        };

        Ok(Self { receivers, adapter })
    }
}

impl DiscoveryHost for BluestHost {
    fn default_adapter(&self) -> Option<Arc<dyn DiscoveryAdapter>> {
        self.adapter
            .clone()
            .map(|adapter| adapter as Arc<dyn DiscoveryAdapter>)
    }

    fn register_receiver(
        &self,
        receiver: Arc<dyn EventReceiver>,
        filter: EventFilter,
    ) -> ScanResult<()> {
        self.receivers.register(receiver, filter);
        Ok(())
    }

    fn unregister_receiver(&self, receiver: &Arc<dyn EventReceiver>) -> ScanResult<()> {
        self.receivers.unregister(receiver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn spawn_session(runtime: &Handle, finished: Arc<AtomicBool>) -> DiscoverySession {
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();
        let task_handle = runtime.spawn(async move {
            token.cancelled().await;
            // still dispatching when the cancel arrives
            tokio::time::sleep(Duration::from_millis(50)).await;
            finished.store(true, Ordering::SeqCst);
        });
        DiscoverySession {
            cancel_token,
            task_handle,
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancel_waits_for_task_inside_runtime() {
        let finished = Arc::new(AtomicBool::new(false));
        let runtime = Handle::current();
        let session = spawn_session(&runtime, finished.clone());

        session.cancel(&runtime);

        assert!(finished.load(Ordering::SeqCst));
    }

    #[test]
    fn cancel_waits_for_task_outside_runtime() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let finished = Arc::new(AtomicBool::new(false));
        let session = spawn_session(runtime.handle(), finished.clone());

        session.cancel(runtime.handle());

        assert!(finished.load(Ordering::SeqCst));
    }
}
