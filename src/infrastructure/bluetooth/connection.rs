//! BLE Connection Module
//!
//! Handles device connection and GATT characteristic access.

use crate::domain::errors::TransportError;
use crate::infrastructure::bluetooth::protocol::{has_bot_service, SERVICE_UUID};
use crate::infrastructure::bluetooth::transport::{GattLink, NotifyHandler};
use async_trait::async_trait;
use btleplug::api::{
    Central, CentralEvent, CharPropFlags, Characteristic, Peripheral as _, WriteType,
};
use btleplug::platform::{Adapter, Peripheral};
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

/// BLE Connection handler
pub struct BleConnection {
    adapter: Adapter,
}

impl BleConnection {
    /// Create a new connection handler
    pub fn new(adapter: Adapter) -> Self {
        Self { adapter }
    }

    /// Connect to a scanned peripheral and discover its services
    pub async fn connect(&self, peripheral: &Peripheral) -> Result<BtleLink, TransportError> {
        let id = peripheral.id();
        info!("Connecting to Bluetooth device: {:?}", id);

        // Step 1: Watch for disconnects before connecting so none is missed
        let mut events = self.adapter.events().await?;

        // Step 2: Connect to BLE device
        peripheral.connect().await?;

        // Step 3: Get GATT services and characteristics
        peripheral.discover_services().await?;
        if !has_bot_service(peripheral.services().iter().map(|s| s.uuid)) {
            warn!("Device {:?} has no SwitchBot service, disconnecting", id);
            if let Err(e) = peripheral.disconnect().await {
                warn!("Disconnect failed: {}", e);
            }
            return Err(TransportError::ServiceNotFound(SERVICE_UUID));
        }
        info!(
            "Device connected, {} characteristics",
            peripheral.characteristics().len()
        );

        let connected = Arc::new(AtomicBool::new(true));
        let flag = connected.clone();
        let watcher = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let CentralEvent::DeviceDisconnected(gone) = event {
                    if gone == id {
                        warn!("Device {:?} disconnected", gone);
                        flag.store(false, Ordering::Release);
                        break;
                    }
                }
            }
        });

        Ok(BtleLink {
            peripheral: peripheral.clone(),
            connected,
            tasks: Mutex::new(vec![watcher]),
        })
    }
}

/// Live GATT connection backed by btleplug
pub struct BtleLink {
    peripheral: Peripheral,
    connected: Arc<AtomicBool>,
    /// Disconnect watcher and notification pumps, aborted on disconnect
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl BtleLink {
    fn find_characteristic(&self, uuid: Uuid) -> Result<Characteristic, TransportError> {
        self.peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == uuid)
            .ok_or(TransportError::CharacteristicNotFound(uuid))
    }

    fn abort_tasks(&self) {
        if let Ok(mut tasks) = self.tasks.lock() {
            for task in tasks.drain(..) {
                task.abort();
            }
        }
    }
}

#[async_trait]
impl GattLink for BtleLink {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        info!("Disconnecting from device...");
        self.abort_tasks();
        self.connected.store(false, Ordering::Release);
        self.peripheral.disconnect().await?;
        Ok(())
    }

    async fn write_characteristic(&self, uuid: Uuid, bytes: &[u8]) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        let characteristic = self.find_characteristic(uuid)?;
        let write_type = if characteristic.properties.contains(CharPropFlags::WRITE) {
            WriteType::WithResponse
        } else {
            WriteType::WithoutResponse
        };
        self.peripheral
            .write(&characteristic, bytes, write_type)
            .await?;
        Ok(())
    }

    async fn subscribe(&self, uuid: Uuid, on_notify: NotifyHandler) -> Result<(), TransportError> {
        let characteristic = self.find_characteristic(uuid)?;
        self.peripheral.subscribe(&characteristic).await?;

        let mut stream = self.peripheral.notifications().await?;
        let pump = tokio::spawn(async move {
            while let Some(notification) = stream.next().await {
                if notification.uuid == uuid {
                    on_notify(&notification.value[..]);
                }
            }
        });

        self.tasks
            .lock()
            .map_err(|_| TransportError::Other("Link task list poisoned".to_string()))?
            .push(pump);
        info!("Notifications enabled on {}", uuid);
        Ok(())
    }
}

impl Drop for BtleLink {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}
