//! Bluetooth Service Module
//!
//! Binds the scanner and connection handler to one adapter and exposes them
//! as a [`BleTransport`].

use crate::domain::errors::TransportError;
use crate::infrastructure::bluetooth::{
    connection::{BleConnection, BtleLink},
    scanner::BleScanner,
    transport::{AdvertisementStream, BleTransport},
};
use async_trait::async_trait;
use btleplug::api::{Central, Manager as _};
use btleplug::platform::{Manager, Peripheral};
use tracing::info;

/// btleplug-backed transport on the first available adapter
pub struct BluetoothService {
    scanner: BleScanner,
    connection: BleConnection,
}

impl BluetoothService {
    /// Open the platform BLE manager and pick the first adapter
    pub async fn new() -> Result<Self, TransportError> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(TransportError::NoAdapter)?;

        if let Ok(info) = adapter.adapter_info().await {
            info!("Using Bluetooth adapter: {}", info);
        }

        Ok(Self {
            scanner: BleScanner::new(adapter.clone()),
            connection: BleConnection::new(adapter),
        })
    }
}

#[async_trait]
impl BleTransport for BluetoothService {
    type Device = Peripheral;
    type Link = BtleLink;

    async fn start_scan(&self) -> Result<AdvertisementStream<Peripheral>, TransportError> {
        self.scanner.start().await
    }

    async fn stop_scan(&self) -> Result<(), TransportError> {
        self.scanner.stop().await
    }

    async fn connect(&self, device: &Peripheral) -> Result<BtleLink, TransportError> {
        self.connection.connect(device).await
    }
}
