//! BLE Scanner Module
//!
//! Handles Bluetooth LE device discovery for SwitchBot Bots.

use crate::domain::errors::TransportError;
use crate::domain::models::ScannedDevice;
use crate::infrastructure::bluetooth::transport::AdvertisementStream;
use btleplug::api::{Central, CentralEvent, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Peripheral};
use futures::StreamExt;
use tracing::{debug, info};

/// BLE Scanner producing a stream of advertisements
pub struct BleScanner {
    adapter: Adapter,
}

impl BleScanner {
    /// Create a new scanner on the given adapter
    pub fn new(adapter: Adapter) -> Self {
        Self { adapter }
    }

    /// Start scanning for BLE devices
    ///
    /// The filter is left open: bots advertise their service data under a
    /// short UUID rather than the GATT service UUID, so matching is done by
    /// address on the caller's side.
    pub async fn start(&self) -> Result<AdvertisementStream<Peripheral>, TransportError> {
        // Subscribe before starting so no early advertisement is missed
        let events = self.adapter.events().await?;

        info!("Starting BLE scan");
        self.adapter.start_scan(ScanFilter::default()).await?;

        let adapter = self.adapter.clone();
        let stream = events.filter_map(move |event| {
            let adapter = adapter.clone();
            async move {
                let id = match event {
                    CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => id,
                    _ => return None,
                };

                let peripheral = adapter.peripheral(&id).await.ok()?;
                let properties = peripheral.properties().await.ok().flatten()?;
                debug!(
                    "Advertisement from {} rssi={:?}",
                    properties.address, properties.rssi
                );

                Some(ScannedDevice {
                    address: properties.address.to_string(),
                    name: properties.local_name,
                    signal_strength: properties.rssi,
                    handle: peripheral,
                })
            }
        });

        Ok(stream.boxed())
    }

    /// Stop scanning
    pub async fn stop(&self) -> Result<(), TransportError> {
        info!("Stopping BLE scan...");
        self.adapter.stop_scan().await?;
        Ok(())
    }
}
