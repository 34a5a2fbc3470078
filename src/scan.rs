//! Nearby device survey.
//!
//! Lists every peripheral that advertises during one scan window, which is
//! how the address of a new bot is found before it goes into the settings.

use crate::domain::errors::TransportError;
use crate::domain::models::ScannedDevice;
use crate::infrastructure::bluetooth::transport::BleTransport;
use futures::StreamExt;
use std::cmp::Reverse;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Advertisements seen during a scan, one entry per address.
#[derive(Debug, Clone)]
pub struct NearbyDevices<D> {
    devices: Vec<ScannedDevice<D>>,
}

impl<D> Default for NearbyDevices<D> {
    fn default() -> Self {
        Self {
            devices: Vec::new(),
        }
    }
}

impl<D> NearbyDevices<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an advertisement. Repeats of a known address refresh its signal
    /// strength and fill in a name the earlier advertisement lacked.
    pub fn record(&mut self, device: ScannedDevice<D>) {
        match self
            .devices
            .iter_mut()
            .find(|known| known.matches_address(&device.address))
        {
            Some(known) => {
                if device.name.is_some() {
                    known.name = device.name;
                }
                if device.signal_strength.is_some() {
                    known.signal_strength = device.signal_strength;
                }
                known.handle = device.handle;
            }
            None => {
                debug!("New device {}", device.address);
                self.devices.push(device);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn addresses(&self) -> Vec<String> {
        self.devices.iter().map(|d| d.address.clone()).collect()
    }

    /// Devices ordered strongest signal first; unknown strength sorts last.
    pub fn by_signal(&self) -> Vec<&ScannedDevice<D>> {
        let mut sorted: Vec<_> = self.devices.iter().collect();
        sorted.sort_by_key(|d| Reverse(d.signal_strength));
        sorted
    }

    pub fn log_devices(&self) {
        for device in self.by_signal() {
            match device.signal_strength {
                Some(rssi) => info!(
                    "  {}  {}  (RSSI: {} dBm)",
                    device.address,
                    device.display_name(),
                    rssi
                ),
                None => info!("  {}  {}", device.address, device.display_name()),
            }
        }
    }
}

/// Scan for `window` (or until `cancel` fires) and collect every device
/// that advertised. The scan is always stopped before returning.
pub async fn scan_nearby<T: BleTransport>(
    transport: &T,
    window: Duration,
    cancel: &CancellationToken,
) -> Result<NearbyDevices<T::Device>, TransportError> {
    info!("Scanning for nearby devices for {:?}", window);
    let mut advertisements = transport.start_scan().await?;
    let mut nearby = NearbyDevices::new();

    let collect = async {
        while let Some(device) = advertisements.next().await {
            nearby.record(device);
        }
    };
    tokio::select! {
        _ = tokio::time::timeout(window, collect) => {}
        _ = cancel.cancelled() => warn!("Scan cancelled"),
    }
    drop(advertisements);

    if let Err(e) = transport.stop_scan().await {
        warn!("Failed to stop scan: {}", e);
    }

    if nearby.is_empty() {
        info!("No devices found");
    } else {
        info!("Found {} device(s):", nearby.len());
        nearby.log_devices();
    }
    Ok(nearby)
}
