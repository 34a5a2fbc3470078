//! Transport Traits
//!
//! The capability surface the controller needs from a BLE stack. The
//! production implementation lives in [`scanner`](super::scanner) and
//! [`connection`](super::connection); tests substitute an in-memory mock.

use crate::domain::errors::TransportError;
use crate::domain::models::ScannedDevice;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;
use uuid::Uuid;

/// Callback invoked with every notification payload.
pub type NotifyHandler = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Stream of advertisements produced by an active scan.
pub type AdvertisementStream<D> = BoxStream<'static, ScannedDevice<D>>;

/// Scanning and connecting.
#[async_trait]
pub trait BleTransport: Send + Sync + 'static {
    /// Opaque handle to a discovered peripheral.
    type Device: Clone + Send + Sync + 'static;
    /// Live connection produced by [`connect`](BleTransport::connect).
    type Link: GattLink;

    /// Start scanning. Advertisements are yielded as they arrive, possibly
    /// several times for the same peripheral.
    async fn start_scan(&self) -> Result<AdvertisementStream<Self::Device>, TransportError>;

    /// Stop a scan started with [`start_scan`](BleTransport::start_scan).
    async fn stop_scan(&self) -> Result<(), TransportError>;

    /// Open a connection to a previously scanned peripheral.
    async fn connect(&self, device: &Self::Device) -> Result<Self::Link, TransportError>;
}

/// A connected GATT client.
#[async_trait]
pub trait GattLink: Send + Sync + 'static {
    /// Cheap liveness check; must not block.
    fn is_connected(&self) -> bool;

    async fn disconnect(&self) -> Result<(), TransportError>;

    async fn write_characteristic(&self, uuid: Uuid, bytes: &[u8]) -> Result<(), TransportError>;

    async fn subscribe(&self, uuid: Uuid, on_notify: NotifyHandler) -> Result<(), TransportError>;
}
