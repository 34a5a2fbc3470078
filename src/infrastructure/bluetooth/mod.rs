//! Bluetooth Module
//!
//! Provides BLE communication with SwitchBot Bots.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    BluetoothService                      │
//! │        (btleplug adapter, implements BleTransport)       │
//! └─────────────────────┬───────────────────────────────────┘
//!                       │
//!         ┌─────────────┼─────────────┐
//!         │             │             │
//!         ▼             ▼             ▼
//! ┌───────────┐  ┌────────────┐  ┌──────────┐
//! │  Scanner  │  │ Connection │  │ Protocol │
//! │           │  │            │  │          │
//! │ - BLE     │  │ - GATT     │  │ - UUIDs  │
//! │ adverts   │  │   link     │  │ - Press  │
//! │           │  │ - Notify   │  │ - Status │
//! └───────────┘  └────────────┘  └──────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] - Bot protocol definitions, command encoding and response parsing
//! - [`transport`] - Traits the controller consumes
//! - [`scanner`] - BLE device discovery
//! - [`connection`] - Device connection and GATT characteristic handling
//! - [`service`] - Binds scanner and connection to one adapter

pub mod connection;
#[cfg(test)]
pub(crate) mod mock;
pub mod protocol;
pub mod scanner;
pub mod service;
pub mod transport;

// Re-export main service for convenience
pub use service::BluetoothService;
