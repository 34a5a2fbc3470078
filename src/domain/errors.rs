//! Error taxonomy for the press controller.
//!
//! Only [`ConnectionError`] ever escapes from a press. Discovery failures,
//! response timeouts and rejected responses are ordinary outcomes and are
//! reported as booleans.

use std::path::PathBuf;

/// Failure reported by the BLE transport collaborator.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No usable Bluetooth adapter on this host.
    #[error("No Bluetooth adapter available")]
    NoAdapter,

    /// The peripheral is connected but is not a bot.
    #[error("Service {0} not found")]
    ServiceNotFound(uuid::Uuid),

    /// The peripheral does not expose a characteristic we need.
    #[error("Characteristic {0} not found")]
    CharacteristicNotFound(uuid::Uuid),

    /// The link was closed underneath us.
    #[error("Link is not connected")]
    NotConnected,

    /// Error bubbled up from the platform BLE stack.
    #[error("BLE error: {0}")]
    Ble(#[from] btleplug::Error),

    /// Anything else the transport wants to report.
    #[error("{0}")]
    Other(String),
}

/// Connect or write failure. The one error `press` propagates.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// `press` was called before discovery located the peripheral.
    #[error("Device {address} has not been discovered yet")]
    NotDiscovered { address: String },

    /// Establishing the transport connection failed.
    #[error("Failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: TransportError,
    },

    /// Subscribing to the notify characteristic failed after connecting.
    #[error("Failed to subscribe to notifications on {address}: {source}")]
    Subscribe {
        address: String,
        #[source]
        source: TransportError,
    },

    /// Writing the command failed mid-press. The link has been torn down.
    #[error("Failed to write command to {address}: {source}")]
    Write {
        address: String,
        #[source]
        source: TransportError,
    },
}

/// Settings file problems.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to access settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid Bluetooth address '{0}' (expected AA:BB:CC:DD:EE:FF)")]
    InvalidAddress(String),
}
