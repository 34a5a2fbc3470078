//! SwitchBot Bot Protocol
//!
//! This module contains the protocol definitions for pressing a SwitchBot
//! Bot over its vendor GATT service.

use tracing::trace;
use uuid::{uuid, Uuid};

/// SwitchBot BLE Service UUID
pub const SERVICE_UUID: Uuid = uuid!("cba20d00-224d-11e6-9fb8-0002a5d5c51b");

/// Command Write Characteristic UUID - where commands are sent
pub const WRITE_CHAR_UUID: Uuid = uuid!("cba20002-224d-11e6-9fb8-0002a5d5c51b");

/// Notify Characteristic UUID - where command responses arrive
pub const NOTIFY_CHAR_UUID: Uuid = uuid!("cba20003-224d-11e6-9fb8-0002a5d5c51b");

/// Leading byte of every command frame
const COMMAND_HEADER: u8 = 0x57;

/// Press action without a password
const PRESS_PLAIN: u8 = 0x01;

/// Press action carrying a password checksum
const PRESS_AUTHENTICATED: u8 = 0x11;

/// Status bytes the bot uses to acknowledge a press
const ACK_STATUSES: [u8; 2] = [0x01, 0x05];

/// Encoded press command, ready to write to [`WRITE_CHAR_UUID`].
///
/// # Frame Layout
///
/// ```text
/// plain:         57 01
/// authenticated: 57 11 c0 c1 c2 c3   (c = CRC-32 of the password, little-endian)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PressCommand {
    bytes: Vec<u8>,
}

impl PressCommand {
    pub fn new(credential: Option<&str>) -> Self {
        let bytes = match credential {
            Some(password) => {
                let mut bytes = vec![COMMAND_HEADER, PRESS_AUTHENTICATED];
                bytes.extend_from_slice(&password_checksum(password).to_le_bytes());
                bytes
            }
            None => vec![COMMAND_HEADER, PRESS_PLAIN],
        };
        Self { bytes }
    }

    pub fn is_authenticated(&self) -> bool {
        self.bytes.get(1) == Some(&PRESS_AUTHENTICATED)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// CRC-32 (IEEE) over the UTF-8 bytes of the password.
pub fn password_checksum(password: &str) -> u32 {
    crc32fast::hash(password.as_bytes())
}

/// Decoded notification payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressResponse {
    Acknowledged(u8),
    Rejected(u8),
    Empty,
}

impl PressResponse {
    pub fn is_ack(&self) -> bool {
        matches!(self, Self::Acknowledged(_))
    }
}

/// Interpret the notification that follows a press. Only the first byte
/// carries the status.
pub fn interpret_response(payload: &[u8]) -> PressResponse {
    #[cfg(debug_assertions)]
    trace!("Raw response: {:02X?}", payload);

    match payload.first() {
        Some(&status) if ACK_STATUSES.contains(&status) => PressResponse::Acknowledged(status),
        Some(&status) => PressResponse::Rejected(status),
        None => PressResponse::Empty,
    }
}

/// Whether a discovered GATT service list includes the bot's vendor service.
pub fn has_bot_service(services: impl IntoIterator<Item = Uuid>) -> bool {
    services.into_iter().any(|uuid| uuid == SERVICE_UUID)
}
