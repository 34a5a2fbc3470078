//! Single-shot response correlation.
//!
//! The bot answers a command with the next notification on the notify
//! characteristic; there is no request id. One slot is armed per command and
//! the first notification to arrive fulfils it. Anything arriving while no
//! slot is armed is stale and dropped.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::debug;

#[derive(Debug, Default)]
pub struct ResponseSlot {
    pending: Mutex<Option<oneshot::Sender<Vec<u8>>>>,
}

impl ResponseSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<oneshot::Sender<Vec<u8>>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Arm a fresh slot, discarding any previous one.
    pub fn arm(&self) -> PendingResponse {
        let (tx, rx) = oneshot::channel();
        *self.lock() = Some(tx);
        PendingResponse { rx }
    }

    /// Deliver a notification. Returns `false` when nothing was waiting.
    pub fn fulfill(&self, payload: &[u8]) -> bool {
        let Some(tx) = self.lock().take() else {
            debug!("Discarding unsolicited notification: {:02X?}", payload);
            return false;
        };
        tx.send(payload.to_vec()).is_ok()
    }

    /// Disarm without delivering; later notifications are discarded.
    pub fn clear(&self) {
        self.lock().take();
    }

    pub fn is_armed(&self) -> bool {
        self.lock().is_some()
    }
}

/// Receiving half of an armed [`ResponseSlot`].
#[derive(Debug)]
pub struct PendingResponse {
    rx: oneshot::Receiver<Vec<u8>>,
}

impl PendingResponse {
    /// Wait for the payload. `None` on timeout or if the slot was
    /// disarmed or replaced.
    pub async fn wait(self, timeout: Duration) -> Option<Vec<u8>> {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(payload)) => Some(payload),
            Ok(Err(_)) | Err(_) => None,
        }
    }
}
