//! Connection-Managed Bot Controller
//!
//! Keeps one reusable GATT connection to a SwitchBot Bot across several
//! presses and drops it after an idle window.
//!
//! ## Locking
//!
//! ```text
//!  press / discover ──► operation_lock ──► ensure_connected ──► connect_lock
//!  idle timer ───────► operation_lock (try only, defer if held) ──► connect_lock
//!  close ────────────────────────────────────────────────────────► connect_lock
//! ```
//!
//! `operation_lock` serializes whole command/response cycles since responses
//! are matched only by arrival order. `connect_lock` serializes connect and
//! teardown. The idle timer never waits on `operation_lock`: if a command is
//! in flight it re-arms itself for another window instead.

pub mod idle;
pub mod response;

use crate::domain::errors::{ConnectionError, TransportError};
use crate::domain::models::ScannedDevice;
use crate::infrastructure::bluetooth::protocol::{
    interpret_response, PressCommand, PressResponse, NOTIFY_CHAR_UUID, WRITE_CHAR_UUID,
};
use crate::infrastructure::bluetooth::transport::{BleTransport, GattLink, NotifyHandler};
use crate::scan::NearbyDevices;
use futures::StreamExt;
use idle::{IdleTimer, Ticket};
use response::ResponseSlot;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Connection timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerOptions {
    /// Inactivity after which the link is dropped
    pub idle_window: Duration,
    /// How long a press waits for its notification
    pub response_timeout: Duration,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            idle_window: Duration::from_secs(9),
            response_timeout: Duration::from_secs(5),
        }
    }
}

/// Scan and retry policy for [`BotController::discover_and_connect`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Maximum time one scan attempt waits for the bot to advertise
    pub scan_window: Duration,
    pub max_attempts: u32,
    /// Pause before every attempt after the first
    pub retry_warmup: Duration,
    /// Extra pause after a failed connect, before the next attempt
    pub reconnect_backoff: Duration,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            scan_window: Duration::from_secs(10),
            max_attempts: 3,
            retry_warmup: Duration::from_secs(2),
            reconnect_backoff: Duration::from_secs(1),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Controller for a single bot address.
///
/// Call [`close`](BotController::close) when done; dropping only cancels the
/// idle timer and cannot await a clean disconnect.
pub struct BotController<T: BleTransport> {
    shared: Arc<Shared<T>>,
}

struct Shared<T: BleTransport> {
    address: String,
    command: PressCommand,
    options: ControllerOptions,
    transport: T,
    /// Peripheral handle remembered from discovery, used for reconnects
    device: Mutex<Option<T::Device>>,
    /// Other addresses seen by the most recent discovery scan
    last_seen: Mutex<Vec<String>>,
    /// Current link. Only replaced while `connect_lock` is held; the std
    /// mutex is never held across an await.
    link: Mutex<Option<Arc<T::Link>>>,
    /// Link that is connected but not yet subscribed. Teardown disconnects
    /// it if the connecting future was dropped before it was promoted.
    connecting: Mutex<Option<Arc<T::Link>>>,
    connect_lock: tokio::sync::Mutex<()>,
    operation_lock: tokio::sync::Mutex<()>,
    responses: Arc<ResponseSlot>,
    idle: IdleTimer,
}

impl<T: BleTransport> BotController<T> {
    pub fn new(
        address: impl Into<String>,
        credential: Option<&str>,
        transport: T,
        options: ControllerOptions,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                address: address.into(),
                command: PressCommand::new(credential),
                options,
                transport,
                device: Mutex::new(None),
                last_seen: Mutex::new(Vec::new()),
                link: Mutex::new(None),
                connecting: Mutex::new(None),
                connect_lock: tokio::sync::Mutex::new(()),
                operation_lock: tokio::sync::Mutex::new(()),
                responses: Arc::new(ResponseSlot::new()),
                idle: IdleTimer::new(options.idle_window),
            }),
        }
    }

    pub fn address(&self) -> &str {
        &self.shared.address
    }

    pub fn command(&self) -> &PressCommand {
        &self.shared.command
    }

    pub fn is_connected(&self) -> bool {
        self.shared.live_link().is_some()
    }

    /// Addresses other than the target that advertised during the most
    /// recent discovery scan.
    pub fn last_seen(&self) -> Vec<String> {
        lock(&self.shared.last_seen).clone()
    }

    /// Scan for the bot and connect while its advertisement is fresh.
    ///
    /// Each attempt scans for up to `scan_window`, stops as soon as the
    /// address is seen and connects immediately. Returns `false` once every
    /// attempt has failed to produce a connection.
    #[tracing::instrument(level = "info", skip_all, fields(address = %self.shared.address))]
    pub async fn discover_and_connect(&self, options: &DiscoveryOptions) -> bool {
        let shared = &self.shared;

        for attempt in 1..=options.max_attempts {
            if attempt > 1 {
                info!("Retry attempt {}/{}", attempt, options.max_attempts);
                tokio::time::sleep(options.retry_warmup).await;
            }

            info!("Scanning for up to {:?}", options.scan_window);
            let found = match shared.scan_for_target(options.scan_window).await {
                Ok(found) => found,
                Err(e) => {
                    warn!("Scan failed: {}", e);
                    None
                }
            };

            let Some(device) = found else {
                warn!("Device not found on attempt {}", attempt);
                continue;
            };

            info!(
                "Device found: {} (RSSI: {:?} dBm), connecting",
                device.display_name(),
                device.signal_strength
            );
            *lock(&shared.device) = Some(device.handle);

            let connected = {
                let _operation = shared.operation_lock.lock().await;
                shared.ensure_connected().await
            };
            match connected {
                Ok(_) => {
                    info!("Connection established");
                    return true;
                }
                Err(e) => {
                    warn!("Connection failed: {}", e);
                    if attempt < options.max_attempts {
                        tokio::time::sleep(options.reconnect_backoff).await;
                    }
                }
            }
        }

        warn!("Unable to connect after {} attempts", options.max_attempts);
        false
    }

    /// Return a live link, reconnecting to the discovered peripheral if the
    /// idle timer (or the peripheral) dropped the previous one.
    pub async fn ensure_connected(&self) -> Result<Arc<T::Link>, ConnectionError> {
        self.shared.ensure_connected().await
    }

    /// Press the bot once.
    ///
    /// `Ok(true)` when the bot acknowledges, `Ok(false)` when it rejects the
    /// command or stays silent past the response timeout. Transport errors
    /// while writing tear the link down and are returned.
    #[tracing::instrument(level = "info", skip_all, fields(address = %self.shared.address))]
    pub async fn press(&self) -> Result<bool, ConnectionError> {
        let shared = &self.shared;
        let _operation = shared.operation_lock.lock().await;

        let link = shared.ensure_connected().await?;
        let pending = shared.responses.arm();

        if let Err(source) = link
            .write_characteristic(WRITE_CHAR_UUID, shared.command.as_bytes())
            .await
        {
            shared.responses.clear();
            warn!("Write failed, dropping connection: {}", source);
            shared.teardown().await;
            return Err(ConnectionError::Write {
                address: shared.address.clone(),
                source,
            });
        }

        let payload = pending.wait(shared.options.response_timeout).await;
        shared.responses.clear();
        shared.reset_idle_timer();

        let Some(payload) = payload else {
            warn!(
                "No response from device within {:?}",
                shared.options.response_timeout
            );
            return Ok(false);
        };

        match interpret_response(&payload) {
            PressResponse::Acknowledged(status) => {
                info!("Press acknowledged (status {:#04x})", status);
                Ok(true)
            }
            PressResponse::Rejected(status) => {
                warn!("Press rejected (status {:#04x})", status);
                Ok(false)
            }
            PressResponse::Empty => {
                warn!("Empty response from device");
                Ok(false)
            }
        }
    }

    /// Cancel the idle timer and disconnect. Safe to call repeatedly, and
    /// before any connection was made.
    #[tracing::instrument(level = "info", skip_all, fields(address = %self.shared.address))]
    pub async fn close(&self) {
        self.shared.teardown().await;
        self.shared.responses.clear();
    }
}

impl<T: BleTransport> Drop for BotController<T> {
    fn drop(&mut self) {
        self.shared.idle.cancel();
    }
}

impl<T: BleTransport> Shared<T> {
    fn live_link(&self) -> Option<Arc<T::Link>> {
        lock(&self.link)
            .as_ref()
            .filter(|link| link.is_connected())
            .cloned()
    }

    async fn scan_for_target(
        &self,
        window: Duration,
    ) -> Result<Option<ScannedDevice<T::Device>>, TransportError> {
        let mut advertisements = self.transport.start_scan().await?;
        let mut nearby = NearbyDevices::new();

        let target = self.address.as_str();
        let found = tokio::time::timeout(window, async {
            while let Some(device) = advertisements.next().await {
                if device.matches_address(target) {
                    return Some(device);
                }
                nearby.record(device);
            }
            None
        })
        .await
        .unwrap_or(None);
        drop(advertisements);

        if let Err(e) = self.transport.stop_scan().await {
            warn!("Failed to stop scan: {}", e);
        }

        if found.is_none() {
            if nearby.is_empty() {
                info!("No other devices advertised");
            } else {
                info!("Available devices:");
                nearby.log_devices();
            }
        }
        *lock(&self.last_seen) = nearby.addresses();
        Ok(found)
    }

    async fn ensure_connected(self: &Arc<Self>) -> Result<Arc<T::Link>, ConnectionError> {
        if let Some(link) = self.live_link() {
            self.reset_idle_timer();
            return Ok(link);
        }

        let _connect = self.connect_lock.lock().await;

        // Someone else may have reconnected while we waited
        if let Some(link) = self.live_link() {
            self.reset_idle_timer();
            return Ok(link);
        }

        let device = lock(&self.device)
            .clone()
            .ok_or_else(|| ConnectionError::NotDiscovered {
                address: self.address.clone(),
            })?;

        if let Some(stale) = lock(&self.link).take() {
            debug!("Releasing dead link before reconnecting");
            drop(stale);
        }
        self.release_interrupted_connect().await;

        info!("Connecting to {}", self.address);
        let link = self
            .transport
            .connect(&device)
            .await
            .map_err(|source| ConnectionError::Connect {
                address: self.address.clone(),
                source,
            })?;

        let link = Arc::new(link);
        *lock(&self.connecting) = Some(link.clone());

        let responses = self.responses.clone();
        let on_notify: NotifyHandler = Arc::new(move |payload: &[u8]| {
            responses.fulfill(payload);
        });
        if let Err(source) = link.subscribe(NOTIFY_CHAR_UUID, on_notify).await {
            lock(&self.connecting).take();
            if let Err(e) = link.disconnect().await {
                debug!("Disconnect after failed subscribe: {}", e);
            }
            return Err(ConnectionError::Subscribe {
                address: self.address.clone(),
                source,
            });
        }

        lock(&self.connecting).take();
        *lock(&self.link) = Some(link.clone());
        self.reset_idle_timer();
        Ok(link)
    }

    /// Disconnect a link left behind by a connect that was cancelled before
    /// it could subscribe. Caller holds `connect_lock`.
    async fn release_interrupted_connect(&self) {
        let orphan = lock(&self.connecting).take();
        if let Some(orphan) = orphan {
            debug!("Releasing link from an interrupted connect");
            if let Err(e) = orphan.disconnect().await {
                warn!("Disconnect failed: {}", e);
            }
        }
    }

    fn reset_idle_timer(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        self.idle.arm(move |ticket| async move {
            if let Some(shared) = weak.upgrade() {
                shared.on_idle_expired(ticket).await;
            }
        });
    }

    async fn on_idle_expired(self: Arc<Self>, ticket: Ticket) {
        if !self.idle.release(ticket) {
            return;
        }

        let Ok(_operation) = self.operation_lock.try_lock() else {
            debug!("Command in flight, deferring idle disconnect");
            self.reset_idle_timer();
            return;
        };

        info!("Idle for {:?}, disconnecting", self.idle.window());
        self.teardown().await;
    }

    async fn teardown(&self) {
        let _connect = self.connect_lock.lock().await;
        self.idle.cancel();

        self.release_interrupted_connect().await;

        let Some(link) = lock(&self.link).take() else {
            return;
        };
        if link.is_connected() {
            if let Err(e) = link.disconnect().await {
                warn!("Disconnect failed: {}", e);
            }
        }
        info!("Disconnected from {}", self.address);
    }
}
