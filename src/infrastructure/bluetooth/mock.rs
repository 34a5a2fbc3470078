//! In-memory transport for tests.
//!
//! Scripted advertisements, connect failures and notification responses,
//! with counters for everything the controller does to the transport.

use crate::domain::errors::TransportError;
use crate::domain::models::ScannedDevice;
use crate::infrastructure::bluetooth::transport::{
    AdvertisementStream, BleTransport, GattLink, NotifyHandler,
};
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// What the mock bot sends back after a write.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Reply { payload: Vec<u8>, delay: Duration },
    Silent,
}

#[derive(Debug)]
pub struct MockState {
    pub advertisements: Mutex<Vec<ScannedDevice<String>>>,
    pub response: Mutex<MockResponse>,
    pub connect_delay: Mutex<Duration>,
    pub subscribe_delay: Mutex<Duration>,
    pub connect_failures: AtomicUsize,
    pub fail_writes: AtomicBool,

    pub scans_started: AtomicUsize,
    pub scans_stopped: AtomicUsize,
    pub connects: AtomicUsize,
    pub disconnects: AtomicUsize,
    pub live_links: AtomicUsize,
    pub max_live_links: AtomicUsize,
    pub writes: Mutex<Vec<Vec<u8>>>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            advertisements: Mutex::new(Vec::new()),
            response: Mutex::new(MockResponse::Reply {
                payload: vec![1],
                delay: Duration::from_millis(50),
            }),
            connect_delay: Mutex::new(Duration::from_millis(100)),
            subscribe_delay: Mutex::new(Duration::ZERO),
            connect_failures: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
            scans_started: AtomicUsize::new(0),
            scans_stopped: AtomicUsize::new(0),
            connects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
            live_links: AtomicUsize::new(0),
            max_live_links: AtomicUsize::new(0),
            writes: Mutex::new(Vec::new()),
        }
    }
}

impl MockState {
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn connects(&self) -> usize {
        Self::count(&self.connects)
    }

    pub fn disconnects(&self) -> usize {
        Self::count(&self.disconnects)
    }

    pub fn live_links(&self) -> usize {
        Self::count(&self.live_links)
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().unwrap().clone()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<MockState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Arc<MockState> {
        self.state.clone()
    }

    /// Advertise `address` on every scan.
    pub fn advertising(self, address: &str) -> Self {
        self.state
            .advertisements
            .lock()
            .unwrap()
            .push(ScannedDevice {
                address: address.to_string(),
                name: Some("WoHand".to_string()),
                signal_strength: Some(-55),
                handle: address.to_string(),
            });
        self
    }

    pub fn responding(self, payload: &[u8], delay: Duration) -> Self {
        *self.state.response.lock().unwrap() = MockResponse::Reply {
            payload: payload.to_vec(),
            delay,
        };
        self
    }

    pub fn silent(self) -> Self {
        *self.state.response.lock().unwrap() = MockResponse::Silent;
        self
    }

    pub fn failing_connects(self, count: usize) -> Self {
        self.state.connect_failures.store(count, Ordering::SeqCst);
        self
    }

    pub fn connect_delay(self, delay: Duration) -> Self {
        *self.state.connect_delay.lock().unwrap() = delay;
        self
    }

    pub fn subscribe_delay(self, delay: Duration) -> Self {
        *self.state.subscribe_delay.lock().unwrap() = delay;
        self
    }
}

#[async_trait]
impl BleTransport for MockTransport {
    type Device = String;
    type Link = MockLink;

    async fn start_scan(&self) -> Result<AdvertisementStream<String>, TransportError> {
        self.state.scans_started.fetch_add(1, Ordering::SeqCst);
        let advertisements = self.state.advertisements.lock().unwrap().clone();
        Ok(futures::stream::iter(advertisements)
            .chain(futures::stream::pending())
            .boxed())
    }

    async fn stop_scan(&self) -> Result<(), TransportError> {
        self.state.scans_stopped.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn connect(&self, device: &String) -> Result<MockLink, TransportError> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        let delay = *self.state.connect_delay.lock().unwrap();
        tokio::time::sleep(delay).await;

        let should_fail = self
            .state
            .connect_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(TransportError::Other(format!("connect to {device} refused")));
        }

        let live = self.state.live_links.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_live_links.fetch_max(live, Ordering::SeqCst);
        Ok(MockLink {
            state: self.state.clone(),
            connected: AtomicBool::new(true),
            handler: Mutex::new(None),
        })
    }
}

pub struct MockLink {
    state: Arc<MockState>,
    connected: AtomicBool,
    handler: Mutex<Option<NotifyHandler>>,
}

impl MockLink {
    /// Simulate the peripheral dropping the link on its own.
    pub fn drop_link(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            self.state.live_links.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl GattLink for MockLink {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.state.disconnects.fetch_add(1, Ordering::SeqCst);
        self.drop_link();
        Ok(())
    }

    async fn write_characteristic(&self, _uuid: Uuid, bytes: &[u8]) -> Result<(), TransportError> {
        if !self.is_connected() || self.state.fail_writes.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        self.state.writes.lock().unwrap().push(bytes.to_vec());

        let response = self.state.response.lock().unwrap().clone();
        let handler = self.handler.lock().unwrap().clone();
        if let (MockResponse::Reply { payload, delay }, Some(handler)) = (response, handler) {
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                handler(&payload[..]);
            });
        }
        Ok(())
    }

    async fn subscribe(&self, _uuid: Uuid, on_notify: NotifyHandler) -> Result<(), TransportError> {
        let delay = *self.state.subscribe_delay.lock().unwrap();
        tokio::time::sleep(delay).await;
        *self.handler.lock().unwrap() = Some(on_notify);
        Ok(())
    }
}
