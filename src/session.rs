//! One press session: discover, press a few times over a single kept-alive
//! connection, then close.

use crate::controller::{BotController, ControllerOptions, DiscoveryOptions};
use crate::domain::models::SessionReport;
use crate::domain::settings::Settings;
use crate::infrastructure::bluetooth::transport::BleTransport;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub address: String,
    pub credential: Option<String>,
    pub controller: ControllerOptions,
    pub discovery: DiscoveryOptions,
    pub press_count: u32,
    /// Pause between presses. Shorter than the idle window keeps the link.
    pub press_interval: Duration,
}

impl SessionConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            address: settings.device_address.clone(),
            credential: settings.credential().map(str::to_string),
            controller: ControllerOptions {
                idle_window: Duration::from_millis(settings.idle_window_ms),
                response_timeout: Duration::from_millis(settings.response_timeout_ms),
            },
            discovery: DiscoveryOptions {
                scan_window: Duration::from_secs(settings.scan_window_secs),
                max_attempts: settings.max_attempts,
                retry_warmup: Duration::from_millis(settings.retry_warmup_ms),
                reconnect_backoff: Duration::from_millis(settings.reconnect_backoff_ms),
            },
            press_count: settings.press_count,
            press_interval: Duration::from_millis(settings.press_interval_ms),
        }
    }
}

/// Run one session on `transport`. The controller is always closed before
/// returning, including when `cancel` fires mid-session.
pub async fn run_session<T: BleTransport>(
    transport: T,
    config: &SessionConfig,
    cancel: &CancellationToken,
) -> SessionReport {
    let controller = BotController::new(
        config.address.clone(),
        config.credential.as_deref(),
        transport,
        config.controller,
    );
    info!(
        "Target {} ({})",
        controller.address(),
        if controller.command().is_authenticated() {
            "password set"
        } else {
            "no password"
        }
    );

    let mut report = SessionReport::default();
    tokio::select! {
        _ = drive(&controller, config, &mut report) => {}
        _ = cancel.cancelled() => warn!("Session cancelled"),
    }

    info!("Closing connection...");
    controller.close().await;
    info!("Session result: {}", report);
    report
}

async fn drive<T: BleTransport>(
    controller: &BotController<T>,
    config: &SessionConfig,
    report: &mut SessionReport,
) {
    info!("Discovering device...");
    if !controller.discover_and_connect(&config.discovery).await {
        warn!("Unable to connect to device {}", config.address);
        return;
    }
    report.device_found = true;

    for i in 1..=config.press_count {
        info!("[{}/{}] Pressing SwitchBot...", i, config.press_count);
        report.attempted += 1;
        match controller.press().await {
            Ok(true) => {
                report.succeeded += 1;
                info!("Press #{} successful", i);
            }
            Ok(false) => warn!("Press #{} failed - no valid response", i),
            Err(e) => error!("Press #{} failed: {}", i, e),
        }

        if i < config.press_count {
            info!(
                "Waiting {:?} (connection stays alive)...",
                config.press_interval
            );
            tokio::time::sleep(config.press_interval).await;
        }
    }
}
