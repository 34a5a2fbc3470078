use anyhow::Context;
use clap::Parser;
use std::time::Duration;
use switchbot_controller_rust::cli::Cli;
use switchbot_controller_rust::domain::models::SessionReport;
use switchbot_controller_rust::domain::settings::{validate_address, SettingsService};
use switchbot_controller_rust::infrastructure::bluetooth::BluetoothService;
use switchbot_controller_rust::infrastructure::logging;
use switchbot_controller_rust::scan::scan_nearby;
use switchbot_controller_rust::scheduler::Scheduler;
use switchbot_controller_rust::session::{run_session, SessionConfig};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

async fn run_once(
    config: &SessionConfig,
    cancel: &CancellationToken,
) -> anyhow::Result<SessionReport> {
    let transport = BluetoothService::new()
        .await
        .context("Failed to open Bluetooth adapter")?;
    Ok(run_session(transport, config, cancel).await)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings_service = match &cli.config {
        Some(path) => SettingsService::from_path(path.clone()),
        None => SettingsService::new(),
    }
    .context("Failed to load settings")?;
    cli.apply(settings_service.get_mut());
    let settings = settings_service.get().clone();

    let _logging = logging::init_logger(&cli.log_settings(&settings.log_settings))?;
    info!("Starting SwitchBot controller");

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Cancelled by user");
            on_interrupt.cancel();
        }
    });

    if cli.scan {
        let transport = BluetoothService::new()
            .await
            .context("Failed to open Bluetooth adapter")?;
        scan_nearby(
            &transport,
            Duration::from_secs(settings.scan_window_secs),
            &cancel,
        )
        .await
        .context("Scan failed")?;
        return Ok(());
    }

    validate_address(&settings.device_address)
        .context("Set device_address in the settings file or pass --address")?;
    let scheduler = if cli.schedule {
        Some(
            Scheduler::new(Duration::from_secs(settings.schedule_interval_secs))
                .context("Invalid schedule_interval_secs")?,
        )
    } else {
        None
    };

    if cli.save {
        settings_service.save()?;
        info!("Settings saved to {}", settings_service.path().display());
    }

    let config = SessionConfig::from_settings(&settings);

    if let Some(scheduler) = scheduler {
        let (config, cancel) = (&config, &cancel);
        scheduler.run(cancel, move || run_once(config, cancel)).await;
        return Ok(());
    }

    let report = run_once(&config, &cancel).await?;
    if !report.is_complete_success() && !cancel.is_cancelled() {
        anyhow::bail!("Session did not complete: {}", report);
    }
    Ok(())
}
