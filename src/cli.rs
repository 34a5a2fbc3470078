use crate::domain::settings::{LogSettings, Settings};
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Press a SwitchBot Bot over Bluetooth LE.
#[derive(Debug, Parser)]
#[command(name = "switchbot-press", version, about)]
pub struct Cli {
    /// Bot address, e.g. AA:BB:CC:DD:EE:FF
    #[arg(short, long, env = "SWITCHBOT_ADDRESS")]
    pub address: Option<String>,

    /// Bot password, if one is set in the SwitchBot app
    #[arg(short, long, env = "SWITCHBOT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Number of presses per session
    #[arg(short = 'n', long)]
    pub presses: Option<u32>,

    /// Pause between presses, in milliseconds
    #[arg(long = "interval", value_name = "MS")]
    pub interval_ms: Option<u64>,

    /// Keep running and repeat the session periodically
    #[arg(long)]
    pub schedule: bool,

    /// Seconds between scheduled sessions
    #[arg(
        long,
        value_name = "SECS",
        requires = "schedule",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub every: Option<u64>,

    /// List nearby devices and their addresses, then exit
    #[arg(long, conflicts_with = "schedule")]
    pub scan: bool,

    /// Settings file (defaults to the per-user config directory)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write the merged settings back to the settings file
    #[arg(long)]
    pub save: bool,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Overlay command line values onto file settings.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(address) = &self.address {
            settings.device_address = address.clone();
        }
        if let Some(password) = &self.password {
            settings.password = Some(password.clone());
        }
        if let Some(presses) = self.presses {
            settings.press_count = presses;
        }
        if let Some(interval) = self.interval_ms {
            settings.press_interval_ms = interval;
        }
        if let Some(every) = self.every {
            settings.schedule_interval_secs = every;
        }
    }

    /// Logging settings for this run. `-v` raises the level without touching
    /// the stored settings.
    pub fn log_settings(&self, stored: &LogSettings) -> LogSettings {
        let mut log_settings = stored.clone();
        match self.verbose {
            0 => {}
            1 => log_settings.level = "debug".to_string(),
            _ => log_settings.level = "trace".to_string(),
        }
        log_settings
    }
}
