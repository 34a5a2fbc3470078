use crate::domain::errors::SettingsError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_false")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_false")]
    pub show_file_line: bool,
    #[serde(default = "default_false")]
    pub show_thread_ids: bool,
    #[serde(default = "default_true")]
    pub show_target: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_logging_enabled: default_false(),
            console_logging_enabled: default_true(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            show_file_line: default_false(),
            show_thread_ids: default_false(),
            show_target: default_true(),
            ansi_colors: default_true(),
            rotation: default_rotation(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "switchbot".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Target bot, `AA:BB:CC:DD:EE:FF`.
    #[serde(default)]
    pub device_address: String,
    /// Bot password. `None` sends unauthenticated commands.
    #[serde(default)]
    pub password: Option<String>,

    // Discovery
    #[serde(default = "default_scan_window_secs")]
    pub scan_window_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_warmup_ms")]
    pub retry_warmup_ms: u64,
    #[serde(default = "default_reconnect_backoff_ms")]
    pub reconnect_backoff_ms: u64,

    // Connection
    #[serde(default = "default_idle_window_ms")]
    pub idle_window_ms: u64,
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,

    // Session
    #[serde(default = "default_press_count")]
    pub press_count: u32,
    #[serde(default = "default_press_interval_ms")]
    pub press_interval_ms: u64,
    #[serde(default = "default_schedule_interval_secs")]
    pub schedule_interval_secs: u64,

    // Logging Settings
    #[serde(default)]
    pub log_settings: LogSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device_address: String::new(),
            password: None,
            scan_window_secs: default_scan_window_secs(),
            max_attempts: default_max_attempts(),
            retry_warmup_ms: default_retry_warmup_ms(),
            reconnect_backoff_ms: default_reconnect_backoff_ms(),
            idle_window_ms: default_idle_window_ms(),
            response_timeout_ms: default_response_timeout_ms(),
            press_count: default_press_count(),
            press_interval_ms: default_press_interval_ms(),
            schedule_interval_secs: default_schedule_interval_secs(),
            log_settings: LogSettings::default(),
        }
    }
}

fn default_scan_window_secs() -> u64 {
    10
}
fn default_max_attempts() -> u32 {
    3
}
fn default_retry_warmup_ms() -> u64 {
    2000
}
fn default_reconnect_backoff_ms() -> u64 {
    1000
}
fn default_idle_window_ms() -> u64 {
    9000
}
fn default_response_timeout_ms() -> u64 {
    5000
}
fn default_press_count() -> u32 {
    3
}
fn default_press_interval_ms() -> u64 {
    8000
}
fn default_schedule_interval_secs() -> u64 {
    3600
}

impl Settings {
    /// Empty password strings count as "no password".
    pub fn credential(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }
}

/// Check that `address` looks like `AA:BB:CC:DD:EE:FF`.
pub fn validate_address(address: &str) -> Result<(), SettingsError> {
    let octets: Vec<&str> = address.split(':').collect();
    let well_formed = octets.len() == 6
        && octets
            .iter()
            .all(|o| o.len() == 2 && o.chars().all(|c| c.is_ascii_hexdigit()));
    if well_formed {
        Ok(())
    } else {
        Err(SettingsError::InvalidAddress(address.to_string()))
    }
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    /// Load from the per-user config directory, falling back to defaults.
    pub fn new() -> Result<Self, SettingsError> {
        let settings_path = Self::default_settings_path()?;
        Self::from_path(settings_path)
    }

    /// Load from an explicit path. A missing file yields defaults; a
    /// malformed one is an error rather than being silently replaced.
    pub fn from_path(settings_path: PathBuf) -> Result<Self, SettingsError> {
        let settings = if settings_path.exists() {
            Self::load_from_file(&settings_path)?
        } else {
            Settings::default()
        };

        Ok(Self {
            settings,
            settings_path,
        })
    }

    fn default_settings_path() -> Result<PathBuf, SettingsError> {
        let mut path = dirs::config_dir().ok_or(SettingsError::NoConfigDir)?;
        path.push("SwitchBotController");
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &Path) -> Result<Settings, SettingsError> {
        let contents = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        let io_err = |source: std::io::Error| SettingsError::Io {
            path: self.settings_path.clone(),
            source,
        };
        if let Some(parent) = self.settings_path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(&self.settings).map_err(|source| {
            SettingsError::Parse {
                path: self.settings_path.clone(),
                source,
            }
        })?;
        fs::write(&self.settings_path, json).map_err(io_err)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.settings_path
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn get_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_fills_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{ "device_address": "AA:BB:CC:DD:EE:FF" }"#).unwrap();
        assert_eq!(settings.device_address, "AA:BB:CC:DD:EE:FF");
        assert_eq!(settings.idle_window_ms, 9000);
        assert_eq!(settings.response_timeout_ms, 5000);
        assert_eq!(settings.max_attempts, 3);
        assert_eq!(settings.log_settings.level, "info");
        assert!(settings.credential().is_none());
    }

    #[test]
    fn test_empty_password_is_no_credential() {
        let settings = Settings {
            password: Some(String::new()),
            ..Default::default()
        };
        assert!(settings.credential().is_none());
    }

    #[test]
    fn test_validate_address() {
        assert!(validate_address("AA:BB:CC:DD:EE:FF").is_ok());
        assert!(validate_address("aa:bb:cc:dd:ee:0f").is_ok());
        assert!(validate_address("AA:BB:CC:DD:EE").is_err());
        assert!(validate_address("AA-BB-CC-DD-EE-FF").is_err());
        assert!(validate_address("GG:BB:CC:DD:EE:FF").is_err());
        assert!(validate_address("").is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut service = SettingsService::from_path(path.clone()).unwrap();
        service.get_mut().device_address = "AA:BB:CC:DD:EE:FF".to_string();
        service.get_mut().password = Some("1234".to_string());
        service.save().unwrap();

        let reloaded = SettingsService::from_path(path).unwrap();
        assert_eq!(reloaded.get().device_address, "AA:BB:CC:DD:EE:FF");
        assert_eq!(reloaded.get().credential(), Some("1234"));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let err = SettingsService::from_path(path).err().unwrap();
        assert!(matches!(err, SettingsError::Parse { .. }));
    }
}
