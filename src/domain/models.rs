use std::fmt;

/// A peripheral seen during a scan.
///
/// `handle` is the transport's own reference to the peripheral, kept so the
/// controller can reconnect later without scanning again.
#[derive(Debug, Clone)]
pub struct ScannedDevice<D> {
    pub address: String,
    pub name: Option<String>,
    pub signal_strength: Option<i16>,
    pub handle: D,
}

impl<D> ScannedDevice<D> {
    /// Case-insensitive address comparison.
    pub fn matches_address(&self, address: &str) -> bool {
        self.address.eq_ignore_ascii_case(address)
    }

    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => "Unknown",
        }
    }
}

/// Outcome of one press session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionReport {
    pub device_found: bool,
    pub attempted: u32,
    pub succeeded: u32,
}

impl SessionReport {
    pub fn not_found() -> Self {
        Self::default()
    }

    pub fn is_complete_success(&self) -> bool {
        self.device_found && self.attempted > 0 && self.succeeded == self.attempted
    }

    pub fn summary(&self) -> String {
        if !self.device_found {
            return "device not found".to_string();
        }
        match self.succeeded {
            0 => format!("no presses succeeded (0/{})", self.attempted),
            n if n == self.attempted => format!("all presses succeeded ({n}/{n})"),
            n => format!("partial success ({n}/{})", self.attempted),
        }
    }
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_address_ignores_case() {
        let device = ScannedDevice {
            address: "aa:bb:cc:dd:ee:ff".to_string(),
            name: None,
            signal_strength: Some(-60),
            handle: (),
        };
        assert!(device.matches_address("AA:BB:CC:DD:EE:FF"));
        assert!(!device.matches_address("AA:BB:CC:DD:EE:00"));
        assert_eq!(device.display_name(), "Unknown");
    }

    #[test]
    fn test_session_report_summary() {
        assert_eq!(SessionReport::not_found().summary(), "device not found");

        let partial = SessionReport {
            device_found: true,
            attempted: 3,
            succeeded: 2,
        };
        assert!(!partial.is_complete_success());
        assert_eq!(partial.summary(), "partial success (2/3)");

        let full = SessionReport {
            device_found: true,
            attempted: 3,
            succeeded: 3,
        };
        assert!(full.is_complete_success());
        assert_eq!(full.to_string(), "all presses succeeded (3/3)");
    }
}
