//! Configuration
//!
//! Protocol constants are carried in [`ProtocolConfig`] and injected into the codec and
//! session, so they can be overridden from a JSON file and shrunk in tests.
//!
//! The serial port name comes from the ComProxy configuration file found on the
//! terminal host (`physical_port=/dev/ttyS0`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default location of the ComProxy configuration file
pub const DEFAULT_COMPROXY_PATH: &str = "/home/tc/storage/comproxy/ComProxy.ini";

/// Port used when the ComProxy file names none
pub const DEFAULT_PORT_NAME: &str = "/dev/ttyS0";

/// Default receipt design file name
pub const DEFAULT_DESIGN_PATH: &str = "new.DPirit_SD";

/// ComProxy key naming the physical serial port (matched case-insensitively)
pub const PHYSICAL_PORT_KEY: &str = "physical_port=";

/// Default terminal password
pub const DEFAULT_PASSWORD: &str = "PIRI";

/// Default packet id; the session never changes it
pub const DEFAULT_PACKET_ID: u8 = 0x20;

/// Errors that can occur while loading configuration or input files
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Password must be exactly 4 ASCII characters, got '{0}'")]
    InvalidPassword(String),
}

/// Protocol settings shared by the codec and the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Terminal access password (4 ASCII characters)
    pub password: String,
    /// Packet id stamped on every outbound frame
    pub packet_id: u8,
    /// Wait after the liveness probe before reading the reply
    pub probe_wait_ms: u64,
    /// Deadline for a framed response
    pub response_timeout_ms: u64,
    /// Interval between bytes-available polls inside the response deadline
    pub poll_interval_ms: u64,
    /// Deadline for the single readiness byte of a payload upload
    pub ack_timeout_ms: u64,
    /// Verify start byte, end byte and checksum of inbound frames
    pub verify_frames: bool,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            password: DEFAULT_PASSWORD.to_string(),
            packet_id: DEFAULT_PACKET_ID,
            probe_wait_ms: 1000,
            response_timeout_ms: 1000,
            poll_interval_ms: 10,
            ack_timeout_ms: 5000,
            verify_frames: false,
        }
    }
}

impl ProtocolConfig {
    /// Parse settings from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load settings from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Check invariants serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.password.len() != 4 || !self.password.is_ascii() {
            return Err(ConfigError::InvalidPassword(self.password.clone()));
        }
        Ok(())
    }

    pub(crate) fn probe_wait(&self) -> Duration {
        Duration::from_millis(self.probe_wait_ms)
    }

    pub(crate) fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub(crate) fn poll_interval(&self) -> Duration {
        // Zero would spin without advancing the deadline
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub(crate) fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }
}

/// Find the port name in ComProxy configuration text.
///
/// The last `physical_port=` line wins.
pub fn port_from_comproxy(contents: &str) -> Option<String> {
    contents
        .lines()
        .filter_map(|line| {
            let key = line.get(..PHYSICAL_PORT_KEY.len())?;
            if !key.eq_ignore_ascii_case(PHYSICAL_PORT_KEY) {
                return None;
            }
            let value = line[PHYSICAL_PORT_KEY.len()..].trim();
            (!value.is_empty()).then(|| value.to_string())
        })
        .last()
}

/// Resolve the serial port from a ComProxy file, falling back to [`DEFAULT_PORT_NAME`]
pub fn resolve_port(comproxy_path: &Path) -> Result<String, ConfigError> {
    let contents = std::fs::read_to_string(comproxy_path).map_err(|source| ConfigError::Io {
        path: comproxy_path.to_path_buf(),
        source,
    })?;

    match port_from_comproxy(&contents) {
        Some(port) => {
            tracing::info!("Port {} taken from {}", port, comproxy_path.display());
            Ok(port)
        }
        None => {
            tracing::warn!(
                "No {} entry in {}, using {}",
                PHYSICAL_PORT_KEY,
                comproxy_path.display(),
                DEFAULT_PORT_NAME
            );
            Ok(DEFAULT_PORT_NAME.to_string())
        }
    }
}

/// Read an input payload (design or logo) from disk
pub fn load_payload(path: &Path) -> Result<Vec<u8>, ConfigError> {
    std::fs::read(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ProtocolConfig::default();
        assert_eq!(config.password, "PIRI");
        assert_eq!(config.packet_id, 0x20);
        assert_eq!(config.probe_wait(), Duration::from_millis(1000));
        assert_eq!(config.response_timeout(), Duration::from_millis(1000));
        assert!(!config.verify_frames);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ProtocolConfig::from_json(r#"{ "verify_frames": true, "ack_timeout_ms": 250 }"#)
            .unwrap();
        assert!(config.verify_frames);
        assert_eq!(config.ack_timeout_ms, 250);
        assert_eq!(config.password, "PIRI");
    }

    #[test]
    fn test_bad_password_rejected() {
        let err = ProtocolConfig::from_json(r#"{ "password": "PIRIT" }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPassword(p) if p == "PIRIT"));
    }

    #[test]
    fn test_zero_poll_interval_is_clamped() {
        let config = ProtocolConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_port_from_comproxy() {
        let ini = "[main]\nlogical_port=/dev/ttyV0\nPhysical_Port=/dev/ttyUSB0\r\n";
        assert_eq!(port_from_comproxy(ini).as_deref(), Some("/dev/ttyUSB0"));
    }

    #[test]
    fn test_port_from_comproxy_last_wins() {
        let ini = "physical_port=/dev/ttyS0\nphysical_port=/dev/ttyS1\n";
        assert_eq!(port_from_comproxy(ini).as_deref(), Some("/dev/ttyS1"));
    }

    #[test]
    fn test_port_from_comproxy_ignores_indented_and_empty() {
        let ini = "  physical_port=/dev/ttyS3\nphysical_port=\n";
        assert_eq!(port_from_comproxy(ini), None);
    }

    #[test]
    fn test_resolve_port_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "physical_port=/dev/ttyACM0").unwrap();
        assert_eq!(resolve_port(file.path()).unwrap(), "/dev/ttyACM0");
    }

    #[test]
    fn test_resolve_port_defaults_when_missing_key() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "baud=57600").unwrap();
        assert_eq!(resolve_port(file.path()).unwrap(), DEFAULT_PORT_NAME);
    }

    #[test]
    fn test_resolve_port_missing_file() {
        let err = resolve_port(Path::new("/nonexistent/ComProxy.ini")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
