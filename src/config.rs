//! Tool configuration
//!
//! Settings come from built-in defaults, optionally overridden by a TOML
//! file passed with `--config`, then by command-line flags.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Baud rate of the bGeigie diagnostic console
pub const DEFAULT_BAUD_RATE: u32 = 57600;

/// Port name fragment used by FTDI bridges on macOS
pub const DEFAULT_PORT_PATTERN: &str = "usbserial-";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QcConfig {
    pub baud_rate: u32,
    /// Timeout of a single serial read
    pub read_timeout_ms: u64,
    /// Inactivity window for the diagnostic session
    pub session_timeout_secs: u64,
    /// Substring a port name must contain to be picked automatically
    pub port_pattern: String,
}

impl Default for QcConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: 1000,
            session_timeout_secs: 10,
            port_pattern: DEFAULT_PORT_PATTERN.to_string(),
        }
    }
}

impl QcConfig {
    /// Load a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse_content(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn parse_content(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load `path` if given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = QcConfig::default();
        assert_eq!(config.baud_rate, 57600);
        assert_eq!(config.session_timeout(), Duration::from_secs(10));
        assert_eq!(config.read_timeout(), Duration::from_secs(1));
        assert_eq!(config.port_pattern, "usbserial-");
    }

    #[test]
    fn test_partial_config() {
        let config = QcConfig::parse_content("baud_rate = 9600\nport_pattern = \"ttyUSB\"\n").unwrap();
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.port_pattern, "ttyUSB");
        assert_eq!(config.session_timeout_secs, 10);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(QcConfig::parse_content("baudrate = 9600\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bgeigie-qc.toml");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "session_timeout_secs = 30").unwrap();

        let config = QcConfig::load_or_default(Some(&path)).unwrap();
        assert_eq!(config.session_timeout(), Duration::from_secs(30));
        assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempdir().unwrap();
        assert!(QcConfig::load(&dir.path().join("absent.toml")).is_err());
    }
}
