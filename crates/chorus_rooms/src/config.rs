//! Runtime configuration for lobby and room behaviour.

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Configuration loaded from a TOML file.
///
/// Every key is optional; missing keys take the defaults below.
#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
pub struct RoomsConfig {
    /// Text placed between the two client ids in a room name.
    #[serde(default = "default_separator")]
    room_name_separator: String,

    /// Ignore a second join from the client already waiting in the lobby.
    /// Off by default, so such a client is paired with itself.
    #[serde(default = "default_reject_duplicate_join")]
    reject_duplicate_join: bool,

    /// Send an `error` to a client joining a full room. When off the
    /// rejection is only logged.
    #[serde(default)]
    notify_full_room: bool,

    /// Tracing filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    log_filter: String,
}

fn default_separator() -> String {
    " vs ".to_string()
}

fn default_reject_duplicate_join() -> bool {
    false
}

fn default_log_filter() -> String {
    "info,chorus_rooms=debug".to_string()
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            room_name_separator: default_separator(),
            reject_duplicate_join: default_reject_duplicate_join(),
            notify_full_room: false,
            log_filter: default_log_filter(),
        }
    }
}

impl RoomsConfig {
    /// Loads configuration from TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config = Self::from_toml(&content)?;
        info!(separator = %config.room_name_separator, "Config loaded successfully");
        Ok(config)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))
    }

    /// Overrides whether duplicate lobby joins are ignored.
    pub fn with_reject_duplicate_join(mut self, reject: bool) -> Self {
        self.reject_duplicate_join = reject;
        self
    }

    /// Overrides whether full-room joins are answered with an error.
    pub fn with_notify_full_room(mut self, notify: bool) -> Self {
        self.notify_full_room = notify;
        self
    }

    /// Options handed to every new game session.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions::new(self.notify_full_room, self.reject_duplicate_join)
    }
}

/// Per-session behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, derive_new::new)]
pub struct SessionOptions {
    /// Answer joins on a full room with an `error`.
    pub notify_full_room: bool,
    /// Ignore a join from a client already seated in the room.
    pub reject_duplicate_join: bool,
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = RoomsConfig::default();
        assert_eq!(config.room_name_separator(), " vs ");
        assert!(!*config.reject_duplicate_join());
        assert!(!*config.notify_full_room());
        assert_eq!(config.session_options(), SessionOptions::default());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = RoomsConfig::from_toml("notify_full_room = true\n").unwrap();
        assert!(*config.notify_full_room());
        assert_eq!(config.room_name_separator(), " vs ");
        assert_eq!(config.log_filter(), "info,chorus_rooms=debug");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "room_name_separator = \":\"").unwrap();
        writeln!(file, "reject_duplicate_join = true").unwrap();

        let config = RoomsConfig::from_file(file.path()).unwrap();
        assert_eq!(config.room_name_separator(), ":");
        assert!(*config.reject_duplicate_join());
        assert_eq!(
            config.session_options(),
            SessionOptions::new(false, true)
        );
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        let err = RoomsConfig::from_toml("notify_full_room = \"yes\"").unwrap_err();
        assert!(err.message.contains("Failed to parse config"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(RoomsConfig::from_file("/definitely/not/here.toml").is_err());
    }
}
