//! reaction.json configuration parser.
//!
//! The file is deserialized into [`ConfigFile`], which mirrors the on-disk
//! shape loosely, and then validated into a [`ReactionConfig`] that the
//! watchdog consumes read-only for the rest of the process lifetime.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Polling interval used when the file omits one or gives a value below 1.
pub const DEFAULT_INTERVAL_SECS: u64 = 10;

/// Probe connect timeout used when the file omits one or gives a value below 1.
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Config file encoding, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// `.toml` files are TOML; everything else is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

/// Raw config file contents, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub interval: Option<i64>,
    pub timeout: Option<i64>,
    #[serde(alias = "task", alias = "Task")]
    pub target: TargetFile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetFile {
    #[serde(default, alias = "ip")]
    pub address: String,
    #[serde(default)]
    pub port: i64,
    #[serde(default, alias = "initial_index")]
    pub initial_index: Option<i64>,
    #[serde(default)]
    pub actions: Vec<String>,
}

/// Validated watchdog configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionConfig {
    /// Time between reachability probes.
    pub interval: Duration,
    /// Upper bound on a single TCP connect attempt.
    pub probe_timeout: Duration,
    pub target: Target,
}

/// The endpoint to watch and the remediation actions to rotate through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub address: String,
    pub port: u16,
    /// Index of the action the first trigger runs.
    pub initial_index: usize,
    pub actions: Vec<String>,
}

impl Target {
    pub fn endpoint(&self) -> String {
        format_endpoint(&self.address, self.port)
    }
}

/// `address:port`, bracketing bare IPv6 literals.
pub fn format_endpoint(address: &str, port: u16) -> String {
    if address.contains(':') && !address.starts_with('[') {
        format!("[{address}]:{port}")
    } else {
        format!("{address}:{port}")
    }
}

impl ReactionConfig {
    /// Read, parse, and validate a config file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let file = ConfigFile::parse(&content, ConfigFormat::from_path(path)).map_err(|message| {
            ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            }
        })?;

        file.validate()
    }
}

impl ConfigFile {
    /// Parse file contents in the given format.
    ///
    /// The error is the parser's message, ready to be wrapped with the path.
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self, String> {
        match format {
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        }
    }

    /// Apply defaults and check every field the watchdog relies on.
    pub fn validate(self) -> ConfigResult<ReactionConfig> {
        let target = self.target;

        let address = target.address.trim().to_string();
        if address.is_empty() {
            return Err(ConfigError::InvalidAddress(target.address));
        }

        let port = u16::try_from(target.port)
            .ok()
            .filter(|p| *p >= 1)
            .ok_or(ConfigError::InvalidPort(target.port))?;

        if target.actions.is_empty() {
            return Err(ConfigError::NoActions);
        }
        if let Some(index) = target.actions.iter().position(|a| a.trim().is_empty()) {
            return Err(ConfigError::EmptyAction { index });
        }

        let len = target.actions.len();
        let initial_index = match target.initial_index {
            None => 0,
            Some(i) => usize::try_from(i)
                .ok()
                .filter(|i| *i < len)
                .ok_or(ConfigError::InitialIndexOutOfRange { index: i, len })?,
        };

        Ok(ReactionConfig {
            interval: positive_secs(self.interval, DEFAULT_INTERVAL_SECS),
            probe_timeout: positive_secs(self.timeout, DEFAULT_TIMEOUT_SECS),
            target: Target {
                address,
                port,
                initial_index,
                actions: target.actions,
            },
        })
    }
}

fn positive_secs(value: Option<i64>, default: u64) -> Duration {
    match value {
        Some(secs) if secs >= 1 => Duration::from_secs(secs as u64),
        _ => Duration::from_secs(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_json(s: &str) -> ConfigResult<ReactionConfig> {
        ConfigFile::parse(s, ConfigFormat::Json).unwrap().validate()
    }

    #[test]
    fn parse_full_json() {
        let config = parse_json(
            r#"{
                "interval": 3,
                "timeout": 2,
                "target": {
                    "address": "10.0.0.5",
                    "port": 5432,
                    "initialIndex": 1,
                    "actions": ["systemctl restart postgresql", "reboot"]
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.interval, Duration::from_secs(3));
        assert_eq!(config.probe_timeout, Duration::from_secs(2));
        assert_eq!(config.target.address, "10.0.0.5");
        assert_eq!(config.target.port, 5432);
        assert_eq!(config.target.initial_index, 1);
        assert_eq!(config.target.actions.len(), 2);
        assert_eq!(config.target.endpoint(), "10.0.0.5:5432");
    }

    #[test]
    fn parse_legacy_task_shape() {
        let config = parse_json(
            r#"{
                "interval": 30,
                "Task": { "ip": "127.0.0.1", "port": 80, "init": true, "actions": ["echo hi"] }
            }"#,
        )
        .unwrap();

        assert_eq!(config.target.address, "127.0.0.1");
        assert_eq!(config.target.port, 80);
        assert_eq!(config.target.initial_index, 0);
    }

    #[test]
    fn interval_and_timeout_default_when_missing_or_invalid() {
        let missing = parse_json(
            r#"{ "target": { "address": "localhost", "port": 22, "actions": ["true"] } }"#,
        )
        .unwrap();
        assert_eq!(missing.interval, Duration::from_secs(DEFAULT_INTERVAL_SECS));
        assert_eq!(missing.probe_timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        let invalid = parse_json(
            r#"{ "interval": 0, "timeout": -4,
                 "target": { "address": "localhost", "port": 22, "actions": ["true"] } }"#,
        )
        .unwrap();
        assert_eq!(invalid.interval, Duration::from_secs(10));
        assert_eq!(invalid.probe_timeout, Duration::from_secs(5));
    }

    #[test]
    fn parse_toml() {
        let file = ConfigFile::parse(
            r#"
interval = 15

[target]
address = "db.internal"
port = 6379
actions = ["redis-cli shutdown", "systemctl restart redis"]
"#,
            ConfigFormat::Toml,
        )
        .unwrap();
        let config = file.validate().unwrap();
        assert_eq!(config.interval, Duration::from_secs(15));
        assert_eq!(config.target.endpoint(), "db.internal:6379");
    }

    #[test]
    fn blank_address_rejected() {
        let err = parse_json(r#"{ "target": { "address": "  ", "port": 22, "actions": ["true"] } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidAddress(_)));

        let err = parse_json(r#"{ "target": { "port": 22, "actions": ["true"] } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidAddress(_)));
    }

    #[test]
    fn port_out_of_range_rejected() {
        for port in [0, -1, 70000] {
            let err = parse_json(&format!(
                r#"{{ "target": {{ "address": "localhost", "port": {port}, "actions": ["true"] }} }}"#
            ))
            .unwrap_err();
            assert!(matches!(err, ConfigError::InvalidPort(p) if p == port));
        }
    }

    #[test]
    fn empty_actions_rejected() {
        let err = parse_json(r#"{ "target": { "address": "localhost", "port": 22, "actions": [] } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::NoActions));
        assert_eq!(err.to_string(), "target has no actions");

        let err = parse_json(
            r#"{ "target": { "address": "localhost", "port": 22, "actions": ["true", " "] } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyAction { index: 1 }));
    }

    #[test]
    fn initial_index_must_fit_actions() {
        let err = parse_json(
            r#"{ "target": { "address": "localhost", "port": 22, "initialIndex": 2, "actions": ["a", "b"] } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InitialIndexOutOfRange { index: 2, len: 2 }));
    }

    #[test]
    fn ipv6_endpoint_is_bracketed() {
        let config = parse_json(r#"{ "target": { "address": "::1", "port": 8080, "actions": ["true"] } }"#)
            .unwrap();
        assert_eq!(config.target.endpoint(), "[::1]:8080");
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("reaction.json")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("/etc/reaction.TOML")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("reaction")), ConfigFormat::Json);
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reaction.json");
        std::fs::write(
            &path,
            r#"{ "interval": 1, "target": { "address": "127.0.0.1", "port": 9, "actions": ["echo A", "echo B"] } }"#,
        )
        .unwrap();

        let config = ReactionConfig::load(&path).unwrap();
        assert_eq!(config.interval, Duration::from_secs(1));
        assert_eq!(config.target.actions, vec!["echo A", "echo B"]);
    }

    #[test]
    fn load_missing_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let err = ReactionConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("absent.json"));
    }

    #[test]
    fn load_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reaction.toml");
        std::fs::write(&path, "interval = [").unwrap();
        let err = ReactionConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
