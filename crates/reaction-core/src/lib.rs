//! reaction-core — configuration for the reaction watchdog.
//!
//! Loads `reaction.json` (or a `.toml` equivalent), applies defaults, and
//! validates it into a [`ReactionConfig`]. A [`ConfigError`] is the only
//! error that stops the watchdog from starting.

pub mod config;
pub mod error;

pub use config::{ConfigFile, ConfigFormat, ReactionConfig, Target, format_endpoint};
pub use error::{ConfigError, ConfigResult};
