//! # Configuration
//!
//! Tunables for firmware generation and loop scheduling. Every field has a
//! default, so an empty TOML document is a valid configuration.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CfgcConfig {
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl CfgcConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path.as_ref())?;
        tracing::debug!("[CFGC] Loaded configuration from {}", path.as_ref().display());
        Self::from_toml_str(&source)
    }
}

/// Values baked into generated firmware
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_serial_baud")]
    pub serial_baud: u32,
    #[serde(default = "default_blink_delay_ms")]
    pub blink_delay_ms: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            serial_baud: default_serial_baud(),
            blink_delay_ms: default_blink_delay_ms(),
        }
    }
}

/// Delays used by the statement scheduler between loop statements
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SchedulerConfig {
    /// Pause after an executed statement so the host can refresh pin state
    #[serde(default = "default_statement_delay_ms")]
    pub statement_delay_ms: u64,
    /// Pause after a statement that failed
    #[serde(default = "default_error_backoff_ms")]
    pub error_backoff_ms: u64,
}

impl SchedulerConfig {
    pub fn statement_delay(&self) -> Duration {
        Duration::from_millis(self.statement_delay_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            statement_delay_ms: default_statement_delay_ms(),
            error_backoff_ms: default_error_backoff_ms(),
        }
    }
}

fn default_serial_baud() -> u32 {
    9600
}

fn default_blink_delay_ms() -> u64 {
    1000
}

fn default_statement_delay_ms() -> u64 {
    10
}

fn default_error_backoff_ms() -> u64 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = CfgcConfig::from_toml_str("").unwrap();
        assert_eq!(config, CfgcConfig::default());
        assert_eq!(config.generator.serial_baud, 9600);
        assert_eq!(config.scheduler.statement_delay(), Duration::from_millis(10));
        assert_eq!(config.scheduler.error_backoff(), Duration::from_millis(100));
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = CfgcConfig::from_toml_str(
            "[generator]\nserial_baud = 115200\n\n[scheduler]\nerror_backoff_ms = 250\n",
        )
        .unwrap();
        assert_eq!(config.generator.serial_baud, 115200);
        assert_eq!(config.generator.blink_delay_ms, 1000);
        assert_eq!(config.scheduler.statement_delay_ms, 10);
        assert_eq!(config.scheduler.error_backoff_ms, 250);
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = CfgcConfig::from_toml_str("[generator\nserial_baud = ").unwrap_err();
        assert!(matches!(err, crate::error::CfgcError::Config(_)));
    }
}
