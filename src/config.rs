//! # Configuration
//!
//! Three layers, each optional:
//!
//! - [`GatewayConfig`]: engine options (`RPCGATE_VERBOSE`).
//! - [`RuntimeConfig`]: coroutine runtime tuning (`RPCGATE_STACK_SIZE`).
//! - [`Settings`]: a YAML file grouping the above with the HTTP and log
//!   settings, loaded by the `rpcgate` binary with `--config`.
//!
//! ```yaml
//! gateway:
//!   verbose: true
//! http:
//!   addr: "0.0.0.0:8080"
//! log:
//!   level: debug
//!   format: pretty
//! runtime:
//!   stack_size: 0x8000
//! ```
//!
//! Command-line flags override file values; the file overrides the environment.

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use std::env;
use std::path::Path;

use crate::logging::{LogConfig, LogFormat};

/// Default coroutine stack size (64 KB)
pub const DEFAULT_STACK_SIZE: usize = 0x10000;

/// Default listen address for the HTTP adapter
pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:8080";

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Parse a byte count written in decimal or `0x` hex.
pub fn parse_size(raw: &str) -> Option<usize> {
    let raw = raw.trim();
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    }
}

/// Engine options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Log every method excluded from the registry, with its reason
    pub verbose: bool,
}

impl GatewayConfig {
    #[must_use]
    pub fn verbose(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load from `RPCGATE_VERBOSE`; unset or unparsable means quiet.
    pub fn from_env() -> Self {
        Self {
            verbose: env::var("RPCGATE_VERBOSE")
                .ok()
                .and_then(|v| parse_flag(&v))
                .unwrap_or(false),
        }
    }
}

/// Coroutine runtime options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RuntimeConfig {
    /// Stack size for coroutines in bytes
    #[serde(deserialize_with = "deserialize_size")]
    pub stack_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl RuntimeConfig {
    /// Load from `RPCGATE_STACK_SIZE` (decimal or `0x` hex).
    pub fn from_env() -> Self {
        let stack_size = env::var("RPCGATE_STACK_SIZE")
            .ok()
            .and_then(|v| parse_size(&v))
            .filter(|&size| size > 0)
            .unwrap_or(DEFAULT_STACK_SIZE);
        Self { stack_size }
    }

    /// Apply to the global `may` scheduler. Must run before the first coroutine
    /// is spawned.
    pub fn apply(&self) {
        may::config().set_stack_size(self.stack_size);
    }
}

fn deserialize_size<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Size {
        Number(usize),
        Text(String),
    }
    match Size::deserialize(deserializer)? {
        Size::Number(n) => Ok(n),
        Size::Text(s) => parse_size(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid size: {s:?}"))),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpSettings {
    pub addr: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSettings {
    pub level: Option<String>,
    pub format: Option<LogFormat>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeSettings {
    #[serde(deserialize_with = "deserialize_opt_size")]
    pub stack_size: Option<usize>,
}

fn deserialize_opt_size<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<usize>, D::Error> {
    #[derive(Deserialize)]
    struct Wrapped(#[serde(deserialize_with = "deserialize_size")] usize);
    Ok(Option::<Wrapped>::deserialize(deserializer)?.map(|w| w.0))
}

/// Contents of a YAML settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub gateway: GatewayConfig,
    pub http: HttpSettings,
    pub log: LogSettings,
    pub runtime: RuntimeSettings,
}

impl Settings {
    /// Load settings from a YAML file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or is not valid settings YAML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        Self::from_yaml(&raw)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))
    }

    /// Parse settings from YAML text. An empty document yields the defaults.
    ///
    /// # Errors
    ///
    /// Fails on malformed YAML or unknown keys.
    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).context("Invalid settings YAML")
    }

    /// Environment settings with file values layered on top.
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            verbose: self.gateway.verbose || GatewayConfig::from_env().verbose,
        }
    }

    pub fn runtime_config(&self) -> RuntimeConfig {
        match self.runtime.stack_size {
            Some(stack_size) if stack_size > 0 => RuntimeConfig { stack_size },
            _ => RuntimeConfig::from_env(),
        }
    }

    pub fn log_config(&self) -> LogConfig {
        let mut config = LogConfig::from_env();
        if let Some(level) = &self.log.level {
            config.log_level = level.clone();
        }
        if let Some(format) = self.log.format {
            config.format = format;
        }
        config
    }

    pub fn http_addr(&self) -> &str {
        self.http.addr.as_deref().unwrap_or(DEFAULT_HTTP_ADDR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("16384"), Some(16384));
        assert_eq!(parse_size("0x4000"), Some(0x4000));
        assert_eq!(parse_size(" 0X8000 "), Some(0x8000));
        assert_eq!(parse_size("0xZZ"), None);
        assert_eq!(parse_size("lots"), None);
    }

    #[test]
    fn test_parse_flag() {
        for raw in ["1", "true", "YES", "on"] {
            assert_eq!(parse_flag(raw), Some(true), "{raw}");
        }
        for raw in ["0", "false", "off", ""] {
            assert_eq!(parse_flag(raw), Some(false), "{raw}");
        }
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_settings_from_yaml() {
        let settings = Settings::from_yaml(
            r#"
gateway:
  verbose: true
http:
  addr: "0.0.0.0:9000"
log:
  level: debug
  format: pretty
runtime:
  stack_size: "0x8000"
"#,
        )
        .unwrap();
        assert!(settings.gateway.verbose);
        assert_eq!(settings.http_addr(), "0.0.0.0:9000");
        assert_eq!(settings.log.format, Some(LogFormat::Pretty));
        assert_eq!(settings.runtime_config().stack_size, 0x8000);
        assert_eq!(settings.log_config().log_level, "debug");
    }

    #[test]
    fn test_numeric_stack_size() {
        let settings = Settings::from_yaml("runtime:\n  stack_size: 32768\n").unwrap();
        assert_eq!(settings.runtime.stack_size, Some(32768));
    }

    #[test]
    fn test_empty_and_partial_yaml() {
        assert_eq!(Settings::from_yaml("").unwrap(), Settings::default());
        let settings = Settings::from_yaml("log:\n  level: warn\n").unwrap();
        assert_eq!(settings.http_addr(), DEFAULT_HTTP_ADDR);
        assert!(!settings.gateway.verbose);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(Settings::from_yaml("gatway:\n  verbose: true\n").is_err());
        assert!(Settings::from_yaml("runtime:\n  stack_size: huge\n").is_err());
    }
}
