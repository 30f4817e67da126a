//! Configuration management for the REAPER OSC bridge
//!
//! Settings come from an optional YAML file, then `REAPER_*` environment
//! variables (a `.env` file is loaded by the binary beforehand). Loaded once at
//! startup and read-only afterwards.

use crate::osc::UnhandledPolicy;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tokio::fs;

pub const ENV_LISTEN_IP: &str = "REAPER_LISTEN_IP";
pub const ENV_LISTEN_PORT: &str = "REAPER_LISTEN_PORT";
pub const ENV_SEND_HOST: &str = "REAPER_SEND_HOST";
pub const ENV_SEND_PORT: &str = "REAPER_SEND_PORT";
pub const ENV_LOG_UNHANDLED: &str = "REAPER_LOG_UNHANDLED";
pub const ENV_LOG_UNHANDLED_LEVEL: &str = "REAPER_LOG_UNHANDLED_LEVEL";
pub const ENV_API_PORT: &str = "REAPER_API_PORT";

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct BridgeConfig {
    /// Local address the OSC listener binds to
    pub listen_ip: String,
    pub listen_port: u16,
    /// REAPER's OSC receive host (for action triggers)
    pub send_host: String,
    pub send_port: u16,
    /// Log messages no handler claims
    pub log_unhandled: bool,
    pub log_unhandled_level: LogLevel,
    /// HTTP query API port
    pub api_port: u16,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            listen_ip: "0.0.0.0".to_string(),
            listen_port: 9000,
            send_host: "localhost".to_string(),
            send_port: 9001,
            log_unhandled: true,
            log_unhandled_level: LogLevel::Debug,
            api_port: 8000,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a YAML file
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Override fields from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Override fields from any key lookup (the environment in production)
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ip) = lookup(ENV_LISTEN_IP) {
            self.listen_ip = ip;
        }
        if let Some(port) = lookup(ENV_LISTEN_PORT) {
            self.listen_port = parse_var(ENV_LISTEN_PORT, &port)?;
        }
        if let Some(host) = lookup(ENV_SEND_HOST) {
            self.send_host = host;
        }
        if let Some(port) = lookup(ENV_SEND_PORT) {
            self.send_port = parse_var(ENV_SEND_PORT, &port)?;
        }
        if let Some(flag) = lookup(ENV_LOG_UNHANDLED) {
            self.log_unhandled = parse_flag(&flag)
                .ok_or_else(|| anyhow!("Invalid {}: '{}' is not a boolean", ENV_LOG_UNHANDLED, flag))?;
        }
        if let Some(level) = lookup(ENV_LOG_UNHANDLED_LEVEL) {
            self.log_unhandled_level = parse_var(ENV_LOG_UNHANDLED_LEVEL, &level)?;
        }
        if let Some(port) = lookup(ENV_API_PORT) {
            self.api_port = parse_var(ENV_API_PORT, &port)?;
        }
        Ok(())
    }

    /// `ip:port` for the OSC listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen_ip, self.listen_port)
    }

    pub fn unhandled_policy(&self) -> UnhandledPolicy {
        UnhandledPolicy {
            enabled: self.log_unhandled,
            level: self.log_unhandled_level.into(),
        }
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| anyhow!("Invalid {}: '{}' ({})", key, value, e))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Severity for unhandled-message records
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[serde(alias = "warning")]
    Warn,
    Info,
    Debug,
    Trace,
}

impl FromStr for LogLevel {
    type Err = String;

    /// Accepts level names and the classic numeric levels (10 = debug ... 50 = critical)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" | "critical" | "40" | "50" => Ok(LogLevel::Error),
            "warn" | "warning" | "30" => Ok(LogLevel::Warn),
            "info" | "20" => Ok(LogLevel::Info),
            "debug" | "10" => Ok(LogLevel::Debug),
            "trace" | "0" => Ok(LogLevel::Trace),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}
