//! Agent configuration.
//!
//! One JSON file configures the whole poller. Every section and every field
//! has a default, so an empty object `{}` is a valid config and a file only
//! needs to name what it changes.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::probes::{SnmpSettings, SshSettings};
use crate::scheduler::{
    DEFAULT_ARCHIVE_CAPACITY, DEFAULT_DISPATCH_TIMEOUT, DEFAULT_MAX_IN_FLIGHT,
    DEFAULT_TICK_INTERVAL,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

fn default_listen_host() -> String {
    "127.0.0.1".to_string()
}

fn default_listen_port() -> u16 {
    9090
}

/// Where the control plane listens.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListenConfig {
    #[serde(default = "default_listen_host")]
    pub host: String,
    #[serde(default = "default_listen_port")]
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_listen_host(),
            port: default_listen_port(),
        }
    }
}

fn default_keepalive_secs() -> u64 {
    120
}

fn default_poller_name() -> String {
    "sonde".to_string()
}

/// Controller to register with. Optional; a poller without one runs
/// standalone and only takes tasks through its own API.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControllerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_poller_name")]
    pub name: String,
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,
}

fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL.as_millis() as u64
}

fn default_max_in_flight() -> usize {
    DEFAULT_MAX_IN_FLIGHT
}

fn default_dispatch_timeout_secs() -> u64 {
    DEFAULT_DISPATCH_TIMEOUT.as_secs()
}

fn default_archive_capacity() -> usize {
    DEFAULT_ARCHIVE_CAPACITY
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    #[serde(default = "default_dispatch_timeout_secs")]
    pub dispatch_timeout_secs: u64,
    #[serde(default = "default_archive_capacity")]
    pub archive_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            max_in_flight: default_max_in_flight(),
            dispatch_timeout_secs: default_dispatch_timeout_secs(),
            archive_capacity: default_archive_capacity(),
        }
    }
}

impl SchedulerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch_timeout_secs)
    }
}

fn default_snmp_community() -> String {
    "public".to_string()
}

fn default_snmp_port() -> u16 {
    161
}

fn default_snmp_timeout_secs() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnmpConfig {
    #[serde(default = "default_snmp_community")]
    pub community: String,
    #[serde(default = "default_snmp_port")]
    pub port: u16,
    #[serde(default = "default_snmp_timeout_secs")]
    pub timeout_secs: u32,
    #[serde(default)]
    pub retries: u32,
}

impl Default for SnmpConfig {
    fn default() -> Self {
        Self {
            community: default_snmp_community(),
            port: default_snmp_port(),
            timeout_secs: default_snmp_timeout_secs(),
            retries: 0,
        }
    }
}

impl SnmpConfig {
    pub fn settings(&self) -> SnmpSettings {
        SnmpSettings {
            community: self.community.clone(),
            port: self.port,
            timeout: self.timeout_secs,
            retries: self.retries,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SshConfig {
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub identity_file: Option<PathBuf>,
}

impl SshConfig {
    pub fn settings(&self) -> SshSettings {
        SshSettings {
            login: self.login.clone(),
            identity_file: self.identity_file.clone(),
        }
    }
}

/// The whole agent configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub controller: Option<ControllerConfig>,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub snmp: SnmpConfig,
    #[serde(default)]
    pub ssh: SshConfig,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }
}
