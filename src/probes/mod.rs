//! Probe definitions and execution.
//!
//! [`ProbeSpec`] is the closed set of probe variants the poller knows how to
//! run; its serde tag is the wire `type` field. [`ProbeRunner`] is the
//! capability the scheduler dispatches through, and [`Dispatcher`] is the
//! production implementation. Adding a variant touches this module and its
//! probe file, never the scheduler.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::core::report::{ProbePayload, ProbeReport};

pub mod http;
pub mod ping;
pub mod snmp;
pub mod ssh;
pub mod trace;

pub use snmp::SnmpSettings;
pub use ssh::SshSettings;

fn default_ping_count() -> u32 {
    9
}

fn default_ping_preload() -> u32 {
    3
}

fn default_ping_timeout() -> u32 {
    1
}

fn default_trace_wait() -> u32 {
    1
}

fn default_trace_max_hops() -> u32 {
    20
}

/// A probe definition: which check to run and against what.
///
/// The serde tag values are the wire `type` names the controller sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProbeSpec {
    /// ICMP echo via the OS `ping` binary.
    Ping {
        device: String,
        #[serde(default = "default_ping_count")]
        count: u32,
        #[serde(default = "default_ping_preload")]
        preload: u32,
        /// Per-reply timeout in seconds (`ping -W`).
        #[serde(default = "default_ping_timeout")]
        timeout: u32,
    },
    /// Path discovery via the OS `traceroute` binary.
    Trace {
        device: String,
        #[serde(default = "default_trace_wait")]
        wait_time: u32,
        #[serde(default = "default_trace_max_hops")]
        max_hops: u32,
        /// Probe with ICMP echo instead of UDP.
        #[serde(default)]
        icmp: bool,
    },
    /// SNMP bulk walk of the system subtree (1.3.6.1.2.1.1).
    SystemInfoProbe { device: String },
    /// SNMP GET of ifHCInOctets/ifHCOutOctets for one interface.
    InterfaceOctetsProbe { device: String, if_index: u32 },
    /// HTTP GET of a page.
    GetPage { url: String },
    /// Run one command on a remote device over SSH.
    SshRunSingleCommand {
        device: String,
        cmd: String,
        /// Overrides the configured SSH login for this task.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        username: Option<String>,
    },
}

impl ProbeSpec {
    /// Wire `type` names of every known variant.
    pub const KINDS: [&'static str; 6] = [
        "Ping",
        "Trace",
        "SystemInfoProbe",
        "InterfaceOctetsProbe",
        "GetPage",
        "SshRunSingleCommand",
    ];

    /// Whether a wire `type` value names a known variant.
    pub fn is_known(kind: &str) -> bool {
        Self::KINDS.contains(&kind)
    }

    /// The wire `type` name of this variant.
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeSpec::Ping { .. } => "Ping",
            ProbeSpec::Trace { .. } => "Trace",
            ProbeSpec::SystemInfoProbe { .. } => "SystemInfoProbe",
            ProbeSpec::InterfaceOctetsProbe { .. } => "InterfaceOctetsProbe",
            ProbeSpec::GetPage { .. } => "GetPage",
            ProbeSpec::SshRunSingleCommand { .. } => "SshRunSingleCommand",
        }
    }

    /// The probed target, for logging.
    pub fn target(&self) -> &str {
        match self {
            ProbeSpec::Ping { device, .. }
            | ProbeSpec::Trace { device, .. }
            | ProbeSpec::SystemInfoProbe { device }
            | ProbeSpec::InterfaceOctetsProbe { device, .. }
            | ProbeSpec::SshRunSingleCommand { device, .. } => device,
            ProbeSpec::GetPage { url } => url,
        }
    }
}

/// Errors a probe execution can produce. These never cross the scheduler
/// boundary as errors; the dispatcher folds them into the report's `error`
/// field.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The probe's external command could not be started.
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The probe's external command failed outright.
    #[error("{0}")]
    CommandFailed(String),

    /// The HTTP request failed (connect, timeout, invalid URL).
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Command output did not have the expected shape.
    #[error("unparseable probe output: {0}")]
    Parse(String),
}

/// What one probe execution produced.
#[derive(Debug)]
pub enum ProbeStatus {
    /// A full payload, no error.
    Complete(ProbePayload),
    /// A partial payload alongside an error (e.g. an unreachable host still
    /// reports its packet counters).
    Partial(ProbePayload, String),
}

/// The capability the scheduler dispatches through: execute one probe and
/// produce a timestamped report. Implementations must not panic; failures
/// belong in the report's `error` field.
#[async_trait]
pub trait ProbeRunner: Send + Sync {
    async fn run(&self, spec: &ProbeSpec) -> ProbeReport;
}

/// Production probe runner: holds the shared HTTP client and the SNMP/SSH
/// settings, and routes each spec variant to its probe implementation.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    http: reqwest::Client,
    snmp: SnmpSettings,
    ssh: SshSettings,
}

impl Dispatcher {
    /// Build a dispatcher. `http_timeout` bounds every HTTP GET probe at the
    /// client level.
    pub fn new(http_timeout: Duration) -> Result<Self, ProbeError> {
        let http = reqwest::Client::builder().timeout(http_timeout).build()?;
        Ok(Self {
            http,
            snmp: SnmpSettings::default(),
            ssh: SshSettings::default(),
        })
    }

    pub fn with_snmp(mut self, snmp: SnmpSettings) -> Self {
        self.snmp = snmp;
        self
    }

    pub fn with_ssh(mut self, ssh: SshSettings) -> Self {
        self.ssh = ssh;
        self
    }

    async fn execute(&self, spec: &ProbeSpec) -> Result<ProbeStatus, ProbeError> {
        match spec {
            ProbeSpec::Ping {
                device,
                count,
                preload,
                timeout,
            } => ping::run(device, *count, *preload, *timeout).await,
            ProbeSpec::Trace {
                device,
                wait_time,
                max_hops,
                icmp,
            } => trace::run(device, *wait_time, *max_hops, *icmp).await,
            ProbeSpec::SystemInfoProbe { device } => snmp::system_info(&self.snmp, device).await,
            ProbeSpec::InterfaceOctetsProbe { device, if_index } => {
                snmp::interface_octets(&self.snmp, device, *if_index).await
            }
            ProbeSpec::GetPage { url } => http::get_page(&self.http, url).await,
            ProbeSpec::SshRunSingleCommand {
                device,
                cmd,
                username,
            } => ssh::run_command(&self.ssh, device, cmd, username.as_deref()).await,
        }
    }
}

#[async_trait]
impl ProbeRunner for Dispatcher {
    async fn run(&self, spec: &ProbeSpec) -> ProbeReport {
        let started_at = Utc::now();
        let (payload, error) = match self.execute(spec).await {
            Ok(ProbeStatus::Complete(payload)) => (Some(payload), None),
            Ok(ProbeStatus::Partial(payload, error)) => (Some(payload), Some(error)),
            Err(e) => (None, Some(e.to_string())),
        };

        ProbeReport {
            started_at,
            finished_at: Utc::now(),
            error,
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_tag_round_trip() {
        let spec = ProbeSpec::GetPage {
            url: "http://example.org".to_string(),
        };
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["type"], "GetPage");
        assert_eq!(json["url"], "http://example.org");

        let back: ProbeSpec = serde_json::from_value(json).unwrap();
        assert_eq!(back, spec);
    }

    #[test]
    fn test_ping_defaults_applied() {
        let spec: ProbeSpec =
            serde_json::from_value(serde_json::json!({"type": "Ping", "device": "192.0.2.1"}))
                .unwrap();
        match spec {
            ProbeSpec::Ping {
                count,
                preload,
                timeout,
                ..
            } => {
                assert_eq!((count, preload, timeout), (9, 3, 1));
            }
            other => panic!("expected ping, got {:?}", other),
        }
    }

    #[test]
    fn test_trace_defaults_applied() {
        let spec: ProbeSpec =
            serde_json::from_value(serde_json::json!({"type": "Trace", "device": "192.0.2.1"}))
                .unwrap();
        match spec {
            ProbeSpec::Trace {
                wait_time,
                max_hops,
                icmp,
                ..
            } => {
                assert_eq!((wait_time, max_hops, icmp), (1, 20, false));
            }
            other => panic!("expected trace, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(!ProbeSpec::is_known("Unknown"));
        let result: Result<ProbeSpec, _> =
            serde_json::from_value(serde_json::json!({"type": "Unknown"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_every_kind_is_known() {
        for kind in ProbeSpec::KINDS {
            assert!(ProbeSpec::is_known(kind));
        }
    }
}
