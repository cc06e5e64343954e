//! Probe execution reports and the per-task result history.
//!
//! A [`ProbeReport`] is the record of one probe execution: when it started
//! and finished, the variant-specific payload it produced, and an optional
//! `error` string. The presence of `error` means the probe failed or was
//! only partially successful; its absence means success.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Serde helpers for epoch-second (f64) timestamps on the wire.
pub mod epoch {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Convert a datetime to fractional epoch seconds.
    pub fn to_f64(dt: &DateTime<Utc>) -> f64 {
        dt.timestamp_micros() as f64 / 1e6
    }

    /// Convert fractional epoch seconds to a datetime, rejecting values the
    /// datetime type cannot represent (and NaN/infinities).
    pub fn try_from_f64(secs: f64) -> Option<DateTime<Utc>> {
        if !secs.is_finite() {
            return None;
        }
        let micros = secs * 1e6;
        if micros < i64::MIN as f64 || micros > i64::MAX as f64 {
            return None;
        }
        DateTime::from_timestamp_micros(micros as i64)
    }

    /// Convert fractional epoch seconds to a datetime.
    ///
    /// Out-of-range values clamp to the unix epoch; use
    /// [`try_from_f64`] where rejection is wanted instead.
    pub fn from_f64(secs: f64) -> DateTime<Utc> {
        try_from_f64(secs).unwrap_or_default()
    }

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_f64(to_f64(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<DateTime<Utc>, D::Error> {
        Ok(from_f64(f64::deserialize(de)?))
    }
}

/// One hop of a traceroute. A silent hop is reported as `"*"` for both
/// fields, matching what the wire has always carried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceHop {
    pub ip_address: String,
    pub rtt: String,
}

/// Variant-specific payload of a probe report, flattened into the report
/// object on the wire.
///
/// Untagged: the variant is implied by the task's `type`, so the wire shape
/// is just the payload fields. Variants are ordered most-specific first for
/// deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProbePayload {
    SystemInfo {
        description: String,
        object_id: String,
        /// Uptime in seconds (SNMP reports hundredths).
        uptime: f64,
        contact: String,
        name: String,
        location: String,
        services: u32,
    },
    Trace {
        hops: Vec<TraceHop>,
    },
    Ssh {
        output: String,
        exit_status: i32,
    },
    HttpGet {
        status_code: u16,
        response: String,
    },
    Ping {
        packets_sent: u64,
        packets_recv: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        avg: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        mdev: Option<f64>,
    },
    InterfaceOctets {
        #[serde(rename = "ifHCInOctets")]
        if_hc_in_octets: Option<u64>,
        #[serde(rename = "ifHCOutOctets")]
        if_hc_out_octets: Option<u64>,
    },
}

/// The record of one probe execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeReport {
    #[serde(with = "epoch")]
    pub started_at: DateTime<Utc>,
    #[serde(with = "epoch")]
    pub finished_at: DateTime<Utc>,
    /// Present when the probe failed or was partial.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub payload: Option<ProbePayload>,
}

impl ProbeReport {
    /// Whether this execution completed without error.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Append-only history of reports attached to a task.
///
/// The sink is shared between the queued task and any in-flight dispatch of
/// it: the scheduler hands a clone to the spawned probe, which appends its
/// report on completion while the task itself is already back in the queue.
/// Insertion order is execution order.
#[derive(Debug, Clone, Default)]
pub struct ResultSink {
    inner: Arc<Mutex<Vec<ProbeReport>>>,
}

impl ResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one report to the history.
    pub fn append(&self, report: ProbeReport) {
        let mut reports = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        reports.push(report);
    }

    /// Clone the current history, in execution order.
    pub fn snapshot(&self) -> Vec<ProbeReport> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of accumulated reports.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
