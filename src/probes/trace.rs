//! Traceroute probe via the OS `traceroute` binary.

use std::net::IpAddr;
use std::process::Stdio;
use tokio::process::Command;

use super::{ProbeError, ProbeStatus};
use crate::core::report::{ProbePayload, TraceHop};

/// Run a traceroute against `device` and collect the hop list.
///
/// Numeric output, one query per hop; `icmp` switches the probe packets
/// from UDP to ICMP echo.
pub async fn run(
    device: &str,
    wait_time: u32,
    max_hops: u32,
    icmp: bool,
) -> Result<ProbeStatus, ProbeError> {
    let mut cmd = Command::new("traceroute");
    cmd.arg("-n");
    if icmp {
        cmd.arg("-I");
    }
    cmd.args(["-w", &wait_time.to_string()])
        .args(["-m", &max_hops.to_string()])
        .args(["-q", "1"])
        .arg(device)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let output = cmd.output().await.map_err(|source| ProbeError::Spawn {
        command: "traceroute",
        source,
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    if stdout.trim().is_empty() {
        return Err(ProbeError::CommandFailed(if stderr.trim().is_empty() {
            format!("traceroute produced no output (exit: {})", output.status)
        } else {
            stderr.trim().to_string()
        }));
    }

    let payload = parse_output(&stdout);
    // traceroute writes warnings to stderr while still producing hops;
    // surface them without discarding the path.
    if stderr.trim().is_empty() {
        Ok(ProbeStatus::Complete(payload))
    } else {
        Ok(ProbeStatus::Partial(payload, stderr.trim().to_string()))
    }
}

/// Parse traceroute output, skipping the `traceroute to ...` header.
fn parse_output(stdout: &str) -> ProbePayload {
    let hops = stdout.lines().skip(1).filter_map(parse_hop).collect();
    ProbePayload::Trace { hops }
}

/// Parse one hop line.
///
/// With `-n -q 1` a line is ` 3  198.51.100.7  4.321 ms` or ` 4  *` for a
/// silent hop; anything else (unparseable addresses, empty lines) is
/// dropped.
fn parse_hop(line: &str) -> Option<TraceHop> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 2 {
        return None;
    }

    if fields[1] == "*" {
        return Some(TraceHop {
            ip_address: "*".to_string(),
            rtt: "*".to_string(),
        });
    }

    if fields[1].parse::<IpAddr>().is_err() {
        return None;
    }

    let rtt = fields
        .get(2)
        .map(|v| v.to_string())
        .unwrap_or_else(|| "*".to_string());

    Some(TraceHop {
        ip_address: fields[1].to_string(),
        rtt,
    })
}
