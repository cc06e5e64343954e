//! ICMP echo probe via the OS `ping` binary.

use std::process::Stdio;
use tokio::process::Command;

use super::{ProbeError, ProbeStatus};
use crate::core::report::ProbePayload;

/// Run a ping against `device` and parse the summary statistics.
pub async fn run(
    device: &str,
    count: u32,
    preload: u32,
    timeout: u32,
) -> Result<ProbeStatus, ProbeError> {
    let output = Command::new("ping")
        .arg(device)
        .args(["-c", &count.to_string()])
        .args(["-l", &preload.to_string()])
        .args(["-W", &timeout.to_string()])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|source| ProbeError::Spawn {
            command: "ping",
            source,
        })?;

    fold_output(
        &String::from_utf8_lossy(&output.stdout),
        &String::from_utf8_lossy(&output.stderr),
    )
}

/// Combine ping's stdout and stderr into one probe status.
///
/// ping writes warnings to stderr (rcvbuf sizing, DNS) while still printing
/// the full statistics block, so stderr alone is not a failure: a parseable
/// summary with stderr noise is a partial result, and only a summary-less
/// run fails outright.
fn fold_output(stdout: &str, stderr: &str) -> Result<ProbeStatus, ProbeError> {
    let stderr = stderr.trim();
    match parse_output(stdout) {
        Ok(status) if stderr.is_empty() => Ok(status),
        Ok(ProbeStatus::Complete(payload)) => {
            Ok(ProbeStatus::Partial(payload, stderr.to_string()))
        }
        Ok(ProbeStatus::Partial(payload, error)) => Ok(ProbeStatus::Partial(
            payload,
            format!("{}; {}", error, stderr),
        )),
        Err(_) if !stderr.is_empty() => Err(ProbeError::CommandFailed(stderr.to_string())),
        Err(e) => Err(e),
    }
}

/// Parse iputils ping output into a payload.
///
/// The statistics block looks like:
/// ```text
/// --- 192.0.2.1 ping statistics ---
/// 9 packets transmitted, 9 received, 0% packet loss, time 8012ms
/// rtt min/avg/max/mdev = 11.961/12.345/12.780/0.251 ms
/// ```
/// The rtt line is absent when no reply arrived; that case is a partial
/// result with packet counters and an unreachable error.
fn parse_output(stdout: &str) -> Result<ProbeStatus, ProbeError> {
    let counters = stdout
        .lines()
        .find(|line| line.contains("packets transmitted"))
        .ok_or_else(|| ProbeError::Parse("no ping statistics line".to_string()))?;

    let fields: Vec<&str> = counters.split_whitespace().collect();
    if fields.len() < 4 {
        return Err(ProbeError::Parse(format!(
            "malformed ping statistics line: {}",
            counters
        )));
    }
    let packets_sent = parse_count(fields[0])?;
    let packets_recv = parse_count(fields[3])?;

    let rtt = stdout
        .lines()
        .find(|line| line.starts_with("rtt min/avg/max/mdev") || line.starts_with("round-trip"));

    let Some(rtt_line) = rtt else {
        return Ok(ProbeStatus::Partial(
            ProbePayload::Ping {
                packets_sent,
                packets_recv,
                min: None,
                avg: None,
                max: None,
                mdev: None,
            },
            "Host unreachable".to_string(),
        ));
    };

    let values = rtt_line
        .split('=')
        .nth(1)
        .map(|v| v.trim().trim_end_matches(" ms"))
        .ok_or_else(|| ProbeError::Parse(format!("malformed rtt line: {}", rtt_line)))?;
    let stats: Vec<f64> = values
        .split('/')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| ProbeError::Parse(format!("malformed rtt values: {}", values)))?;
    if stats.len() != 4 {
        return Err(ProbeError::Parse(format!(
            "expected 4 rtt values, got {}",
            stats.len()
        )));
    }

    Ok(ProbeStatus::Complete(ProbePayload::Ping {
        packets_sent,
        packets_recv,
        min: Some(stats[0]),
        avg: Some(stats[1]),
        max: Some(stats[2]),
        mdev: Some(stats[3]),
    }))
}

fn parse_count(field: &str) -> Result<u64, ProbeError> {
    field
        .trim_end_matches(',')
        .parse::<u64>()
        .map_err(|_| ProbeError::Parse(format!("bad packet count: {}", field)))
}
