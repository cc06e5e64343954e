//! SNMP probes via the net-snmp command line tools.
//!
//! Shells out to `snmpget` and `snmpbulkwalk` with numeric OID output
//! (`-On`), the same way the ping and traceroute probes shell out to
//! iputils. v2c community auth only.

use std::collections::HashMap;
use std::process::Stdio;
use tokio::process::Command;

use super::{ProbeError, ProbeStatus};
use crate::core::report::ProbePayload;

/// System subtree: sysDescr through sysServices.
const SYSTEM_OID: &str = "1.3.6.1.2.1.1";
const IF_HC_IN_OCTETS: &str = "1.3.6.1.2.1.31.1.1.1.6";
const IF_HC_OUT_OCTETS: &str = "1.3.6.1.2.1.31.1.1.1.10";

/// SNMP client settings shared by every SNMP probe.
#[derive(Debug, Clone)]
pub struct SnmpSettings {
    /// v2c community string.
    pub community: String,
    pub port: u16,
    /// Request timeout in seconds.
    pub timeout: u32,
    /// Retries after the first request; 0 means a single poll.
    pub retries: u32,
}

impl Default for SnmpSettings {
    fn default() -> Self {
        Self {
            community: "public".to_string(),
            port: 161,
            timeout: 1,
            retries: 0,
        }
    }
}

/// Walk the system subtree and report common system information.
pub async fn system_info(settings: &SnmpSettings, device: &str) -> Result<ProbeStatus, ProbeError> {
    let stdout = run_tool(settings, "snmpbulkwalk", device, SYSTEM_OID).await?;
    let varbinds = parse_varbinds(&stdout);

    let field = |suffix: &str| -> Result<String, ProbeError> {
        varbinds
            .get(&format!(".{}.{}", SYSTEM_OID, suffix))
            .cloned()
            .ok_or_else(|| ProbeError::Parse(format!("missing system OID .{}.{}", SYSTEM_OID, suffix)))
    };

    let uptime = parse_timeticks(&field("3.0")?)?;
    let services = field("7.0")?
        .parse::<u32>()
        .map_err(|_| ProbeError::Parse("bad sysServices value".to_string()))?;

    Ok(ProbeStatus::Complete(ProbePayload::SystemInfo {
        description: field("1.0")?,
        object_id: field("2.0")?,
        uptime,
        contact: field("4.0")?,
        name: field("5.0")?,
        location: field("6.0")?,
        services,
    }))
}

/// GET the high-capacity in/out octet counters for one interface.
///
/// A failed half still reports the other counter, so the payload may be
/// partial with an error alongside it.
pub async fn interface_octets(
    settings: &SnmpSettings,
    device: &str,
    if_index: u32,
) -> Result<ProbeStatus, ProbeError> {
    let in_octets = get_counter(settings, device, IF_HC_IN_OCTETS, if_index).await;
    let out_octets = get_counter(settings, device, IF_HC_OUT_OCTETS, if_index).await;

    match (in_octets, out_octets) {
        (Ok(in_v), Ok(out_v)) => Ok(ProbeStatus::Complete(ProbePayload::InterfaceOctets {
            if_hc_in_octets: Some(in_v),
            if_hc_out_octets: Some(out_v),
        })),
        (in_res, out_res) => {
            let error = [in_res.as_ref().err(), out_res.as_ref().err()]
                .into_iter()
                .flatten()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            Ok(ProbeStatus::Partial(
                ProbePayload::InterfaceOctets {
                    if_hc_in_octets: in_res.ok(),
                    if_hc_out_octets: out_res.ok(),
                },
                error,
            ))
        }
    }
}

async fn get_counter(
    settings: &SnmpSettings,
    device: &str,
    base_oid: &str,
    if_index: u32,
) -> Result<u64, ProbeError> {
    let oid = format!("{}.{}", base_oid, if_index);
    let stdout = run_tool(settings, "snmpget", device, &oid).await?;
    let varbinds = parse_varbinds(&stdout);
    varbinds
        .values()
        .next()
        .and_then(|v| v.parse::<u64>().ok())
        .ok_or_else(|| ProbeError::Parse(format!("no counter value for OID {}", oid)))
}

/// Run one net-snmp tool against `device` and return its stdout.
async fn run_tool(
    settings: &SnmpSettings,
    tool: &'static str,
    device: &str,
    oid: &str,
) -> Result<String, ProbeError> {
    let output = Command::new(tool)
        .args(["-v2c", "-c", &settings.community, "-On"])
        .args(["-t", &settings.timeout.to_string()])
        .args(["-r", &settings.retries.to_string()])
        .arg(format!("{}:{}", device, settings.port))
        .arg(oid)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|source| ProbeError::Spawn {
            command: tool,
            source,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        return Err(ProbeError::CommandFailed(format!("{}: {}", tool, detail)));
    }
    // Timeouts exit 0 but print a diagnostic instead of a varbind.
    if stdout.contains("No Response from") {
        return Err(ProbeError::CommandFailed(stdout.trim().to_string()));
    }

    Ok(stdout)
}

/// Parse `-On` output lines of the form `.1.3.6.1.2.1.1.5.0 = STRING: name`
/// into an OID → value map. Values keep only the part after the type tag,
/// with surrounding quotes stripped.
fn parse_varbinds(stdout: &str) -> HashMap<String, String> {
    stdout
        .lines()
        .filter_map(|line| {
            let (oid, rest) = line.split_once(" = ")?;
            let value = match rest.split_once(": ") {
                Some((_type_tag, v)) => v,
                // e.g. `= ""` for empty octet strings
                None => rest,
            };
            Some((
                oid.trim().to_string(),
                value.trim().trim_matches('"').to_string(),
            ))
        })
        .collect()
}

/// Parse a Timeticks value, `(8675309) 1 day, 0:05:53.09` or a bare tick
/// count, into seconds.
fn parse_timeticks(value: &str) -> Result<f64, ProbeError> {
    let ticks = if let Some(inner) = value.strip_prefix('(') {
        inner
            .split(')')
            .next()
            .and_then(|t| t.parse::<f64>().ok())
    } else {
        value.parse::<f64>().ok()
    };
    ticks
        .map(|t| t / 100.0)
        .ok_or_else(|| ProbeError::Parse(format!("bad timeticks value: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const WALK: &str = "\
.1.3.6.1.2.1.1.1.0 = STRING: Linux core-sw1 5.15.0 #1 SMP x86_64
.1.3.6.1.2.1.1.2.0 = OID: .1.3.6.1.4.1.8072.3.2.10
.1.3.6.1.2.1.1.3.0 = Timeticks: (8675309) 1 day, 0:05:53.09
.1.3.6.1.2.1.1.4.0 = STRING: \"noc@example.org\"
.1.3.6.1.2.1.1.5.0 = STRING: core-sw1
.1.3.6.1.2.1.1.6.0 = STRING: rack 12
.1.3.6.1.2.1.1.7.0 = INTEGER: 72
";

    #[test]
    fn test_parse_varbinds() {
        let varbinds = parse_varbinds(WALK);
        assert_eq!(varbinds.len(), 7);
        assert_eq!(varbinds[".1.3.6.1.2.1.1.5.0"], "core-sw1");
        // quotes stripped
        assert_eq!(varbinds[".1.3.6.1.2.1.1.4.0"], "noc@example.org");
        assert_eq!(varbinds[".1.3.6.1.2.1.1.2.0"], ".1.3.6.1.4.1.8072.3.2.10");
    }

    #[test]
    fn test_parse_timeticks_with_parens() {
        assert_eq!(
            parse_timeticks("(8675309) 1 day, 0:05:53.09").unwrap(),
            86753.09
        );
    }

    #[test]
    fn test_parse_timeticks_bare() {
        assert_eq!(parse_timeticks("100").unwrap(), 1.0);
    }

    #[test]
    fn test_parse_timeticks_garbage() {
        assert!(parse_timeticks("soon").is_err());
    }

    #[test]
    fn test_counter_varbind() {
        let varbinds = parse_varbinds(".1.3.6.1.2.1.31.1.1.1.6.2 = Counter64: 1234567\n");
        assert_eq!(varbinds[".1.3.6.1.2.1.31.1.1.1.6.2"], "1234567");
    }

    #[test]
    fn test_default_settings_match_agent_defaults() {
        let settings = SnmpSettings::default();
        assert_eq!(settings.community, "public");
        assert_eq!(settings.port, 161);
        assert_eq!(settings.timeout, 1);
        assert_eq!(settings.retries, 0);
    }
}
