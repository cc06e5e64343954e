//! SSH single-command probe via the OS `ssh` binary.
//!
//! Runs in batch mode, so only key-based auth works; the login and identity
//! file come from configuration, with a per-task username override.

use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

use super::{ProbeError, ProbeStatus};
use crate::core::report::ProbePayload;

/// SSH client settings shared by every SSH probe.
#[derive(Debug, Clone, Default)]
pub struct SshSettings {
    /// Default remote login name.
    pub login: Option<String>,
    /// Private key to authenticate with.
    pub identity_file: Option<PathBuf>,
}

/// Run one command on `device` and report its output and exit status.
pub async fn run_command(
    settings: &SshSettings,
    device: &str,
    cmd: &str,
    username: Option<&str>,
) -> Result<ProbeStatus, ProbeError> {
    let mut ssh = Command::new("ssh");
    ssh.args(["-o", "BatchMode=yes"])
        .args(["-o", "StrictHostKeyChecking=accept-new"]);

    if let Some(identity) = &settings.identity_file {
        ssh.arg("-i").arg(identity);
    }
    if let Some(login) = username.or(settings.login.as_deref()) {
        ssh.args(["-l", login]);
    }

    let output = ssh
        .arg(device)
        .arg(cmd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|source| ProbeError::Spawn {
            command: "ssh",
            source,
        })?;

    let exit_status = output.status.code().unwrap_or(-1);
    let payload = ProbePayload::Ssh {
        output: String::from_utf8_lossy(&output.stdout).to_string(),
        exit_status,
    };

    if output.status.success() {
        Ok(ProbeStatus::Complete(payload))
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let error = if stderr.trim().is_empty() {
            format!("ssh exited with status {}", exit_status)
        } else {
            stderr.trim().to_string()
        };
        Ok(ProbeStatus::Partial(payload, error))
    }
}
