//! Controller registration and keepalive.
//!
//! A poller announces itself to its controller once at startup and then
//! heartbeats on a fixed interval so the controller knows the agent is
//! still alive. The controller reaches back through the control plane the
//! poller advertises here.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("controller request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("controller answered {status} to {endpoint}")]
    Rejected {
        endpoint: &'static str,
        status: reqwest::StatusCode,
    },
}

/// Announcement body for both registration and keepalive.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Announcement {
    pub name: String,
    pub ip: String,
    pub port: u16,
}

/// Client for the controller's poller-facing endpoints.
pub struct ControllerClient {
    http: reqwest::Client,
    base_url: String,
    announcement: Announcement,
    keepalive_interval: Duration,
}

impl ControllerClient {
    /// `host`/`port` locate the controller; the announcement carries this
    /// poller's own name and listen address.
    pub fn new(
        host: &str,
        port: u16,
        announcement: Announcement,
    ) -> Result<Self, ControllerError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            base_url: format!("http://{}:{}", host, port),
            announcement,
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
        })
    }

    pub fn with_keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = interval;
        self
    }

    async fn announce(&self, endpoint: &'static str) -> Result<(), ControllerError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self
            .http
            .post(&url)
            .json(&self.announcement)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ControllerError::Rejected { endpoint, status });
        }
        Ok(())
    }

    /// Register this poller with the controller.
    pub async fn register(&self) -> Result<(), ControllerError> {
        self.announce("/pollers/register").await
    }

    /// Send one heartbeat.
    pub async fn keepalive(&self) -> Result<(), ControllerError> {
        self.announce("/pollers/keepalive").await
    }

    /// Heartbeat forever. A failed heartbeat is logged and retried on the
    /// next interval; losing the controller for a while never stops the
    /// poller itself.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.keepalive_interval);
        interval.tick().await; // first tick fires immediately, skip it

        loop {
            interval.tick().await;
            match self.keepalive().await {
                Ok(()) => tracing::debug!(poller = %self.announcement.name, "keepalive sent"),
                Err(e) => tracing::warn!(error = %e, "keepalive failed, will retry"),
            }
        }
    }
}
