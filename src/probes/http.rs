//! HTTP GET probe.

use super::{ProbeError, ProbeStatus};
use crate::core::report::ProbePayload;

/// Fetch a page and report its status code and body.
///
/// The client carries the dispatch timeout, so a hanging server surfaces as
/// an error report rather than a stuck task.
pub async fn get_page(client: &reqwest::Client, url: &str) -> Result<ProbeStatus, ProbeError> {
    let response = client.get(url).send().await?;
    let status_code = response.status().as_u16();
    let body = response.text().await?;

    Ok(ProbeStatus::Complete(ProbePayload::HttpGet {
        status_code,
        response: body,
    }))
}
