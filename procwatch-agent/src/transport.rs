//! HTTP transport to the collector
//!
//! One POST per report, short timeout, no retry. Anything other than a
//! 200 answer is a transport failure for that report only.

use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

pub const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Report status as sent on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WireStatus {
    Online,
    Offline,
}

impl From<bool> for WireStatus {
    fn from(running: bool) -> Self {
        if running {
            WireStatus::Online
        } else {
            WireStatus::Offline
        }
    }
}

/// POST /status body (matches the collector's field names)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// Informational only, the collector uses the connection address
    pub ip: String,
    pub process: String,
    pub status: WireStatus,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("collector answered {0}")]
    Rejected(StatusCode),
}

/// Seam between the reporter and the network
pub trait StatusSender {
    fn send(&self, report: &StatusReport) -> impl Future<Output = Result<(), TransportError>> + Send;
}

pub struct HttpSender {
    client: Client,
    url: String,
}

impl HttpSender {
    pub fn new(url: impl Into<String>) -> Result<Self, TransportError> {
        Self::build(Client::builder(), url)
    }

    fn build(builder: reqwest::ClientBuilder, url: impl Into<String>) -> Result<Self, TransportError> {
        let client = builder.timeout(SEND_TIMEOUT).build()?;
        Ok(Self { client, url: url.into() })
    }
}

impl StatusSender for HttpSender {
    async fn send(&self, report: &StatusReport) -> Result<(), TransportError> {
        let response = self.client.post(&self.url).json(report).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(TransportError::Rejected(status));
        }
        Ok(())
    }
}

/// Best-effort local address for the informational `ip` field
pub fn local_address() -> String {
    local_ip_address::local_ip().map(|ip| ip.to_string()).unwrap_or_default()
}
