//! Leader Client
//!
//! The replica's view of its leader: fetch the next pending outbox entry and
//! acknowledge it once applied. `HttpLeaderClient` talks to the leader's
//! `/get-old-key` and `/delete-replica-key` endpoints; tests substitute an
//! in-process implementation.

use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::api::protocol::{
    ENDPOINT_DELETE_REPLICA_KEY, ENDPOINT_GET_OLD_KEY, KeyValueParams, NextKeyValue,
};
use crate::storage::OutboxEntry;

/// Failure to reach the leader or to understand its answer. Always retryable.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to leader failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("leader responded with {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("cannot encode request: {0}")]
    Encode(#[from] serde_urlencoded::ser::Error),

    #[error("leader reported an error: {0}")]
    Remote(String),
}

/// Result of a delivered acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckOutcome {
    /// The leader removed the outbox entry.
    Removed,
    /// The leader kept its entry: it was already gone or a newer value superseded it.
    Rejected(String),
}

pub trait LeaderClient: Send + Sync {
    /// The leader's smallest pending outbox entry, or `None` if nothing is pending.
    fn oldest_entry(
        &self,
    ) -> impl Future<Output = Result<Option<OutboxEntry>, TransportError>> + Send;

    /// Compare-and-delete the entry on the leader.
    fn acknowledge(
        &self,
        entry: &OutboxEntry,
    ) -> impl Future<Output = Result<AckOutcome, TransportError>> + Send;
}

pub struct HttpLeaderClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpLeaderClient {
    /// `leader_addr` is the leader's `host:port`.
    pub fn new(leader_addr: &str, timeout: Duration) -> Result<Self, TransportError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url: format!("http://{}", leader_addr.trim_end_matches('/')),
        })
    }
}

impl LeaderClient for HttpLeaderClient {
    async fn oldest_entry(&self) -> Result<Option<OutboxEntry>, TransportError> {
        let url = format!("{}{}", self.base_url, ENDPOINT_GET_OLD_KEY);
        let response = self.http_client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status { status, body });
        }

        let next: NextKeyValue = response.json().await?;
        if let Some(error) = next.error {
            return Err(TransportError::Remote(error));
        }
        if next.key.is_empty() {
            return Ok(None);
        }

        Ok(Some(OutboxEntry {
            key: next.key.into_bytes(),
            value: next.value.into_bytes(),
        }))
    }

    async fn acknowledge(&self, entry: &OutboxEntry) -> Result<AckOutcome, TransportError> {
        let url = format!("{}{}", self.base_url, ENDPOINT_DELETE_REPLICA_KEY);
        let form = serde_urlencoded::to_string(KeyValueParams {
            key: String::from_utf8_lossy(&entry.key).into_owned(),
            value: String::from_utf8_lossy(&entry.value).into_owned(),
        })?;

        let response = self
            .http_client
            .post(url)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::OK => Ok(AckOutcome::Removed),
            StatusCode::EXPECTATION_FAILED => Ok(AckOutcome::Rejected(body)),
            _ => Err(TransportError::Status { status, body }),
        }
    }
}
