//! Replication Loop
//!
//! Drives a replica towards its leader's state:
//!
//! 1. **Poll** the leader for its smallest pending outbox entry. Nothing pending:
//!    sleep `poll_interval` and poll again.
//! 2. **Apply** the entry with `Database::set_local`, which never queues it for
//!    further replication. Re-applying the same entry is harmless.
//! 3. **Acknowledge** it on the leader. Removed, already gone or superseded all
//!    count as done; a newer value will be picked up by a later poll. If the leader
//!    cannot be reached, only the acknowledgment is retried after a backoff.
//!
//! The loop checks its stop signal between cycles and while sleeping.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

use super::client::{AckOutcome, LeaderClient, TransportError};
use crate::config::ReplicationConfig;
use crate::storage::{Database, OutboxEntry, StorageError};

#[derive(Debug, Error)]
pub enum ReplicationError {
    #[error("failed to poll leader: {0}")]
    Poll(#[source] TransportError),

    #[error("failed to apply entry locally: {0}")]
    Apply(#[from] StorageError),

    /// The entry is applied locally but the leader has not heard about it.
    #[error("failed to acknowledge entry: {source}")]
    Ack {
        entry: OutboxEntry,
        #[source]
        source: TransportError,
    },
}

/// Outcome of one replication cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The leader had nothing pending.
    Idle,
    /// An entry was applied locally and acknowledged.
    Applied { entry: OutboxEntry, ack: AckOutcome },
}

pub struct Replicator<L> {
    db: Arc<Database>,
    leader: L,
    poll_interval: Duration,
    retry_backoff: Duration,
}

impl<L: LeaderClient> Replicator<L> {
    pub fn new(db: Arc<Database>, leader: L, config: &ReplicationConfig) -> Self {
        Self {
            db,
            leader,
            poll_interval: config.poll_interval(),
            retry_backoff: config.retry_backoff(),
        }
    }

    /// Runs a single poll → apply → acknowledge cycle.
    pub async fn step(&self) -> Result<Step, ReplicationError> {
        let Some(entry) = self
            .leader
            .oldest_entry()
            .await
            .map_err(ReplicationError::Poll)?
        else {
            return Ok(Step::Idle);
        };

        self.db.set_local(&entry.key, &entry.value)?;
        tracing::debug!(
            "Applied replicated key {:?}",
            String::from_utf8_lossy(&entry.key)
        );

        let ack = self.acknowledge(&entry).await?;
        Ok(Step::Applied { entry, ack })
    }

    /// Acknowledges an already applied entry on the leader.
    pub async fn acknowledge(&self, entry: &OutboxEntry) -> Result<AckOutcome, ReplicationError> {
        match self.leader.acknowledge(entry).await {
            Ok(outcome) => {
                if let AckOutcome::Rejected(reason) = &outcome {
                    tracing::debug!(
                        "Leader kept key {:?} after acknowledgment: {}",
                        String::from_utf8_lossy(&entry.key),
                        reason.trim()
                    );
                }
                Ok(outcome)
            }
            Err(source) => Err(ReplicationError::Ack {
                entry: entry.clone(),
                source,
            }),
        }
    }

    /// Replicates until `stop` turns `true` or its sender is dropped.
    ///
    /// Transport and transient storage failures are logged and retried. Only a
    /// corrupted local database ends the loop with an error.
    pub async fn run(self, mut stop: watch::Receiver<bool>) -> Result<(), ReplicationError> {
        tracing::info!("Replication loop started");

        let mut pending_ack: Option<OutboxEntry> = None;

        loop {
            if *stop.borrow() {
                break;
            }

            let delay = match pending_ack.take() {
                Some(entry) => match self.acknowledge(&entry).await {
                    Ok(_) => Duration::ZERO,
                    Err(e) => {
                        tracing::warn!("{}", e);
                        pending_ack = Some(entry);
                        self.backoff()
                    }
                },
                None => match self.step().await {
                    Ok(Step::Idle) => self.poll_interval,
                    Ok(Step::Applied { .. }) => Duration::ZERO,
                    Err(ReplicationError::Ack { entry, source }) => {
                        tracing::warn!(
                            "Failed to acknowledge key {:?}, will retry: {}",
                            String::from_utf8_lossy(&entry.key),
                            source
                        );
                        pending_ack = Some(entry);
                        self.backoff()
                    }
                    Err(ReplicationError::Apply(e)) if e.is_fatal() => {
                        tracing::error!("Local database is corrupted, stopping replication: {}", e);
                        return Err(ReplicationError::Apply(e));
                    }
                    Err(e) => {
                        tracing::warn!("Replication cycle failed: {}", e);
                        self.backoff()
                    }
                },
            };

            if delay.is_zero() {
                continue;
            }

            let stopped = tokio::select! {
                changed = stop.changed() => changed.is_err(),
                _ = tokio::time::sleep(delay) => false,
            };
            if stopped {
                break;
            }
        }

        tracing::info!("Replication loop stopped");
        Ok(())
    }

    fn backoff(&self) -> Duration {
        let jitter = rand::random::<u64>() % 50;
        self.retry_backoff + Duration::from_millis(jitter)
    }
}
