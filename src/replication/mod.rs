//! Replication Module
//!
//! Asynchronous leader → replica mirroring through the leader's outbox.
//!
//! ## Core Concepts
//! - **Outbox**: every `set` on a leader also records the write in its outbox.
//! - **Pull model**: the replica polls, applies, then acknowledges; the leader never
//!   pushes. Delivery is at-least-once and applying is idempotent.
//! - **Compare-and-delete**: an acknowledgment removes the outbox entry only if the
//!   value still matches, so a newer write is never lost.
//! - **Ordering**: entries are pulled in key order, not write order. A replica
//!   converges per key but may see different keys in a different order than written.
//!
//! ## Submodules
//! - **`client`**: the `LeaderClient` seam and its HTTP implementation.
//! - **`replicator`**: the background loop with its stop signal.

pub mod client;
pub mod replicator;

pub use client::{AckOutcome, HttpLeaderClient, LeaderClient, TransportError};
pub use replicator::{ReplicationError, Replicator, Step};
