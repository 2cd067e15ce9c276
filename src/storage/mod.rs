//! Storage Engine Module
//!
//! Durable single-node key-value storage backed by redb.
//!
//! ## Core Concepts
//! - **Primary namespace**: the data this node owns (or mirrors, on a replica).
//! - **Outbox namespace**: writes still waiting for replica acknowledgment. At most
//!   one entry per key; a newer write overwrites the pending one.
//! - **Dual write**: `set` updates both namespaces in one transaction, while
//!   `set_local` (the replica apply path) touches only the primary namespace.
//! - **Compare-and-delete**: outbox entries are removed only when the acknowledged
//!   value still matches.

pub mod engine;
pub mod errors;

pub use engine::{Database, OutboxEntry};
pub use errors::StorageError;

#[cfg(test)]
mod tests;
