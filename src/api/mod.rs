//! HTTP API Module
//!
//! The request-handling side of a node.
//!
//! ## Flow
//! For `/get` and `/set` the owner of the key is computed first. If another shard
//! owns it, the untouched request is forwarded there and the peer's response is
//! returned; no local storage call happens. Otherwise the local `Database` serves it.
//!
//! `/get-old-key` and `/delete-replica-key` form the leader side of replication;
//! `/delete-extra` reclaims space after a manual reshard.
//!
//! ## Submodules
//! - **`protocol`**: endpoint paths and DTOs.
//! - **`extract`**: the `ShardRequest` extractor that keeps the raw request for forwarding.
//! - **`forward`**: the HTTP relay to peer shards.
//! - **`handlers`**: axum handlers.
//! - **`server`**: `ShardServer`, the shared handler state and router builder.

pub mod extract;
pub mod forward;
pub mod handlers;
pub mod protocol;
pub mod server;

pub use forward::Forwarder;
pub use server::ShardServer;
