//! Sharded Key-Value Store Library
//!
//! Core modules of a statically sharded key-value node. The binary (`main.rs`)
//! wires them together.
//!
//! ## Architecture Modules
//! - **`storage`**: redb-backed engine with a primary namespace and a replication
//!   outbox, written together in one transaction.
//! - **`sharding`**: the validated shard topology and the key → shard hash.
//! - **`api`**: HTTP handlers that serve owned keys locally and forward the rest
//!   to the owning shard.
//! - **`replication`**: the replica-side loop pulling a leader's outbox.
//! - **`config`**: TOML node configuration.

pub mod api;
pub mod config;
pub mod replication;
pub mod sharding;
pub mod storage;
