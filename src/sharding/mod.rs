//! Shard Routing Module
//!
//! Maps keys to the shard that owns them and shard indices to node addresses.
//!
//! ## Core Concepts
//! - **Ownership**: `xxHash64(key) % shard_count`, seed 0. Every node computes the same
//!   owner for the same key, so changing the hash or the shard count moves data and
//!   needs a manual reshard followed by `/delete-extra`.
//! - **Topology**: immutable after construction; shared by reference between request
//!   handlers and the replication loop.

pub mod topology;

pub use topology::{Topology, TopologyError};
