//! HTTP Protocol
//!
//! Endpoint paths and the request/response bodies exchanged with clients and
//! between nodes. Request parameters are form-encoded (query string on GET,
//! `application/x-www-form-urlencoded` body otherwise); responses are JSON,
//! except the acknowledgment endpoint which answers with plain text.

use serde::{Deserialize, Serialize};

// --- API Endpoints ---

/// Public read, forwarded to the owning shard when needed.
pub const ENDPOINT_GET: &str = "/get";
/// Public write, forwarded to the owning shard when needed.
pub const ENDPOINT_SET: &str = "/set";
/// Administrative purge of keys the topology no longer assigns to this shard.
pub const ENDPOINT_DELETE_EXTRA: &str = "/delete-extra";
/// Replica poll: the smallest pending outbox entry.
pub const ENDPOINT_GET_OLD_KEY: &str = "/get-old-key";
/// Replica acknowledgment: compare-and-delete on the outbox.
pub const ENDPOINT_DELETE_REPLICA_KEY: &str = "/delete-replica-key";

/// Set on requests a node forwards, so a misrouted request is never forwarded twice.
pub const HEADER_FORWARDED_FROM: &str = "x-forwarded-from-shard";

// --- Requests ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyParams {
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyValueParams {
    pub key: String,
    pub value: String,
}

// --- Responses ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetResponse {
    /// Shard that owns the key.
    pub shard: usize,
    /// Shard that answered.
    pub current_shard: usize,
    pub key: String,
    /// `None` when the key does not exist.
    pub value: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetResponse {
    pub shard: usize,
    pub current_shard: usize,
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteExtraResponse {
    pub purged: usize,
    pub error: Option<String>,
}

/// Answer to `/get-old-key`. Key and value are empty when the outbox is empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NextKeyValue {
    pub key: String,
    pub value: String,
    pub error: Option<String>,
}
