use axum::{
    Extension, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;

use super::extract::ShardRequest;
use super::forward::Forwarder;
use super::handlers::*;
use super::protocol::*;
use crate::sharding::Topology;
use crate::storage::Database;

/// Everything a node needs to answer requests: its storage, the shard layout
/// and an HTTP client for forwarding. Built once by `main` and shared by all handlers.
pub struct ShardServer {
    pub db: Arc<Database>,
    pub topology: Arc<Topology>,
    forwarder: Forwarder,
}

impl ShardServer {
    pub fn new(db: Arc<Database>, topology: Arc<Topology>, forwarder: Forwarder) -> Arc<Self> {
        Arc::new(Self {
            db,
            topology,
            forwarder,
        })
    }

    pub fn current_shard(&self) -> usize {
        self.topology.current_index()
    }

    /// Builds the HTTP router with this server bound to every handler.
    pub fn router(self: Arc<Self>) -> Router {
        Router::new()
            .route(ENDPOINT_GET, get(handle_get).post(handle_get))
            .route(ENDPOINT_SET, get(handle_set).post(handle_set))
            .route(ENDPOINT_DELETE_EXTRA, post(handle_delete_extra))
            .route(ENDPOINT_GET_OLD_KEY, get(handle_get_old_key))
            .route(ENDPOINT_DELETE_REPLICA_KEY, post(handle_delete_replica_key))
            .layer(Extension(self))
    }

    /// Sends `request` to the node owning `shard` and relays its answer.
    pub(crate) async fn forward<T>(&self, shard: usize, request: &ShardRequest<T>) -> Response {
        let current = self.current_shard();

        // A request that was already forwarded once must be served where it landed;
        // if this node disagrees about ownership the topologies are out of sync.
        if let Some(origin) = request.forwarded_from {
            tracing::error!(
                "Shard {} forwarded a key owned by shard {} to shard {}; refusing second hop",
                origin,
                shard,
                current
            );
            return (
                StatusCode::MISDIRECTED_REQUEST,
                format!(
                    "shard {} does not own this key (owner is shard {}), topology mismatch",
                    current, shard
                ),
            )
                .into_response();
        }

        let Some(address) = self.topology.address_of(shard) else {
            tracing::error!("No address for shard {}", shard);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("no address for shard {}", shard),
            )
                .into_response();
        };

        self.forwarder
            .forward(current, shard, address, request)
            .await
    }
}
