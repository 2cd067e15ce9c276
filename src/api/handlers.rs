use axum::{
    Extension, Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::extract::ShardRequest;
use super::protocol::{
    DeleteExtraResponse, GetResponse, KeyParams, KeyValueParams, NextKeyValue, SetResponse,
};
use super::server::ShardServer;
use crate::storage::StorageError;

fn storage_status(err: &StorageError) -> StatusCode {
    match err {
        StorageError::ReadOnly => StatusCode::FORBIDDEN,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn empty_key() -> Response {
    (StatusCode::BAD_REQUEST, "key must not be empty").into_response()
}

pub async fn handle_get(
    Extension(server): Extension<Arc<ShardServer>>,
    request: ShardRequest<KeyParams>,
) -> Response {
    let key = request.params.key.as_bytes();
    if key.is_empty() {
        return empty_key();
    }

    if !server.topology.is_local(key) {
        let owner = server.topology.owner_of(key);
        return server.forward(owner, &request).await;
    }
    let current_shard = server.current_shard();
    let shard = current_shard;

    let (status, value, error) = match server.db.get(key) {
        Ok(Some(value)) => (
            StatusCode::OK,
            Some(String::from_utf8_lossy(&value).into_owned()),
            None,
        ),
        Ok(None) => (StatusCode::NOT_FOUND, None, None),
        Err(e) => {
            tracing::error!("Failed to read key {:?}: {}", request.params.key, e);
            (storage_status(&e), None, Some(e.to_string()))
        }
    };

    (
        status,
        Json(GetResponse {
            shard,
            current_shard,
            key: request.params.key.clone(),
            value,
            error,
        }),
    )
        .into_response()
}

pub async fn handle_set(
    Extension(server): Extension<Arc<ShardServer>>,
    request: ShardRequest<KeyValueParams>,
) -> Response {
    let key = request.params.key.as_bytes();
    if key.is_empty() {
        return empty_key();
    }

    if !server.topology.is_local(key) {
        let owner = server.topology.owner_of(key);
        return server.forward(owner, &request).await;
    }
    let current_shard = server.current_shard();
    let shard = current_shard;

    match server.db.set(key, request.params.value.as_bytes()) {
        Ok(()) => {
            tracing::debug!("Stored key {:?} on shard {}", request.params.key, shard);
            (
                StatusCode::OK,
                Json(SetResponse {
                    shard,
                    current_shard,
                    success: true,
                    error: None,
                }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::warn!("Failed to set key {:?}: {}", request.params.key, e);
            (
                storage_status(&e),
                Json(SetResponse {
                    shard,
                    current_shard,
                    success: false,
                    error: Some(e.to_string()),
                }),
            )
                .into_response()
        }
    }
}

/// Drops every local key whose owner under the current topology is another shard.
pub async fn handle_delete_extra(Extension(server): Extension<Arc<ShardServer>>) -> Response {
    let topology = server.topology.clone();
    let current_shard = topology.current_index();

    match server
        .db
        .purge_where(|key| !topology.is_local(key))
    {
        Ok(purged) => {
            tracing::info!("Purged {} keys not owned by shard {}", purged, current_shard);
            (
                StatusCode::OK,
                Json(DeleteExtraResponse {
                    purged,
                    error: None,
                }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Failed to purge extra keys: {}", e);
            (
                storage_status(&e),
                Json(DeleteExtraResponse {
                    purged: 0,
                    error: Some(e.to_string()),
                }),
            )
                .into_response()
        }
    }
}

pub async fn handle_get_old_key(Extension(server): Extension<Arc<ShardServer>>) -> Json<NextKeyValue> {
    let next = match server.db.oldest_outbox_entry() {
        Ok(Some(entry)) => NextKeyValue {
            key: String::from_utf8_lossy(&entry.key).into_owned(),
            value: String::from_utf8_lossy(&entry.value).into_owned(),
            error: None,
        },
        Ok(None) => NextKeyValue::default(),
        Err(e) => {
            tracing::error!("Failed to read outbox: {}", e);
            NextKeyValue {
                error: Some(e.to_string()),
                ..NextKeyValue::default()
            }
        }
    };
    Json(next)
}

pub async fn handle_delete_replica_key(
    Extension(server): Extension<Arc<ShardServer>>,
    request: ShardRequest<KeyValueParams>,
) -> Response {
    let KeyValueParams { key, value } = &request.params;

    match server.db.ack_outbox_entry(key.as_bytes(), value.as_bytes()) {
        Ok(()) => {
            tracing::debug!("Replica acknowledged key {:?}", key);
            (StatusCode::OK, "ok").into_response()
        }
        Err(e @ (StorageError::NotFound | StorageError::ValueMismatch)) => {
            tracing::debug!("Rejected acknowledgment for key {:?}: {}", key, e);
            (StatusCode::EXPECTATION_FAILED, format!("error: {}", e)).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to acknowledge key {:?}: {}", key, e);
            (storage_status(&e), format!("error: {}", e)).into_response()
        }
    }
}
