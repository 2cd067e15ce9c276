//! Request Forwarding
//!
//! Relays a request to the node that owns its key. Method, path, query string,
//! content type and body are sent unchanged; the peer's status, content type and
//! body are streamed back as-is. Failures are not retried here: the client resends.

use axum::{
    body::Body,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use std::time::Duration;

use super::extract::ShardRequest;
use super::protocol::HEADER_FORWARDED_FROM;

pub struct Forwarder {
    http_client: reqwest::Client,
}

impl Forwarder {
    /// Every forwarded call is bounded by `timeout`; a timeout counts as a failed forward.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http_client })
    }

    pub async fn forward<T>(
        &self,
        from_shard: usize,
        to_shard: usize,
        address: &str,
        request: &ShardRequest<T>,
    ) -> Response {
        let path = request
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let url = format!("http://{}{}", address, path);

        tracing::debug!(
            "Redirecting from shard {} to shard {} ({})",
            from_shard,
            to_shard,
            url
        );

        let mut builder = self
            .http_client
            .request(request.method.clone(), &url)
            .header(HEADER_FORWARDED_FROM, from_shard.to_string())
            .body(request.body.clone());
        if let Some(content_type) = &request.content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type.clone());
        }

        let upstream = match builder.send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::error!("Failed to forward request to shard {}: {}", to_shard, e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Error forwarding request: {}", e),
                )
                    .into_response();
            }
        };

        let status = upstream.status();
        let content_type = upstream.headers().get(header::CONTENT_TYPE).cloned();

        let mut response = Body::from_stream(upstream.bytes_stream()).into_response();
        *response.status_mut() = status;
        if let Some(content_type) = content_type {
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, content_type);
        }
        response
    }
}
