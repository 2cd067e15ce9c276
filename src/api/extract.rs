use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::{HeaderValue, Method, StatusCode, Uri, header},
};
use percent_encoding::percent_decode;
use serde::de::DeserializeOwned;

use super::protocol::HEADER_FORWARDED_FROM;

/// A keyed request, parsed but kept intact so it can be forwarded verbatim.
///
/// Parameters come from the form body when present, otherwise from the query string.
/// Keys and values must decode to UTF-8; anything else is rejected rather than
/// stored with replacement characters.
pub struct ShardRequest<T> {
    pub params: T,
    pub method: Method,
    pub uri: Uri,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
    /// Shard index of the node that forwarded this request, if any.
    pub forwarded_from: Option<usize>,
}

#[async_trait]
impl<S, T> FromRequest<S> for ShardRequest<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = (StatusCode, String);

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let method = req.method().clone();
        let uri = req.uri().clone();
        let content_type = req.headers().get(header::CONTENT_TYPE).cloned();
        let forwarded_from = req
            .headers()
            .get(HEADER_FORWARDED_FROM)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok());

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, format!("cannot read body: {}", e)))?;

        let raw = if body.is_empty() {
            uri.query().unwrap_or_default().as_bytes()
        } else {
            &body[..]
        };
        if percent_decode(raw).decode_utf8().is_err() {
            return Err((
                StatusCode::BAD_REQUEST,
                "invalid parameters: not valid UTF-8".to_string(),
            ));
        }
        let params: T = serde_urlencoded::from_bytes(raw)
            .map_err(|e| (StatusCode::BAD_REQUEST, format!("invalid parameters: {}", e)))?;

        Ok(Self {
            params,
            method,
            uri,
            content_type,
            body,
            forwarded_from,
        })
    }
}
