//! Axum handlers for the relay server
use crate::client::HttpClient;
use crate::downstream::Downstream;
use crate::errors::RelayError;
use crate::models::ChatRequest;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::{debug, info, instrument};

use crate::Relay;

pub const GREETING: &str = "Relay server is running";

/// Liveness endpoint. Always answers 200, whatever the request looked like.
#[instrument]
pub async fn root() -> &'static str {
    GREETING
}

/// Relays a chat query to the downstream AI service and hands back its answer verbatim.
#[instrument(skip(relay, headers, body))]
pub async fn chat<T: HttpClient + Clone + Send + Sync + 'static>(
    State(relay): State<Relay<T>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, RelayError> {
    let downstream = &relay.downstream;

    // Bodies that aren't declared as JSON are left unparsed, so they carry no query.
    let request = if body.is_empty() || !is_json(&headers) {
        ChatRequest::default()
    } else {
        let value = serde_json::from_slice(&body).map_err(|e| {
            debug!("Rejecting malformed chat body: {}", e);
            RelayError::InvalidBody
        })?;
        ChatRequest::from_json(value)
    };
    let query = request.query().ok_or(RelayError::MissingQuery)?;

    info!("Relaying query of {} bytes to {}", query.len(), downstream.url);

    let call = forward(&relay.http_client, downstream, query);
    match downstream.timeout {
        Some(timeout) => tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| RelayError::DownstreamTimeout(timeout))?,
        None => call.await,
    }
}

/// Whether the request declares a JSON body (`application/json`, parameters allowed).
fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}

/// Posts the query downstream and buffers the reply. Anything but a 2xx is a failure.
async fn forward<T: HttpClient + Sync>(
    client: &T,
    downstream: &Downstream,
    query: &str,
) -> Result<Response, RelayError> {
    let req = downstream
        .chat_request(query)
        .map_err(|e| RelayError::DownstreamUnavailable(e.to_string()))?;

    let response = client
        .request(req)
        .await
        .map_err(|e| RelayError::DownstreamUnavailable(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(RelayError::DownstreamStatus(status));
    }

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("application/json"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .map_err(|e| RelayError::DownstreamBody(e.to_string()))?;

    debug!("Downstream answered with {} bytes", body.len());

    Ok((StatusCode::OK, [(header::CONTENT_TYPE, content_type)], body).into_response())
}
