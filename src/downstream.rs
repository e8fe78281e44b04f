//! The downstream is the AI service that `POST /chat` relays queries to. It's fixed for the
//! lifetime of the process: built once from the config and carried in the application state.
//!
//! Incoming queries are re-wrapped as `{"query": ...}` and posted to the downstream URL; whatever
//! the downstream answers is handed back to the caller unchanged.
use axum::http::{Method, Uri, header};
use bon::Builder;
use std::time::Duration;
use url::Url;

use crate::models::DownstreamQuery;

/// A downstream endpoint, specified by its absolute URL.
///
/// ## Timeouts
/// A downstream can carry a timeout bounding the whole outbound call, from connecting to reading
/// the last byte of the response body. Without one, the relay waits for as long as the downstream
/// takes.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct Downstream {
    pub url: Url,
    pub timeout: Option<Duration>,
}

impl Downstream {
    /// Build the outbound request carrying `query` to this downstream.
    pub(crate) fn chat_request(
        &self,
        query: &str,
    ) -> Result<axum::extract::Request, Box<dyn std::error::Error + Send + Sync>> {
        let body = serde_json::to_vec(&DownstreamQuery { query })?;
        let uri = Uri::try_from(self.url.as_str())?;

        let mut builder = axum::http::Request::builder()
            .method(Method::POST)
            .uri(&uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::CONTENT_LENGTH, body.len());

        // Set the host header to match the downstream (hyper doesn't fill it in for us).
        if let Some(host) = uri.host() {
            let host_value = match uri.port_u16() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            };
            builder = builder.header(header::HOST, host_value);
        }

        Ok(builder.body(axum::body::Body::from(body))?)
    }
}
