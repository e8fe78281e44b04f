//! Wire types for the relay endpoints.
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The body of an incoming `POST /chat` request.
///
/// `query` is kept as a raw JSON value so that a missing, null, or non-string query can all be
/// reported the same way.
#[derive(Debug, Clone, Default)]
pub(crate) struct ChatRequest {
    pub(crate) query: Option<Value>,
}

impl ChatRequest {
    /// Reads `query` off a parsed body. Only a JSON object can carry one: arrays and scalars
    /// yield a request without a query.
    pub(crate) fn from_json(body: Value) -> Self {
        let query = match body {
            Value::Object(mut fields) => fields.remove("query"),
            _ => None,
        };
        Self { query }
    }

    /// The query to forward, if present and non-empty.
    pub(crate) fn query(&self) -> Option<&str> {
        self.query
            .as_ref()
            .and_then(|value| value.as_str())
            .filter(|query| !query.is_empty())
    }
}

/// The body posted to the downstream AI service.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct DownstreamQuery<'a> {
    pub(crate) query: &'a str,
}

/// The body of every error reply.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}
