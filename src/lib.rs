//! Relay - a minimal HTTP relay for chat queries
//!
//! This library exposes a root liveness endpoint and an optional `POST /chat` endpoint that
//! forwards a JSON query to a downstream AI service, relaying its answer back to the caller.

use axum::Router;
use axum::routing::{get, post};
use axum_prometheus::{
    GenericMetricLayer, Handle, PrometheusMetricLayerBuilder,
    metrics_exporter_prometheus::PrometheusHandle,
};
use std::borrow::Cow;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

pub mod client;
pub mod config;
pub mod downstream;
pub mod errors;
pub mod handlers;
pub mod models;

use client::{HttpClient, HyperClient, PoolConfig};
use config::Config;
use downstream::Downstream;
use handlers::{chat, root};

/// The main application state containing the HTTP client and the downstream to relay to
#[derive(Clone, Debug)]
pub struct AppState<T: HttpClient> {
    pub http_client: T,
    /// `None` when the relay is disabled; `POST /chat` is then not routed.
    pub downstream: Option<Downstream>,
}

impl AppState<HyperClient> {
    /// Create a new AppState with the default Hyper client
    pub fn new(downstream: Option<Downstream>) -> Self {
        Self::with_pool(downstream, PoolConfig::default())
    }

    /// Create a new AppState with a Hyper client using the given pool settings
    pub fn with_pool(downstream: Option<Downstream>, pool: PoolConfig) -> Self {
        Self {
            http_client: client::create_hyper_client(pool),
            downstream,
        }
    }

    /// Build the state described by a parsed config
    pub fn from_config(config: &Config) -> Self {
        let pool = PoolConfig {
            idle_timeout: std::time::Duration::from_secs(config.pool_idle_timeout_secs),
            max_idle_per_host: config.pool_max_idle_per_host,
        };
        Self::with_pool(config.downstream(), pool)
    }
}

impl<T: HttpClient> AppState<T> {
    /// Create a new AppState with a custom HTTP client (useful for testing)
    pub fn with_client(downstream: Option<Downstream>, http_client: T) -> Self {
        Self {
            http_client,
            downstream,
        }
    }
}

impl<T: HttpClient + Clone> AppState<T> {
    /// The state served by `POST /chat`, present only when a downstream is configured.
    pub fn relay(&self) -> Option<Relay<T>> {
        self.downstream.as_ref().map(|downstream| Relay {
            http_client: self.http_client.clone(),
            downstream: downstream.clone(),
        })
    }
}

/// State for the `POST /chat` route: the client plus the downstream it always relays to.
#[derive(Clone, Debug)]
pub struct Relay<T: HttpClient> {
    pub http_client: T,
    pub downstream: Downstream,
}

/// Build the main router for the relay
/// This creates routes for:
/// - `/` - Liveness greeting
/// - `/chat` - Relays queries downstream (only when a downstream is configured)
#[instrument(skip(state))]
pub fn build_router<T: HttpClient + Clone + Send + Sync + 'static>(state: AppState<T>) -> Router {
    info!("Building router");
    let mut router = Router::new().route("/", get(root));
    match state.relay() {
        Some(relay) => {
            info!("Relaying POST /chat to {}", relay.downstream.url);
            router = router.route("/chat", post(chat::<T>).with_state(relay));
        }
        None => info!("Relay disabled, POST /chat will not be served"),
    }
    router.layer(TraceLayer::new_for_http())
}

/// Builds a router for the metrics endpoint.
#[instrument(skip(handle))]
pub fn build_metrics_router(handle: PrometheusHandle) -> Router {
    info!("Building metrics router");
    Router::new().route(
        "/metrics",
        axum::routing::get(move || async move { handle.render() }),
    )
}

type MetricsLayerAndHandle = (
    GenericMetricLayer<'static, PrometheusHandle, Handle>,
    PrometheusHandle,
);

/// Builds a layer and handle for prometheus metrics collection.
///
/// # Parameters
/// - `prefix`: A string prefix for the metrics. The `'static` bound comes from the Prometheus
///   metrics layer, which keeps the prefix for the lifetime of the program.
pub fn build_metrics_layer_and_handle(
    prefix: impl Into<Cow<'static, str>>,
) -> MetricsLayerAndHandle {
    info!("Building metrics layer");
    PrometheusMetricLayerBuilder::new()
        .with_prefix(prefix)
        .enable_response_body_size(true)
        .with_endpoint_label_type(axum_prometheus::EndpointLabel::Exact)
        .with_default_metrics()
        .build_pair()
}

#[cfg(test)]
pub mod test_utils {
    use super::*;
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    pub struct MockHttpClient {
        pub requests: Arc<Mutex<Vec<MockRequest>>>,
        response_builder: Arc<dyn Fn() -> MockOutcome + Send + Sync>,
        delay: Option<Duration>,
    }

    pub enum MockOutcome {
        Respond(axum::response::Response),
        Fail(String),
    }

    #[derive(Debug, Clone)]
    pub struct MockRequest {
        pub method: String,
        pub uri: String,
        pub headers: Vec<(String, String)>,
        pub body: Vec<u8>,
    }

    impl MockHttpClient {
        pub fn new(status: StatusCode, body: &str) -> Self {
            let body = body.to_string();
            Self::from_builder(move || {
                MockOutcome::Respond(
                    axum::response::Response::builder()
                        .status(status)
                        .header("content-type", "application/json")
                        .body(axum::body::Body::from(body.clone()))
                        .unwrap(),
                )
            })
        }

        /// A client whose every request fails at the transport level.
        pub fn failing(reason: &str) -> Self {
            let reason = reason.to_string();
            Self::from_builder(move || MockOutcome::Fail(reason.clone()))
        }

        /// Delay every response, for exercising downstream timeouts.
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn from_builder(builder: impl Fn() -> MockOutcome + Send + Sync + 'static) -> Self {
            Self {
                requests: Arc::new(Mutex::new(Vec::new())),
                response_builder: Arc::new(builder),
                delay: None,
            }
        }

        pub fn get_requests(&self) -> Vec<MockRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl std::fmt::Debug for MockHttpClient {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("MockHttpClient")
                .field("requests", &self.requests)
                .field("response_builder", &"<closure>")
                .field("delay", &self.delay)
                .finish()
        }
    }

    impl Clone for MockHttpClient {
        fn clone(&self) -> Self {
            Self {
                requests: Arc::clone(&self.requests),
                response_builder: Arc::clone(&self.response_builder),
                delay: self.delay,
            }
        }
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn request(
            &self,
            req: axum::extract::Request,
        ) -> Result<axum::response::Response, Box<dyn std::error::Error + Send + Sync>> {
            let method = req.method().to_string();
            let uri = req.uri().to_string();
            let headers = req
                .headers()
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
                .collect();

            let body = axum::body::to_bytes(req.into_body(), usize::MAX)
                .await
                .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?
                .to_vec();

            self.requests.lock().unwrap().push(MockRequest {
                method,
                uri,
                headers,
                body,
            });

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            match (self.response_builder)() {
                MockOutcome::Respond(response) => Ok(response),
                MockOutcome::Fail(reason) => Err(reason.into()),
            }
        }
    }
}
