//! Configuration parsing and validation for the relay server
//!
//! Every option can be given as a command-line flag or through the environment (a `.env` file is
//! loaded before parsing). The parsed [`Config`] is built once at startup and handed to the
//! server; nothing reads the environment after that.
use anyhow::anyhow;
use clap::Parser;
use std::time::Duration;
use url::Url;

use crate::downstream::Downstream;

#[derive(Debug, Clone, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// The address on which the relay server will listen.
    #[arg(long, env = "RELAY_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// The port on which the relay server will listen.
    #[arg(short = 'p', long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// The downstream chat endpoint that `POST /chat` forwards queries to.
    #[arg(
        long,
        env = "AI_SERVER_URL",
        default_value = "http://localhost:8000/api/chat"
    )]
    pub downstream_url: Url,

    /// Disable the `POST /chat` relay route, leaving only the root endpoint.
    #[arg(long, env = "RELAY_DISABLED", default_value_t = false)]
    pub no_relay: bool,

    /// Upper bound (in seconds) on a single downstream call. 0 disables the timeout.
    #[arg(long, env = "DOWNSTREAM_TIMEOUT_SECS", default_value_t = 30)]
    pub downstream_timeout_secs: u64,

    /// Maximum number of idle HTTP connections to keep alive to the downstream host.
    #[arg(long, env = "RELAY_POOL_MAX_IDLE_PER_HOST", default_value_t = 100)]
    pub pool_max_idle_per_host: usize,

    /// How long (in seconds) to keep idle HTTP connections alive.
    #[arg(long, env = "RELAY_POOL_IDLE_TIMEOUT_SECS", default_value_t = 90)]
    pub pool_idle_timeout_secs: u64,

    /// Whether to enable the metrics endpoint.
    #[arg(short = 'm', long, env = "RELAY_METRICS", default_value_t = false)]
    pub metrics: bool,

    /// The port on which the metrics server will listen.
    #[arg(long, env = "RELAY_METRICS_PORT", default_value_t = 9090)]
    pub metrics_port: u16,

    /// The prefix to use for metrics.
    #[arg(long, env = "RELAY_METRICS_PREFIX", default_value = "relay")]
    pub metrics_prefix: String,
}

impl Config {
    pub fn validate(self) -> Result<Self, anyhow::Error> {
        match self.downstream_url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(anyhow!(
                    "Downstream URL '{}' has unsupported scheme '{}'",
                    self.downstream_url,
                    other
                ));
            }
        }
        if self.downstream_url.host_str().is_none() {
            return Err(anyhow!(
                "Downstream URL '{}' has no host",
                self.downstream_url
            ));
        }
        if self.metrics && self.metrics_port == self.port {
            return Err(anyhow!(
                "Metrics port {} clashes with the relay port",
                self.metrics_port
            ));
        }
        Ok(self)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn downstream_timeout(&self) -> Option<Duration> {
        match self.downstream_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// The downstream to relay to, or `None` when the relay route is disabled.
    pub fn downstream(&self) -> Option<Downstream> {
        if self.no_relay {
            return None;
        }
        Some(
            Downstream::builder()
                .url(self.downstream_url.clone())
                .maybe_timeout(self.downstream_timeout())
                .build(),
        )
    }
}
