//!
//! Library for watching a Redbelly node through its local status server.
//!
//! ## Polling a node
//! ```no_run
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), node_status::Error> {
//!     use node_status::ClientBuilder;
//!
//!     let client = ClientBuilder::new().build("http://localhost:6539")?;
//!
//!     let status = client.status().await?;
//!     // Never fails, an unreachable metrics endpoint gives an empty snapshot
//!     let metrics = client.metrics().await;
//!
//!     let report = node_status::aggregate(status, &metrics, 10, &Default::default());
//!     println!("{}", node_status::render::render(client.status_url().as_str(), &report));
//!     Ok(())
//! }
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

use std::time::Duration;

pub mod balance;
pub mod block_rate;
pub mod exposition;
pub mod monitor;
pub mod render;
pub mod report;
pub mod status;
pub mod units;

pub use block_rate::BlockRate;
pub use exposition::{MetricValue, MetricsSnapshot, Sample};
pub use report::{aggregate, Report};
pub use status::StatusSnapshot;

/// Default address of the node status server
pub const DEFAULT_ADDRESS: &str = "http://localhost:6539";

/// Timeout for `/status` requests
pub const STATUS_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for `/metrics` requests
pub const METRICS_TIMEOUT: Duration = Duration::from_secs(10);

/// Error returned by client and monitor functions
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed returned by the HTTP server
    #[error("HTTP failed {0}, {1}")]
    WebServer(u16, String),

    /// HTTP client error, including connection failures and timeouts
    #[error("Reqwest: {0}")]
    HTTPClient(#[from] reqwest::Error),

    /// URL parsing error
    #[error("URL: {0}")]
    URL(#[from] url::ParseError),

    /// Status body is not a JSON object
    #[error("Serde JSON error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Required status field is absent
    #[error("Missing status field '{0}'")]
    MissingField(&'static str),

    /// Required status field has the wrong shape
    #[error("Malformed status field '{field}': {source}")]
    MalformedField {
        /// Field name as sent by the node
        field: &'static str,
        /// Underlying decode error
        source: serde_json::Error,
    },

    /// IO Errors
    #[error("IO error {0}")]
    IO(#[from] std::io::Error),

    /// The user interrupted the monitor
    #[error("Cancelled by user")]
    Cancelled,
}

/// Broad classes of [`Error`], deciding how the poll loop reacts
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The status endpoint could not be reached or answered with an error
    Fetch,
    /// The status payload could not be decoded
    Decode,
    /// The user asked to stop
    CancelledByUser,
    /// Anything else, fatal to the process
    Unexpected,
}

impl Error {
    /// Classify the error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::WebServer(..) | Self::HTTPClient(_) => ErrorKind::Fetch,
            Self::Serde(_) | Self::MissingField(_) | Self::MalformedField { .. } => {
                ErrorKind::Decode
            }
            Self::Cancelled => ErrorKind::CancelledByUser,
            Self::URL(_) | Self::IO(_) => ErrorKind::Unexpected,
        }
    }
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Builder for a [`Client`]
#[derive(Clone, Debug)]
pub struct ClientBuilder {
    status_timeout: Duration,
    metrics_timeout: Duration,
}

impl ClientBuilder {
    /// Create a new builder instance
    #[must_use]
    pub const fn new() -> Self {
        Self {
            status_timeout: STATUS_TIMEOUT,
            metrics_timeout: METRICS_TIMEOUT,
        }
    }

    /// Override the `/status` timeout
    #[must_use]
    pub fn status_timeout(self, timeout: Duration) -> Self {
        Self {
            status_timeout: timeout,
            ..self
        }
    }

    /// Override the `/metrics` timeout
    #[must_use]
    pub fn metrics_timeout(self, timeout: Duration) -> Self {
        Self {
            metrics_timeout: timeout,
            ..self
        }
    }

    /// Create a client for the status server at `address`
    pub fn build(&self, address: &str) -> Result<Client> {
        let mut base_url = url::Url::parse(address)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let status_url = base_url.join("status")?;
        let metrics_url = base_url.join("metrics")?;
        let client = reqwest::Client::builder().build()?;

        Ok(Client {
            status_url,
            metrics_url,
            client,
            status_timeout: self.status_timeout,
            metrics_timeout: self.metrics_timeout,
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Client for the node's status server
#[derive(Clone, Debug)]
pub struct Client {
    status_url: url::Url,
    metrics_url: url::Url,
    client: reqwest::Client,
    status_timeout: Duration,
    metrics_timeout: Duration,
}

impl Client {
    /// Create a Client builder
    #[must_use]
    pub const fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// URL polled for the node status
    #[must_use]
    pub const fn status_url(&self) -> &url::Url {
        &self.status_url
    }

    /// URL polled for metrics
    #[must_use]
    pub const fn metrics_url(&self) -> &url::Url {
        &self.metrics_url
    }

    /// GET and decode the node status
    pub async fn status(&self) -> Result<StatusSnapshot> {
        tracing::debug!("GET {}", self.status_url);

        let result = self
            .client
            .get(self.status_url.clone())
            .header("Accept", "application/json")
            .timeout(self.status_timeout)
            .send()
            .await?;

        if result.status().is_success() {
            let body = result.bytes().await?;
            status::decode(&body)
        } else {
            Err(Error::WebServer(
                result.status().as_u16(),
                result.status().to_string(),
            ))
        }
    }

    /// GET and parse the node metrics. Any failure gives an empty snapshot.
    pub async fn metrics(&self) -> MetricsSnapshot {
        match self.metrics_text().await {
            Ok(text) => exposition::parse(&text),
            Err(e) => {
                tracing::debug!("metrics unavailable from {}: {}", self.metrics_url, e);
                MetricsSnapshot::default()
            }
        }
    }

    async fn metrics_text(&self) -> Result<String> {
        tracing::debug!("GET {}", self.metrics_url);

        let result = self
            .client
            .get(self.metrics_url.clone())
            .timeout(self.metrics_timeout)
            .send()
            .await?;

        if result.status().is_success() {
            Ok(result.text().await?)
        } else {
            Err(Error::WebServer(
                result.status().as_u16(),
                result.status().to_string(),
            ))
        }
    }
}
