//! Transport configuration
//!
//! Which solving endpoint a viewer talks to is decided here, never by the
//! request cycle.

use crate::app_server::AppServerTransport;
use crate::compute::ComputeServiceTransport;
use crate::error::TransportError;
use crate::SolveTransport;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Solving endpoint
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Endpoint {
    /// Local application server exposing `POST /solve`
    AppServer { base_url: String },
    /// Remote compute service exposing `POST /grasshopper`
    ComputeService {
        base_url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        api_key: Option<String>,
    },
}

impl Endpoint {
    /// Application server endpoint
    #[inline]
    pub fn app_server(base_url: impl Into<String>) -> Self {
        Self::AppServer {
            base_url: base_url.into(),
        }
    }

    /// Compute service endpoint
    #[inline]
    pub fn compute_service(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self::ComputeService {
            base_url: base_url.into(),
            api_key,
        }
    }

    /// Base URL of the endpoint
    #[must_use]
    pub fn base_url(&self) -> &str {
        match self {
            Self::AppServer { base_url } | Self::ComputeService { base_url, .. } => base_url,
        }
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AppServer { base_url } => f
                .debug_struct("AppServer")
                .field("base_url", base_url)
                .finish(),
            Self::ComputeService { base_url, api_key } => f
                .debug_struct("ComputeService")
                .field("base_url", base_url)
                .field("api_key", &api_key.as_ref().map(|_| "<redacted>"))
                .finish(),
        }
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::app_server("http://localhost:3000")
    }
}

/// Transport configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Endpoint to talk to
    pub endpoint: Endpoint,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl TransportConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With endpoint
    #[inline]
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// With request timeout
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Request timeout
    #[inline]
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Build the transport for the configured endpoint
    ///
    /// # Errors
    /// `TransportError::Config` if the HTTP client cannot be built or the
    /// base URL is empty.
    pub fn connect(&self) -> Result<Arc<dyn SolveTransport>, TransportError> {
        if self.endpoint.base_url().trim().is_empty() {
            return Err(TransportError::Config("endpoint base_url is empty".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(self.request_timeout())
            .user_agent(concat!("gsolve/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Config(e.to_string()))?;

        let transport: Arc<dyn SolveTransport> = match &self.endpoint {
            Endpoint::AppServer { base_url } => Arc::new(AppServerTransport::new(
                client,
                base_url,
                self.request_timeout(),
            )),
            Endpoint::ComputeService { base_url, api_key } => {
                Arc::new(ComputeServiceTransport::new(
                    client,
                    base_url,
                    api_key.clone(),
                    self.request_timeout(),
                ))
            }
        };
        tracing::debug!("Connected transport: {}", transport.describe());
        Ok(transport)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            request_timeout_ms: 30_000,
        }
    }
}
