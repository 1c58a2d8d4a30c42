//! Compute service transport
//!
//! Talks to a remote Grasshopper compute service directly. The definition
//! travels with every request (inline bytes or a pointer) and inputs are
//! sent as data trees. Remote services require an API key header.

use crate::error::TransportError;
use crate::{exchange, join_url, SolveReply, SolveTransport};
use gsolve_schema::SolveRequest;
use std::time::Duration;

/// Header carrying the compute API key
pub const API_KEY_HEADER: &str = "RhinoComputeKey";

/// `POST {base_url}/grasshopper`
#[derive(Clone)]
pub struct ComputeServiceTransport {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl ComputeServiceTransport {
    /// Create a transport for a compute service
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            url: join_url(base_url, "grasshopper"),
            api_key,
            timeout,
        }
    }
}

impl std::fmt::Debug for ComputeServiceTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputeServiceTransport")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl SolveTransport for ComputeServiceTransport {
    async fn solve(&self, request: &SolveRequest) -> Result<SolveReply, TransportError> {
        let body = request.compute_body()?;
        tracing::debug!(
            "POST {} definition={} inputs={}",
            self.url,
            request.definition().name(),
            request.inputs()
        );

        let mut builder = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.header(API_KEY_HEADER, key);
        } else {
            tracing::debug!("No API key configured for {}", self.url);
        }
        exchange(builder, self.timeout).await
    }

    fn describe(&self) -> String {
        format!("compute service {}", self.url)
    }
}
