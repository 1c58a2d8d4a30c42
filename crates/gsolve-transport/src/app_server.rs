//! Application server transport
//!
//! The local app server resolves definitions by name and forwards the
//! solve to the compute backend, reporting the split in `Server-Timing`.

use crate::error::TransportError;
use crate::{exchange, join_url, SolveReply, SolveTransport};
use gsolve_schema::SolveRequest;
use std::time::Duration;

/// `POST {base_url}/solve`
#[derive(Debug, Clone)]
pub struct AppServerTransport {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl AppServerTransport {
    /// Create a transport for an app server
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            client,
            url: join_url(base_url, "solve"),
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl SolveTransport for AppServerTransport {
    async fn solve(&self, request: &SolveRequest) -> Result<SolveReply, TransportError> {
        let body = request.app_server_body()?;
        tracing::debug!(
            "POST {} definition={} inputs={}",
            self.url,
            request.definition().name(),
            request.inputs()
        );
        exchange(self.client.post(&self.url).json(&body), self.timeout).await
    }

    fn describe(&self) -> String {
        format!("app server {}", self.url)
    }
}
