//! gsolve Transport - switchable solving-service backends
//!
//! One request, one response. The request cycle sees only the
//! [`SolveTransport`] trait; which backend answers is configuration:
//! - [`AppServerTransport`]: local application server (`POST /solve`)
//! - [`ComputeServiceTransport`]: remote compute service (`POST /grasshopper`)

#![warn(unreachable_pub)]

pub mod app_server;
pub mod compute;
pub mod config;
pub mod error;

pub use app_server::AppServerTransport;
pub use compute::ComputeServiceTransport;
pub use config::{Endpoint, TransportConfig};
pub use error::TransportError;

use gsolve_schema::{ServerTiming, SolveRequest};
use std::time::{Duration, Instant};

/// Raw success response of a solve exchange
#[derive(Debug, Clone, PartialEq)]
pub struct SolveReply {
    /// Response body, not yet parsed
    pub body: Vec<u8>,
    /// Parsed `Server-Timing` header, if the service sent one
    pub server_timing: Option<ServerTiming>,
    /// Wall time of the exchange
    pub elapsed: Duration,
}

impl SolveReply {
    /// Reply with a body only
    #[inline]
    #[must_use]
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            server_timing: None,
            elapsed: Duration::ZERO,
        }
    }
}

/// Request/response exchange with a solving service
#[async_trait::async_trait]
pub trait SolveTransport: Send + Sync {
    /// Send one request and await exactly one response
    async fn solve(&self, request: &SolveRequest) -> Result<SolveReply, TransportError>;

    /// Human-readable target for logs
    fn describe(&self) -> String;
}

/// Send a prepared request and collect a success reply
pub(crate) async fn exchange(
    builder: reqwest::RequestBuilder,
    timeout: Duration,
) -> Result<SolveReply, TransportError> {
    let started = Instant::now();
    let response = builder
        .send()
        .await
        .map_err(|e| TransportError::from_reqwest(&e, timeout))?;

    let status = response.status();
    if !status.is_success() {
        let reason = status
            .canonical_reason()
            .unwrap_or("unknown status")
            .to_string();
        tracing::debug!("Solve rejected: {} {}", status.as_u16(), reason);
        return Err(TransportError::Status {
            status: status.as_u16(),
            reason,
        });
    }

    let server_timing = response
        .headers()
        .get("server-timing")
        .and_then(|v| v.to_str().ok())
        .map(ServerTiming::parse);

    let body = response
        .bytes()
        .await
        .map_err(|e| TransportError::from_reqwest(&e, timeout))?
        .to_vec();

    tracing::debug!("Solve reply: {} bytes", body.len());
    Ok(SolveReply {
        body,
        server_timing,
        elapsed: started.elapsed(),
    })
}

/// Join a base URL and a route without doubling slashes
pub(crate) fn join_url(base_url: &str, route: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        route.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_normalizes_slashes() {
        assert_eq!(join_url("http://h:1/", "/solve"), "http://h:1/solve");
        assert_eq!(join_url("http://h:1", "solve"), "http://h:1/solve");
        assert_eq!(
            join_url("https://c.example.com/", "grasshopper"),
            "https://c.example.com/grasshopper"
        );
    }
}
