//! Cycle reports and timing breakdown

use crate::sequence::Generation;
use gsolve_schema::ServerTiming;
use std::time::Duration;
use ulid::Ulid;

/// Log correlation id of one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CycleId(pub Ulid);

impl CycleId {
    /// Generate new cycle ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for CycleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CycleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the time of one cycle went
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleTimings {
    /// Solve exchange, including service time
    pub solve: Duration,
    /// Parsing and decoding records
    pub decode: Duration,
    /// Swapping the scene
    pub rebuild: Duration,
    /// Service-reported breakdown of `solve`
    pub server: Option<ServerTiming>,
}

impl CycleTimings {
    /// Whole cycle
    #[must_use]
    pub fn total(&self) -> Duration {
        self.solve + self.decode + self.rebuild
    }

    /// Solve time the service did not account for (client-side network latency)
    #[must_use]
    pub fn local_latency_ms(&self) -> Option<f64> {
        let server = self.server.as_ref()?;
        Some((self.solve.as_secs_f64() * 1000.0 - server.total_ms()).max(0.0))
    }
}

/// Outcome of a cycle that replaced the displayed geometry
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Log correlation id
    pub cycle_id: CycleId,
    /// Generation now displayed
    pub generation: Generation,
    /// Decoded objects attached
    pub objects: usize,
    /// Timing breakdown
    pub timings: CycleTimings,
}

impl CycleReport {
    /// Emit the timing breakdown
    pub fn log(&self) {
        let t = &self.timings;
        tracing::info!(
            "Cycle {} applied {} object(s) in {} ms",
            self.generation,
            self.objects,
            t.total().as_millis()
        );
        tracing::debug!("  {} ms: solve request", t.solve.as_millis());
        if let Some(server) = &t.server {
            for entry in server.iter() {
                if entry.name == "network" {
                    tracing::debug!("  .. {} ms: service network latency", entry.duration_ms);
                } else {
                    tracing::debug!("  .. {} ms: {}", entry.duration_ms, entry.name);
                }
            }
        }
        if let Some(local) = t.local_latency_ms() {
            tracing::debug!("  .. {local:.0} ms: local network latency");
        }
        tracing::debug!("  {} ms: decode records", t.decode.as_millis());
        tracing::debug!("  {} ms: rebuild scene", t.rebuild.as_millis());
    }
}

/// Result of a cycle that did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Displayed geometry replaced
    Applied(CycleReport),
    /// A newer cycle started; this one's response was discarded
    Superseded {
        generation: Generation,
        latest: Generation,
    },
}

impl CycleOutcome {
    /// Report, if applied
    #[must_use]
    pub fn applied(&self) -> Option<&CycleReport> {
        match self {
            Self::Applied(report) => Some(report),
            Self::Superseded { .. } => None,
        }
    }

    /// Whether the response was discarded
    #[inline]
    #[must_use]
    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded { .. })
    }
}
