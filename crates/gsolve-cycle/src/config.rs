//! Cycle configuration

use gsolve_schema::{RecordSelection, DEFAULT_OUTPUT_BRANCH};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How solved geometry is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// One record decoded to one mesh, drawn with a material reused across cycles
    #[default]
    SingleMesh,
    /// Every record of every output collected into one document subtree
    Document,
}

/// Compute request cycle configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    /// Presentation variant
    pub display_mode: DisplayMode,
    /// Branch key expected in every output tree
    pub output_branch: String,
    /// Upper bound on one solve exchange, in milliseconds
    pub request_timeout_ms: u64,
    /// File name offered by the export action
    pub export_file_name: String,
    /// MIME type of exported bytes
    pub export_mime_type: String,
}

impl CycleConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With display mode
    #[inline]
    #[must_use]
    pub fn with_display_mode(mut self, mode: DisplayMode) -> Self {
        self.display_mode = mode;
        self
    }

    /// With request timeout
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With export file name
    #[inline]
    #[must_use]
    pub fn with_export_file_name(mut self, name: impl Into<String>) -> Self {
        self.export_file_name = name.into();
        self
    }

    /// Request timeout
    #[inline]
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Records the display mode expects from a response
    #[must_use]
    pub fn selection(&self) -> RecordSelection {
        let branch = self.output_branch.clone();
        match self.display_mode {
            DisplayMode::SingleMesh => RecordSelection::First { branch },
            DisplayMode::Document => RecordSelection::All { branch },
        }
    }
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            display_mode: DisplayMode::SingleMesh,
            output_branch: DEFAULT_OUTPUT_BRANCH.to_string(),
            request_timeout_ms: 30_000,
            export_file_name: "solve.3dm".to_string(),
            export_mime_type: "application/octet-stream".to_string(),
        }
    }
}
