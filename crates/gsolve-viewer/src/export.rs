//! File export sink

use gsolve_cycle::{ExportArtifact, ExportError, ExportSink};
use std::path::{Path, PathBuf};

/// Writes artifacts to disk
///
/// A directory target receives the artifact under its suggested file name;
/// any other target is used as the file path.
#[derive(Debug, Clone)]
pub struct FileExportSink {
    target: PathBuf,
}

impl FileExportSink {
    /// Sink writing to `target`
    #[inline]
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
        }
    }

    /// Path `artifact` would be written to
    pub async fn path_for(&self, artifact: &ExportArtifact) -> PathBuf {
        let is_dir = tokio::fs::metadata(&self.target)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if is_dir {
            self.target.join(&artifact.file_name)
        } else {
            self.target.clone()
        }
    }
}

fn sink_error(path: &Path, e: &std::io::Error) -> ExportError {
    ExportError::Sink(format!("{}: {e}", path.display()))
}

#[async_trait::async_trait]
impl ExportSink for FileExportSink {
    async fn save(&self, artifact: &ExportArtifact) -> Result<(), ExportError> {
        let path = self.path_for(artifact).await;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| sink_error(parent, &e))?;
        }
        tokio::fs::write(&path, &artifact.bytes)
            .await
            .map_err(|e| sink_error(&path, &e))?;
        tracing::info!(
            "Saved {} ({}, {} bytes)",
            path.display(),
            artifact.mime_type,
            artifact.bytes.len()
        );
        Ok(())
    }
}
