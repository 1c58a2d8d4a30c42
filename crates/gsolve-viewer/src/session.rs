//! Headless viewer session
//!
//! Wires the configured transport, the envelope decoder and the console
//! collaborators into one controller.

use crate::config::{ConfigError, ViewerConfig};
use crate::console::{ConsoleScene, ConsoleUi};
use crate::envelope::{EncodedObject, EnvelopeDecoder};
use crate::export::FileExportSink;
use gsolve_cycle::{
    Collaborators, CycleError, CycleOutcome, ExportArtifact, ExportError, Scene, UiSurface,
    ViewerController,
};
use gsolve_transport::TransportError;
use std::path::Path;
use std::sync::Arc;

/// Viewer failures
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    /// Unusable configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Transport could not be built
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Cycle failed
    #[error(transparent)]
    Cycle(#[from] CycleError),

    /// Export failed
    #[error(transparent)]
    Export(#[from] ExportError),
}

/// One controller with console collaborators
pub struct Session {
    controller: Arc<ViewerController<EnvelopeDecoder>>,
    decoder: Arc<EnvelopeDecoder>,
    scene: Arc<ConsoleScene>,
    ui: Arc<ConsoleUi>,
}

impl Session {
    /// Build a session from `config`
    ///
    /// # Errors
    /// - `Config` if the definition cannot be resolved
    /// - `Transport` if the endpoint is unusable
    pub async fn open(config: &ViewerConfig) -> Result<Self, ViewerError> {
        let definition = config.definition.resolve().await?;
        let transport = config.transport.connect()?;
        let decoder = Arc::new(EnvelopeDecoder::new());
        let scene = Arc::new(ConsoleScene::new());
        let ui = Arc::new(ConsoleUi::new(config.inputs.clone()));

        tracing::info!(
            "Session for {} via {}",
            definition.name(),
            transport.describe()
        );
        let controller = ViewerController::new(
            config.cycle.clone(),
            definition,
            Collaborators {
                transport,
                decoder: Arc::clone(&decoder),
                scene: Arc::clone(&scene) as Arc<dyn Scene<EncodedObject>>,
                ui: Arc::clone(&ui) as Arc<dyn UiSurface>,
            },
        );

        Ok(Self {
            controller: Arc::new(controller),
            decoder,
            scene,
            ui,
        })
    }

    /// Run one cycle with the UI's current inputs
    ///
    /// # Errors
    /// `Cycle` if the cycle failed.
    pub async fn solve(&self) -> Result<CycleOutcome, ViewerError> {
        let inputs = self.ui.read_inputs();
        Ok(self.controller.run_cycle(inputs).await?)
    }

    /// Export the displayed geometry to `target`
    ///
    /// # Errors
    /// `Export` if nothing is displayed or the file cannot be written.
    pub async fn export(&self, target: &Path) -> Result<ExportArtifact, ViewerError> {
        let sink = FileExportSink::new(target);
        Ok(self.controller.export(&sink).await?)
    }

    /// Release everything the session holds
    pub fn close(&self) {
        self.controller.shutdown();
        tracing::debug!(
            nodes = self.scene.live_nodes(),
            objects = self.decoder.live_objects(),
            "Session closed"
        );
    }

    /// Controller
    #[must_use]
    pub fn controller(&self) -> &Arc<ViewerController<EnvelopeDecoder>> {
        &self.controller
    }

    /// Scene
    #[must_use]
    pub fn scene(&self) -> &ConsoleScene {
        &self.scene
    }

    /// UI
    #[must_use]
    pub fn ui(&self) -> &ConsoleUi {
        &self.ui
    }

    /// Decoder
    #[must_use]
    pub fn decoder(&self) -> &EnvelopeDecoder {
        &self.decoder
    }
}
