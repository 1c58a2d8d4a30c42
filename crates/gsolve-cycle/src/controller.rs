//! Viewer controller
//!
//! Owns the displayed geometry and drives compute request cycles:
//! - one generation per cycle; a newer cycle supersedes every older one
//! - the solve exchange is the only suspension point
//! - geometry is swapped under the display lock, by the latest cycle only
//! - the busy indicator follows the newest cycle

use crate::collab::{
    DisplayLayer, ExportArtifact, ExportSink, GeometryDecoder, MaterialKind, Scene, UiSurface,
};
use crate::config::{CycleConfig, DisplayMode};
use crate::display::{DisplaySlot, DisplayedGeometry};
use crate::error::{CycleError, ExportError};
use crate::report::{CycleId, CycleOutcome, CycleReport, CycleTimings};
use crate::sequence::{Generation, Invalidation, Sequencer, Ticket};
use gsolve_schema::{DefinitionRef, GeometryRecord, SliderInputs, SolveRequest, SolveResponse};
use gsolve_transport::{SolveReply, SolveTransport, TransportError};
use parking_lot::Mutex;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Everything a controller talks to
pub struct Collaborators<D: GeometryDecoder> {
    /// Solving service backend
    pub transport: Arc<dyn SolveTransport>,
    /// Geometry-decoding library
    pub decoder: Arc<D>,
    /// Display scene
    pub scene: Arc<dyn Scene<D::Object>>,
    /// Page controls
    pub ui: Arc<dyn UiSurface>,
}

/// Ends a cycle when dropped, so the busy indicator clears even if the
/// cycle future is aborted or dropped by the caller
struct CycleGuard<C, D>
where
    C: Deref<Target = ViewerController<D>>,
    D: GeometryDecoder,
{
    controller: C,
    generation: Generation,
    _decoder: PhantomData<fn() -> D>,
}

impl<C, D> CycleGuard<C, D>
where
    C: Deref<Target = ViewerController<D>>,
    D: GeometryDecoder,
{
    fn new(controller: C, generation: Generation) -> Self {
        Self {
            controller,
            generation,
            _decoder: PhantomData,
        }
    }
}

impl<C, D> Drop for CycleGuard<C, D>
where
    C: Deref<Target = ViewerController<D>>,
    D: GeometryDecoder,
{
    fn drop(&mut self) {
        self.controller.finish(self.generation);
    }
}

enum Swap {
    Applied,
    Stale { latest: Generation },
}

/// Single owner of the viewer's mutable state
pub struct ViewerController<D: GeometryDecoder> {
    config: CycleConfig,
    definition: DefinitionRef,
    transport: Arc<dyn SolveTransport>,
    decoder: Arc<D>,
    scene: Arc<dyn Scene<D::Object>>,
    ui: Arc<dyn UiSurface>,
    sequencer: Sequencer,
    display: Mutex<DisplaySlot<D::Object>>,
}

impl<D: GeometryDecoder> ViewerController<D> {
    /// Create a controller with nothing displayed
    pub fn new(config: CycleConfig, definition: DefinitionRef, collab: Collaborators<D>) -> Self {
        Self {
            config,
            definition,
            transport: collab.transport,
            decoder: collab.decoder,
            scene: collab.scene,
            ui: collab.ui,
            sequencer: Sequencer::new(),
            display: Mutex::new(DisplaySlot::new()),
        }
    }

    /// Cycle configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &CycleConfig {
        &self.config
    }

    /// Solve `inputs` and replace the displayed geometry
    ///
    /// Starting a cycle supersedes every cycle still in flight. A superseded
    /// cycle resolves with [`CycleOutcome::Superseded`] and leaves the display
    /// untouched.
    ///
    /// # Errors
    /// - `Transport` if the exchange failed or timed out
    /// - `Protocol` if the response lacks the expected records
    /// - `Decode` if a record could not be decoded
    /// - `Cancelled` if the controller was shut down
    pub async fn run_cycle(&self, inputs: SliderInputs) -> Result<CycleOutcome, CycleError> {
        let ticket = self.begin()?;
        let _guard = CycleGuard::new(self, ticket.generation());
        self.complete(ticket, inputs).await
    }

    /// Input-change event handler; failures are logged, never raised
    pub async fn on_input_changed(&self) {
        let inputs = self.ui.read_inputs();
        match self.begin() {
            Ok(ticket) => {
                let _guard = CycleGuard::new(self, ticket.generation());
                Self::log_outcome(self.complete(ticket, inputs).await);
            }
            Err(e) => Self::log_outcome(Err(e)),
        }
    }

    /// Run [`Self::on_input_changed`] on the runtime
    ///
    /// The generation is allocated before spawning, so cycles are ordered by
    /// event, not by task scheduling. Aborting the handle ends the cycle like
    /// any other exit.
    pub fn spawn_on_input_changed(self: &Arc<Self>) -> JoinHandle<()> {
        let inputs = self.ui.read_inputs();
        let started = self.begin();
        let guard = started
            .as_ref()
            .ok()
            .map(|ticket| CycleGuard::new(Arc::clone(self), ticket.generation()));
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let _guard = guard;
            let result = match started {
                Ok(ticket) => this.complete(ticket, inputs).await,
                Err(e) => Err(e),
            };
            Self::log_outcome(result);
        })
    }

    /// Serialize the displayed geometry and hand it to `sink`
    ///
    /// # Errors
    /// - `NothingDisplayed` before the first successful cycle
    /// - `Serialize` if the decoder cannot write the document
    /// - `Sink` if the sink rejects the artifact
    pub async fn export(&self, sink: &dyn ExportSink) -> Result<ExportArtifact, ExportError> {
        let artifact = {
            let slot = self.display.lock();
            let displayed = slot.current.as_ref().ok_or(ExportError::NothingDisplayed)?;
            let bytes = self
                .decoder
                .to_bytes(&displayed.objects)
                .map_err(ExportError::Serialize)?;
            ExportArtifact {
                file_name: self.config.export_file_name.clone(),
                mime_type: self.config.export_mime_type.clone(),
                generation: displayed.generation,
                bytes,
            }
        };

        sink.save(&artifact).await?;
        tracing::info!(
            "Exported {} ({} bytes) from {}",
            artifact.file_name,
            artifact.bytes.len(),
            artifact.generation
        );
        Ok(artifact)
    }

    /// Tear down: cancel in-flight cycles and release the displayed geometry
    ///
    /// Idempotent.
    pub fn shutdown(&self) {
        let mut slot = self.display.lock();
        let first = !self.sequencer.is_closed();
        self.sequencer.close();

        if let Some(previous) = slot.current.take() {
            self.scene.release(previous.node);
            self.decoder.release(previous.objects);
        }
        if first {
            self.ui.set_busy(false);
            self.ui.set_export_enabled(false);
            tracing::info!("Viewer controller shut down");
        }
    }

    /// Generation of the displayed geometry
    #[must_use]
    pub fn displayed_generation(&self) -> Option<Generation> {
        self.display.lock().displayed_generation()
    }

    /// Most recently started generation
    #[must_use]
    pub fn latest_generation(&self) -> Generation {
        self.sequencer.latest()
    }

    /// Whether any geometry is displayed
    #[must_use]
    pub fn has_geometry(&self) -> bool {
        self.display.lock().current.is_some()
    }

    fn begin(&self) -> Result<Ticket, CycleError> {
        let _slot = self.display.lock();
        let ticket = self.sequencer.issue().ok_or(CycleError::Cancelled)?;
        self.ui.set_busy(true);
        self.ui.set_export_enabled(false);
        Ok(ticket)
    }

    async fn complete(
        &self,
        mut ticket: Ticket,
        inputs: SliderInputs,
    ) -> Result<CycleOutcome, CycleError> {
        let generation = ticket.generation();
        let cycle_id = CycleId::new();
        let span = tracing::info_span!("cycle", id = %cycle_id, generation = generation.0);

        self.drive(&mut ticket, cycle_id, inputs)
            .instrument(span)
            .await
    }

    fn finish(&self, generation: Generation) {
        let slot = self.display.lock();
        if self.sequencer.is_current(generation) {
            self.ui.set_busy(false);
            self.ui.set_export_enabled(slot.current.is_some());
        }
    }

    async fn drive(
        &self,
        ticket: &mut Ticket,
        cycle_id: CycleId,
        inputs: SliderInputs,
    ) -> Result<CycleOutcome, CycleError> {
        let generation = ticket.generation();
        let request = SolveRequest::new(self.definition.clone(), inputs);
        tracing::debug!(
            "Solving {} with {} via {}",
            self.definition.name(),
            request.inputs(),
            self.transport.describe()
        );

        let started = Instant::now();
        let reply = match self.exchange(ticket, &request).await {
            Ok(reply) => reply,
            Err(Some(latest)) => {
                tracing::debug!("Cycle {generation} superseded by {latest} in flight");
                return Ok(CycleOutcome::Superseded { generation, latest });
            }
            Err(None) => return Err(CycleError::Cancelled),
        }?;
        let solve = started.elapsed();

        let decode_started = Instant::now();
        let response = SolveResponse::from_slice(&reply.body)?;
        if let Some(pointer) = &response.pointer {
            tracing::debug!("Service pointer: {pointer}");
        }
        for warning in &response.warnings {
            tracing::warn!("Service warning: {warning}");
        }
        for error in &response.errors {
            tracing::warn!("Service error: {error}");
        }
        let records = response.select(&self.config.selection())?;
        let objects = self.decode_all(&records)?;
        let decode = decode_started.elapsed();

        let count = objects.len();
        let rebuild_started = Instant::now();
        if let Swap::Stale { latest } = self.swap(generation, objects)? {
            return Ok(CycleOutcome::Superseded { generation, latest });
        }

        let report = CycleReport {
            cycle_id,
            generation,
            objects: count,
            timings: CycleTimings {
                solve,
                decode,
                rebuild: rebuild_started.elapsed(),
                server: reply.server_timing,
            },
        };
        report.log();
        Ok(CycleOutcome::Applied(report))
    }

    /// Await the solve exchange unless the ticket is invalidated first
    ///
    /// `Err(Some(latest))` when superseded, `Err(None)` when closed.
    async fn exchange(
        &self,
        ticket: &mut Ticket,
        request: &SolveRequest,
    ) -> Result<Result<SolveReply, TransportError>, Option<Generation>> {
        let timeout = self.config.request_timeout();
        tokio::select! {
            biased;
            invalidation = ticket.invalidated() => match invalidation {
                Invalidation::Superseded { latest } => Err(Some(latest)),
                Invalidation::Closed => Err(None),
            },
            result = tokio::time::timeout(timeout, self.transport.solve(request)) => {
                Ok(result.unwrap_or_else(|_| Err(TransportError::Timeout { after: timeout })))
            }
        }
    }

    fn decode_all(&self, records: &[GeometryRecord]) -> Result<Vec<D::Object>, CycleError> {
        let mut objects = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            match self.decoder.decode(record) {
                Ok(object) => objects.push(object),
                Err(fault) => {
                    self.decoder.release(objects);
                    return Err(CycleError::Decode { index, fault });
                }
            }
        }
        Ok(objects)
    }

    fn swap(&self, generation: Generation, objects: Vec<D::Object>) -> Result<Swap, CycleError> {
        let mut guard = self.display.lock();
        if self.sequencer.is_closed() {
            self.decoder.release(objects);
            return Err(CycleError::Cancelled);
        }
        if !self.sequencer.is_current(generation) {
            let latest = self.sequencer.latest();
            self.decoder.release(objects);
            tracing::warn!("Discarding stale response of {generation}, latest is {latest}");
            return Ok(Swap::Stale { latest });
        }

        let slot = &mut *guard;
        let layer = match (self.config.display_mode, objects.first()) {
            (DisplayMode::SingleMesh, Some(object)) => {
                let material = *slot
                    .material
                    .get_or_insert_with(|| self.scene.create_material(MaterialKind::Normal));
                DisplayLayer::Mesh { object, material }
            }
            _ => DisplayLayer::Document { objects: &objects },
        };

        if let Some(previous) = slot.current.take() {
            tracing::debug!("Releasing {} of {}", previous.node, previous.generation);
            self.scene.release(previous.node);
            self.decoder.release(previous.objects);
        }
        let node = self.scene.attach(layer);
        slot.current = Some(DisplayedGeometry {
            generation,
            node,
            objects,
        });
        Ok(Swap::Applied)
    }

    fn log_outcome(result: Result<CycleOutcome, CycleError>) {
        match result {
            Ok(CycleOutcome::Applied(_)) => {}
            Ok(CycleOutcome::Superseded { generation, latest }) => {
                tracing::debug!("Cycle {generation} gave way to {latest}");
            }
            Err(CycleError::Cancelled) => tracing::debug!("Cycle cancelled"),
            Err(e) => tracing::error!(kind = ?e.kind(), "Solve cycle failed: {e}"),
        }
    }
}

impl<D: GeometryDecoder> std::fmt::Debug for ViewerController<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewerController")
            .field("definition", &self.definition)
            .field("transport", &self.transport.describe())
            .field("latest", &self.sequencer.latest())
            .field("displayed", &self.displayed_generation())
            .finish_non_exhaustive()
    }
}
