//! Testing utilities for gsolve workspace
//!
//! Scripted fakes for every collaborator of the request cycle, plus
//! response fixtures.

#![allow(missing_docs)]

use gsolve_cycle::{
    Collaborators, CycleConfig, DecodeFault, DisplayLayer, ExportArtifact, ExportError,
    ExportSink, GeometryDecoder, MaterialId, MaterialKind, Scene, SceneNodeId, UiSurface,
    ViewerController,
};
use gsolve_schema::{DefinitionRef, GeometryRecord, SliderInputs, SolveRequest};
use gsolve_transport::{SolveReply, SolveTransport, TransportError};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// One output item whose `data` decodes to a fake mesh
pub fn mesh_record(id: u64) -> Value {
    json!({
        "type": "Rhino.Geometry.Mesh",
        "data": json!({"kind": "mesh", "id": id}).to_string(),
    })
}

/// Output item the fake decoder rejects
pub fn broken_record() -> Value {
    json!({"type": "Rhino.Geometry.Mesh", "data": json!({"id": 0}).to_string()})
}

/// Response body with one output holding `items` under `{ 0; }`
pub fn body_with_items(items: Vec<Value>) -> Vec<u8> {
    body_with_outputs(vec![items])
}

/// Response body with one output per entry of `outputs`
pub fn body_with_outputs(outputs: Vec<Vec<Value>>) -> Vec<u8> {
    let values: Vec<Value> = outputs
        .into_iter()
        .enumerate()
        .map(|(i, items)| {
            json!({
                "ParamName": format!("RH_OUT:geometry{i}"),
                "InnerTree": {"{ 0; }": items},
            })
        })
        .collect();
    serde_json::to_vec(&json!({"values": values})).unwrap()
}

/// Response body with one output holding one mesh per id
pub fn solve_body(ids: &[u64]) -> Vec<u8> {
    body_with_items(ids.iter().copied().map(mesh_record).collect())
}

/// Success reply carrying `solve_body(ids)`
pub fn mesh_reply(ids: &[u64]) -> SolveReply {
    SolveReply::new(solve_body(ids))
}

/// Inputs `{grow, seed}`
pub fn inputs(grow: f64, seed: f64) -> SliderInputs {
    SliderInputs::new()
        .with("grow", grow)
        .unwrap()
        .with("seed", seed)
        .unwrap()
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

enum Step {
    Reply(SolveReply),
    Fail(TransportError),
    Delayed(Duration, SolveReply),
    Gated(oneshot::Receiver<Result<SolveReply, TransportError>>),
}

/// Releases one gated exchange
pub struct Gate(oneshot::Sender<Result<SolveReply, TransportError>>);

impl Gate {
    pub fn open(self, reply: SolveReply) {
        let _ = self.0.send(Ok(reply));
    }

    pub fn fail(self, error: TransportError) {
        let _ = self.0.send(Err(error));
    }
}

/// Transport answering from a queue of scripted steps
#[derive(Default)]
pub struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<SolveRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, reply: SolveReply) -> &Self {
        self.steps.lock().push_back(Step::Reply(reply));
        self
    }

    pub fn fail(&self, error: TransportError) -> &Self {
        self.steps.lock().push_back(Step::Fail(error));
        self
    }

    pub fn delayed(&self, delay: Duration, reply: SolveReply) -> &Self {
        self.steps.lock().push_back(Step::Delayed(delay, reply));
        self
    }

    /// Queue an exchange that waits until the returned gate is opened
    pub fn gated(&self) -> Gate {
        let (tx, rx) = oneshot::channel();
        self.steps.lock().push_back(Step::Gated(rx));
        Gate(tx)
    }

    /// Requests seen so far
    pub fn requests(&self) -> Vec<SolveRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait::async_trait]
impl SolveTransport for ScriptedTransport {
    async fn solve(&self, request: &SolveRequest) -> Result<SolveReply, TransportError> {
        self.requests.lock().push(request.clone());
        let step = self.steps.lock().pop_front();
        match step {
            Some(Step::Reply(reply)) => Ok(reply),
            Some(Step::Fail(error)) => Err(error),
            Some(Step::Delayed(delay, reply)) => {
                tokio::time::sleep(delay).await;
                Ok(reply)
            }
            Some(Step::Gated(rx)) => rx
                .await
                .unwrap_or_else(|_| Err(TransportError::Network("gate dropped".to_string()))),
            None => Err(TransportError::Network("script exhausted".to_string())),
        }
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeMesh {
    pub id: u64,
}

/// Decoder accepting `{"kind": ..., "id": ...}` payloads
#[derive(Default)]
pub struct FakeDecoder {
    decoded: AtomicUsize,
    released: AtomicUsize,
    release_calls: AtomicUsize,
}

impl FakeDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decoded(&self) -> usize {
        self.decoded.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn release_calls(&self) -> usize {
        self.release_calls.load(Ordering::SeqCst)
    }

    /// Decoded objects not yet released
    pub fn live(&self) -> usize {
        self.decoded() - self.released()
    }
}

impl GeometryDecoder for FakeDecoder {
    type Object = FakeMesh;

    fn decode(&self, record: &GeometryRecord) -> Result<FakeMesh, DecodeFault> {
        if record.value.get("kind").and_then(Value::as_str).is_none() {
            return Err(DecodeFault::new("not a geometry archive"));
        }
        self.decoded.fetch_add(1, Ordering::SeqCst);
        Ok(FakeMesh {
            id: record.value["id"].as_u64().unwrap_or_default(),
        })
    }

    fn to_bytes(&self, objects: &[FakeMesh]) -> Result<Vec<u8>, DecodeFault> {
        let ids: Vec<u64> = objects.iter().map(|m| m.id).collect();
        serde_json::to_vec(&ids).map_err(|e| DecodeFault::new(e.to_string()))
    }

    fn release(&self, objects: Vec<FakeMesh>) {
        self.release_calls.fetch_add(1, Ordering::SeqCst);
        self.released.fetch_add(objects.len(), Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attached {
    pub node: SceneNodeId,
    pub ids: Vec<u64>,
    pub material: Option<MaterialId>,
}

#[derive(Default)]
struct SceneLog {
    attached: Vec<Attached>,
    released: Vec<SceneNodeId>,
    materials: u64,
}

/// Scene that records every call
#[derive(Default)]
pub struct CountingScene {
    log: Mutex<SceneLog>,
}

impl CountingScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attached(&self) -> Vec<Attached> {
        self.log.lock().attached.clone()
    }

    pub fn released(&self) -> Vec<SceneNodeId> {
        self.log.lock().released.clone()
    }

    pub fn materials_created(&self) -> u64 {
        self.log.lock().materials
    }

    /// Nodes attached and not yet released
    pub fn live_nodes(&self) -> Vec<SceneNodeId> {
        let log = self.log.lock();
        log.attached
            .iter()
            .map(|a| a.node)
            .filter(|node| !log.released.contains(node))
            .collect()
    }
}

impl Scene<FakeMesh> for CountingScene {
    fn create_material(&self, _kind: MaterialKind) -> MaterialId {
        let mut log = self.log.lock();
        log.materials += 1;
        MaterialId(log.materials)
    }

    fn attach(&self, layer: DisplayLayer<'_, FakeMesh>) -> SceneNodeId {
        let (ids, material) = match layer {
            DisplayLayer::Mesh { object, material } => (vec![object.id], Some(material)),
            DisplayLayer::Document { objects } => (objects.iter().map(|m| m.id).collect(), None),
        };
        let mut log = self.log.lock();
        let node = SceneNodeId(log.attached.len() as u64);
        log.attached.push(Attached {
            node,
            ids,
            material,
        });
        node
    }

    fn release(&self, node: SceneNodeId) {
        self.log.lock().released.push(node);
    }
}

// ---------------------------------------------------------------------------
// UI
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    Busy(bool),
    Export(bool),
}

/// UI surface recording indicator changes
pub struct RecordingUi {
    inputs: Mutex<SliderInputs>,
    events: Mutex<Vec<UiEvent>>,
}

impl RecordingUi {
    pub fn new(inputs: SliderInputs) -> Self {
        Self {
            inputs: Mutex::new(inputs),
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn set_inputs(&self, inputs: SliderInputs) {
        *self.inputs.lock() = inputs;
    }

    pub fn events(&self) -> Vec<UiEvent> {
        self.events.lock().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.last(|e| match e {
            UiEvent::Busy(b) => Some(*b),
            UiEvent::Export(_) => None,
        })
    }

    pub fn export_enabled(&self) -> bool {
        self.last(|e| match e {
            UiEvent::Export(b) => Some(*b),
            UiEvent::Busy(_) => None,
        })
    }

    fn last(&self, pick: impl Fn(&UiEvent) -> Option<bool>) -> bool {
        self.events.lock().iter().rev().find_map(pick).unwrap_or(false)
    }
}

impl UiSurface for RecordingUi {
    fn read_inputs(&self) -> SliderInputs {
        self.inputs.lock().clone()
    }

    fn set_busy(&self, busy: bool) {
        self.events.lock().push(UiEvent::Busy(busy));
    }

    fn set_export_enabled(&self, enabled: bool) {
        self.events.lock().push(UiEvent::Export(enabled));
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Sink keeping artifacts in memory
#[derive(Default)]
pub struct MemorySink {
    saved: Mutex<Vec<ExportArtifact>>,
    reject: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    pub fn saved(&self) -> Vec<ExportArtifact> {
        self.saved.lock().clone()
    }
}

#[async_trait::async_trait]
impl ExportSink for MemorySink {
    async fn save(&self, artifact: &ExportArtifact) -> Result<(), ExportError> {
        if self.reject {
            return Err(ExportError::Sink("disk full".to_string()));
        }
        self.saved.lock().push(artifact.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

/// Controller wired to fakes, with handles to each fake
pub struct Harness {
    pub controller: Arc<ViewerController<FakeDecoder>>,
    pub transport: Arc<ScriptedTransport>,
    pub decoder: Arc<FakeDecoder>,
    pub scene: Arc<CountingScene>,
    pub ui: Arc<RecordingUi>,
}

pub fn setup_controller(config: CycleConfig) -> Harness {
    let transport = Arc::new(ScriptedTransport::new());
    let decoder = Arc::new(FakeDecoder::new());
    let scene = Arc::new(CountingScene::new());
    let ui = Arc::new(RecordingUi::new(inputs(3.0, 7.0)));

    let controller = ViewerController::new(
        config,
        DefinitionRef::named("orbs.gh"),
        Collaborators {
            transport: Arc::clone(&transport) as Arc<dyn SolveTransport>,
            decoder: Arc::clone(&decoder),
            scene: Arc::clone(&scene) as Arc<dyn Scene<FakeMesh>>,
            ui: Arc::clone(&ui) as Arc<dyn UiSurface>,
        },
    );

    Harness {
        controller: Arc::new(controller),
        transport,
        decoder,
        scene,
        ui,
    }
}
