//! Log-only scene and UI

use crate::envelope::EncodedObject;
use gsolve_cycle::{DisplayLayer, MaterialId, MaterialKind, Scene, SceneNodeId, UiSurface};
use gsolve_schema::SliderInputs;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
struct SceneState {
    next_node: u64,
    next_material: u64,
    /// Live node -> object count
    nodes: HashMap<SceneNodeId, usize>,
}

/// Scene that logs what it would draw
#[derive(Debug, Default)]
pub struct ConsoleScene {
    state: Mutex<SceneState>,
}

impl ConsoleScene {
    /// Create an empty scene
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Nodes currently in the scene
    #[must_use]
    pub fn live_nodes(&self) -> usize {
        self.state.lock().nodes.len()
    }

    /// Objects across all live nodes
    #[must_use]
    pub fn live_objects(&self) -> usize {
        self.state.lock().nodes.values().sum()
    }
}

impl Scene<EncodedObject> for ConsoleScene {
    fn create_material(&self, kind: MaterialKind) -> MaterialId {
        let mut state = self.state.lock();
        state.next_material += 1;
        tracing::debug!("Material {} created ({kind:?})", state.next_material);
        MaterialId(state.next_material)
    }

    fn attach(&self, layer: DisplayLayer<'_, EncodedObject>) -> SceneNodeId {
        let mut state = self.state.lock();
        let node = SceneNodeId(state.next_node);
        state.next_node += 1;

        match &layer {
            DisplayLayer::Mesh { object, material } => tracing::info!(
                "Attached {node}: mesh of {} bytes with material {}",
                object.data.len(),
                material.0
            ),
            DisplayLayer::Document { objects } => {
                let bytes: usize = objects.iter().map(|o| o.data.len()).sum();
                tracing::info!(
                    "Attached {node}: document of {} object(s), {bytes} bytes",
                    objects.len()
                );
            }
        }
        state.nodes.insert(node, layer.object_count());
        node
    }

    fn release(&self, node: SceneNodeId) {
        if self.state.lock().nodes.remove(&node).is_some() {
            tracing::debug!("Released {node}");
        } else {
            tracing::warn!("Release of unknown {node}");
        }
    }
}

/// Fixed inputs and logged indicators
#[derive(Debug)]
pub struct ConsoleUi {
    inputs: Mutex<SliderInputs>,
    busy: AtomicBool,
    export_enabled: AtomicBool,
}

impl ConsoleUi {
    /// UI reporting `inputs`
    #[must_use]
    pub fn new(inputs: SliderInputs) -> Self {
        Self {
            inputs: Mutex::new(inputs),
            busy: AtomicBool::new(false),
            export_enabled: AtomicBool::new(false),
        }
    }

    /// Replace the reported inputs
    pub fn set_inputs(&self, inputs: SliderInputs) {
        *self.inputs.lock() = inputs;
    }

    /// Whether the loading indicator is shown
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Whether export is offered
    #[must_use]
    pub fn export_enabled(&self) -> bool {
        self.export_enabled.load(Ordering::SeqCst)
    }
}

impl UiSurface for ConsoleUi {
    fn read_inputs(&self) -> SliderInputs {
        self.inputs.lock().clone()
    }

    fn set_busy(&self, busy: bool) {
        if self.busy.swap(busy, Ordering::SeqCst) != busy {
            tracing::debug!(busy, "Loading indicator");
        }
    }

    fn set_export_enabled(&self, enabled: bool) {
        if self.export_enabled.swap(enabled, Ordering::SeqCst) != enabled {
            tracing::debug!(enabled, "Export action");
        }
    }
}
