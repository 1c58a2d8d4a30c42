//! Collaborator interfaces
//!
//! The cycle owns none of the heavy machinery. It talks to:
//! - the UI (input controls, busy indicator, export toggle)
//! - the geometry decoder (records in, decoded objects out)
//! - the scene (attach renderables, release them)
//! - an export sink (persist serialized geometry)

use crate::error::{DecodeFault, ExportError};
use crate::sequence::Generation;
use gsolve_schema::{GeometryRecord, SliderInputs};

/// Page-side controls the cycle reads and toggles
#[cfg_attr(test, mockall::automock)]
pub trait UiSurface: Send + Sync {
    /// Current values of the numeric input controls
    fn read_inputs(&self) -> SliderInputs;

    /// Show or hide the loading indicator
    fn set_busy(&self, busy: bool);

    /// Enable or disable the export action
    fn set_export_enabled(&self, enabled: bool);
}

/// Geometry-decoding library boundary
pub trait GeometryDecoder: Send + Sync + 'static {
    /// Decoded geometry object
    type Object: Send + Sync + 'static;

    /// Decode one record
    ///
    /// # Errors
    /// `DecodeFault` if the record is not decodable geometry.
    fn decode(&self, record: &GeometryRecord) -> Result<Self::Object, DecodeFault>;

    /// Serialize objects as one document (export path)
    ///
    /// # Errors
    /// `DecodeFault` if the library cannot write the document.
    fn to_bytes(&self, objects: &[Self::Object]) -> Result<Vec<u8>, DecodeFault>;

    /// Free library-side memory held by objects
    ///
    /// Decoding libraries backed by foreign heaps do not reclaim this on
    /// drop; the cycle calls this exactly once per decoded batch.
    fn release(&self, objects: Vec<Self::Object>) {
        drop(objects);
    }
}

/// Material kinds a scene can provide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialKind {
    /// Shading by surface normal
    Normal,
}

/// Scene-owned material handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(pub u64);

/// Scene-owned node handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneNodeId(pub u64);

impl std::fmt::Display for SceneNodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// What a cycle asks the scene to show
#[derive(Debug)]
pub enum DisplayLayer<'a, O> {
    /// One mesh with a cached material
    Mesh { object: &'a O, material: MaterialId },
    /// A whole document converted into one subtree
    Document { objects: &'a [O] },
}

impl<O> DisplayLayer<'_, O> {
    /// Number of objects in the layer
    #[must_use]
    pub fn object_count(&self) -> usize {
        match self {
            Self::Mesh { .. } => 1,
            Self::Document { objects } => objects.len(),
        }
    }
}

/// Display scene boundary
///
/// The scene owns the render loop; the cycle only swaps what it shows.
pub trait Scene<O>: Send + Sync {
    /// Allocate a material the scene keeps alive until teardown
    fn create_material(&self, kind: MaterialKind) -> MaterialId;

    /// Convert and insert a layer, returning its node
    fn attach(&self, layer: DisplayLayer<'_, O>) -> SceneNodeId;

    /// Detach a node and free its render resources
    fn release(&self, node: SceneNodeId);
}

/// Serialized geometry ready to be saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    /// Suggested file name
    pub file_name: String,
    /// MIME type of `bytes`
    pub mime_type: String,
    /// Generation the bytes were produced from
    pub generation: Generation,
    /// Serialized document
    pub bytes: Vec<u8>,
}

/// Destination for exported geometry
#[async_trait::async_trait]
pub trait ExportSink: Send + Sync {
    /// Persist an artifact
    ///
    /// # Errors
    /// `ExportError::Sink` if the artifact cannot be stored.
    async fn save(&self, artifact: &ExportArtifact) -> Result<(), ExportError>;
}
