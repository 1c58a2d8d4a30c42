//! Displayed geometry state

use crate::collab::{MaterialId, SceneNodeId};
use crate::sequence::Generation;

/// Geometry currently shown by the scene
///
/// At most one exists per controller. Its objects stay alive for export
/// until the next successful cycle replaces them.
#[derive(Debug)]
pub struct DisplayedGeometry<O> {
    /// Generation that produced it
    pub generation: Generation,
    /// Scene node holding its renderables
    pub node: SceneNodeId,
    /// Decoded objects
    pub objects: Vec<O>,
}

/// Everything the display lock guards
#[derive(Debug)]
pub(crate) struct DisplaySlot<O> {
    pub(crate) current: Option<DisplayedGeometry<O>>,
    /// Created on the first single-mesh swap, reused after
    pub(crate) material: Option<MaterialId>,
}

impl<O> DisplaySlot<O> {
    pub(crate) fn new() -> Self {
        Self {
            current: None,
            material: None,
        }
    }

    pub(crate) fn displayed_generation(&self) -> Option<Generation> {
        self.current.as_ref().map(|d| d.generation)
    }
}
