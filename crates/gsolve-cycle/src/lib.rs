//! gsolve Cycle - the compute request cycle
//!
//! Turns a slider change into displayed geometry:
//! - allocate a generation, superseding older in-flight cycles
//! - solve through a [`gsolve_transport::SolveTransport`]
//! - select and decode the geometry records
//! - swap the displayed geometry, releasing the previous one exactly once
//!
//! All mutable viewer state lives in one [`ViewerController`]. The UI,
//! decoding library, scene and export destination are collaborators behind
//! the traits in [`collab`].

#![warn(unreachable_pub)]

pub mod collab;
pub mod config;
pub mod controller;
pub mod display;
pub mod error;
pub mod report;
pub mod sequence;

pub use collab::{
    DisplayLayer, ExportArtifact, ExportSink, GeometryDecoder, MaterialId, MaterialKind, Scene,
    SceneNodeId, UiSurface,
};
pub use config::{CycleConfig, DisplayMode};
pub use controller::{Collaborators, ViewerController};
pub use display::DisplayedGeometry;
pub use error::{CycleError, DecodeFault, ErrorKind, ExportError};
pub use report::{CycleId, CycleOutcome, CycleReport, CycleTimings};
pub use sequence::{Generation, Invalidation, Sequencer, Ticket};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for common imports
pub mod prelude {
    pub use crate::collab::{ExportSink, GeometryDecoder, Scene, UiSurface};
    pub use crate::config::{CycleConfig, DisplayMode};
    pub use crate::controller::{Collaborators, ViewerController};
    pub use crate::error::{CycleError, ExportError};
    pub use crate::report::CycleOutcome;
    pub use gsolve_schema::{DefinitionRef, SliderInputs};
}
