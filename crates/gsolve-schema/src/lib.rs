//! gsolve Schema - wire types for the solving service
//!
//! Everything that crosses the wire between the viewer and a solving
//! service lives here:
//! - Slider inputs collected from the UI
//! - Solve requests in both the app-server and compute-service renderings
//! - Typed solve responses with fail-fast record selection
//! - `Server-Timing` header breakdowns
//!
//! # Example
//!
//! ```rust
//! use gsolve_schema::{DefinitionRef, SliderInputs, SolveRequest};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let inputs = SliderInputs::new().with("grow", 3.0)?.with("seed", 7.0)?;
//! let request = SolveRequest::new(DefinitionRef::named("orbs.gh"), inputs);
//!
//! let body = request.app_server_body()?;
//! assert_eq!(body["inputs"]["grow"], 3.0);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod error;
pub mod inputs;
pub mod request;
pub mod response;
pub mod timing;
pub mod tree;

pub use error::{EncodeError, InputError, ProtocolError};
pub use inputs::SliderInputs;
pub use request::{DefinitionRef, SolveRequest, INPUT_BRANCH, INPUT_PREFIX};
pub use response::{GeometryRecord, RecordSelection, SolveResponse, DEFAULT_OUTPUT_BRANCH};
pub use timing::{ServerTiming, TimingEntry};
pub use tree::{DataTree, TreeItem};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
