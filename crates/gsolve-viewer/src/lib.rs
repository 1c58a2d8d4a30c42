//! gsolve Viewer - headless front end
//!
//! Runs the compute request cycle from the command line:
//! - [`config`]: TOML configuration with environment and CLI overrides
//! - [`envelope`]: decoder for compute-service geometry envelopes
//! - [`console`]: log-only scene and UI
//! - [`export`]: writes exported geometry to disk
//! - [`session`]: wires them into one controller

#![warn(unreachable_pub)]

pub mod cli;
pub mod config;
pub mod console;
pub mod envelope;
pub mod export;
pub mod session;

pub use config::{ConfigError, DefinitionSource, ViewerConfig, API_KEY_ENV};
pub use console::{ConsoleScene, ConsoleUi};
pub use envelope::{EncodedObject, EnvelopeDecoder};
pub use export::FileExportSink;
pub use session::{Session, ViewerError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
