//! Solve requests
//!
//! A request pairs the slider inputs with a reference to the geometry
//! definition the service should evaluate. Two wire renderings exist:
//!
//! | endpoint        | body                                                    |
//! |-----------------|---------------------------------------------------------|
//! | app server      | `{"definition": name, "inputs": {name: value}}`         |
//! | compute service | `{"algo": b64, "pointer": url, "values": [DataTree]}`   |

use crate::error::EncodeError;
use crate::inputs::SliderInputs;
use crate::tree::DataTree;
use base64::Engine;
use serde::Serialize;
use serde_json::Value;

/// Prefix the compute service expects on input parameter names
pub const INPUT_PREFIX: &str = "RH_IN:";

/// Branch path every scalar input is appended to
pub const INPUT_BRANCH: &str = "{0}";

/// Reference to a geometry definition
#[derive(Clone, PartialEq, Eq)]
pub enum DefinitionRef {
    /// Name resolved by the application server (e.g. `orbs.gh`)
    Named(String),
    /// URL the compute service downloads itself
    Pointer(String),
    /// Definition bytes uploaded with every request
    Inline { name: String, bytes: Vec<u8> },
}

impl DefinitionRef {
    /// Named definition
    #[inline]
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Definition by URL
    #[inline]
    pub fn pointer(url: impl Into<String>) -> Self {
        Self::Pointer(url.into())
    }

    /// Inline definition bytes
    #[inline]
    pub fn inline(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self::Inline {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Display name used in logs
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Named(name) | Self::Inline { name, .. } => name,
            Self::Pointer(url) => url,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Named(_) => "named",
            Self::Pointer(_) => "pointer",
            Self::Inline { .. } => "inline",
        }
    }
}

impl std::fmt::Debug for DefinitionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Self::Pointer(url) => f.debug_tuple("Pointer").field(url).finish(),
            Self::Inline { name, bytes } => f
                .debug_struct("Inline")
                .field("name", name)
                .field("bytes", &bytes.len())
                .finish(),
        }
    }
}

/// Immutable solve request
#[derive(Debug, Clone, PartialEq)]
pub struct SolveRequest {
    definition: DefinitionRef,
    inputs: SliderInputs,
}

#[derive(Serialize)]
struct AppServerBody<'a> {
    definition: &'a str,
    inputs: &'a SliderInputs,
}

#[derive(Serialize)]
struct ComputeBody<'a> {
    algo: Option<String>,
    pointer: Option<&'a str>,
    values: Vec<DataTree<f64>>,
}

impl SolveRequest {
    /// Build a request
    #[inline]
    #[must_use]
    pub fn new(definition: DefinitionRef, inputs: SliderInputs) -> Self {
        Self { definition, inputs }
    }

    /// Definition reference
    #[inline]
    #[must_use]
    pub fn definition(&self) -> &DefinitionRef {
        &self.definition
    }

    /// Slider inputs
    #[inline]
    #[must_use]
    pub fn inputs(&self) -> &SliderInputs {
        &self.inputs
    }

    /// Body for the application server's `/solve` route
    ///
    /// # Errors
    /// `EncodeError::UnsupportedDefinition` unless the definition is
    /// [`DefinitionRef::Named`].
    pub fn app_server_body(&self) -> Result<Value, EncodeError> {
        let DefinitionRef::Named(name) = &self.definition else {
            return Err(EncodeError::UnsupportedDefinition {
                endpoint: "app server",
                kind: self.definition.kind(),
            });
        };
        let body = AppServerBody {
            definition: name,
            inputs: &self.inputs,
        };
        serde_json::to_value(body).map_err(|e| EncodeError::Json(e.to_string()))
    }

    /// Body for the compute service's `grasshopper` route
    ///
    /// Named definitions are sent as pointers; the service resolves them
    /// relative to its own definition store.
    ///
    /// # Errors
    /// `EncodeError::Json` if rendering fails.
    pub fn compute_body(&self) -> Result<Value, EncodeError> {
        let (algo, pointer) = match &self.definition {
            DefinitionRef::Named(name) => (None, Some(name.as_str())),
            DefinitionRef::Pointer(url) => (None, Some(url.as_str())),
            DefinitionRef::Inline { bytes, .. } => (
                Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
                None,
            ),
        };

        let values = self
            .inputs
            .iter()
            .map(|(name, value)| {
                let mut tree = DataTree::new(format!("{INPUT_PREFIX}{name}"));
                tree.append(INPUT_BRANCH, [value]);
                tree
            })
            .collect();

        let body = ComputeBody {
            algo,
            pointer,
            values,
        };
        serde_json::to_value(body).map_err(|e| EncodeError::Json(e.to_string()))
    }
}
