//! Error types for the wire schema
//!
//! - Input validation (slider values that JSON cannot carry)
//! - Request encoding (definition kinds an endpoint cannot express)
//! - Response protocol violations (missing or malformed structure)

/// Slider input errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    /// NaN and infinities have no JSON representation
    #[error("input '{name}' is not a finite number ({value})")]
    NotFinite { name: String, value: f64 },

    /// Parameter names must be non-empty
    #[error("input name must not be empty")]
    EmptyName,
}

/// Request encoding errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// The endpoint cannot express this kind of definition reference
    #[error("{endpoint} cannot send a {kind} definition")]
    UnsupportedDefinition {
        endpoint: &'static str,
        kind: &'static str,
    },

    /// JSON rendering failed
    #[error("json encoding failed: {0}")]
    Json(String),
}

/// Protocol violations in a solve response
///
/// Every missing or renamed key is reported here instead of being
/// replaced by a default.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// Body is not a JSON solve response
    #[error("malformed response body: {0}")]
    MalformedBody(String),

    /// Response carries no output parameters at all
    #[error("response contains no outputs")]
    NoOutputs,

    /// Output lacks the expected branch key
    #[error("output '{param}' has no branch '{branch}'")]
    MissingBranch { param: String, branch: String },

    /// Selected branch holds no geometry records
    #[error("output '{param}' branch '{branch}' holds no records")]
    EmptyBranch { param: String, branch: String },

    /// Record payload is not valid JSON
    #[error("record {index} of output '{param}' is malformed: {reason}")]
    MalformedRecord {
        param: String,
        index: usize,
        reason: String,
    },
}
