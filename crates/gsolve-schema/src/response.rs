//! Solve responses
//!
//! The service answers with a list of output trees whose items carry
//! JSON-encoded geometry. Traversal is typed: a caller states which records
//! it expects via [`RecordSelection`], and anything absent or malformed is a
//! [`ProtocolError`].

use crate::error::ProtocolError;
use crate::tree::{DataTree, TreeItem};
use serde::Deserialize;
use serde_json::Value;

/// Branch key the service uses for single-path outputs
pub const DEFAULT_OUTPUT_BRANCH: &str = "{ 0; }";

/// Parsed solve response
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SolveResponse {
    /// Output parameter trees
    pub values: Vec<DataTree<String>>,
    /// Definition pointer echoed back by the compute service
    #[serde(default)]
    pub pointer: Option<String>,
    /// Service warnings, logged but never interpreted
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Service errors, logged but never interpreted
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Which geometry records a caller expects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordSelection {
    /// First record of the given branch of the first output
    First { branch: String },
    /// Every record of the given branch of every output
    All { branch: String },
}

impl RecordSelection {
    /// First record of the default branch
    #[inline]
    #[must_use]
    pub fn first() -> Self {
        Self::First {
            branch: DEFAULT_OUTPUT_BRANCH.to_string(),
        }
    }

    /// All records of the default branch
    #[inline]
    #[must_use]
    pub fn all() -> Self {
        Self::All {
            branch: DEFAULT_OUTPUT_BRANCH.to_string(),
        }
    }

    /// Branch key this selection reads
    #[must_use]
    pub fn branch(&self) -> &str {
        match self {
            Self::First { branch } | Self::All { branch } => branch,
        }
    }
}

/// One geometry record with its payload already parsed
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryRecord {
    /// Output parameter the record came from
    pub param: String,
    /// Branch key
    pub path: String,
    /// Position within the branch
    pub index: usize,
    /// Service-side type name, if given
    pub type_name: Option<String>,
    /// Parsed `data` payload
    pub value: Value,
}

impl SolveResponse {
    /// Parse a response body
    ///
    /// # Errors
    /// `ProtocolError::MalformedBody` if the body is not a solve response.
    pub fn from_slice(body: &[u8]) -> Result<Self, ProtocolError> {
        serde_json::from_slice(body).map_err(|e| ProtocolError::MalformedBody(e.to_string()))
    }

    /// Total number of items across all outputs
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.values.iter().map(DataTree::item_count).sum()
    }

    /// Select the expected geometry records
    ///
    /// # Errors
    /// - `NoOutputs` when the response has no output trees
    /// - `MissingBranch` when a visited output lacks the branch key
    /// - `EmptyBranch` when nothing is selected
    /// - `MalformedRecord` when a record's payload is not JSON
    pub fn select(&self, selection: &RecordSelection) -> Result<Vec<GeometryRecord>, ProtocolError> {
        let branch = selection.branch();
        let first = self.values.first().ok_or(ProtocolError::NoOutputs)?;

        match selection {
            RecordSelection::First { .. } => {
                let items = branch_of(first, branch)?;
                let item = items.first().ok_or_else(|| ProtocolError::EmptyBranch {
                    param: first.param_name.clone(),
                    branch: branch.to_string(),
                })?;
                Ok(vec![parse_record(first, branch, 0, item)?])
            }
            RecordSelection::All { .. } => {
                let mut records = Vec::with_capacity(self.item_count());
                for output in &self.values {
                    for (index, item) in branch_of(output, branch)?.iter().enumerate() {
                        records.push(parse_record(output, branch, index, item)?);
                    }
                }
                if records.is_empty() {
                    return Err(ProtocolError::EmptyBranch {
                        param: first.param_name.clone(),
                        branch: branch.to_string(),
                    });
                }
                Ok(records)
            }
        }
    }
}

fn branch_of<'a>(
    output: &'a DataTree<String>,
    branch: &str,
) -> Result<&'a [TreeItem<String>], ProtocolError> {
    output
        .branch(branch)
        .ok_or_else(|| ProtocolError::MissingBranch {
            param: output.param_name.clone(),
            branch: branch.to_string(),
        })
}

fn parse_record(
    output: &DataTree<String>,
    branch: &str,
    index: usize,
    item: &TreeItem<String>,
) -> Result<GeometryRecord, ProtocolError> {
    let value = serde_json::from_str(&item.data).map_err(|e| ProtocolError::MalformedRecord {
        param: output.param_name.clone(),
        index,
        reason: e.to_string(),
    })?;
    Ok(GeometryRecord {
        param: output.param_name.clone(),
        path: branch.to_string(),
        index,
        type_name: item.type_name.clone(),
        value,
    })
}
