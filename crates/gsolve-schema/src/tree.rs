//! Data trees
//!
//! The solving service exchanges parameters as named trees of branches,
//! each branch keyed by a path string and holding a list of items.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One item inside a branch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeItem<T> {
    /// Service-side type name (e.g. `Rhino.Geometry.Mesh`)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// Item payload
    pub data: T,
}

impl<T> TreeItem<T> {
    /// Untyped item
    #[inline]
    pub fn new(data: T) -> Self {
        Self {
            type_name: None,
            data,
        }
    }

    /// Item with a service-side type name
    #[inline]
    #[must_use]
    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }
}

/// Named parameter tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTree<T> {
    /// Parameter name (`RH_IN:grow`, `RH_OUT:mesh`, ...)
    #[serde(rename = "ParamName")]
    pub param_name: String,
    /// Branches in service order
    #[serde(rename = "InnerTree")]
    pub inner_tree: IndexMap<String, Vec<TreeItem<T>>>,
}

impl<T> DataTree<T> {
    /// Empty tree for a parameter
    #[inline]
    #[must_use]
    pub fn new(param_name: impl Into<String>) -> Self {
        Self {
            param_name: param_name.into(),
            inner_tree: IndexMap::new(),
        }
    }

    /// Append items to a branch, creating it if needed
    pub fn append(&mut self, branch: impl Into<String>, items: impl IntoIterator<Item = T>) {
        self.inner_tree
            .entry(branch.into())
            .or_default()
            .extend(items.into_iter().map(TreeItem::new));
    }

    /// Items of a branch
    #[inline]
    #[must_use]
    pub fn branch(&self, key: &str) -> Option<&[TreeItem<T>]> {
        self.inner_tree.get(key).map(Vec::as_slice)
    }

    /// Total number of items across all branches
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.inner_tree.values().map(Vec::len).sum()
    }
}
