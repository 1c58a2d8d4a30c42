//! Slider inputs
//!
//! Named numeric parameters read from the UI controls at request time.

use crate::error::InputError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered mapping from parameter name to its current value
///
/// Insertion order is preserved so requests serialize deterministically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SliderInputs {
    values: IndexMap<String, f64>,
}

impl SliderInputs {
    /// Create empty inputs
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`SliderInputs::set`]
    ///
    /// # Errors
    /// Same as [`SliderInputs::set`].
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Result<Self, InputError> {
        self.set(name, value)?;
        Ok(self)
    }

    /// Set a parameter, replacing any previous value in place
    ///
    /// # Errors
    /// - `InputError::EmptyName` for an empty name
    /// - `InputError::NotFinite` for NaN or infinite values
    pub fn set(&mut self, name: impl Into<String>, value: f64) -> Result<(), InputError> {
        let name = name.into();
        if name.is_empty() {
            return Err(InputError::EmptyName);
        }
        if !value.is_finite() {
            return Err(InputError::NotFinite { name, value });
        }
        self.values.insert(name, value);
        Ok(())
    }

    /// Current value of a parameter
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Parameters in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of parameters
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no parameter is set
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Merge `other` on top of `self`; later values win
    #[must_use]
    pub fn merged(mut self, other: &SliderInputs) -> Self {
        for (name, value) in other.iter() {
            self.values.insert(name.to_string(), value);
        }
        self
    }
}

impl std::fmt::Display for SliderInputs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        write!(f, "}}")
    }
}
