//! Viewer configuration
//!
//! Loaded from a TOML file, then overridden by the environment and CLI flags:
//!
//! ```toml
//! [definition]
//! kind = "named"
//! name = "orbs.gh"
//!
//! [transport]
//! request_timeout_ms = 10000
//!
//! [transport.endpoint]
//! kind = "compute_service"
//! base_url = "http://localhost:6500"
//!
//! [cycle]
//! display_mode = "document"
//!
//! [inputs]
//! grow = 3.0
//! seed = 7.0
//! ```

use gsolve_cycle::CycleConfig;
use gsolve_schema::{DefinitionRef, SliderInputs};
use gsolve_transport::{Endpoint, TransportConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the compute service API key
pub const API_KEY_ENV: &str = "GSOLVE_API_KEY";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config or definition file unreadable
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Not valid TOML for a viewer config
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Parsed but unusable
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Where the geometry definition comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DefinitionSource {
    /// Resolved by name on the application server
    Named { name: String },
    /// URL the compute service fetches
    Pointer { url: String },
    /// Local file uploaded with every request
    File { path: PathBuf },
}

impl Default for DefinitionSource {
    fn default() -> Self {
        Self::Named {
            name: "orbs.gh".to_string(),
        }
    }
}

impl DefinitionSource {
    /// Resolve into a request definition, reading local files
    ///
    /// # Errors
    /// `ConfigError::Read` if a definition file cannot be read.
    pub async fn resolve(&self) -> Result<DefinitionRef, ConfigError> {
        match self {
            Self::Named { name } => Ok(DefinitionRef::named(name.clone())),
            Self::Pointer { url } => Ok(DefinitionRef::pointer(url.clone())),
            Self::File { path } => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|source| ConfigError::Read {
                        path: path.clone(),
                        source,
                    })?;
                let name = path.file_name().map_or_else(
                    || path.display().to_string(),
                    |n| n.to_string_lossy().into_owned(),
                );
                tracing::debug!("Loaded definition {} ({} bytes)", name, bytes.len());
                Ok(DefinitionRef::inline(name, bytes))
            }
        }
    }
}

/// Complete viewer configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Geometry definition
    pub definition: DefinitionSource,
    /// Solving endpoint
    pub transport: TransportConfig,
    /// Request cycle
    pub cycle: CycleConfig,
    /// Default slider values
    pub inputs: SliderInputs,
}

impl ViewerConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML
    ///
    /// # Errors
    /// - `Parse` if the document does not match the config shape
    /// - `Invalid` if a slider default is not finite
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file
    ///
    /// # Errors
    /// `Read` if the file cannot be read, otherwise as [`Self::from_toml_str`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// With endpoint
    #[inline]
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.transport.endpoint = endpoint;
        self
    }

    /// With definition
    #[inline]
    #[must_use]
    pub fn with_definition(mut self, definition: DefinitionSource) -> Self {
        self.definition = definition;
        self
    }

    /// Fill the compute service API key from `key` unless the file set one
    #[must_use]
    pub fn with_api_key_fallback(mut self, key: Option<String>) -> Self {
        if let Endpoint::ComputeService { api_key, .. } = &mut self.transport.endpoint {
            if api_key.is_none() {
                *api_key = key.filter(|k| !k.is_empty());
            }
        }
        self
    }

    /// Apply [`API_KEY_ENV`] from the process environment
    #[must_use]
    pub fn with_env(self) -> Self {
        let key = std::env::var(API_KEY_ENV).ok();
        self.with_api_key_fallback(key)
    }

    /// Copy safe to print: the API key is masked
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if let Endpoint::ComputeService {
            api_key: Some(key), ..
        } = &mut copy.transport.endpoint
        {
            *key = "<redacted>".to_string();
        }
        copy
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some((name, value)) = self.inputs.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "input {name} must be finite, got {value}"
            )));
        }
        if self.cycle.output_branch.is_empty() {
            return Err(ConfigError::Invalid("cycle.output_branch is empty".to_string()));
        }
        Ok(())
    }
}
