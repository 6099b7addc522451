//! Engine configuration.
//!
//! A [`ForestConfig`] is read from a JSON file and turned into the settings of
//! a [`Forest`](crate::Forest): whether writes are audited and which
//! hierarchies exist on top of the standard ones.
//!
//! ```json
//! {
//!   "verify_writes": true,
//!   "hierarchies": [
//!     { "entity_type": "Folder", "allow_multiple_roots": true, "cascade_delete_default": true },
//!     { "entity_type": "Project Phase", "context_required": true, "require_order_key": true }
//!   ]
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Result;
use crate::scope::{HierarchyConfig, ScopeRegistry};

/// Errors raised while loading configuration.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config file {path}")]
    Read {
        /// The file that was read
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid configuration JSON.
    #[error("Failed to parse config file {path}")]
    Parse {
        /// The file that was parsed
        path: PathBuf,
        /// The underlying parse error
        #[source]
        source: serde_json::Error,
    },
}

impl From<ConfigError> for crate::Error {
    fn from(err: ConfigError) -> Self {
        crate::Error::Config(err)
    }
}

/// A hierarchy declared in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyDeclaration {
    pub entity_type: String,
    #[serde(flatten)]
    pub config: HierarchyConfig,
}

/// Settings of a [`Forest`](crate::Forest).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    /// Audit the post-mutation state before every write.
    pub verify_writes: bool,
    /// Hierarchies registered on top of [`ScopeRegistry::standard`].
    /// A declaration with a standard entity type replaces its policy.
    pub hierarchies: Vec<HierarchyDeclaration>,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            verify_writes: true,
            hierarchies: Vec::new(),
        }
    }
}

impl ForestConfig {
    /// Loads configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded forest config");
        Ok(config)
    }

    /// Builds the registry: the standard hierarchies plus every declaration.
    pub fn registry(&self) -> Result<ScopeRegistry> {
        let mut registry = ScopeRegistry::standard();
        for declaration in &self.hierarchies {
            registry.register(declaration.entity_type.clone(), declaration.config)?;
        }
        Ok(registry)
    }
}
