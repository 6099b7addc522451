//! Persistence operations for the InMemory store
//!
//! This module handles serialization and file I/O for saving/loading the
//! in-memory state to/from JSON files.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use serde::{Deserialize, Deserializer, Serialize};

use super::{InMemory, ScopeRows};
use crate::backend::BackendError;
use crate::node::TreeNode;
use crate::scope::ScopeId;
use crate::{Error, Result};

/// The current persistence file format version.
/// v0 indicates this is an unstable format subject to breaking changes.
const PERSISTENCE_VERSION: u8 = 0;

/// Helper to check if version is default (0) for serde skip_serializing_if
fn is_v0(v: &u8) -> bool {
    *v == 0
}

/// Validates the persistence version during deserialization.
fn validate_persistence_version<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let version = u8::deserialize(deserializer)?;
    if version != PERSISTENCE_VERSION {
        return Err(serde::de::Error::custom(format!(
            "unsupported persistence version {version}; only version {PERSISTENCE_VERSION} is supported"
        )));
    }
    Ok(version)
}

/// Rows of one scope as written to disk.
#[derive(Serialize, Deserialize)]
struct SerializableScope {
    scope: ScopeId,
    nodes: Vec<TreeNode>,
}

/// Serializable version of the InMemory store
///
/// Scopes are written as a list because JSON object keys must be strings.
#[derive(Serialize, Deserialize)]
struct SerializableStore {
    /// File format version for compatibility checking
    #[serde(
        rename = "_v",
        default,
        skip_serializing_if = "is_v0",
        deserialize_with = "validate_persistence_version"
    )]
    version: u8,
    #[serde(default)]
    scopes: Vec<SerializableScope>,
}

impl SerializableStore {
    fn capture(store: &InMemory) -> Self {
        let scopes = store.scopes.read().unwrap();
        let mut captured: Vec<SerializableScope> = scopes
            .iter()
            .map(|(scope, rows)| SerializableScope {
                scope: scope.clone(),
                nodes: rows.values().cloned().collect(),
            })
            .collect();
        captured.sort_by(|a, b| a.scope.cmp(&b.scope));
        Self {
            version: PERSISTENCE_VERSION,
            scopes: captured,
        }
    }

    fn into_store(self) -> InMemory {
        let scopes: HashMap<ScopeId, ScopeRows> = self
            .scopes
            .into_iter()
            .filter(|scope| !scope.nodes.is_empty())
            .map(|scope| {
                let rows = scope
                    .nodes
                    .into_iter()
                    .map(|node| (node.id.clone(), node))
                    .collect();
                (scope.scope, rows)
            })
            .collect();
        InMemory {
            scopes: RwLock::new(scopes),
        }
    }
}

/// Saves every scope to a specified file as JSON.
///
/// # Arguments
/// * `store` - The InMemory store to save
/// * `path` - The path to the file where the state should be saved.
pub(crate) fn save_to_file<P: AsRef<Path>>(store: &InMemory, path: P) -> Result<()> {
    let serializable = SerializableStore::capture(store);
    let json = serde_json::to_string_pretty(&serializable)
        .map_err(|e| -> Error { BackendError::SerializationFailed { source: e }.into() })?;
    std::fs::write(path, json).map_err(|e| -> Error { BackendError::FileIo { source: e }.into() })
}

/// Loads the store from a specified JSON file.
///
/// If the file does not exist, a new, empty store is returned.
///
/// # Arguments
/// * `path` - The path to the file from which to load the state.
pub(crate) fn load_from_file<P: AsRef<Path>>(path: P) -> Result<InMemory> {
    match std::fs::read_to_string(path) {
        Ok(json) => {
            let serializable: SerializableStore = serde_json::from_str(&json).map_err(|e| -> Error {
                BackendError::DeserializationFailed { source: e }.into()
            })?;
            Ok(serializable.into_store())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(InMemory::new()),
        Err(e) => Err(BackendError::FileIo { source: e }.into()),
    }
}
