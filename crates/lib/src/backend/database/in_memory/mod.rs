//! In-memory Node Store implementation
//!
//! This module provides an in-memory implementation of the `NodeStore` trait,
//! suitable for testing, development, or deployments that persist by saving
//! the whole state to a JSON file.

mod persistence;
mod storage;

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::RwLock;

use crate::Result;
use crate::backend::{NodeStore, WriteBatch};
use crate::node::{NodeId, TreeNode};
use crate::scope::ScopeId;

/// Rows of one scope keyed by node id.
pub(crate) type ScopeRows = BTreeMap<NodeId, TreeNode>;

/// A simple in-memory Node Store using a `HashMap` of scopes.
///
/// Every read and every batch runs under a single `RwLock`, so readers always
/// observe a fully committed state and batches are atomic.
///
/// It provides basic persistence via `save_to_file` and `load_from_file`,
/// serializing all scopes to JSON.
#[derive(Debug, Default)]
pub struct InMemory {
    /// Rows grouped by scope
    pub(crate) scopes: RwLock<HashMap<ScopeId, ScopeRows>>,
}

impl InMemory {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of rows across all scopes.
    pub fn len(&self) -> usize {
        let scopes = self.scopes.read().unwrap();
        scopes.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Saves every scope to a file as JSON.
    ///
    /// # Arguments
    /// * `path` - The path to the file where the state should be saved.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        persistence::save_to_file(self, path)
    }

    /// Loads the store from a JSON file.
    ///
    /// If the file does not exist, a new, empty store is returned.
    ///
    /// # Arguments
    /// * `path` - The path to the file from which to load the state.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        persistence::load_from_file(path)
    }
}

impl NodeStore for InMemory {
    fn read_node(&self, scope: &ScopeId, id: &NodeId) -> Result<TreeNode> {
        storage::read_node(self, scope, id)
    }

    fn read_range(&self, scope: &ScopeId, lft_min: i64, rgt_max: i64) -> Result<Vec<TreeNode>> {
        Ok(storage::read_range(self, scope, lft_min, rgt_max))
    }

    fn read_enclosing(
        &self,
        scope: &ScopeId,
        inner_lft: i64,
        inner_rgt: i64,
    ) -> Result<Vec<TreeNode>> {
        Ok(storage::read_enclosing(self, scope, inner_lft, inner_rgt))
    }

    fn scan_scope(&self, scope: &ScopeId) -> Result<Vec<TreeNode>> {
        Ok(storage::scan_scope(self, scope))
    }

    fn write_batch(&self, scope: &ScopeId, batch: WriteBatch) -> Result<()> {
        storage::write_batch(self, scope, batch)
    }

    fn scopes(&self) -> Result<Vec<ScopeId>> {
        Ok(storage::scopes(self))
    }

    fn consistent_reads(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
