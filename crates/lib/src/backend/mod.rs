//! Node Store implementations for Canopy
//!
//! This module provides the core `NodeStore` trait and the backends that
//! implement it, organized by category (currently only `database`).
//!
//! The `NodeStore` trait is the engine's only boundary with durable storage.
//! It deals in whole rows ([`TreeNode`]) keyed by `(scope, id)` and exposes
//! exactly the capabilities the nested-set engine needs: point reads, range
//! scans over `lft`/`rgt`, and an atomic multi-row write.

use std::any::Any;

use crate::Result;
use crate::node::{NodeId, TreeNode};
use crate::scope::ScopeId;

// Category modules
pub mod database;
mod errors;

pub use errors::BackendError;

/// A set of row changes applied atomically to one scope.
///
/// Removals and upserts must not name the same id; stores reject such a
/// batch with [`BackendError::BatchRejected`] before touching any row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    upserts: Vec<TreeNode>,
    removals: Vec<NodeId>,
}

impl WriteBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a row to be inserted or replaced.
    pub fn put(&mut self, node: TreeNode) -> &mut Self {
        self.upserts.push(node);
        self
    }

    /// Queues a row to be removed.
    pub fn remove(&mut self, id: NodeId) -> &mut Self {
        self.removals.push(id);
        self
    }

    /// Rows to insert or replace.
    pub fn upserts(&self) -> &[TreeNode] {
        &self.upserts
    }

    /// Ids to remove.
    pub fn removals(&self) -> &[NodeId] {
        &self.removals
    }

    /// Total number of row changes.
    pub fn len(&self) -> usize {
        self.upserts.len() + self.removals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.removals.is_empty()
    }

    /// Splits the batch into its upserts and removals.
    pub fn into_parts(self) -> (Vec<TreeNode>, Vec<NodeId>) {
        (self.upserts, self.removals)
    }

    /// Checks the batch is well formed before a store applies it.
    ///
    /// Every backend calls this first so that a malformed batch never reaches
    /// the point of partial application.
    pub fn validate(&self, scope: &ScopeId) -> Result<()> {
        let mut seen = std::collections::HashSet::with_capacity(self.len());
        for id in self
            .upserts
            .iter()
            .map(|node| &node.id)
            .chain(self.removals.iter())
        {
            if id.is_empty() {
                return Err(BackendError::BatchRejected {
                    scope: scope.clone(),
                    reason: "batch contains an empty node id".to_string(),
                }
                .into());
            }
            if !seen.insert(id) {
                return Err(BackendError::BatchRejected {
                    scope: scope.clone(),
                    reason: format!("node {id} appears more than once in the batch"),
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Storage abstraction consumed by the tree engine.
///
/// Implementations handle how rows are persisted (in memory, SQLite,
/// PostgreSQL). The engine never caches rows across calls: every mutation
/// re-reads what it needs through this trait, so implementations are free to
/// be shared between processes as long as each scope has a single writer.
///
/// All implementations must be `Send` and `Sync` to allow sharing across
/// threads, and implement `Any` to allow for downcasting if needed.
pub trait NodeStore: Send + Sync + Any {
    /// Reads one row.
    ///
    /// # Returns
    /// The row, or `BackendError::NodeNotFound` if the scope holds no such id.
    fn read_node(&self, scope: &ScopeId, id: &NodeId) -> Result<TreeNode>;

    /// Range scan over the numbering.
    ///
    /// Returns every numbered row of the scope with `lft >= lft_min` and
    /// `rgt <= rgt_max`, ordered by `lft` ascending. Unnumbered rows are never
    /// returned.
    fn read_range(&self, scope: &ScopeId, lft_min: i64, rgt_max: i64) -> Result<Vec<TreeNode>>;

    /// Enclosing-range scan, the ancestor predicate of the nested-set model.
    ///
    /// Returns every numbered row of the scope with `lft < inner_lft` and
    /// `rgt > inner_rgt`, ordered by `lft` ascending (outermost first).
    fn read_enclosing(
        &self,
        scope: &ScopeId,
        inner_lft: i64,
        inner_rgt: i64,
    ) -> Result<Vec<TreeNode>>;

    /// Reads every row of a scope, numbered or not.
    ///
    /// Numbered rows come first ordered by `lft`; unnumbered rows follow in
    /// id order.
    fn scan_scope(&self, scope: &ScopeId) -> Result<Vec<TreeNode>>;

    /// Applies a batch of upserts and removals atomically.
    ///
    /// Either every change in the batch becomes visible or none does. A failed
    /// write leaves the previously committed rows untouched.
    fn write_batch(&self, scope: &ScopeId, batch: WriteBatch) -> Result<()>;

    /// Lists the scopes that currently hold at least one row.
    fn scopes(&self) -> Result<Vec<ScopeId>>;

    /// Whether each single read observes a committed state.
    ///
    /// When true, readers may skip the engine's shared scope lock. Backends
    /// that can expose a half-applied batch to a concurrent reader must
    /// return false.
    fn consistent_reads(&self) -> bool {
        false
    }

    /// Returns a reference to the store as a dynamic `Any` type.
    ///
    /// This allows for downcasting to a concrete backend implementation if
    /// necessary, enabling access to implementation-specific methods.
    fn as_any(&self) -> &dyn Any;

    /// Reads every numbered row of a scope ordered by `lft`.
    fn read_numbered(&self, scope: &ScopeId) -> Result<Vec<TreeNode>> {
        self.read_range(scope, 1, i64::MAX)
    }

    /// Reads the numbered roots of a scope ordered by `lft`.
    ///
    /// The default filters a full numbered scan; stores with an index on
    /// `parent_id` should override it.
    fn read_roots(&self, scope: &ScopeId) -> Result<Vec<TreeNode>> {
        let mut nodes = self.read_numbered(scope)?;
        nodes.retain(TreeNode::is_root);
        Ok(nodes)
    }
}
