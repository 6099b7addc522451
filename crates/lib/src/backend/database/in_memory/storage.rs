//! Row storage operations for the InMemory store
//!
//! Reads clone rows out under the read lock; batches are validated first and
//! then applied under one write lock, which is what makes them atomic.

use super::InMemory;
use crate::Result;
use crate::backend::{BackendError, WriteBatch};
use crate::node::{NodeId, TreeNode};
use crate::scope::ScopeId;

pub(crate) fn read_node(store: &InMemory, scope: &ScopeId, id: &NodeId) -> Result<TreeNode> {
    let scopes = store.scopes.read().unwrap();
    scopes
        .get(scope)
        .and_then(|rows| rows.get(id))
        .cloned()
        .ok_or_else(|| {
            BackendError::NodeNotFound {
                scope: scope.clone(),
                id: id.clone(),
            }
            .into()
        })
}

pub(crate) fn read_range(
    store: &InMemory,
    scope: &ScopeId,
    lft_min: i64,
    rgt_max: i64,
) -> Vec<TreeNode> {
    let scopes = store.scopes.read().unwrap();
    let Some(rows) = scopes.get(scope) else {
        return Vec::new();
    };

    let mut nodes: Vec<TreeNode> = rows
        .values()
        .filter(|node| node.is_numbered() && node.lft >= lft_min && node.rgt <= rgt_max)
        .cloned()
        .collect();
    nodes.sort_by_key(|node| node.lft);
    nodes
}

pub(crate) fn read_enclosing(
    store: &InMemory,
    scope: &ScopeId,
    inner_lft: i64,
    inner_rgt: i64,
) -> Vec<TreeNode> {
    let scopes = store.scopes.read().unwrap();
    let Some(rows) = scopes.get(scope) else {
        return Vec::new();
    };

    let mut nodes: Vec<TreeNode> = rows
        .values()
        .filter(|node| node.is_numbered() && node.lft < inner_lft && node.rgt > inner_rgt)
        .cloned()
        .collect();
    nodes.sort_by_key(|node| node.lft);
    nodes
}

pub(crate) fn scan_scope(store: &InMemory, scope: &ScopeId) -> Vec<TreeNode> {
    let scopes = store.scopes.read().unwrap();
    let Some(rows) = scopes.get(scope) else {
        return Vec::new();
    };

    // BTreeMap iteration is already in id order, so a stable sort keeps
    // unnumbered rows sorted by id after the numbered ones
    let mut nodes: Vec<TreeNode> = rows.values().cloned().collect();
    nodes.sort_by_key(|node| (!node.is_numbered(), node.lft));
    nodes
}

pub(crate) fn write_batch(store: &InMemory, scope: &ScopeId, batch: WriteBatch) -> Result<()> {
    batch.validate(scope)?;
    if batch.is_empty() {
        return Ok(());
    }

    let (upserts, removals) = batch.into_parts();
    let mut scopes = store.scopes.write().unwrap();
    let rows = scopes.entry(scope.clone()).or_default();
    for id in &removals {
        rows.remove(id);
    }
    for node in upserts {
        rows.insert(node.id.clone(), node);
    }
    if rows.is_empty() {
        scopes.remove(scope);
    }
    Ok(())
}

pub(crate) fn scopes(store: &InMemory) -> Vec<ScopeId> {
    let scopes = store.scopes.read().unwrap();
    let mut ids: Vec<ScopeId> = scopes.keys().cloned().collect();
    ids.sort();
    ids
}
