//! The Tree Query Engine.
//!
//! Read-only operations answered with range predicates over `lft`/`rgt`.
//! Every call re-reads the Node Store, so results are never stale with
//! respect to the last committed mutation.

use super::locks::ScopeLocks;
use crate::Result;
use crate::backend::NodeStore;
use crate::node::{NodeId, TreeNode};
use crate::scope::ScopeId;

/// Read handle on one scope.
///
/// Obtained from [`Forest::query`](crate::Forest::query). Methods that combine
/// several store reads hold the scope's shared lock so they never mix two
/// numberings. Single reads skip the lock when the Node Store guarantees
/// consistent reads.
///
/// # Example
///
/// ```
/// use canopy::{Forest, NewNode};
/// use canopy::backend::database::InMemory;
///
/// let forest = Forest::new(InMemory::new());
/// let scope = forest.resolve("Territory", "").unwrap();
/// forest.insert(&scope, None, NewNode::group().with_id("World")).unwrap();
/// forest.insert(&scope, Some(&"World".into()), NewNode::leaf().with_id("Europe")).unwrap();
///
/// let query = forest.query(&scope).unwrap();
/// let ancestors = query.ancestors_of(&"Europe".into()).unwrap();
/// assert_eq!(ancestors[0].id, "World");
/// assert_eq!(query.depth_of(&"Europe".into()).unwrap(), 1);
/// ```
pub struct TreeQuery<'a> {
    store: &'a dyn NodeStore,
    locks: &'a ScopeLocks,
    scope: ScopeId,
}

impl<'a> TreeQuery<'a> {
    pub(crate) fn new(store: &'a dyn NodeStore, locks: &'a ScopeLocks, scope: ScopeId) -> Self {
        Self {
            store,
            locks,
            scope,
        }
    }

    pub fn scope(&self) -> &ScopeId {
        &self.scope
    }

    /// One store call, under the shared lock unless the store's reads are
    /// consistent on their own.
    fn read<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        if self.store.consistent_reads() {
            f()
        } else {
            self.locks.with_shared(&self.scope, f)
        }
    }

    /// Several store calls that must observe the same committed state.
    fn read_many<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        self.locks.with_shared(&self.scope, f)
    }

    /// Reads one node.
    pub fn node(&self, id: &NodeId) -> Result<TreeNode> {
        self.read(|| self.store.read_node(&self.scope, id))
    }

    /// Every numbered node of the scope in `lft` order.
    pub fn all(&self) -> Result<Vec<TreeNode>> {
        self.read(|| self.store.read_numbered(&self.scope))
    }

    /// Roots of the scope in `lft` order.
    pub fn roots(&self) -> Result<Vec<TreeNode>> {
        self.read(|| self.store.read_roots(&self.scope))
    }

    /// Nodes whose range strictly contains `id`'s, root first.
    pub fn ancestors_of(&self, id: &NodeId) -> Result<Vec<TreeNode>> {
        self.read_many(|| {
            let node = self.store.read_node(&self.scope, id)?;
            self.store.read_enclosing(&self.scope, node.lft, node.rgt)
        })
    }

    /// Nodes strictly inside `id`'s range in `lft` order.
    ///
    /// With `include_groups = false` only leaves are returned.
    pub fn descendants_of(&self, id: &NodeId, include_groups: bool) -> Result<Vec<TreeNode>> {
        self.read_many(|| {
            let node = self.store.read_node(&self.scope, id)?;
            if !node.has_children() {
                return Ok(Vec::new());
            }
            let mut descendants = self
                .store
                .read_range(&self.scope, node.lft + 1, node.rgt - 1)?;
            if !include_groups {
                descendants.retain(TreeNode::is_leaf);
            }
            Ok(descendants)
        })
    }

    /// True if `a` lies strictly inside `b`'s range.
    pub fn is_descendant_of(&self, a: &NodeId, b: &NodeId) -> Result<bool> {
        self.read_many(|| {
            let a = self.store.read_node(&self.scope, a)?;
            let b = self.store.read_node(&self.scope, b)?;
            Ok(a.is_descendant_of(&b))
        })
    }

    /// Number of ancestors of `id`; roots have depth 0.
    pub fn depth_of(&self, id: &NodeId) -> Result<usize> {
        Ok(self.ancestors_of(id)?.len())
    }

    /// Direct children of `id` in `lft` order.
    pub fn children_of(&self, id: &NodeId) -> Result<Vec<TreeNode>> {
        self.read_many(|| {
            let node = self.store.read_node(&self.scope, id)?;
            self.children_within(&node)
        })
    }

    /// Other nodes sharing `id`'s parent, in `lft` order.
    ///
    /// Inserts place keyed siblings in `order_key` order, so `lft` order is
    /// also key order for siblings that carry keys.
    pub fn siblings_of(&self, id: &NodeId) -> Result<Vec<TreeNode>> {
        self.read_many(|| {
            let node = self.store.read_node(&self.scope, id)?;
            let mut siblings = match &node.parent_id {
                Some(parent) => {
                    let parent = self.store.read_node(&self.scope, parent)?;
                    self.children_within(&parent)?
                }
                None => self.store.read_roots(&self.scope)?,
            };
            siblings.retain(|sibling| sibling.id != node.id);
            Ok(siblings)
        })
    }

    fn children_within(&self, parent: &TreeNode) -> Result<Vec<TreeNode>> {
        if !parent.has_children() {
            return Ok(Vec::new());
        }
        let mut children = self
            .store
            .read_range(&self.scope, parent.lft + 1, parent.rgt - 1)?;
        children.retain(|child| child.parent_id.as_ref() == Some(&parent.id));
        Ok(children)
    }
}
