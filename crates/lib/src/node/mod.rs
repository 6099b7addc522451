//!
//! Defines the row type (`TreeNode`) shared by the engine and every Node Store.
//!
//! A `TreeNode` is one entity instance participating in a hierarchy. Its
//! position is encoded twice: once as a `parent_id` pointer and once as the
//! nested-set pair `(lft, rgt)`. The engine keeps the two consistent; the
//! pointer is authoritative when numbering has to be rebuilt from scratch.

pub mod id;

pub use id::NodeId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One row of a nested-set hierarchy.
///
/// Rows are owned by the Node Store. Every value read from a store is a copy
/// that is only valid until the next mutation of its scope, since mutations
/// renumber in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Identity of the node, unique within its scope.
    pub id: NodeId,
    /// Parent of this node. `None` only for roots.
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    /// Whether this node may hold children.
    pub is_group: bool,
    /// Left boundary. `0` means the row has never been numbered.
    #[serde(default)]
    pub lft: i64,
    /// Right boundary. `0` means the row has never been numbered.
    #[serde(default)]
    pub rgt: i64,
    /// Parent before the most recent successful move.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_parent: Option<NodeId>,
    /// Explicit sibling ordering key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_key: Option<String>,
    /// Caller-owned entity data. The engine never inspects it.
    #[serde(default)]
    pub payload: Value,
}

impl TreeNode {
    /// Creates a row that has not been numbered yet.
    ///
    /// Such rows come from bulk imports; they must go through
    /// [`Forest::rebuild`](crate::Forest::rebuild) before any other mutation
    /// of their scope is accepted.
    pub fn unnumbered(id: impl Into<NodeId>, parent_id: Option<NodeId>, is_group: bool) -> Self {
        Self {
            id: id.into(),
            parent_id,
            is_group,
            lft: 0,
            rgt: 0,
            old_parent: None,
            order_key: None,
            payload: Value::Null,
        }
    }

    /// True if the node has no parent.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// True if the node is a leaf (may never hold children).
    pub fn is_leaf(&self) -> bool {
        !self.is_group
    }

    /// True once the row carries nested-set numbering.
    pub fn is_numbered(&self) -> bool {
        self.lft > 0 && self.rgt > 0
    }

    /// Number of boundary slots occupied by this node and its subtree.
    pub fn width(&self) -> i64 {
        self.rgt - self.lft + 1
    }

    /// Number of descendants implied by the numbering.
    pub fn descendant_count(&self) -> i64 {
        (self.rgt - self.lft - 1) / 2
    }

    /// True if the numbering says this node has at least one descendant.
    pub fn has_children(&self) -> bool {
        self.rgt - self.lft > 1
    }

    /// True if `other` lies strictly inside this node's range.
    pub fn contains(&self, other: &TreeNode) -> bool {
        self.lft < other.lft && other.rgt < self.rgt
    }

    /// True if this node lies strictly inside `ancestor`'s range.
    pub fn is_descendant_of(&self, ancestor: &TreeNode) -> bool {
        ancestor.contains(self)
    }

    /// True if the numeric boundary `value` falls inside `[lft, rgt]`.
    pub fn covers(&self, value: i64) -> bool {
        self.lft <= value && value <= self.rgt
    }
}

/// Description of a node to insert.
///
/// The engine assigns numbering; callers only describe identity, kind,
/// ordering and payload.
///
/// # Example
///
/// ```
/// use canopy::NewNode;
/// use serde_json::json;
///
/// let node = NewNode::group()
///     .with_id("Assets")
///     .with_order_key("1000")
///     .with_payload(json!({"account_type": "Asset"}));
/// assert!(node.is_group());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NewNode {
    pub(crate) id: Option<NodeId>,
    pub(crate) is_group: bool,
    pub(crate) order_key: Option<String>,
    pub(crate) payload: Value,
}

impl NewNode {
    /// Describes a node that may hold children.
    pub fn group() -> Self {
        Self::new(true)
    }

    /// Describes a leaf node.
    pub fn leaf() -> Self {
        Self::new(false)
    }

    /// Describes a node with an explicit group flag.
    pub fn new(is_group: bool) -> Self {
        Self {
            id: None,
            is_group,
            order_key: None,
            payload: Value::Null,
        }
    }

    /// Sets the node id. A random id is generated on insert when absent.
    pub fn with_id(mut self, id: impl Into<NodeId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the sibling ordering key.
    pub fn with_order_key(mut self, key: impl Into<String>) -> Self {
        self.order_key = Some(key.into());
        self
    }

    /// Attaches caller-owned payload.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn id(&self) -> Option<&NodeId> {
        self.id.as_ref()
    }

    pub fn is_group(&self) -> bool {
        self.is_group
    }

    pub fn order_key(&self) -> Option<&str> {
        self.order_key.as_deref()
    }

    /// Materializes the row with the given parent and numbering.
    pub(crate) fn into_node(self, parent_id: Option<NodeId>, lft: i64, rgt: i64) -> TreeNode {
        TreeNode {
            id: self.id.unwrap_or_else(NodeId::generate),
            parent_id,
            is_group: self.is_group,
            lft,
            rgt,
            old_parent: None,
            order_key: self.order_key,
            payload: self.payload,
        }
    }
}
