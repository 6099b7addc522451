//! Tree scopes: independent numbering spaces.
//!
//! Every hierarchy is numbered separately per `(entity_type, owning_context)`
//! pair. Two company charts of accounts, for example, are two scopes and
//! their `lft`/`rgt` values are never compared with each other.
//!
//! [`ScopeRegistry`] decides which entity types are tree-shaped at all and
//! which [`ScopePolicy`] applies to them.

mod errors;
mod registry;

pub use errors::ScopeError;
pub use registry::ScopeRegistry;
use serde::{Deserialize, Serialize};

/// Identifier of one independent numbering space.
///
/// Obtained from [`ScopeRegistry::resolve`], which validates that the entity
/// type is a registered hierarchy. Backends and tests may construct ids
/// directly with [`ScopeId::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeId {
    entity_type: String,
    #[serde(default)]
    context: String,
}

impl ScopeId {
    /// Creates a scope id without consulting a registry.
    pub fn new(entity_type: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            context: context.into(),
        }
    }

    /// Creates the id of a global (context-free) hierarchy.
    pub fn global(entity_type: impl Into<String>) -> Self {
        Self::new(entity_type, "")
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Owning context, empty for global hierarchies.
    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn is_global(&self) -> bool {
        self.context.is_empty()
    }
}

impl std::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.context.is_empty() {
            write!(f, "{}", self.entity_type)
        } else {
            write!(f, "{}[{}]", self.entity_type, self.context)
        }
    }
}

/// Per-hierarchy policy flags.
///
/// A closed set of switches resolved once per scope. All flags default to
/// `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScopePolicy {
    /// Whether the scope may hold more than one root.
    #[serde(default)]
    pub allow_multiple_roots: bool,
    /// Whether every inserted node must carry an `order_key`.
    #[serde(default)]
    pub require_order_key: bool,
    /// Whether `Forest::delete_with_policy` removes whole subtrees.
    #[serde(default)]
    pub cascade_delete_default: bool,
}

impl ScopePolicy {
    /// Single-root policy with every other flag off.
    pub fn single_root() -> Self {
        Self::default()
    }

    /// Policy allowing a forest of roots.
    pub fn multiple_roots() -> Self {
        Self {
            allow_multiple_roots: true,
            ..Self::default()
        }
    }

    pub fn with_required_order_key(mut self) -> Self {
        self.require_order_key = true;
        self
    }

    pub fn with_cascade_delete(mut self) -> Self {
        self.cascade_delete_default = true;
        self
    }
}

/// Registration of one tree-shaped entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HierarchyConfig {
    /// Whether scopes of this hierarchy are keyed by an owning context.
    #[serde(default)]
    pub context_required: bool,
    /// Policy applied to every scope of this hierarchy.
    #[serde(flatten)]
    pub policy: ScopePolicy,
}

impl HierarchyConfig {
    /// A hierarchy with one tree per owning context.
    pub fn per_context(policy: ScopePolicy) -> Self {
        Self {
            context_required: true,
            policy,
        }
    }

    /// A hierarchy with one tree for the whole system.
    pub fn global(policy: ScopePolicy) -> Self {
        Self {
            context_required: false,
            policy,
        }
    }
}
