//!
//! Canopy: a nested-set tree maintenance engine for hierarchical records.
//!
//! Every node carries a `lft`/`rgt` pair such that a node's descendants are
//! exactly the nodes whose pair lies strictly inside its own. Canopy keeps
//! those numbers correct while nodes are inserted, moved, deleted and
//! regrouped, so that subtree and ancestor questions become single range
//! scans.
//!
//! ## Core Concepts
//!
//! * **Scopes (`scope::ScopeId`)**: An independent forest, identified by an entity
//!   type and an optional owning context such as a company. Numbering never
//!   crosses scopes.
//! * **Nodes (`node::TreeNode`)**: A row with an id, a parent pointer, a group flag
//!   and its numbering.
//! * **Node Stores (`backend::NodeStore`)**: Pluggable persistence with atomic batch
//!   writes. An in-memory store and SQL stores (SQLite, PostgreSQL) are provided.
//! * **Forest (`Forest`)**: The mutator. It serializes mutations per scope,
//!   validates them, computes the new numbering and commits it in one batch.
//! * **Queries (`tree::TreeQuery`)**: Ancestors, descendants, children and siblings
//!   answered from the numbering alone.
//! * **Integrity (`tree::IntegrityReport`)**: An audit of the six nested-set
//!   invariants, with `rebuild` to restore a damaged scope from parent pointers.

pub mod backend;
pub mod clock;
pub mod config;
mod forest;
pub mod node;
pub mod scope;
pub mod tree;

pub use clock::{Clock, Deadline, SystemClock};
#[cfg(any(test, feature = "testing"))]
pub use clock::FixedClock;
pub use config::ForestConfig;
pub use forest::Forest;
pub use node::{NewNode, NodeId, TreeNode};
pub use scope::{ScopeId, ScopePolicy, ScopeRegistry};

/// Result type used throughout the Canopy library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Canopy library.
///
/// Each module defines its own structured error; this enum wraps them so that
/// callers can match on the origin or use the classification helpers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured scope resolution errors from the scope module
    #[error(transparent)]
    Scope(scope::ScopeError),

    /// Structured storage errors from the backend module
    #[error(transparent)]
    Backend(backend::BackendError),

    /// Structured mutation and integrity errors from the tree module
    #[error(transparent)]
    Tree(tree::TreeError),

    /// Structured configuration errors from the config module
    #[error(transparent)]
    Config(config::ConfigError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Io(_) => "io",
            Error::Serialize(_) => "serialize",
            Error::Scope(_) => "scope",
            Error::Backend(_) => "backend",
            Error::Tree(_) => "tree",
            Error::Config(_) => "config",
        }
    }

    /// Check if this error indicates a node or scope was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Scope(scope_err) => scope_err.is_unknown_scope(),
            Error::Backend(backend_err) => backend_err.is_not_found(),
            _ => false,
        }
    }

    /// Check if the failed operation may succeed when retried unchanged.
    ///
    /// Only storage failures qualify: a rejected mutation stays rejected.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Backend(backend_err) => backend_err.is_storage_error(),
            _ => false,
        }
    }

    /// Check if a mutation was rejected before anything was written.
    pub fn is_validation_error(&self) -> bool {
        match self {
            Error::Tree(tree_err) => tree_err.is_validation_error(),
            Error::Scope(_) => true,
            _ => false,
        }
    }

    /// Check if this error reports broken nested-set numbering.
    pub fn is_invariant_violation(&self) -> bool {
        match self {
            Error::Tree(tree_err) => tree_err.is_invariant_violation(),
            _ => false,
        }
    }

    /// Check if the scope refused the mutation because it is halted.
    pub fn is_halted(&self) -> bool {
        match self {
            Error::Tree(tree_err) => tree_err.is_halted(),
            _ => false,
        }
    }

    /// Check if a mutation gave up because its deadline passed.
    pub fn is_deadline_exceeded(&self) -> bool {
        match self {
            Error::Tree(tree_err) => tree_err.is_deadline_exceeded(),
            _ => false,
        }
    }

    /// Check if this error is I/O related.
    pub fn is_io_error(&self) -> bool {
        match self {
            Error::Io(_) => true,
            Error::Backend(backend_err) => backend_err.is_io_error(),
            Error::Config(config::ConfigError::Read { .. }) => true,
            _ => false,
        }
    }
}
