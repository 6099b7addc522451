//! Tree engine error types.
//!
//! This module defines the structured errors raised by the Tree Mutator and
//! the Range Allocator. Validation errors are expected and recoverable;
//! `InvariantViolation` means the stored tree can no longer be trusted.

use thiserror::Error;

use super::mutation::MutationPhase;
use crate::node::NodeId;
use crate::scope::ScopeId;

/// Errors that can occur while mutating a tree.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Existing variants will not be removed in minor versions
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum TreeError {
    /// The requested parent is a leaf and may not hold children.
    #[error("Parent {parent} in scope {scope} is not a group")]
    ParentNotGroup {
        /// The scope of the mutation
        scope: ScopeId,
        /// The leaf that was named as parent
        parent: NodeId,
    },

    /// The scope allows a single root and already has one.
    #[error("Scope {scope} allows a single root and already has {existing}")]
    RootConflict {
        /// The scope of the mutation
        scope: ScopeId,
        /// The root that already exists
        existing: NodeId,
    },

    /// A node cannot be moved under itself or one of its descendants.
    #[error("Moving {node} under {new_parent} in scope {scope} would create a cycle")]
    CycleDetected {
        /// The scope of the mutation
        scope: ScopeId,
        /// The node being moved
        node: NodeId,
        /// The rejected new parent
        new_parent: NodeId,
    },

    /// The node still has descendants.
    #[error("Node {node} in scope {scope} has {descendants} descendant(s)")]
    NodeHasChildren {
        /// The scope of the mutation
        scope: ScopeId,
        /// The node with children
        node: NodeId,
        /// Number of descendants implied by the numbering
        descendants: i64,
    },

    /// A node with the requested id already exists in the scope.
    #[error("Node {node} already exists in scope {scope}")]
    DuplicateNode {
        /// The scope of the mutation
        scope: ScopeId,
        /// The conflicting id
        node: NodeId,
    },

    /// The scope requires every node to carry an order key.
    #[error("Scope {scope} requires an order key on every node")]
    MissingOrderKey {
        /// The scope of the mutation
        scope: ScopeId,
    },

    /// The stored tree, or the state a mutation would produce, breaks the
    /// nested-set invariants.
    #[error("Invariant violation in scope {scope}: {reason}")]
    InvariantViolation {
        /// The affected scope
        scope: ScopeId,
        /// Description of the violation
        reason: String,
    },

    /// Mutations are refused until the scope is rebuilt.
    #[error("Scope {scope} is halted after an invariant violation ({reason}); run rebuild")]
    ScopeHalted {
        /// The halted scope
        scope: ScopeId,
        /// The violation that halted the scope
        reason: String,
    },

    /// The caller's deadline passed before the write began.
    #[error("Deadline exceeded in scope {scope} while {phase}")]
    DeadlineExceeded {
        /// The scope of the mutation
        scope: ScopeId,
        /// The phase the mutation was in when it gave up
        phase: MutationPhase,
    },
}

impl TreeError {
    /// Check if this error is an expected rejection of the caller's request.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            TreeError::ParentNotGroup { .. }
                | TreeError::RootConflict { .. }
                | TreeError::CycleDetected { .. }
                | TreeError::NodeHasChildren { .. }
                | TreeError::DuplicateNode { .. }
                | TreeError::MissingOrderKey { .. }
        )
    }

    /// Check if this error reports a broken invariant.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, TreeError::InvariantViolation { .. })
    }

    /// Check if this error was raised because the scope is halted.
    pub fn is_halted(&self) -> bool {
        matches!(self, TreeError::ScopeHalted { .. })
    }

    /// Check if this error is a deadline expiry.
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, TreeError::DeadlineExceeded { .. })
    }

    /// The scope this error is about.
    pub fn scope(&self) -> &ScopeId {
        match self {
            TreeError::ParentNotGroup { scope, .. }
            | TreeError::RootConflict { scope, .. }
            | TreeError::CycleDetected { scope, .. }
            | TreeError::NodeHasChildren { scope, .. }
            | TreeError::DuplicateNode { scope, .. }
            | TreeError::MissingOrderKey { scope }
            | TreeError::InvariantViolation { scope, .. }
            | TreeError::ScopeHalted { scope, .. }
            | TreeError::DeadlineExceeded { scope, .. } => scope,
        }
    }

    pub(crate) fn violation(scope: &ScopeId, reason: impl Into<String>) -> Self {
        TreeError::InvariantViolation {
            scope: scope.clone(),
            reason: reason.into(),
        }
    }
}

impl From<TreeError> for crate::Error {
    fn from(err: TreeError) -> Self {
        crate::Error::Tree(err)
    }
}
