//! Error types for scope resolution.

use thiserror::Error;

/// Errors raised while mapping an entity type and context to a scope.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Existing variants will not be removed in minor versions
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ScopeError {
    /// The entity type has no registered hierarchy behavior.
    #[error("Entity type '{entity_type}' is not a registered hierarchy")]
    UnknownScope {
        /// The entity type that was looked up
        entity_type: String,
    },

    /// The hierarchy is scoped by an owning context but none was supplied.
    #[error("Hierarchy '{entity_type}' requires an owning context")]
    MissingContext {
        /// The entity type that was looked up
        entity_type: String,
    },

    /// The hierarchy is global but a context was supplied.
    #[error("Hierarchy '{entity_type}' is global and takes no context (got '{context}')")]
    UnexpectedContext {
        /// The entity type that was looked up
        entity_type: String,
        /// The context that was rejected
        context: String,
    },

    /// The entity type cannot name a hierarchy.
    #[error("Invalid entity type: '{entity_type}'")]
    InvalidEntityType {
        /// The rejected entity type
        entity_type: String,
    },
}

impl ScopeError {
    /// Check if this error indicates the hierarchy is not registered.
    pub fn is_unknown_scope(&self) -> bool {
        matches!(self, ScopeError::UnknownScope { .. })
    }

    /// Check if this error is about the owning context rather than the entity type.
    pub fn is_context_error(&self) -> bool {
        matches!(
            self,
            ScopeError::MissingContext { .. } | ScopeError::UnexpectedContext { .. }
        )
    }

    /// The entity type this error is about.
    pub fn entity_type(&self) -> &str {
        match self {
            ScopeError::UnknownScope { entity_type }
            | ScopeError::MissingContext { entity_type }
            | ScopeError::UnexpectedContext { entity_type, .. }
            | ScopeError::InvalidEntityType { entity_type } => entity_type,
        }
    }
}

impl From<ScopeError> for crate::Error {
    fn from(err: ScopeError) -> Self {
        crate::Error::Scope(err)
    }
}
