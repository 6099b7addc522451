//! Node Store error types.
//!
//! This module defines structured error types for storage operations. Every
//! failure that is not a missing row is a storage failure in the engine's
//! taxonomy: the committed state is untouched and the caller may retry.

use thiserror::Error;

use crate::node::NodeId;
use crate::scope::ScopeId;

/// Errors that can occur during Node Store operations.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Existing variants will not be removed in minor versions
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BackendError {
    /// Row not found in the scope.
    #[error("Node {id} not found in scope {scope}")]
    NodeNotFound {
        /// The scope that was searched
        scope: ScopeId,
        /// The id that was not found
        id: NodeId,
    },

    /// A batch was malformed and nothing was written.
    #[error("Write batch rejected for scope {scope}: {reason}")]
    BatchRejected {
        /// The scope the batch targeted
        scope: ScopeId,
        /// Why the batch was rejected
        reason: String,
    },

    /// Serialization failed.
    #[error("Serialization failed")]
    SerializationFailed {
        /// The underlying serialization error
        #[source]
        source: serde_json::Error,
    },

    /// Deserialization failed.
    #[error("Deserialization failed")]
    DeserializationFailed {
        /// The underlying deserialization error
        #[source]
        source: serde_json::Error,
    },

    /// File I/O error.
    #[error("File I/O error")]
    FileIo {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The store could not be reached or refused the operation.
    #[error("Storage unavailable: {reason}")]
    Unavailable {
        /// Description of the failure
        reason: String,
    },

    /// SQL database error.
    #[cfg(any(feature = "sqlite", feature = "postgres"))]
    #[error("SQL error: {reason}")]
    SqlxError {
        /// Description of the failure, including context
        reason: String,
        /// The underlying sqlx error, if any
        #[source]
        source: Option<sqlx::Error>,
    },
}

impl BackendError {
    /// Check if this error indicates a row was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::NodeNotFound { .. })
    }

    /// Check if this error is a storage failure the caller may retry.
    pub fn is_storage_error(&self) -> bool {
        !matches!(
            self,
            BackendError::NodeNotFound { .. } | BackendError::BatchRejected { .. }
        )
    }

    /// Check if this error is related to I/O or (de)serialization.
    pub fn is_io_error(&self) -> bool {
        matches!(
            self,
            BackendError::FileIo { .. }
                | BackendError::SerializationFailed { .. }
                | BackendError::DeserializationFailed { .. }
        )
    }

    /// Get the node id if this error is about a specific row.
    pub fn node_id(&self) -> Option<&NodeId> {
        match self {
            BackendError::NodeNotFound { id, .. } => Some(id),
            _ => None,
        }
    }
}

impl From<BackendError> for crate::Error {
    fn from(err: BackendError) -> Self {
        crate::Error::Backend(err)
    }
}
