//! Domain errors for djiki

use thiserror::Error;

/// Core domain errors
///
/// Only identifier lookups, permission checks and the store's ordering check
/// fail. Content of any shape is valid input to every operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Entity or revision absent
    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: String, id: String },

    /// The auth backend refused the action
    #[error("Permission denied: cannot {action} {entity}")]
    PermissionDenied { action: String, entity: String },

    /// An append lost the race for the entity head
    #[error("Concurrent modification of {entity}: {reason}")]
    ConcurrentModification { entity: String, reason: String },

    /// Title or name that normalizes to nothing
    #[error("Invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    /// Payload of the wrong kind for the entity
    #[error("Invalid content for {entity}: {reason}")]
    InvalidContent { entity: String, reason: String },
}

impl DomainError {
    /// Create a NotFound error for an entity
    pub fn entity_not_found(entity: impl ToString) -> Self {
        Self::NotFound {
            entity_type: "Entity".to_string(),
            id: entity.to_string(),
        }
    }

    /// Create a NotFound error for a revision
    pub fn revision_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity_type: "Revision".to_string(),
            id: id.to_string(),
        }
    }

    /// Create a PermissionDenied error
    pub fn permission_denied(action: impl Into<String>, entity: impl ToString) -> Self {
        Self::PermissionDenied {
            action: action.into(),
            entity: entity.to_string(),
        }
    }

    /// Create a ConcurrentModification error
    pub fn concurrent_modification(entity: impl ToString, reason: impl Into<String>) -> Self {
        Self::ConcurrentModification {
            entity: entity.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidContent error
    pub fn invalid_content(entity: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidContent {
            entity: entity.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether retrying against a fresh head may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }
}

/// Result type alias for domain operations
pub type DomainResult<T> = Result<T, DomainError>;
