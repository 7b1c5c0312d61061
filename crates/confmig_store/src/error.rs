//! Error types for entity stores.

use confmig_model::{EntityId, EntityType};
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in entity store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested entity does not exist.
    #[error("entity not found: {entity_type}:{id}")]
    NotFound {
        /// The entity type searched.
        entity_type: EntityType,
        /// The ID that was not found.
        id: EntityId,
    },

    /// An entity with the same primary ID already exists.
    #[error("entity already exists: {entity_type}:{id}")]
    AlreadyExists {
        /// The entity type.
        entity_type: EntityType,
        /// The colliding ID.
        id: EntityId,
    },

    /// A per-scope unique name constraint was violated.
    #[error("unique name conflict: {entity_type} named {name:?} already exists in scope")]
    UniqueNameConflict {
        /// The entity type.
        entity_type: EntityType,
        /// The colliding name.
        name: String,
    },

    /// The entity cannot be deleted while other entities depend on it.
    #[error("entity in use: {entity_type}:{id} has {dependents} live dependent(s)")]
    DependentsExist {
        /// The entity type.
        entity_type: EntityType,
        /// The entity ID.
        id: EntityId,
        /// Number of live dependents.
        dependents: usize,
    },

    /// The well-known root folder cannot be created, updated or deleted.
    #[error("the root folder is immutable")]
    RootFolderImmutable,

    /// The snapshot content is not acceptable to the store.
    #[error("invalid snapshot: {message}")]
    InvalidSnapshot {
        /// Description of the problem.
        message: String,
    },
}

impl StoreError {
    /// Creates a not-found error.
    pub fn not_found(entity_type: EntityType, id: EntityId) -> Self {
        Self::NotFound { entity_type, id }
    }

    /// Creates an already-exists error.
    pub fn already_exists(entity_type: EntityType, id: EntityId) -> Self {
        Self::AlreadyExists { entity_type, id }
    }

    /// Creates a unique-name conflict error.
    pub fn unique_name(entity_type: EntityType, name: impl Into<String>) -> Self {
        Self::UniqueNameConflict {
            entity_type,
            name: name.into(),
        }
    }

    /// Creates a dependents-exist error.
    pub fn dependents_exist(entity_type: EntityType, id: EntityId, dependents: usize) -> Self {
        Self::DependentsExist {
            entity_type,
            id,
            dependents,
        }
    }

    /// Creates an invalid snapshot error.
    pub fn invalid_snapshot(message: impl Into<String>) -> Self {
        Self::InvalidSnapshot {
            message: message.into(),
        }
    }

    /// Returns true if this error is a uniqueness violation.
    ///
    /// The import engine maps these to the `UniqueKeyConflict` mapping error.
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            StoreError::UniqueNameConflict { .. } | StoreError::AlreadyExists { .. }
        )
    }
}
