//! Error types for registry and closure operations.

use confmig_model::EntityType;
use confmig_store::StoreError;
use thiserror::Error;

/// Result type for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// Errors that can occur building a dependency closure.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A requested root entity does not exist in the source store.
    ///
    /// This aborts the whole export; there is no partial bundle.
    #[error("root entity not found: {reference}")]
    RootNotFound {
        /// Display form of the missing reference.
        reference: String,
    },

    /// A store call failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A descriptor for this type is already registered.
    #[error("descriptor already registered for {entity_type}")]
    DuplicateDescriptor {
        /// The entity type.
        entity_type: EntityType,
    },

    /// The type has no descriptor and cannot be exported.
    #[error("entity type not exportable: {entity_type}")]
    NotExportable {
        /// The entity type.
        entity_type: EntityType,
    },
}

impl GraphError {
    /// Creates a root-not-found error.
    pub fn root_not_found(reference: impl Into<String>) -> Self {
        Self::RootNotFound {
            reference: reference.into(),
        }
    }
}
