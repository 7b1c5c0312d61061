//! Error types for export and import.

use thiserror::Error;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for import operations.
pub type ImportResult<T> = Result<T, ImportError>;

/// Errors that abort an export.
///
/// Exports are all-or-nothing: any failure means no bundle.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Closure building failed (missing root, store failure).
    #[error("closure error: {0}")]
    Graph(#[from] confmig_graph::GraphError),

    /// A store call failed.
    #[error("store error: {0}")]
    Store(#[from] confmig_store::StoreError),

    /// Secret wrapping failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] confmig_crypto::CryptoError),

    /// The produced bundle failed validation.
    #[error("bundle error: {0}")]
    Model(#[from] confmig_model::ModelError),

    /// An entity disappeared between closure and snapshot fetch.
    #[error("entity vanished during export: {reference}")]
    EntityVanished {
        /// Display form of the missing reference.
        reference: String,
    },
}

impl ExportError {
    /// Creates an entity-vanished error.
    pub fn entity_vanished(reference: impl Into<String>) -> Self {
        Self::EntityVanished {
            reference: reference.into(),
        }
    }
}

/// Errors that abort an import before any mapping runs.
///
/// Everything else is recorded per-mapping in the report; a mapping failure
/// never surfaces here.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The bundle violates its structural invariants.
    #[error("invalid bundle: {0}")]
    InvalidBundle(#[from] confmig_model::ModelError),
}
