//! Error types for the confmig model.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur when building or serializing bundles.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Bundle failed to encode to CBOR.
    #[error("bundle encode error: {message}")]
    Encode {
        /// Description of the failure.
        message: String,
    },

    /// Bundle failed to decode from CBOR.
    #[error("bundle decode error: {message}")]
    Decode {
        /// Description of the failure.
        message: String,
    },

    /// The same source entity appears in more than one mapping.
    #[error("duplicate mapping source: {reference}")]
    DuplicateSource {
        /// Display form of the offending reference.
        reference: String,
    },

    /// A reference snapshot has no corresponding mapping.
    #[error("snapshot without mapping: {reference}")]
    OrphanReference {
        /// Display form of the offending reference.
        reference: String,
    },
}

impl ModelError {
    /// Creates an encode error.
    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode {
            message: message.into(),
        }
    }

    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates a duplicate source error.
    pub fn duplicate_source(reference: impl Into<String>) -> Self {
        Self::DuplicateSource {
            reference: reference.into(),
        }
    }

    /// Creates an orphan reference error.
    pub fn orphan_reference(reference: impl Into<String>) -> Self {
        Self::OrphanReference {
            reference: reference.into(),
        }
    }
}
