//! Error types for the secret transit codec.

use thiserror::Error;

/// Result type for codec operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur wrapping or unwrapping secrets.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Encryption of the secret or the data key failed.
    #[error("secret wrap failed: {message}")]
    WrapFailed {
        /// Description of the failure.
        message: String,
    },

    /// Decryption failed (wrong passphrase, corrupted data).
    #[error("secret unwrap failed: {message}")]
    UnwrapFailed {
        /// Description of the failure.
        message: String,
    },

    /// The envelope is structurally malformed (too short, bad framing).
    #[error("malformed secret envelope: {message}")]
    MalformedSecret {
        /// Description of the problem.
        message: String,
    },

    /// Key derivation from the passphrase failed.
    #[error("key derivation failed: {message}")]
    KeyDerivation {
        /// Description of the failure.
        message: String,
    },
}

impl CryptoError {
    /// Creates a wrap failure.
    pub fn wrap_failed(message: impl Into<String>) -> Self {
        Self::WrapFailed {
            message: message.into(),
        }
    }

    /// Creates an unwrap failure.
    pub fn unwrap_failed(message: impl Into<String>) -> Self {
        Self::UnwrapFailed {
            message: message.into(),
        }
    }

    /// Creates a malformed envelope error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedSecret {
            message: message.into(),
        }
    }

    /// Creates a key derivation error.
    pub fn key_derivation(message: impl Into<String>) -> Self {
        Self::KeyDerivation {
            message: message.into(),
        }
    }
}
