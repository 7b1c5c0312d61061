//! # confmig crypto
//!
//! Secret transit codec for confmig bundles.
//!
//! A bundle that crosses a network boundary must not expose key material or
//! passwords at rest. This crate wraps each secret under a one-off data key
//! (AES-256-GCM) and wraps that data key under a key derived from a shared
//! passphrase (HKDF-SHA256 over a random salt), so the receiving side can
//! reproduce the exact bytes given the same passphrase.
//!
//! The codec is byte-exact: `unwrap(wrap(k, p), p) == k` for arbitrary key
//! material `k` and passphrase `p`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod transit;

pub use error::{CryptoError, CryptoResult};
pub use transit::{Passphrase, TransitCodec, TransitEnvelope, KEY_SIZE, NONCE_SIZE, SALT_SIZE, TAG_SIZE};
