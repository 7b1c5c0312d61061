//! Passphrase-based secret wrapping using AES-256-GCM.

use crate::error::{CryptoError, CryptoResult};
use aes_gcm::{
    aead::{generic_array::GenericArray, Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of the AES-256 data key in bytes.
pub const KEY_SIZE: usize = 32;
/// Size of the GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;
/// Size of the GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;
/// Size of the HKDF salt prepended to a wrapped key.
pub const SALT_SIZE: usize = 16;

/// A shared transit passphrase.
///
/// Zeroized when dropped; never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Passphrase {
    bytes: Vec<u8>,
}

impl Passphrase {
    /// Creates a passphrase from a string.
    #[must_use]
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self {
            bytes: passphrase.into().into_bytes(),
        }
    }

    fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Passphrase")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

impl From<&str> for Passphrase {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// The two-part output of wrapping a secret.
///
/// `ciphertext` is `nonce || AES-GCM(data_key, plaintext)`; `wrapped_key` is
/// `salt || nonce || AES-GCM(kek, data_key)` with the key-encryption key
/// derived from the passphrase over the salt. Both parts travel in the
/// bundle; neither is useful without the passphrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitEnvelope {
    /// Nonce-prefixed ciphertext of the secret.
    pub ciphertext: Vec<u8>,
    /// Salt- and nonce-prefixed ciphertext of the data key.
    pub wrapped_key: Vec<u8>,
}

/// Zeroized one-off data key.
#[derive(Zeroize, ZeroizeOnDrop)]
struct DataKey {
    bytes: [u8; KEY_SIZE],
}

impl DataKey {
    fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self { bytes }
    }
}

/// Wraps and unwraps secret material with a shared passphrase.
pub struct TransitCodec {
    passphrase: Passphrase,
}

impl TransitCodec {
    /// Creates a codec for the given passphrase.
    #[must_use]
    pub fn new(passphrase: Passphrase) -> Self {
        Self { passphrase }
    }

    /// Encrypts a secret for transit.
    pub fn wrap(&self, plaintext: &[u8]) -> CryptoResult<TransitEnvelope> {
        let data_key = DataKey::generate();
        let ciphertext = encrypt(&data_key.bytes, plaintext)
            .map_err(|_| CryptoError::wrap_failed("secret encryption error"))?;

        let mut salt = [0u8; SALT_SIZE];
        rand::thread_rng().fill_bytes(&mut salt);
        let kek = derive_key(self.passphrase.as_bytes(), &salt)?;

        let key_ct = encrypt(&kek.bytes, &data_key.bytes)
            .map_err(|_| CryptoError::wrap_failed("key wrap error"))?;
        let mut wrapped_key = Vec::with_capacity(SALT_SIZE + key_ct.len());
        wrapped_key.extend_from_slice(&salt);
        wrapped_key.extend(key_ct);

        Ok(TransitEnvelope {
            ciphertext,
            wrapped_key,
        })
    }

    /// Decrypts a secret wrapped with [`wrap`](Self::wrap).
    ///
    /// # Errors
    ///
    /// Returns an error if the envelope is malformed or the passphrase does
    /// not match the one used to wrap.
    pub fn unwrap(&self, envelope: &TransitEnvelope) -> CryptoResult<Vec<u8>> {
        if envelope.wrapped_key.len() < SALT_SIZE + NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::malformed("wrapped key too short"));
        }
        let (salt, key_ct) = envelope.wrapped_key.split_at(SALT_SIZE);
        let kek = derive_key(self.passphrase.as_bytes(), salt)?;

        let key_bytes = decrypt(&kek.bytes, key_ct)
            .map_err(|_| CryptoError::unwrap_failed("key unwrap error"))?;
        if key_bytes.len() != KEY_SIZE {
            return Err(CryptoError::malformed("unwrapped key has wrong size"));
        }
        let mut data_key = DataKey {
            bytes: [0u8; KEY_SIZE],
        };
        data_key.bytes.copy_from_slice(&key_bytes);

        decrypt(&data_key.bytes, &envelope.ciphertext)
            .map_err(|_| CryptoError::unwrap_failed("secret decryption error"))
    }
}

impl std::fmt::Debug for TransitCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitCodec")
            .field("cipher", &"Aes256Gcm")
            .finish()
    }
}

/// Derives a key-encryption key from the passphrase using HKDF-SHA256.
fn derive_key(passphrase: &[u8], salt: &[u8]) -> CryptoResult<DataKey> {
    use hkdf::Hkdf;
    use sha2::Sha256;

    let hk = Hkdf::<Sha256>::new(Some(salt), passphrase);
    let mut bytes = [0u8; KEY_SIZE];
    hk.expand(b"confmig-transit-key-v1", &mut bytes)
        .map_err(|_| CryptoError::key_derivation("HKDF expand failed"))?;
    Ok(DataKey { bytes })
}

/// Encrypts with a fresh random nonce; output is `nonce || ciphertext`.
fn encrypt(key: &[u8; KEY_SIZE], plaintext: &[u8]) -> Result<Vec<u8>, aes_gcm::Error> {
    let cipher = Aes256Gcm::new(GenericArray::from_slice(key));
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher.encrypt(nonce, plaintext)?;
    let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    result.extend_from_slice(&nonce_bytes);
    result.extend(ciphertext);
    Ok(result)
}

/// Decrypts `nonce || ciphertext` framing produced by [`encrypt`].
fn decrypt(key: &[u8; KEY_SIZE], data: &[u8]) -> Result<Vec<u8>, aes_gcm::Error> {
    if data.len() < NONCE_SIZE + TAG_SIZE {
        return Err(aes_gcm::Error);
    }
    let cipher = Aes256Gcm::new(GenericArray::from_slice(key));
    let nonce = Nonce::from_slice(&data[..NONCE_SIZE]);
    cipher.decrypt(nonce, &data[NONCE_SIZE..])
}
