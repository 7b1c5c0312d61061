//! Entity snapshots: the exported content of one entity.

use crate::entity::{EntityId, EntityKey, EntityRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// What kind of secret material a snapshot carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretKind {
    /// A stored password value.
    Password,
    /// A PKCS#12 private key blob.
    Pkcs12Key,
    /// A shared secret (e.g. a connector credential).
    SharedSecret,
}

/// Plaintext secret material.
///
/// The byte content is redacted from `Debug` output so snapshots can be
/// logged safely.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretMaterial {
    /// What the bytes are.
    pub kind: SecretKind,
    /// The raw secret bytes.
    pub bytes: Vec<u8>,
}

impl SecretMaterial {
    /// Creates new secret material.
    #[must_use]
    pub fn new(kind: SecretKind, bytes: Vec<u8>) -> Self {
        Self { kind, bytes }
    }
}

impl fmt::Debug for SecretMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretMaterial")
            .field("kind", &self.kind)
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Secret material encrypted for transit.
///
/// `ciphertext` is the secret encrypted under a one-off data key;
/// `wrapped_key` is that data key encrypted under a passphrase-derived key.
/// The model does not interpret either field; the transit codec does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedSecret {
    /// What the plaintext was.
    pub kind: SecretKind,
    /// Nonce-prefixed AEAD ciphertext of the secret.
    pub ciphertext: Vec<u8>,
    /// Salt- and nonce-prefixed AEAD ciphertext of the data key.
    pub wrapped_key: Vec<u8>,
}

/// The secret slot of a snapshot: plaintext or encrypted for transit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretBlock {
    /// Plaintext material (trusted channel only).
    Plain(SecretMaterial),
    /// Material encrypted by the secret transit codec.
    Encrypted(WrappedSecret),
}

impl SecretBlock {
    /// Returns true if the block is encrypted for transit.
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        matches!(self, SecretBlock::Encrypted(_))
    }
}

/// An embedded reference from one entity's content to another entity.
///
/// The `slot` names where the reference sits (e.g. `"target"` for an alias,
/// `"password"` for a connector credential) so the import engine can rewrite
/// it without understanding the content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityLink {
    /// Name of the reference slot within the owning entity.
    pub slot: String,
    /// The referenced entity.
    pub target: EntityRef,
}

impl EntityLink {
    /// Creates a link.
    #[must_use]
    pub fn new(slot: impl Into<String>, target: EntityRef) -> Self {
        Self {
            slot: slot.into(),
            target,
        }
    }
}

/// A full serialized representation of one entity's content at export time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// The entity this snapshot belongs to.
    pub entity: EntityRef,
    /// Containing folder, for folder-resident types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<EntityId>,
    /// Opaque content attributes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    /// Embedded references to other entities.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<EntityLink>,
    /// Secret material, if the entity carries any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<SecretBlock>,
}

impl EntitySnapshot {
    /// Creates an empty snapshot for an entity.
    #[must_use]
    pub fn new(entity: EntityRef) -> Self {
        Self {
            entity,
            folder: None,
            attributes: BTreeMap::new(),
            links: Vec::new(),
            secret: None,
        }
    }

    /// Places the entity in a folder.
    #[must_use]
    pub fn in_folder(mut self, folder: EntityId) -> Self {
        self.folder = Some(folder);
        self
    }

    /// Sets a content attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Adds an embedded reference.
    #[must_use]
    pub fn with_link(mut self, slot: impl Into<String>, target: EntityRef) -> Self {
        self.links.push(EntityLink::new(slot, target));
        self
    }

    /// Attaches plaintext secret material.
    #[must_use]
    pub fn with_secret(mut self, secret: SecretMaterial) -> Self {
        self.secret = Some(SecretBlock::Plain(secret));
        self
    }

    /// Returns true if the snapshot's content references the given entity,
    /// either through its folder or through any link.
    #[must_use]
    pub fn references(&self, key: EntityKey) -> bool {
        if let Some(folder) = self.folder {
            if key == (crate::entity::EntityType::Folder, folder) {
                return true;
            }
        }
        self.links.iter().any(|l| l.target.key() == key)
    }

    /// Rewrites embedded references through a source→target ID map.
    ///
    /// References whose source key is absent from the map are left as-is
    /// (identity passthrough).
    pub fn rewrite_references(
        &mut self,
        resolved: &std::collections::HashMap<EntityKey, EntityId>,
    ) {
        if let Some(folder) = self.folder {
            if let Some(mapped) = resolved.get(&(crate::entity::EntityType::Folder, folder)) {
                self.folder = Some(*mapped);
            }
        }
        for link in &mut self.links {
            if let Some(mapped) = resolved.get(&link.target.key()) {
                link.target.id = *mapped;
            }
        }
    }
}
