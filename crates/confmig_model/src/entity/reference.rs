//! Entity types and references.

use crate::entity::EntityId;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The closed set of migratable entity types.
///
/// `Role` is special: roles are auto-created by the store alongside
/// services, policies and folders, and are only touched by the delete
/// cascade. They are never exported on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// A folder in the folder tree.
    Folder,
    /// A published service.
    Service,
    /// An alias pointing at a service in another folder.
    ServiceAlias,
    /// A policy fragment, identified by a GUID in addition to its ID.
    Policy,
    /// An alias pointing at a policy in another folder.
    PolicyAlias,
    /// An outbound/inbound connector.
    Connector,
    /// A private key entry (PKCS#12 material).
    PrivateKey,
    /// A stored password.
    StoredPassword,
    /// A user account.
    User,
    /// A security zone.
    SecurityZone,
    /// An access-control role, auto-created by the store.
    Role,
}

impl EntityType {
    /// All exportable types, in canonical export order.
    ///
    /// Folders come first so an export-everything root set lists containers
    /// before their contents.
    pub const EXPORTABLE: [EntityType; 10] = [
        EntityType::Folder,
        EntityType::SecurityZone,
        EntityType::StoredPassword,
        EntityType::PrivateKey,
        EntityType::Connector,
        EntityType::User,
        EntityType::Policy,
        EntityType::Service,
        EntityType::PolicyAlias,
        EntityType::ServiceAlias,
    ];

    /// Returns the lowercase tag used in wire and CLI output.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Folder => "folder",
            EntityType::Service => "service",
            EntityType::ServiceAlias => "service_alias",
            EntityType::Policy => "policy",
            EntityType::PolicyAlias => "policy_alias",
            EntityType::Connector => "connector",
            EntityType::PrivateKey => "private_key",
            EntityType::StoredPassword => "stored_password",
            EntityType::User => "user",
            EntityType::SecurityZone => "security_zone",
            EntityType::Role => "role",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite lookup key for an entity: type plus primary ID.
pub type EntityKey = (EntityType, EntityId);

/// A reference to an entity by identity.
///
/// `id` is the primary stable identifier in the owning store. `guid` is a
/// secondary globally-unique identifier carried by some types (policies)
/// to detect cross-store duplicates independent of `id`. `name` is the
/// per-type-scoped display key usable for name-based mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    /// The entity type.
    pub entity_type: EntityType,
    /// Primary identifier.
    pub id: EntityId,
    /// Secondary globally-unique identifier, if the type carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<Uuid>,
    /// Unique display name, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl EntityRef {
    /// Creates a reference from a type and ID.
    #[must_use]
    pub fn new(entity_type: EntityType, id: EntityId) -> Self {
        Self {
            entity_type,
            id,
            guid: None,
            name: None,
        }
    }

    /// The well-known root folder reference.
    #[must_use]
    pub fn root_folder() -> Self {
        Self::new(EntityType::Folder, EntityId::ROOT_FOLDER).with_name("Root Node")
    }

    /// Attaches a GUID.
    #[must_use]
    pub fn with_guid(mut self, guid: Uuid) -> Self {
        self.guid = Some(guid);
        self
    }

    /// Attaches a name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the `(type, id)` lookup key.
    #[must_use]
    pub fn key(&self) -> EntityKey {
        (self.entity_type, self.id)
    }

    /// Returns true if this reference is the root folder.
    #[must_use]
    pub fn is_root_folder(&self) -> bool {
        self.entity_type == EntityType::Folder && self.id.is_root_folder()
    }

    /// Identity comparison: ID, then GUID, then name.
    ///
    /// Two references denote the same entity when their types match and any
    /// of the identity tiers coincide. This is deliberately NOT structural
    /// equality; a reference learned by name and one learned by ID can still
    /// denote the same entity.
    #[must_use]
    pub fn same_entity(&self, other: &EntityRef) -> bool {
        if self.entity_type != other.entity_type {
            return false;
        }
        if self.id == other.id {
            return true;
        }
        if let (Some(a), Some(b)) = (self.guid, other.guid) {
            if a == b {
                return true;
            }
        }
        matches!((&self.name, &other.name), (Some(a), Some(b)) if a == b)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.id)?;
        if let Some(name) = &self.name {
            write!(f, " ({name})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_and_root_folder() {
        let r = EntityRef::root_folder();
        assert!(r.is_root_folder());
        assert_eq!(r.key(), (EntityType::Folder, EntityId::ROOT_FOLDER));
    }

    #[test]
    fn same_entity_by_id() {
        let id = EntityId::new();
        let a = EntityRef::new(EntityType::Service, id);
        let b = EntityRef::new(EntityType::Service, id).with_name("svc");
        assert!(a.same_entity(&b));
    }

    #[test]
    fn same_entity_by_guid() {
        let guid = Uuid::new_v4();
        let a = EntityRef::new(EntityType::Policy, EntityId::new()).with_guid(guid);
        let b = EntityRef::new(EntityType::Policy, EntityId::new()).with_guid(guid);
        assert!(a.same_entity(&b));
    }

    #[test]
    fn same_entity_by_name() {
        let a = EntityRef::new(EntityType::Connector, EntityId::new()).with_name("mq");
        let b = EntityRef::new(EntityType::Connector, EntityId::new()).with_name("mq");
        assert!(a.same_entity(&b));
    }

    #[test]
    fn different_types_never_match() {
        let id = EntityId::new();
        let a = EntityRef::new(EntityType::Service, id);
        let b = EntityRef::new(EntityType::Policy, id);
        assert!(!a.same_entity(&b));
    }

    #[test]
    fn different_identity_does_not_match() {
        let a = EntityRef::new(EntityType::User, EntityId::new()).with_name("alice");
        let b = EntityRef::new(EntityType::User, EntityId::new()).with_name("bob");
        assert!(!a.same_entity(&b));
    }

    #[test]
    fn display_includes_name() {
        let r = EntityRef::new(EntityType::Folder, EntityId::ROOT_FOLDER).with_name("Root Node");
        let s = format!("{r}");
        assert!(s.starts_with("folder:"));
        assert!(s.contains("Root Node"));
    }
}
