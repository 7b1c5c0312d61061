//! In-memory entity store.

use crate::error::{StoreError, StoreResult};
use crate::store::EntityStore;
use confmig_model::{
    EntityId, EntityKey, EntityRef, EntitySnapshot, EntityType,
};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Entity types that get a manage-role created alongside them.
const ROLE_MANAGED_TYPES: [EntityType; 3] =
    [EntityType::Service, EntityType::Policy, EntityType::Folder];

/// An in-memory entity store.
///
/// The reference implementation of [`EntityStore`]: it seeds the well-known
/// root folder on construction, enforces per-scope name uniqueness, tracks
/// live dependents, and auto-creates a manage-role whenever a service,
/// policy or folder is created (the cascade the import engine cleans up on
/// delete).
pub struct InMemoryStore {
    entities: RwLock<BTreeMap<EntityKey, EntitySnapshot>>,
}

impl InMemoryStore {
    /// Creates a store containing only the root folder.
    #[must_use]
    pub fn new() -> Self {
        let mut entities = BTreeMap::new();
        let root = EntitySnapshot::new(EntityRef::root_folder());
        entities.insert(root.entity.key(), root);
        Self {
            entities: RwLock::new(entities),
        }
    }

    /// Builds a store from previously dumped snapshots.
    ///
    /// Snapshots are inserted verbatim (no auto-role creation); the root
    /// folder is seeded if the dump does not carry it.
    pub fn from_snapshots(snapshots: Vec<EntitySnapshot>) -> StoreResult<Self> {
        let store = Self::new();
        {
            let mut entities = store.entities.write();
            for snapshot in snapshots {
                let key = snapshot.entity.key();
                if snapshot.entity.is_root_folder() {
                    continue;
                }
                if entities.contains_key(&key) {
                    return Err(StoreError::already_exists(key.0, key.1));
                }
                entities.insert(key, snapshot);
            }
        }
        Ok(store)
    }

    /// Dumps every snapshot in the store, in key order.
    #[must_use]
    pub fn snapshots(&self) -> Vec<EntitySnapshot> {
        self.entities.read().values().cloned().collect()
    }

    /// Returns the number of entities, root folder included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    /// Returns true if the store holds only the root folder.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    fn check_unique_name(
        entities: &BTreeMap<EntityKey, EntitySnapshot>,
        snapshot: &EntitySnapshot,
        exclude: Option<EntityId>,
    ) -> StoreResult<()> {
        let Some(name) = &snapshot.entity.name else {
            return Ok(());
        };
        let entity_type = snapshot.entity.entity_type;
        let collision = entities
            .iter()
            .filter(|((t, id), _)| *t == entity_type && Some(*id) != exclude)
            .any(|(_, other)| {
                other.folder == snapshot.folder && other.entity.name.as_deref() == Some(name)
            });
        if collision {
            return Err(StoreError::unique_name(entity_type, name.clone()));
        }
        Ok(())
    }

    fn auto_role_for(snapshot: &EntitySnapshot) -> EntitySnapshot {
        let name = snapshot
            .entity
            .name
            .clone()
            .unwrap_or_else(|| snapshot.entity.entity_type.to_string());
        let role_ref = EntityRef::new(EntityType::Role, EntityId::new())
            .with_name(format!("Manage {name} ({})", snapshot.entity.id));
        EntitySnapshot::new(role_ref).with_link("managed", snapshot.entity.clone())
    }

    fn live_dependents(
        entities: &BTreeMap<EntityKey, EntitySnapshot>,
        key: EntityKey,
    ) -> Vec<EntityRef> {
        entities
            .values()
            .filter(|s| s.entity.entity_type != EntityType::Role)
            .filter(|s| s.entity.key() != key && s.references(key))
            .map(|s| s.entity.clone())
            .collect()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore for InMemoryStore {
    fn get(&self, entity_type: EntityType, id: EntityId) -> StoreResult<Option<EntitySnapshot>> {
        Ok(self.entities.read().get(&(entity_type, id)).cloned())
    }

    fn find_by_name(
        &self,
        entity_type: EntityType,
        container: Option<EntityId>,
        name: &str,
    ) -> StoreResult<Vec<EntityRef>> {
        Ok(self
            .entities
            .read()
            .iter()
            .filter(|((t, _), _)| *t == entity_type)
            .filter(|(_, s)| container.is_none() || s.folder == container)
            .filter(|(_, s)| s.entity.name.as_deref() == Some(name))
            .map(|(_, s)| s.entity.clone())
            .collect())
    }

    fn find_by_guid(&self, entity_type: EntityType, guid: Uuid) -> StoreResult<Option<EntityRef>> {
        Ok(self
            .entities
            .read()
            .iter()
            .filter(|((t, _), _)| *t == entity_type)
            .find(|(_, s)| s.entity.guid == Some(guid))
            .map(|(_, s)| s.entity.clone()))
    }

    fn create(&self, snapshot: &EntitySnapshot) -> StoreResult<EntityId> {
        if snapshot.entity.is_root_folder() {
            return Err(StoreError::RootFolderImmutable);
        }
        let key = snapshot.entity.key();
        let mut entities = self.entities.write();
        if entities.contains_key(&key) {
            return Err(StoreError::already_exists(key.0, key.1));
        }
        Self::check_unique_name(&entities, snapshot, None)?;
        entities.insert(key, snapshot.clone());
        if ROLE_MANAGED_TYPES.contains(&key.0) {
            let role = Self::auto_role_for(snapshot);
            entities.insert(role.entity.key(), role);
        }
        Ok(key.1)
    }

    fn update(
        &self,
        entity_type: EntityType,
        id: EntityId,
        snapshot: &EntitySnapshot,
    ) -> StoreResult<()> {
        if entity_type == EntityType::Folder && id.is_root_folder() {
            return Err(StoreError::RootFolderImmutable);
        }
        let mut entities = self.entities.write();
        if !entities.contains_key(&(entity_type, id)) {
            return Err(StoreError::not_found(entity_type, id));
        }
        let mut updated = snapshot.clone();
        updated.entity.entity_type = entity_type;
        updated.entity.id = id;
        Self::check_unique_name(&entities, &updated, Some(id))?;
        entities.insert((entity_type, id), updated);
        Ok(())
    }

    fn delete(&self, entity_type: EntityType, id: EntityId) -> StoreResult<()> {
        if entity_type == EntityType::Folder && id.is_root_folder() {
            return Err(StoreError::RootFolderImmutable);
        }
        let mut entities = self.entities.write();
        let key = (entity_type, id);
        if !entities.contains_key(&key) {
            return Err(StoreError::not_found(entity_type, id));
        }
        let dependents = Self::live_dependents(&entities, key);
        if !dependents.is_empty() {
            return Err(StoreError::dependents_exist(
                entity_type,
                id,
                dependents.len(),
            ));
        }
        entities.remove(&key);
        Ok(())
    }

    fn list_dependents(
        &self,
        entity_type: EntityType,
        id: EntityId,
    ) -> StoreResult<Vec<EntityRef>> {
        Ok(Self::live_dependents(
            &self.entities.read(),
            (entity_type, id),
        ))
    }

    fn list_auto_roles(
        &self,
        entity_type: EntityType,
        id: EntityId,
    ) -> StoreResult<Vec<EntityRef>> {
        let key = (entity_type, id);
        Ok(self
            .entities
            .read()
            .values()
            .filter(|s| s.entity.entity_type == EntityType::Role)
            .filter(|s| s.references(key))
            .map(|s| s.entity.clone())
            .collect())
    }

    fn list(&self, entity_type: EntityType) -> StoreResult<Vec<EntityRef>> {
        Ok(self
            .entities
            .read()
            .iter()
            .filter(|((t, _), _)| *t == entity_type)
            .map(|(_, s)| s.entity.clone())
            .collect())
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("entities", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder(name: &str) -> EntitySnapshot {
        EntitySnapshot::new(EntityRef::new(EntityType::Folder, EntityId::new()).with_name(name))
            .in_folder(EntityId::ROOT_FOLDER)
    }

    fn service(name: &str, folder: EntityId) -> EntitySnapshot {
        EntitySnapshot::new(EntityRef::new(EntityType::Service, EntityId::new()).with_name(name))
            .in_folder(folder)
    }

    #[test]
    fn seeds_root_folder() {
        let store = InMemoryStore::new();
        let root = store
            .get(EntityType::Folder, EntityId::ROOT_FOLDER)
            .unwrap();
        assert!(root.is_some());
        assert!(store.is_empty());
    }

    #[test]
    fn create_get_update_delete() {
        let store = InMemoryStore::new();
        let snap = folder("apps");
        let id = store.create(&snap).unwrap();
        assert_eq!(id, snap.entity.id);

        let fetched = store.get(EntityType::Folder, id).unwrap().unwrap();
        assert_eq!(fetched.entity.name.as_deref(), Some("apps"));

        let renamed = folder("renamed");
        store.update(EntityType::Folder, id, &renamed).unwrap();
        let fetched = store.get(EntityType::Folder, id).unwrap().unwrap();
        assert_eq!(fetched.entity.name.as_deref(), Some("renamed"));
        // update keys by the addressed id, not the snapshot's
        assert_eq!(fetched.entity.id, id);

        // cascade the auto-role away first, as the engine would
        for role in store.list_auto_roles(EntityType::Folder, id).unwrap() {
            store.delete(EntityType::Role, role.id).unwrap();
        }
        store.delete(EntityType::Folder, id).unwrap();
        assert!(store.get(EntityType::Folder, id).unwrap().is_none());
    }

    #[test]
    fn duplicate_id_rejected() {
        let store = InMemoryStore::new();
        let snap = folder("apps");
        store.create(&snap).unwrap();
        assert!(matches!(
            store.create(&snap),
            Err(StoreError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn unique_name_within_folder() {
        let store = InMemoryStore::new();
        let parent = store.create(&folder("apps")).unwrap();

        store.create(&service("svc", parent)).unwrap();
        let dup = service("svc", parent);
        assert!(matches!(
            store.create(&dup),
            Err(StoreError::UniqueNameConflict { .. })
        ));

        // same name in a different folder is fine
        let other = store.create(&folder("other")).unwrap();
        assert!(store.create(&service("svc", other)).is_ok());
    }

    #[test]
    fn delete_refuses_while_dependents_exist() {
        let store = InMemoryStore::new();
        let parent = store.create(&folder("apps")).unwrap();
        let svc = store.create(&service("svc", parent)).unwrap();

        let err = store.delete(EntityType::Folder, parent).unwrap_err();
        assert!(matches!(err, StoreError::DependentsExist { .. }));

        let dependents = store.list_dependents(EntityType::Folder, parent).unwrap();
        assert_eq!(dependents.len(), 1);
        assert_eq!(dependents[0].id, svc);
    }

    #[test]
    fn auto_roles_created_and_listed() {
        let store = InMemoryStore::new();
        let parent = store.create(&folder("apps")).unwrap();
        let svc = store.create(&service("svc", parent)).unwrap();

        let roles = store.list_auto_roles(EntityType::Service, svc).unwrap();
        assert_eq!(roles.len(), 1);
        assert!(roles[0].name.as_deref().unwrap().starts_with("Manage svc"));

        // passwords get no role
        let pw = EntitySnapshot::new(
            EntityRef::new(EntityType::StoredPassword, EntityId::new()).with_name("db"),
        );
        let pw_id = store.create(&pw).unwrap();
        assert!(store
            .list_auto_roles(EntityType::StoredPassword, pw_id)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn find_by_name_scoping_and_ambiguity() {
        let store = InMemoryStore::new();
        let a = store.create(&folder("a")).unwrap();
        let b = store.create(&folder("b")).unwrap();
        store.create(&service("svc", a)).unwrap();
        store.create(&service("svc", b)).unwrap();

        let scoped = store
            .find_by_name(EntityType::Service, Some(a), "svc")
            .unwrap();
        assert_eq!(scoped.len(), 1);

        let global = store.find_by_name(EntityType::Service, None, "svc").unwrap();
        assert_eq!(global.len(), 2);

        assert!(store
            .find_by_name(EntityType::Service, None, "absent")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn find_by_guid() {
        let store = InMemoryStore::new();
        let guid = Uuid::new_v4();
        let policy = EntitySnapshot::new(
            EntityRef::new(EntityType::Policy, EntityId::new())
                .with_guid(guid)
                .with_name("audit"),
        )
        .in_folder(EntityId::ROOT_FOLDER);
        let id = store.create(&policy).unwrap();

        let found = store.find_by_guid(EntityType::Policy, guid).unwrap();
        assert_eq!(found.unwrap().id, id);
        assert!(store
            .find_by_guid(EntityType::Policy, Uuid::new_v4())
            .unwrap()
            .is_none());
    }

    #[test]
    fn root_folder_is_immutable() {
        let store = InMemoryStore::new();
        let root = EntitySnapshot::new(EntityRef::root_folder());
        assert!(matches!(
            store.create(&root),
            Err(StoreError::RootFolderImmutable)
        ));
        assert!(matches!(
            store.update(EntityType::Folder, EntityId::ROOT_FOLDER, &root),
            Err(StoreError::RootFolderImmutable)
        ));
        assert!(matches!(
            store.delete(EntityType::Folder, EntityId::ROOT_FOLDER),
            Err(StoreError::RootFolderImmutable)
        ));
    }

    #[test]
    fn folder_paths_roundtrip() {
        let store = InMemoryStore::new();
        let apps = store.create(&folder("apps")).unwrap();
        let inner = store
            .create(
                &EntitySnapshot::new(
                    EntityRef::new(EntityType::Folder, EntityId::new()).with_name("billing"),
                )
                .in_folder(apps),
            )
            .unwrap();

        assert_eq!(
            store.folder_path(EntityId::ROOT_FOLDER).unwrap().as_deref(),
            Some("/")
        );
        assert_eq!(
            store.folder_path(inner).unwrap().as_deref(),
            Some("/apps/billing")
        );
        assert!(store.folder_path(EntityId::new()).unwrap().is_none());

        let resolved = store.find_folder_by_path("/apps/billing").unwrap().unwrap();
        assert_eq!(resolved.id, inner);
        assert!(store.find_folder_by_path("/apps/missing").unwrap().is_none());
        assert!(store
            .find_folder_by_path("/")
            .unwrap()
            .unwrap()
            .is_root_folder());
    }

    #[test]
    fn snapshot_dump_roundtrip() {
        let store = InMemoryStore::new();
        let parent = store.create(&folder("apps")).unwrap();
        store.create(&service("svc", parent)).unwrap();

        let dump = store.snapshots();
        let restored = InMemoryStore::from_snapshots(dump).unwrap();
        assert_eq!(restored.len(), store.len());
        assert!(restored.get(EntityType::Folder, parent).unwrap().is_some());
    }
}
