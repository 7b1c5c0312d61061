//! Target-store session with a dry-run overlay.
//!
//! All import-side store access goes through a [`TargetSession`]. In live
//! mode every mutation is forwarded to the store; in dry-run mode mutations
//! only touch the overlay. Lookups consult the overlay first in both modes,
//! so the state machine observes identical state either way and the dry-run
//! report matches what a live import would produce.

use confmig_model::{EntityId, EntityKey, EntityRef, EntitySnapshot, EntityType};
use confmig_store::{EntityStore, StoreError, StoreResult};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

pub(crate) struct TargetSession<'a, S: EntityStore + ?Sized> {
    store: &'a S,
    dry_run: bool,
    /// Snapshots created or updated during this apply.
    written: HashMap<EntityKey, EntitySnapshot>,
    /// Entities deleted during this apply.
    deleted: HashSet<EntityKey>,
}

impl<'a, S: EntityStore + ?Sized> TargetSession<'a, S> {
    pub(crate) fn new(store: &'a S, dry_run: bool) -> Self {
        Self {
            store,
            dry_run,
            written: HashMap::new(),
            deleted: HashSet::new(),
        }
    }

    pub(crate) fn get(
        &self,
        entity_type: EntityType,
        id: EntityId,
    ) -> StoreResult<Option<EntitySnapshot>> {
        let key = (entity_type, id);
        if self.deleted.contains(&key) {
            return Ok(None);
        }
        if let Some(snapshot) = self.written.get(&key) {
            return Ok(Some(snapshot.clone()));
        }
        self.store.get(entity_type, id)
    }

    pub(crate) fn find_by_name(
        &self,
        entity_type: EntityType,
        container: Option<EntityId>,
        name: &str,
    ) -> StoreResult<Vec<EntityRef>> {
        let mut found = self.store.find_by_name(entity_type, container, name)?;
        found.retain(|r| !self.deleted.contains(&r.key()) && !self.written.contains_key(&r.key()));
        for snapshot in self.written.values() {
            if snapshot.entity.entity_type != entity_type {
                continue;
            }
            if container.is_some() && snapshot.folder != container {
                continue;
            }
            if snapshot.entity.name.as_deref() == Some(name) {
                found.push(snapshot.entity.clone());
            }
        }
        Ok(found)
    }

    pub(crate) fn find_by_guid(
        &self,
        entity_type: EntityType,
        guid: Uuid,
    ) -> StoreResult<Option<EntityRef>> {
        for snapshot in self.written.values() {
            if snapshot.entity.entity_type == entity_type && snapshot.entity.guid == Some(guid) {
                return Ok(Some(snapshot.entity.clone()));
            }
        }
        let found = self.store.find_by_guid(entity_type, guid)?;
        Ok(found.filter(|r| !self.deleted.contains(&r.key()) && !self.written.contains_key(&r.key())))
    }

    pub(crate) fn create(&mut self, snapshot: &EntitySnapshot) -> StoreResult<EntityId> {
        let key = snapshot.entity.key();
        if self.get(key.0, key.1)?.is_some() {
            return Err(StoreError::already_exists(key.0, key.1));
        }
        if let Some(name) = snapshot.entity.name.as_deref() {
            if !self.find_by_name(key.0, snapshot.folder, name)?.is_empty() {
                return Err(StoreError::unique_name(key.0, name));
            }
        }
        if !self.dry_run {
            self.store.create(snapshot)?;
        }
        self.deleted.remove(&key);
        self.written.insert(key, snapshot.clone());
        Ok(key.1)
    }

    pub(crate) fn update(
        &mut self,
        entity_type: EntityType,
        id: EntityId,
        snapshot: &EntitySnapshot,
    ) -> StoreResult<()> {
        if entity_type == EntityType::Folder && id.is_root_folder() {
            return Err(StoreError::RootFolderImmutable);
        }
        if self.get(entity_type, id)?.is_none() {
            return Err(StoreError::not_found(entity_type, id));
        }
        let mut updated = snapshot.clone();
        updated.entity.entity_type = entity_type;
        updated.entity.id = id;
        if let Some(name) = updated.entity.name.as_deref() {
            let clash = self
                .find_by_name(entity_type, updated.folder, name)?
                .into_iter()
                .any(|r| r.id != id);
            if clash {
                return Err(StoreError::unique_name(entity_type, name));
            }
        }
        if !self.dry_run {
            self.store.update(entity_type, id, &updated)?;
        }
        self.written.insert((entity_type, id), updated);
        Ok(())
    }

    pub(crate) fn delete(&mut self, entity_type: EntityType, id: EntityId) -> StoreResult<()> {
        if entity_type == EntityType::Folder && id.is_root_folder() {
            return Err(StoreError::RootFolderImmutable);
        }
        let key = (entity_type, id);
        if self.get(entity_type, id)?.is_none() {
            return Err(StoreError::not_found(entity_type, id));
        }
        if !self.dry_run {
            self.store.delete(entity_type, id)?;
        }
        self.written.remove(&key);
        self.deleted.insert(key);
        Ok(())
    }

    pub(crate) fn list_dependents(
        &self,
        entity_type: EntityType,
        id: EntityId,
    ) -> StoreResult<Vec<EntityRef>> {
        let key = (entity_type, id);
        let mut dependents = self.store.list_dependents(entity_type, id)?;
        dependents
            .retain(|r| !self.deleted.contains(&r.key()) && !self.written.contains_key(&r.key()));
        for snapshot in self.written.values() {
            if snapshot.entity.entity_type == EntityType::Role {
                continue;
            }
            if snapshot.entity.key() != key && snapshot.references(key) {
                dependents.push(snapshot.entity.clone());
            }
        }
        Ok(dependents)
    }

    pub(crate) fn list_auto_roles(
        &self,
        entity_type: EntityType,
        id: EntityId,
    ) -> StoreResult<Vec<EntityRef>> {
        let mut roles = self.store.list_auto_roles(entity_type, id)?;
        roles.retain(|r| !self.deleted.contains(&r.key()));
        Ok(roles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confmig_store::InMemoryStore;

    fn password(name: &str) -> EntitySnapshot {
        EntitySnapshot::new(
            EntityRef::new(EntityType::StoredPassword, EntityId::new()).with_name(name),
        )
    }

    #[test]
    fn dry_run_never_touches_store() {
        let store = InMemoryStore::new();
        let mut session = TargetSession::new(&store, true);

        let snap = password("db");
        let id = session.create(&snap).unwrap();

        // visible through the session, absent from the store
        assert!(session.get(EntityType::StoredPassword, id).unwrap().is_some());
        assert!(store.get(EntityType::StoredPassword, id).unwrap().is_none());

        session.delete(EntityType::StoredPassword, id).unwrap();
        assert!(session.get(EntityType::StoredPassword, id).unwrap().is_none());
    }

    #[test]
    fn live_mode_writes_through() {
        let store = InMemoryStore::new();
        let mut session = TargetSession::new(&store, false);

        let snap = password("db");
        let id = session.create(&snap).unwrap();
        assert!(store.get(EntityType::StoredPassword, id).unwrap().is_some());
    }

    #[test]
    fn dry_run_delete_hides_store_entity() {
        let store = InMemoryStore::new();
        let snap = password("db");
        let id = store.create(&snap).unwrap();

        let mut session = TargetSession::new(&store, true);
        session.delete(EntityType::StoredPassword, id).unwrap();

        assert!(session.get(EntityType::StoredPassword, id).unwrap().is_none());
        assert!(session
            .find_by_name(EntityType::StoredPassword, None, "db")
            .unwrap()
            .is_empty());
        assert!(store.get(EntityType::StoredPassword, id).unwrap().is_some());
    }

    #[test]
    fn uniqueness_enforced_against_overlay() {
        let store = InMemoryStore::new();
        let mut session = TargetSession::new(&store, true);

        session.create(&password("db")).unwrap();
        let err = session.create(&password("db")).unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[test]
    fn overlay_dependents_are_reported() {
        let store = InMemoryStore::new();
        let mut session = TargetSession::new(&store, true);

        let pw = password("db");
        let pw_id = session.create(&pw).unwrap();

        let connector = EntitySnapshot::new(
            EntityRef::new(EntityType::Connector, EntityId::new()).with_name("mq"),
        )
        .with_link("password", pw.entity.clone());
        session.create(&connector).unwrap();

        let dependents = session
            .list_dependents(EntityType::StoredPassword, pw_id)
            .unwrap();
        assert_eq!(dependents.len(), 1);
        assert_eq!(dependents[0].entity_type, EntityType::Connector);
    }
}
