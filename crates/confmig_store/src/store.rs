//! The entity store boundary trait.

use crate::error::StoreResult;
use confmig_model::{EntityId, EntityRef, EntitySnapshot, EntityType};
use uuid::Uuid;

/// The external system the migration engine exports from and imports into.
///
/// Every call is expected to be individually atomic and consistent from the
/// store's perspective; the engine provides no cross-call isolation (see the
/// engine crate's concurrency notes). Implementations must be `Send + Sync`.
pub trait EntityStore: Send + Sync {
    /// Fetches the full snapshot of an entity, or `None` if absent.
    fn get(&self, entity_type: EntityType, id: EntityId) -> StoreResult<Option<EntitySnapshot>>;

    /// Finds entities of a type by unique name.
    ///
    /// `container` scopes the search to one folder; `None` searches the
    /// whole type. All matches are returned so callers can detect ambiguity.
    fn find_by_name(
        &self,
        entity_type: EntityType,
        container: Option<EntityId>,
        name: &str,
    ) -> StoreResult<Vec<EntityRef>>;

    /// Finds an entity of a type by its GUID.
    fn find_by_guid(&self, entity_type: EntityType, guid: Uuid) -> StoreResult<Option<EntityRef>>;

    /// Creates an entity from a snapshot, under the snapshot's own ID.
    ///
    /// Fails if the ID is taken or a unique-name constraint is violated.
    fn create(&self, snapshot: &EntitySnapshot) -> StoreResult<EntityId>;

    /// Replaces an existing entity's content.
    fn update(
        &self,
        entity_type: EntityType,
        id: EntityId,
        snapshot: &EntitySnapshot,
    ) -> StoreResult<()>;

    /// Deletes an entity.
    ///
    /// Refuses with a conflict while live dependents exist.
    fn delete(&self, entity_type: EntityType, id: EntityId) -> StoreResult<()>;

    /// Lists the entities whose content references the given entity.
    ///
    /// Auto-created roles are not reported here; they are cascade-deleted,
    /// not dependency-guarded.
    fn list_dependents(&self, entity_type: EntityType, id: EntityId)
        -> StoreResult<Vec<EntityRef>>;

    /// Lists the access-control roles auto-created for the given entity.
    fn list_auto_roles(&self, entity_type: EntityType, id: EntityId)
        -> StoreResult<Vec<EntityRef>>;

    /// Lists all entities of a type, in a deterministic order.
    fn list(&self, entity_type: EntityType) -> StoreResult<Vec<EntityRef>>;

    /// Checks whether an entity exists.
    fn contains(&self, entity_type: EntityType, id: EntityId) -> StoreResult<bool> {
        Ok(self.get(entity_type, id)?.is_some())
    }

    /// Renders a folder's absolute path (`/` is the root folder).
    ///
    /// Returns `None` if the folder does not exist or an ancestor chain is
    /// broken.
    fn folder_path(&self, id: EntityId) -> StoreResult<Option<String>> {
        if id.is_root_folder() {
            return Ok(Some("/".into()));
        }
        let mut segments = Vec::new();
        let mut cursor = id;
        while !cursor.is_root_folder() {
            let Some(snapshot) = self.get(EntityType::Folder, cursor)? else {
                return Ok(None);
            };
            let Some(name) = snapshot.entity.name else {
                return Ok(None);
            };
            segments.push(name);
            let Some(parent) = snapshot.folder else {
                return Ok(None);
            };
            cursor = parent;
        }
        segments.reverse();
        Ok(Some(format!("/{}", segments.join("/"))))
    }

    /// Resolves an absolute folder path back to a folder reference.
    fn find_folder_by_path(&self, path: &str) -> StoreResult<Option<EntityRef>> {
        let mut cursor = EntityId::ROOT_FOLDER;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let mut matches = self.find_by_name(EntityType::Folder, Some(cursor), segment)?;
            let Some(next) = matches.pop() else {
                return Ok(None);
            };
            cursor = next.id;
        }
        self.get(EntityType::Folder, cursor)
            .map(|found| found.map(|s| s.entity))
    }
}
