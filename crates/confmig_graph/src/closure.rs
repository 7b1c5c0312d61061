//! Transitive dependency closure with dependency-first ordering.

use crate::error::{GraphError, GraphResult};
use crate::registry::Registry;
use confmig_model::{EntityId, EntityKey, EntityRef, EntityType};
use confmig_store::EntityStore;
use std::collections::HashSet;
use tracing::{debug, trace, warn};

/// Computes dependency closures over an entity store.
pub struct ClosureBuilder<'a, S: EntityStore + ?Sized> {
    store: &'a S,
    registry: &'a Registry,
}

impl<'a, S: EntityStore + ?Sized> ClosureBuilder<'a, S> {
    /// Creates a builder over a store and registry.
    pub fn new(store: &'a S, registry: &'a Registry) -> Self {
        Self { store, registry }
    }

    /// Builds the ordered entity set for a root set.
    ///
    /// With `include_dependencies` false the result is exactly the roots
    /// (deduplicated, in request order). With it true, a depth-first
    /// traversal emits every distinct `(type, id)` once, dependencies
    /// strictly before dependents.
    ///
    /// # Errors
    ///
    /// `RootNotFound` if any requested root is absent from the store; the
    /// whole build aborts.
    pub fn build(
        &self,
        roots: &[EntityRef],
        include_dependencies: bool,
    ) -> GraphResult<Vec<EntityRef>> {
        debug!(
            roots = roots.len(),
            include_dependencies, "building dependency closure"
        );

        let mut visited: HashSet<EntityKey> = HashSet::new();
        let mut ordered: Vec<EntityRef> = Vec::new();

        for root in roots {
            let snapshot = self
                .store
                .get(root.entity_type, root.id)?
                .ok_or_else(|| GraphError::root_not_found(root.to_string()))?;
            if !include_dependencies {
                if visited.insert(root.key()) {
                    ordered.push(snapshot.entity.clone());
                }
                continue;
            }
            self.visit(&snapshot.entity, &mut visited, &mut ordered)?;
        }

        debug!(entities = ordered.len(), "closure complete");
        Ok(ordered)
    }

    /// Post-order visit: dependencies first, each key at most once.
    fn visit(
        &self,
        entity: &EntityRef,
        visited: &mut HashSet<EntityKey>,
        ordered: &mut Vec<EntityRef>,
    ) -> GraphResult<()> {
        if !visited.insert(entity.key()) {
            return Ok(());
        }
        trace!(entity = %entity, "visiting");

        let Some(snapshot) = self.store.get(entity.entity_type, entity.id)? else {
            // A dangling link inside the store; the bundle simply omits it.
            warn!(entity = %entity, "skipping dangling dependency");
            visited.remove(&entity.key());
            return Ok(());
        };

        for dependency in self.registry.dependencies(&snapshot) {
            self.visit(&dependency, visited, ordered)?;
        }
        ordered.push(snapshot.entity);
        Ok(())
    }

    /// Root set for an export-everything bundle.
    ///
    /// Deterministic: canonical type order, then the store's listing order.
    pub fn all_roots(&self) -> GraphResult<Vec<EntityRef>> {
        let mut roots = Vec::new();
        for entity_type in EntityType::EXPORTABLE {
            if self.registry.is_exportable(entity_type) {
                roots.extend(self.store.list(entity_type)?);
            }
        }
        Ok(roots)
    }

    /// Root set for a folder subtree: the folder, every folder below it, and
    /// every exportable entity residing in one of those folders.
    pub fn subtree_roots(&self, folder: EntityId) -> GraphResult<Vec<EntityRef>> {
        let folder_ref = EntityRef::new(EntityType::Folder, folder);
        if !self.store.contains(EntityType::Folder, folder)? {
            return Err(GraphError::root_not_found(folder_ref.to_string()));
        }

        // Collect the subtree folder set by walking parent links.
        let all_folders = self.store.list(EntityType::Folder)?;
        let mut subtree: HashSet<EntityId> = HashSet::new();
        subtree.insert(folder);
        let mut grew = true;
        while grew {
            grew = false;
            for candidate in &all_folders {
                if subtree.contains(&candidate.id) {
                    continue;
                }
                let parent = self
                    .store
                    .get(EntityType::Folder, candidate.id)?
                    .and_then(|s| s.folder);
                if parent.is_some_and(|p| subtree.contains(&p)) {
                    subtree.insert(candidate.id);
                    grew = true;
                }
            }
        }

        let mut roots = Vec::new();
        for entity_type in EntityType::EXPORTABLE {
            if !self.registry.is_exportable(entity_type) {
                continue;
            }
            for entity in self.store.list(entity_type)? {
                if entity_type == EntityType::Folder {
                    if subtree.contains(&entity.id) {
                        roots.push(entity);
                    }
                    continue;
                }
                let resident = self
                    .store
                    .get(entity_type, entity.id)?
                    .and_then(|s| s.folder)
                    .is_some_and(|f| subtree.contains(&f));
                if resident {
                    roots.push(entity);
                }
            }
        }
        Ok(roots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confmig_model::EntitySnapshot;
    use confmig_store::InMemoryStore;

    fn store_with_tree() -> (InMemoryStore, EntityId, EntityId, EntityId) {
        let store = InMemoryStore::new();
        let folder_a = EntityId::new();
        store
            .create(
                &EntitySnapshot::new(
                    EntityRef::new(EntityType::Folder, folder_a).with_name("FolderA"),
                )
                .in_folder(EntityId::ROOT_FOLDER),
            )
            .unwrap();
        let service = EntityId::new();
        store
            .create(
                &EntitySnapshot::new(
                    EntityRef::new(EntityType::Service, service).with_name("ServiceA"),
                )
                .in_folder(folder_a),
            )
            .unwrap();
        let alias = EntityId::new();
        store
            .create(
                &EntitySnapshot::new(EntityRef::new(EntityType::ServiceAlias, alias))
                    .in_folder(folder_a)
                    .with_link("target", EntityRef::new(EntityType::Service, service)),
            )
            .unwrap();
        (store, folder_a, service, alias)
    }

    fn positions(ordered: &[EntityRef]) -> impl Fn(EntityKey) -> usize + '_ {
        move |key| {
            ordered
                .iter()
                .position(|r| r.key() == key)
                .unwrap_or_else(|| panic!("{key:?} not in closure"))
        }
    }

    #[test]
    fn dependencies_before_dependents() {
        let (store, folder_a, service, alias) = store_with_tree();
        let registry = Registry::standard();
        let builder = ClosureBuilder::new(&store, &registry);

        let ordered = builder
            .build(
                &[EntityRef::new(EntityType::ServiceAlias, alias)],
                true,
            )
            .unwrap();

        assert_eq!(ordered.len(), 4);
        let pos = positions(&ordered);
        assert!(pos((EntityType::Folder, EntityId::ROOT_FOLDER)) < pos((EntityType::Folder, folder_a)));
        assert!(pos((EntityType::Folder, folder_a)) < pos((EntityType::Service, service)));
        assert!(pos((EntityType::Service, service)) < pos((EntityType::ServiceAlias, alias)));
    }

    #[test]
    fn diamond_dependency_deduplicated() {
        let (store, folder_a, service, alias) = store_with_tree();
        let registry = Registry::standard();
        let builder = ClosureBuilder::new(&store, &registry);

        // Both roots reach FolderA and the root folder.
        let ordered = builder
            .build(
                &[
                    EntityRef::new(EntityType::Service, service),
                    EntityRef::new(EntityType::ServiceAlias, alias),
                ],
                true,
            )
            .unwrap();

        let folder_count = ordered
            .iter()
            .filter(|r| r.key() == (EntityType::Folder, folder_a))
            .count();
        assert_eq!(folder_count, 1);
        assert_eq!(ordered.len(), 4);
    }

    #[test]
    fn roots_only_mode() {
        let (store, _, service, alias) = store_with_tree();
        let registry = Registry::standard();
        let builder = ClosureBuilder::new(&store, &registry);

        let roots = [
            EntityRef::new(EntityType::Service, service),
            EntityRef::new(EntityType::ServiceAlias, alias),
            EntityRef::new(EntityType::Service, service),
        ];
        let ordered = builder.build(&roots, false).unwrap();

        // exactly the (deduplicated) roots, no dependencies
        assert_eq!(ordered.len(), 2);
        assert_eq!(ordered[0].key(), (EntityType::Service, service));
        assert_eq!(ordered[1].key(), (EntityType::ServiceAlias, alias));
    }

    #[test]
    fn missing_root_aborts() {
        let (store, ..) = store_with_tree();
        let registry = Registry::standard();
        let builder = ClosureBuilder::new(&store, &registry);

        let absent = EntityRef::new(EntityType::Service, EntityId::new());
        assert!(matches!(
            builder.build(&[absent], true),
            Err(GraphError::RootNotFound { .. })
        ));
    }

    #[test]
    fn cycle_terminates() {
        let store = InMemoryStore::new();
        let a = EntityId::new();
        let b = EntityId::new();
        store
            .create(
                &EntitySnapshot::new(EntityRef::new(EntityType::Connector, a).with_name("a"))
                    .with_link("peer", EntityRef::new(EntityType::Connector, b)),
            )
            .unwrap();
        store
            .create(
                &EntitySnapshot::new(EntityRef::new(EntityType::Connector, b).with_name("b"))
                    .with_link("peer", EntityRef::new(EntityType::Connector, a)),
            )
            .unwrap();

        let registry = Registry::standard();
        let builder = ClosureBuilder::new(&store, &registry);
        let ordered = builder
            .build(&[EntityRef::new(EntityType::Connector, a)], true)
            .unwrap();

        assert_eq!(ordered.len(), 2);
    }

    #[test]
    fn subtree_roots_collects_descendants() {
        let (store, folder_a, service, alias) = store_with_tree();
        // Sibling folder outside the requested subtree.
        let other = EntityId::new();
        store
            .create(
                &EntitySnapshot::new(
                    EntityRef::new(EntityType::Folder, other).with_name("Other"),
                )
                .in_folder(EntityId::ROOT_FOLDER),
            )
            .unwrap();

        let registry = Registry::standard();
        let builder = ClosureBuilder::new(&store, &registry);

        let roots = builder.subtree_roots(folder_a).unwrap();
        let keys: Vec<EntityKey> = roots.iter().map(EntityRef::key).collect();
        assert!(keys.contains(&(EntityType::Folder, folder_a)));
        assert!(keys.contains(&(EntityType::Service, service)));
        assert!(keys.contains(&(EntityType::ServiceAlias, alias)));
        assert!(!keys.contains(&(EntityType::Folder, other)));

        let whole_tree = builder.subtree_roots(EntityId::ROOT_FOLDER).unwrap();
        assert!(whole_tree
            .iter()
            .any(|r| r.key() == (EntityType::Folder, other)));
    }

    #[test]
    fn all_roots_excludes_roles() {
        let (store, ..) = store_with_tree();
        let registry = Registry::standard();
        let builder = ClosureBuilder::new(&store, &registry);

        let roots = builder.all_roots().unwrap();
        assert!(roots
            .iter()
            .all(|r| r.entity_type != EntityType::Role));
        // root folder + FolderA + service + alias (store auto-roles excluded)
        assert_eq!(roots.len(), 4);
    }
}
