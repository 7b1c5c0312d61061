//! Proptest strategies for randomized fixtures.

use crate::fixtures::TestStore;
use confmig_model::EntityRef;
use proptest::prelude::*;

/// A randomized folder-tree shape.
///
/// Entry `i` describes folder `i`: `parent` indexes an earlier folder (or
/// the root when `i == 0` or the index wraps), `services` is how many
/// services the folder holds.
#[derive(Debug, Clone)]
pub struct TreeSpec {
    /// Per-folder `(parent hint, service count)` pairs.
    pub folders: Vec<(usize, usize)>,
}

/// Strategy for folder-tree shapes: up to eight folders, up to three
/// services each.
pub fn arb_tree_spec() -> impl Strategy<Value = TreeSpec> {
    proptest::collection::vec((any::<usize>(), 0usize..=3), 1..=8)
        .prop_map(|folders| TreeSpec { folders })
}

/// Strategy for secret byte strings.
pub fn arb_secret_bytes() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(any::<u8>(), 0..512)
}

/// Strategy for transit passphrases.
pub fn arb_passphrase() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 !@#]{1,32}"
}

/// Materializes a tree spec into a seeded store.
///
/// Returns the store and every created entity, folders first.
#[must_use]
pub fn build_tree_store(spec: &TreeSpec) -> (TestStore, Vec<EntityRef>) {
    let store = TestStore::new();
    let mut folders: Vec<EntityRef> = Vec::new();
    let mut created: Vec<EntityRef> = Vec::new();

    for (index, (parent_hint, services)) in spec.folders.iter().enumerate() {
        let parent = if index == 0 || folders.is_empty() {
            confmig_model::EntityId::ROOT_FOLDER
        } else {
            folders[parent_hint % folders.len()].id
        };
        let folder = store.add_folder(&format!("folder-{index}"), parent);
        folders.push(folder.clone());
        created.push(folder.clone());

        for service_index in 0..*services {
            let service =
                store.add_service(&format!("svc-{index}-{service_index}"), folder.id);
            created.push(service);
        }
    }
    (store, created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use confmig_model::EntityType;
    use confmig_store::EntityStore;

    #[test]
    fn build_tree_store_produces_connected_tree() {
        let spec = TreeSpec {
            folders: vec![(0, 1), (0, 2), (1, 0)],
        };
        let (store, created) = build_tree_store(&spec);

        let folder_count = created
            .iter()
            .filter(|r| r.entity_type == EntityType::Folder)
            .count();
        assert_eq!(folder_count, 3);

        // every folder chains to the root
        for folder in created.iter().filter(|r| r.entity_type == EntityType::Folder) {
            let mut cursor = folder.id;
            let mut hops = 0;
            while !cursor.is_root_folder() {
                cursor = store
                    .get(EntityType::Folder, cursor)
                    .unwrap()
                    .unwrap()
                    .folder
                    .expect("folder has a parent");
                hops += 1;
                assert!(hops < 16, "parent chain must terminate");
            }
        }
    }
}
