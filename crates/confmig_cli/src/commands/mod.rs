//! CLI command implementations and shared file helpers.

pub mod export;
pub mod import;
pub mod inspect;

use confmig_model::{EntityId, EntityRef, EntitySnapshot, EntityType};
use confmig_store::InMemoryStore;
use std::path::Path;

/// Loads a store file: a JSON array of entity snapshots.
pub fn load_store(path: &Path) -> Result<InMemoryStore, Box<dyn std::error::Error>> {
    let data = std::fs::read_to_string(path)?;
    let snapshots: Vec<EntitySnapshot> = serde_json::from_str(&data)?;
    Ok(InMemoryStore::from_snapshots(snapshots)?)
}

/// Writes a store back to its JSON file form.
pub fn save_store(path: &Path, store: &InMemoryStore) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(&store.snapshots())?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Parses an entity type tag as printed by [`EntityType::as_str`].
pub fn parse_entity_type(tag: &str) -> Option<EntityType> {
    let all = [
        EntityType::Folder,
        EntityType::Service,
        EntityType::ServiceAlias,
        EntityType::Policy,
        EntityType::PolicyAlias,
        EntityType::Connector,
        EntityType::PrivateKey,
        EntityType::StoredPassword,
        EntityType::User,
        EntityType::SecurityZone,
        EntityType::Role,
    ];
    all.into_iter().find(|t| t.as_str() == tag)
}

/// Parses a `type:id` root argument.
pub fn parse_root(arg: &str) -> Result<EntityRef, String> {
    let (tag, id) = arg
        .split_once(':')
        .ok_or_else(|| format!("expected type:id, got {arg:?}"))?;
    let entity_type =
        parse_entity_type(tag).ok_or_else(|| format!("unknown entity type {tag:?}"))?;
    let id = EntityId::parse(id).ok_or_else(|| format!("invalid entity id {id:?}"))?;
    Ok(EntityRef::new(entity_type, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use confmig_store::EntityStore;
    use confmig_testkit::sample_gateway;

    #[test]
    fn parse_root_arguments() {
        let id = EntityId::new();
        let parsed = parse_root(&format!("service:{id}")).unwrap();
        assert_eq!(parsed.entity_type, EntityType::Service);
        assert_eq!(parsed.id, id);

        assert!(parse_root("service").is_err());
        assert!(parse_root("gizmo:not-an-id").is_err());
        assert!(parse_root(&format!("gizmo:{id}")).is_err());
    }

    #[test]
    fn store_file_roundtrip() {
        let sample = sample_gateway();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        save_store(&path, &sample.store.store).unwrap();
        let restored = load_store(&path).unwrap();

        assert_eq!(restored.len(), sample.store.len());
        assert!(restored
            .get(EntityType::Service, sample.service_a.id)
            .unwrap()
            .is_some());
    }
}
