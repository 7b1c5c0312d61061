//! The export/import unit: ordered snapshots plus one mapping per entity.

use crate::entity::{EntityKey, EntitySnapshot, EntityType};
use crate::error::{ModelError, ModelResult};
use crate::mapping::Mapping;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A migration bundle.
///
/// Both arrays are in dependency-first order as produced by the exporter:
/// a mapping never precedes a mapping it depends on, and the resolution
/// engine relies on that when rewriting forward references. `references`
/// holds one snapshot per mapping except for the well-known root folder,
/// which gets a mapping but no content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    /// Entity snapshots, in export order.
    pub references: Vec<EntitySnapshot>,
    /// Resolution directives, in export order.
    pub mappings: Vec<Mapping>,
}

impl Bundle {
    /// Creates an empty bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes the bundle to CBOR.
    pub fn encode(&self) -> ModelResult<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).map_err(|e| ModelError::encode(e.to_string()))?;
        Ok(buf)
    }

    /// Decodes a bundle from CBOR and validates it.
    pub fn decode(bytes: &[u8]) -> ModelResult<Self> {
        let bundle: Bundle =
            ciborium::from_reader(bytes).map_err(|e| ModelError::decode(e.to_string()))?;
        bundle.validate()?;
        Ok(bundle)
    }

    /// Validates the bundle's structural invariants.
    ///
    /// - every mapping source appears exactly once,
    /// - every snapshot has a mapping (the reverse is not required: callers
    ///   may filter `references` to a subset of types).
    pub fn validate(&self) -> ModelResult<()> {
        let mut seen: HashSet<EntityKey> = HashSet::with_capacity(self.mappings.len());
        for mapping in &self.mappings {
            if !seen.insert(mapping.key()) {
                return Err(ModelError::duplicate_source(mapping.source.to_string()));
            }
        }
        for snapshot in &self.references {
            if !seen.contains(&snapshot.entity.key()) {
                return Err(ModelError::orphan_reference(snapshot.entity.to_string()));
            }
        }
        Ok(())
    }

    /// Returns the snapshot for a mapping key, if the bundle carries one.
    #[must_use]
    pub fn snapshot(&self, key: EntityKey) -> Option<&EntitySnapshot> {
        self.references.iter().find(|s| s.entity.key() == key)
    }

    /// Narrows `references` to the given types without touching `mappings`.
    #[must_use]
    pub fn filter_references(mut self, types: &[EntityType]) -> Self {
        self.references
            .retain(|s| types.contains(&s.entity.entity_type));
        self
    }

    /// Returns true if any snapshot carries an encrypted secret.
    #[must_use]
    pub fn has_encrypted_secrets(&self) -> bool {
        self.references
            .iter()
            .any(|s| s.secret.as_ref().is_some_and(|b| b.is_encrypted()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityId, EntityRef};
    use crate::mapping::MappingAction;

    fn snapshot(entity_type: EntityType) -> EntitySnapshot {
        EntitySnapshot::new(EntityRef::new(entity_type, EntityId::new()))
    }

    fn bundle_of(snapshots: Vec<EntitySnapshot>) -> Bundle {
        let mappings = snapshots
            .iter()
            .map(|s| Mapping::new(s.entity.clone(), MappingAction::NewOrExisting))
            .collect();
        Bundle {
            references: snapshots,
            mappings,
        }
    }

    #[test]
    fn encode_decode_roundtrip() {
        let bundle = bundle_of(vec![
            snapshot(EntityType::Folder),
            snapshot(EntityType::Service),
        ]);

        let bytes = bundle.encode().unwrap();
        let decoded = Bundle::decode(&bytes).unwrap();
        assert_eq!(bundle, decoded);
    }

    #[test]
    fn duplicate_source_rejected() {
        let snap = snapshot(EntityType::Service);
        let mut bundle = bundle_of(vec![snap.clone()]);
        bundle
            .mappings
            .push(Mapping::new(snap.entity, MappingAction::NewOrUpdate));

        assert!(matches!(
            bundle.validate(),
            Err(ModelError::DuplicateSource { .. })
        ));
    }

    #[test]
    fn orphan_reference_rejected() {
        let mut bundle = bundle_of(vec![snapshot(EntityType::Service)]);
        bundle.references.push(snapshot(EntityType::Connector));

        assert!(matches!(
            bundle.validate(),
            Err(ModelError::OrphanReference { .. })
        ));
    }

    #[test]
    fn mapping_without_snapshot_is_valid() {
        // Root-folder mappings and filtered bundles have no snapshot.
        let mut bundle = bundle_of(vec![]);
        bundle.mappings.push(Mapping::new(
            EntityRef::root_folder(),
            MappingAction::NewOrExisting,
        ));
        assert!(bundle.validate().is_ok());
    }

    #[test]
    fn filter_references_keeps_mappings() {
        let bundle = bundle_of(vec![
            snapshot(EntityType::Folder),
            snapshot(EntityType::Service),
        ]);
        let filtered = bundle.filter_references(&[EntityType::Service]);

        assert_eq!(filtered.references.len(), 1);
        assert_eq!(filtered.mappings.len(), 2);
        assert!(filtered.validate().is_ok());
    }

    #[test]
    fn snapshot_lookup_by_key() {
        let snap = snapshot(EntityType::Connector);
        let key = snap.entity.key();
        let bundle = bundle_of(vec![snap]);

        assert!(bundle.snapshot(key).is_some());
        assert!(bundle
            .snapshot((EntityType::Connector, EntityId::new()))
            .is_none());
    }
}
