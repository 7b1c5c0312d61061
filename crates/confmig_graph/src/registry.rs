//! Per-type identity rules and dependency extraction.

use crate::error::{GraphError, GraphResult};
use confmig_model::{EntityRef, EntitySnapshot, EntityType};
use std::collections::BTreeMap;

/// Where a type's unique name is scoped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameScope {
    /// The type has no usable unique name.
    None,
    /// The name is unique across the whole store.
    Global,
    /// The name is unique within the containing folder.
    InFolder,
}

/// Identity rules and dependency extraction for one entity type.
#[derive(Clone)]
pub struct TypeDescriptor {
    /// The described type.
    pub entity_type: EntityType,
    /// Whether the type carries a secondary GUID.
    pub has_guid: bool,
    /// Name uniqueness scope.
    pub name_scope: NameScope,
    /// Whether entities of this type live in the folder tree.
    pub folder_resident: bool,
    extract: fn(&EntitySnapshot) -> Vec<EntityRef>,
}

impl TypeDescriptor {
    /// Creates a descriptor.
    #[must_use]
    pub fn new(
        entity_type: EntityType,
        has_guid: bool,
        name_scope: NameScope,
        folder_resident: bool,
        extract: fn(&EntitySnapshot) -> Vec<EntityRef>,
    ) -> Self {
        Self {
            entity_type,
            has_guid,
            name_scope,
            folder_resident,
            extract,
        }
    }

    /// Extracts the direct dependencies of a snapshot.
    #[must_use]
    pub fn dependencies(&self, snapshot: &EntitySnapshot) -> Vec<EntityRef> {
        (self.extract)(snapshot)
    }
}

impl std::fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("entity_type", &self.entity_type)
            .field("has_guid", &self.has_guid)
            .field("name_scope", &self.name_scope)
            .field("folder_resident", &self.folder_resident)
            .finish_non_exhaustive()
    }
}

/// Folder membership plus every embedded link.
fn folder_and_links(snapshot: &EntitySnapshot) -> Vec<EntityRef> {
    let mut deps = Vec::with_capacity(snapshot.links.len() + 1);
    if let Some(folder) = snapshot.folder {
        deps.push(EntityRef::new(EntityType::Folder, folder));
    }
    deps.extend(snapshot.links.iter().map(|l| l.target.clone()));
    deps
}

/// Embedded links only (folderless types).
fn links_only(snapshot: &EntitySnapshot) -> Vec<EntityRef> {
    snapshot.links.iter().map(|l| l.target.clone()).collect()
}

/// No dependencies.
fn no_dependencies(_snapshot: &EntitySnapshot) -> Vec<EntityRef> {
    Vec::new()
}

/// Maps entity types to their descriptors.
pub struct Registry {
    descriptors: BTreeMap<EntityType, TypeDescriptor>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            descriptors: BTreeMap::new(),
        }
    }

    /// The standard registry covering the closed entity set.
    ///
    /// `Role` is deliberately absent: roles are auto-created by stores and
    /// only touched by the delete cascade, never exported.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        let descriptors = [
            TypeDescriptor::new(
                EntityType::Folder,
                false,
                NameScope::InFolder,
                true,
                folder_and_links,
            ),
            TypeDescriptor::new(
                EntityType::Service,
                false,
                NameScope::InFolder,
                true,
                folder_and_links,
            ),
            TypeDescriptor::new(
                EntityType::ServiceAlias,
                false,
                NameScope::None,
                true,
                folder_and_links,
            ),
            TypeDescriptor::new(
                EntityType::Policy,
                true,
                NameScope::Global,
                true,
                folder_and_links,
            ),
            TypeDescriptor::new(
                EntityType::PolicyAlias,
                false,
                NameScope::None,
                true,
                folder_and_links,
            ),
            TypeDescriptor::new(
                EntityType::Connector,
                false,
                NameScope::Global,
                false,
                links_only,
            ),
            TypeDescriptor::new(
                EntityType::PrivateKey,
                false,
                NameScope::Global,
                false,
                no_dependencies,
            ),
            TypeDescriptor::new(
                EntityType::StoredPassword,
                false,
                NameScope::Global,
                false,
                no_dependencies,
            ),
            TypeDescriptor::new(
                EntityType::User,
                false,
                NameScope::Global,
                false,
                no_dependencies,
            ),
            TypeDescriptor::new(
                EntityType::SecurityZone,
                false,
                NameScope::Global,
                false,
                no_dependencies,
            ),
        ];
        for descriptor in descriptors {
            registry
                .register(descriptor)
                .expect("standard registry has no duplicates");
        }
        registry
    }

    /// Registers a descriptor.
    ///
    /// Returns an error if the type already has one.
    pub fn register(&mut self, descriptor: TypeDescriptor) -> GraphResult<()> {
        let entity_type = descriptor.entity_type;
        if self.descriptors.contains_key(&entity_type) {
            return Err(GraphError::DuplicateDescriptor { entity_type });
        }
        self.descriptors.insert(entity_type, descriptor);
        Ok(())
    }

    /// Looks up the descriptor for a type.
    #[must_use]
    pub fn descriptor(&self, entity_type: EntityType) -> Option<&TypeDescriptor> {
        self.descriptors.get(&entity_type)
    }

    /// Returns true if the type can be exported.
    #[must_use]
    pub fn is_exportable(&self, entity_type: EntityType) -> bool {
        self.descriptors.contains_key(&entity_type)
    }

    /// Extracts the direct dependencies of a snapshot.
    ///
    /// Types without a descriptor have none.
    #[must_use]
    pub fn dependencies(&self, snapshot: &EntitySnapshot) -> Vec<EntityRef> {
        self.descriptor(snapshot.entity.entity_type)
            .map(|d| d.dependencies(snapshot))
            .unwrap_or_default()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}
