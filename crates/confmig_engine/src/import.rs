//! Mapping resolution: the import side.

use crate::error::ImportResult;
use crate::options::ImportOptions;
use crate::report::ImportReport;
use crate::session::TargetSession;
use confmig_crypto::{TransitCodec, TransitEnvelope};
use confmig_graph::{NameScope, Registry};
use confmig_model::{
    AppliedAction, Bundle, EntityId, EntityKey, EntityRef, EntitySnapshot, EntityType, Mapping,
    MappingAction, MappingErrorKind, MappingFailure, SecretBlock, SecretMaterial, TargetSelector,
};
use confmig_store::{EntityStore, StoreError};
use std::collections::HashMap;
use tracing::{info, trace, warn};
use uuid::Uuid;

type StepResult = Result<(AppliedAction, Option<EntityId>), MappingFailure>;

/// Resolves bundles against a target store.
///
/// One apply call walks the mapping array strictly in order: the exporter
/// guaranteed dependencies-before-dependents, and forward-reference
/// rewriting depends on earlier mappings having already resolved. Each
/// mapping's effect commits independently; failures are recorded in the
/// report and never abort siblings, and earlier side effects stay committed.
pub struct Importer<'a, S: EntityStore + ?Sized> {
    store: &'a S,
    registry: &'a Registry,
}

impl<'a, S: EntityStore + ?Sized> Importer<'a, S> {
    /// Creates an importer over a target store and registry.
    pub fn new(store: &'a S, registry: &'a Registry) -> Self {
        Self { store, registry }
    }

    /// Applies a bundle and returns one outcome per mapping, in input order.
    ///
    /// # Errors
    ///
    /// Only structural bundle problems abort before processing; everything
    /// else is a per-mapping outcome.
    pub fn apply(&self, bundle: &Bundle, options: &ImportOptions) -> ImportResult<ImportReport> {
        bundle.validate()?;
        info!(
            mappings = bundle.mappings.len(),
            dry_run = options.dry_run,
            "applying bundle"
        );

        let mut mappings = bundle.mappings.clone();
        if let Some(action) = options.default_action {
            for mapping in &mut mappings {
                // The root folder always exists on any target; it never
                // follows an action override.
                if !mapping.is_root_folder() {
                    mapping.action = action;
                }
            }
        }

        let codec = options.passphrase.clone().map(TransitCodec::new);
        let mut session = TargetSession::new(self.store, options.dry_run);
        let mut resolved: HashMap<EntityKey, EntityId> = HashMap::new();

        let mut steps: Vec<StepResult> = Vec::with_capacity(mappings.len());
        for index in 0..mappings.len() {
            let mapping = &mappings[index];
            trace!(index, source = %mapping.source, action = %mapping.action, "processing mapping");
            let step = self.process(
                mapping,
                index,
                &mappings,
                bundle,
                &mut session,
                &mut resolved,
                codec.as_ref(),
            );
            if let Err(failure) = &step {
                warn!(source = %mapping.source, kind = %failure.kind, detail = %failure.message, "mapping failed");
            }
            steps.push(step);
        }

        for (mapping, step) in mappings.iter_mut().zip(steps) {
            match step {
                Ok((action, target)) => mapping.mark_applied(action, target),
                Err(failure) => mapping.mark_failed(failure.kind, failure.message),
            }
        }

        let report = ImportReport::new(mappings, options.dry_run);
        info!("{}", report.summary());
        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    fn process(
        &self,
        mapping: &Mapping,
        index: usize,
        mappings: &[Mapping],
        bundle: &Bundle,
        session: &mut TargetSession<'_, S>,
        resolved: &mut HashMap<EntityKey, EntityId>,
        codec: Option<&TransitCodec>,
    ) -> StepResult {
        if mapping.is_root_folder() {
            return match mapping.action {
                MappingAction::Delete => Err(fail(
                    MappingErrorKind::ImproperMapping,
                    "the root folder cannot be deleted",
                )),
                MappingAction::Ignore => Ok((AppliedAction::Ignored, None)),
                _ => Ok((AppliedAction::UsedExisting, Some(EntityId::ROOT_FOLDER))),
            };
        }
        if mapping.action == MappingAction::Ignore {
            return Ok((AppliedAction::Ignored, None));
        }

        let snapshot = bundle.snapshot(mapping.key());
        let candidate = self.locate(mapping, snapshot, session, resolved)?;

        match candidate {
            Some(target) => {
                if mapping.properties.fail_on_existing {
                    return Err(fail(
                        MappingErrorKind::TargetExists,
                        format!("fail on existing specified and target {target} exists"),
                    ));
                }
                match mapping.action {
                    MappingAction::NewOrExisting => {
                        self.check_guid_conflict(mapping, snapshot, Some(&target), session)?;
                        resolved.insert(mapping.key(), target.id);
                        Ok((AppliedAction::UsedExisting, Some(target.id)))
                    }
                    MappingAction::NewOrUpdate => {
                        self.check_guid_conflict(mapping, snapshot, Some(&target), session)?;
                        let content =
                            prepare_content(mapping, snapshot, target.id, resolved, codec)?;
                        session
                            .update(mapping.entity_type(), target.id, &content)
                            .map_err(classify)?;
                        resolved.insert(mapping.key(), target.id);
                        Ok((AppliedAction::UpdatedExisting, Some(target.id)))
                    }
                    MappingAction::AlwaysCreateNew => {
                        // A fresh copy beside the match: new primary ID, and a
                        // new GUID when the bundle's would collide.
                        let create_id = EntityId::new();
                        let mut content =
                            prepare_content(mapping, snapshot, create_id, resolved, codec)?;
                        self.reset_colliding_guid(&mut content, session)?;
                        session.create(&content).map_err(classify)?;
                        resolved.insert(mapping.key(), create_id);
                        Ok((AppliedAction::CreatedNew, Some(create_id)))
                    }
                    MappingAction::Delete => {
                        self.delete(mapping, index, mappings, bundle, &target, session)
                    }
                    MappingAction::Ignore => Ok((AppliedAction::Ignored, None)),
                }
            }
            None => {
                if mapping.properties.fail_on_new {
                    return Err(fail(
                        MappingErrorKind::TargetNotFound,
                        "fail on new specified and could not locate an existing target",
                    ));
                }
                match mapping.action {
                    MappingAction::NewOrExisting
                    | MappingAction::NewOrUpdate
                    | MappingAction::AlwaysCreateNew => {
                        if mapping.action != MappingAction::AlwaysCreateNew {
                            self.check_guid_conflict(mapping, snapshot, None, session)?;
                        }
                        let create_id = forced_create_id(mapping);
                        let mut content =
                            prepare_content(mapping, snapshot, create_id, resolved, codec)?;
                        if mapping.action == MappingAction::AlwaysCreateNew {
                            self.reset_colliding_guid(&mut content, session)?;
                        }
                        session.create(&content).map_err(classify)?;
                        resolved.insert(mapping.key(), create_id);
                        Ok((AppliedAction::CreatedNew, Some(create_id)))
                    }
                    // Delete of an absent entity is not an error.
                    MappingAction::Delete | MappingAction::Ignore => {
                        Ok((AppliedAction::Ignored, None))
                    }
                }
            }
        }
    }

    /// Resolves the target candidate for a mapping.
    ///
    /// Precedence: explicit `target_id`, then the MapBy selector, then the
    /// source ID (identity passthrough).
    fn locate(
        &self,
        mapping: &Mapping,
        snapshot: Option<&EntitySnapshot>,
        session: &TargetSession<'_, S>,
        resolved: &HashMap<EntityKey, EntityId>,
    ) -> Result<Option<EntityRef>, MappingFailure> {
        let entity_type = mapping.entity_type();
        if let Some(target_id) = mapping.target_id {
            let found = session.get(entity_type, target_id).map_err(classify)?;
            return Ok(found.map(|s| s.entity));
        }
        match &mapping.properties.map_to {
            None => {
                let found = session
                    .get(entity_type, mapping.source.id)
                    .map_err(classify)?;
                Ok(found.map(|s| s.entity))
            }
            Some(TargetSelector::ById(id)) => {
                let found = session.get(entity_type, *id).map_err(classify)?;
                Ok(found.map(|s| s.entity))
            }
            Some(TargetSelector::ByName(name)) => {
                let container = self.name_container(mapping, snapshot, resolved);
                let mut matches = session
                    .find_by_name(entity_type, container, name)
                    .map_err(classify)?;
                if matches.len() > 1 {
                    return Err(fail(
                        MappingErrorKind::ImproperMapping,
                        format!("name {name:?} resolves to {} candidates", matches.len()),
                    ));
                }
                Ok(matches.pop())
            }
            Some(TargetSelector::ByGuid(guid)) => {
                let has_guid = self
                    .registry
                    .descriptor(entity_type)
                    .is_some_and(|d| d.has_guid);
                if !has_guid {
                    return Err(fail(
                        MappingErrorKind::ImproperMapping,
                        format!("{entity_type} cannot be mapped by guid"),
                    ));
                }
                session.find_by_guid(entity_type, *guid).map_err(classify)
            }
        }
    }

    /// Scope for a by-name lookup: the resolved target folder for
    /// folder-scoped names, the whole type otherwise.
    fn name_container(
        &self,
        mapping: &Mapping,
        snapshot: Option<&EntitySnapshot>,
        resolved: &HashMap<EntityKey, EntityId>,
    ) -> Option<EntityId> {
        let scope = self
            .registry
            .descriptor(mapping.entity_type())
            .map(|d| d.name_scope)?;
        if scope != NameScope::InFolder {
            return None;
        }
        let folder = snapshot?.folder?;
        Some(
            resolved
                .get(&(EntityType::Folder, folder))
                .copied()
                .unwrap_or(folder),
        )
    }

    /// A GUID collision under a *different* primary ID is a conflict to
    /// surface, never something to silently resolve.
    fn check_guid_conflict(
        &self,
        mapping: &Mapping,
        snapshot: Option<&EntitySnapshot>,
        candidate: Option<&EntityRef>,
        session: &TargetSession<'_, S>,
    ) -> Result<(), MappingFailure> {
        let entity_type = mapping.entity_type();
        let has_guid = self
            .registry
            .descriptor(entity_type)
            .is_some_and(|d| d.has_guid);
        if !has_guid {
            return Ok(());
        }
        let Some(guid) = snapshot.and_then(|s| s.entity.guid) else {
            return Ok(());
        };
        let existing = session.find_by_guid(entity_type, guid).map_err(classify)?;
        match (existing, candidate) {
            (Some(holder), Some(target)) if holder.id != target.id => Err(fail(
                MappingErrorKind::InvalidResource,
                format!("guid {guid} already exists under a different id ({})", holder.id),
            )),
            (Some(holder), None) => Err(fail(
                MappingErrorKind::InvalidResource,
                format!("guid {guid} already exists under id {}", holder.id),
            )),
            _ => Ok(()),
        }
    }

    /// Gives the content a fresh GUID when its GUID is already taken on the
    /// target (a fresh copy must not duplicate a global identifier).
    fn reset_colliding_guid(
        &self,
        content: &mut EntitySnapshot,
        session: &TargetSession<'_, S>,
    ) -> Result<(), MappingFailure> {
        let Some(guid) = content.entity.guid else {
            return Ok(());
        };
        let taken = session
            .find_by_guid(content.entity.entity_type, guid)
            .map_err(classify)?
            .is_some();
        if taken {
            content.entity.guid = Some(Uuid::new_v4());
        }
        Ok(())
    }

    /// Deletes a resolved target, guarding against live dependents and
    /// cascading away auto-created roles.
    fn delete(
        &self,
        mapping: &Mapping,
        index: usize,
        mappings: &[Mapping],
        bundle: &Bundle,
        target: &EntityRef,
        session: &mut TargetSession<'_, S>,
    ) -> StepResult {
        let entity_type = mapping.entity_type();
        let mut blockers = session
            .list_dependents(entity_type, target.id)
            .map_err(classify)?;

        // Mappings later in this bundle that will leave the entity referenced.
        for other in &mappings[index + 1..] {
            if matches!(other.action, MappingAction::Delete | MappingAction::Ignore) {
                continue;
            }
            let Some(snapshot) = bundle.snapshot(other.key()) else {
                continue;
            };
            if snapshot.references(mapping.key()) || snapshot.references((entity_type, target.id)) {
                blockers.push(other.source.clone());
            }
        }

        if !blockers.is_empty() {
            return Err(fail(
                MappingErrorKind::ImproperMapping,
                format!(
                    "cannot delete {target}: {} live dependent(s), e.g. {}",
                    blockers.len(),
                    blockers[0]
                ),
            ));
        }

        for role in session
            .list_auto_roles(entity_type, target.id)
            .map_err(classify)?
        {
            session.delete(EntityType::Role, role.id).map_err(classify)?;
        }
        session.delete(entity_type, target.id).map_err(classify)?;
        Ok((AppliedAction::Deleted, Some(target.id)))
    }
}

/// The ID a missing target is created under: an explicit pin wins, then the
/// source ID (identity passthrough).
fn forced_create_id(mapping: &Mapping) -> EntityId {
    if let Some(target_id) = mapping.target_id {
        return target_id;
    }
    if let Some(TargetSelector::ById(id)) = mapping.properties.map_to {
        return id;
    }
    mapping.source.id
}

/// Builds the snapshot to write: target ID applied, forward references
/// rewritten to already-resolved targets, transit secrets unwrapped.
fn prepare_content(
    mapping: &Mapping,
    snapshot: Option<&EntitySnapshot>,
    target_id: EntityId,
    resolved: &HashMap<EntityKey, EntityId>,
    codec: Option<&TransitCodec>,
) -> Result<EntitySnapshot, MappingFailure> {
    let Some(snapshot) = snapshot else {
        return Err(fail(
            MappingErrorKind::ImproperMapping,
            format!("bundle carries no content for {}", mapping.source),
        ));
    };
    let mut content = snapshot.clone();
    content.entity.id = target_id;
    content.rewrite_references(resolved);

    content.secret = match content.secret.take() {
        Some(SecretBlock::Encrypted(wrapped)) => {
            let Some(codec) = codec else {
                return Err(fail(
                    MappingErrorKind::InvalidResource,
                    "bundle secret is encrypted and no passphrase was supplied",
                ));
            };
            let envelope = TransitEnvelope {
                ciphertext: wrapped.ciphertext,
                wrapped_key: wrapped.wrapped_key,
            };
            let bytes = codec.unwrap(&envelope).map_err(|e| {
                fail(
                    MappingErrorKind::InvalidResource,
                    format!("cannot unwrap secret: {e}"),
                )
            })?;
            Some(SecretBlock::Plain(SecretMaterial::new(wrapped.kind, bytes)))
        }
        other => other,
    };
    Ok(content)
}

fn fail(kind: MappingErrorKind, message: impl Into<String>) -> MappingFailure {
    MappingFailure::new(kind, message)
}

/// Maps store refusals onto the mapping error taxonomy.
fn classify(error: StoreError) -> MappingFailure {
    let kind = match &error {
        StoreError::UniqueNameConflict { .. } | StoreError::AlreadyExists { .. } => {
            MappingErrorKind::UniqueKeyConflict
        }
        StoreError::DependentsExist { .. } | StoreError::RootFolderImmutable => {
            MappingErrorKind::ImproperMapping
        }
        StoreError::NotFound { .. } => MappingErrorKind::TargetNotFound,
        StoreError::InvalidSnapshot { .. } => MappingErrorKind::InvalidResource,
    };
    MappingFailure::new(kind, error.to_string())
}
