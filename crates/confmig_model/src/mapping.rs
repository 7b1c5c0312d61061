//! Mapping directives and outcomes.
//!
//! A [`Mapping`] is the per-entity resolution record of a bundle: the
//! operator-chosen strategy going in, the engine-recorded outcome coming
//! out. Mappings live exactly one export → (optional edit) → import round
//! trip and are never persisted.

use crate::entity::{EntityId, EntityKey, EntityRef, EntityType};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Operator-chosen resolution strategy for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingAction {
    /// Reuse an existing target if one matches, otherwise create it.
    NewOrExisting,
    /// Update an existing target in place if one matches, otherwise create it.
    NewOrUpdate,
    /// Always create a fresh entity, ignoring any existing match.
    AlwaysCreateNew,
    /// Delete the matching target entity.
    Delete,
    /// Leave the target untouched.
    Ignore,
}

impl fmt::Display for MappingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MappingAction::NewOrExisting => "new_or_existing",
            MappingAction::NewOrUpdate => "new_or_update",
            MappingAction::AlwaysCreateNew => "always_create_new",
            MappingAction::Delete => "delete",
            MappingAction::Ignore => "ignore",
        };
        f.write_str(s)
    }
}

/// What the engine actually did for a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppliedAction {
    /// A fresh entity was created on the target.
    CreatedNew,
    /// An existing target entity was reused untouched.
    UsedExisting,
    /// An existing target entity's content was replaced.
    UpdatedExisting,
    /// The target entity was deleted.
    Deleted,
    /// Nothing was done.
    Ignored,
}

/// Why a mapping failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingErrorKind {
    /// `FailOnNew` was set and no existing target matched.
    TargetNotFound,
    /// `FailOnExisting` was set and a target matched.
    TargetExists,
    /// A store-enforced uniqueness constraint blocked a forced creation.
    UniqueKeyConflict,
    /// The mapping request is structurally unsatisfiable.
    InvalidResource,
    /// Ambiguous resolution, or a delete blocked by a live dependent.
    ImproperMapping,
}

impl fmt::Display for MappingErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MappingErrorKind::TargetNotFound => "target not found",
            MappingErrorKind::TargetExists => "target exists",
            MappingErrorKind::UniqueKeyConflict => "unique key conflict",
            MappingErrorKind::InvalidResource => "invalid resource",
            MappingErrorKind::ImproperMapping => "improper mapping",
        };
        f.write_str(s)
    }
}

/// A recorded mapping failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingFailure {
    /// The failure category.
    pub kind: MappingErrorKind,
    /// Human-readable detail.
    pub message: String,
}

impl MappingFailure {
    /// Creates a failure record.
    #[must_use]
    pub fn new(kind: MappingErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// The outcome of resolving one mapping.
///
/// Success and failure are mutually exclusive by construction: a mapping
/// either records exactly one applied action or exactly one failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingOutcome {
    /// The mapping was applied.
    Applied(AppliedAction),
    /// The mapping failed; later mappings may still succeed.
    Failed(MappingFailure),
}

/// Override instructing the engine how to locate the target entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSelector {
    /// Match the target with this primary ID; if absent, create under it.
    ById(EntityId),
    /// Match the target by unique name within the type's scope.
    ByName(String),
    /// Match the target by GUID.
    ByGuid(Uuid),
}

/// Operator overrides attached to a mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingProperties {
    /// Fail with `TargetNotFound` instead of creating a missing target.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fail_on_new: bool,
    /// Fail with `TargetExists` instead of reusing/updating a match.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fail_on_existing: bool,
    /// Resolve the target by this selector instead of the source ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_to: Option<TargetSelector>,
}

impl MappingProperties {
    /// Sets `fail_on_new`.
    #[must_use]
    pub fn fail_on_new(mut self) -> Self {
        self.fail_on_new = true;
        self
    }

    /// Sets `fail_on_existing`.
    #[must_use]
    pub fn fail_on_existing(mut self) -> Self {
        self.fail_on_existing = true;
        self
    }

    /// Sets the target selector.
    #[must_use]
    pub fn map_to(mut self, selector: TargetSelector) -> Self {
        self.map_to = Some(selector);
        self
    }

    /// Returns true if no override is set.
    #[must_use]
    pub fn is_default(&self) -> bool {
        !self.fail_on_new && !self.fail_on_existing && self.map_to.is_none()
    }
}

/// A per-entity resolution directive and outcome record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mapping {
    /// The source entity this mapping is for.
    pub source: EntityRef,
    /// The resolved target ID; pre-set by the operator to force a target,
    /// written by the engine on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<EntityId>,
    /// The resolution strategy.
    pub action: MappingAction,
    /// Operator overrides.
    #[serde(default, skip_serializing_if = "MappingProperties::is_default")]
    pub properties: MappingProperties,
    /// Engine-recorded outcome; `None` until the bundle is applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<MappingOutcome>,
}

impl Mapping {
    /// Creates a mapping with default properties and no outcome.
    #[must_use]
    pub fn new(source: EntityRef, action: MappingAction) -> Self {
        Self {
            source,
            target_id: None,
            action,
            properties: MappingProperties::default(),
            outcome: None,
        }
    }

    /// The entity type this mapping concerns.
    #[must_use]
    pub fn entity_type(&self) -> EntityType {
        self.source.entity_type
    }

    /// The `(type, id)` key of the source entity.
    #[must_use]
    pub fn key(&self) -> EntityKey {
        self.source.key()
    }

    /// Returns true if this mapping is for the well-known root folder.
    #[must_use]
    pub fn is_root_folder(&self) -> bool {
        self.source.is_root_folder()
    }

    /// Records a successful outcome and the resolved target.
    pub fn mark_applied(&mut self, action: AppliedAction, target_id: Option<EntityId>) {
        self.outcome = Some(MappingOutcome::Applied(action));
        if target_id.is_some() {
            self.target_id = target_id;
        }
    }

    /// Records a failure outcome.
    pub fn mark_failed(&mut self, kind: MappingErrorKind, message: impl Into<String>) {
        self.outcome = Some(MappingOutcome::Failed(MappingFailure::new(kind, message)));
    }

    /// The applied action, if the mapping succeeded.
    #[must_use]
    pub fn action_taken(&self) -> Option<AppliedAction> {
        match &self.outcome {
            Some(MappingOutcome::Applied(action)) => Some(*action),
            _ => None,
        }
    }

    /// The failure record, if the mapping failed.
    #[must_use]
    pub fn failure(&self) -> Option<&MappingFailure> {
        match &self.outcome {
            Some(MappingOutcome::Failed(failure)) => Some(failure),
            _ => None,
        }
    }

    /// Returns true if an outcome was recorded and it is a failure.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.failure().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping() -> Mapping {
        Mapping::new(
            EntityRef::new(EntityType::Service, EntityId::new()),
            MappingAction::NewOrExisting,
        )
    }

    #[test]
    fn outcome_exclusivity() {
        let mut m = mapping();
        assert!(m.action_taken().is_none());
        assert!(m.failure().is_none());

        let target = EntityId::new();
        m.mark_applied(AppliedAction::CreatedNew, Some(target));
        assert_eq!(m.action_taken(), Some(AppliedAction::CreatedNew));
        assert!(m.failure().is_none());
        assert_eq!(m.target_id, Some(target));

        m.mark_failed(MappingErrorKind::TargetExists, "already there");
        assert!(m.action_taken().is_none());
        assert_eq!(m.failure().unwrap().kind, MappingErrorKind::TargetExists);
    }

    #[test]
    fn applied_without_target_keeps_preset() {
        let mut m = mapping();
        let preset = EntityId::new();
        m.target_id = Some(preset);
        m.mark_applied(AppliedAction::Ignored, None);
        assert_eq!(m.target_id, Some(preset));
    }

    #[test]
    fn default_properties_are_empty() {
        let props = MappingProperties::default();
        assert!(props.is_default());

        let props = props.fail_on_new();
        assert!(!props.is_default());
        assert!(props.fail_on_new);
    }

    #[test]
    fn properties_selector() {
        let props =
            MappingProperties::default().map_to(TargetSelector::ByName("backend".into()));
        assert_eq!(
            props.map_to,
            Some(TargetSelector::ByName("backend".into()))
        );
    }

    #[test]
    fn root_folder_detection() {
        let m = Mapping::new(EntityRef::root_folder(), MappingAction::NewOrExisting);
        assert!(m.is_root_folder());
        assert!(!mapping().is_root_folder());
    }
}
