//! Import outcome report.

use confmig_model::{AppliedAction, EntityKey, Mapping, MappingErrorKind};

/// The outcome of one apply call: the input mappings with outcomes recorded,
/// in input order.
///
/// The report is the aggregate conflict signal: the overall call "succeeds"
/// only if no mapping failed, but earlier successful side effects are
/// committed either way. Callers inspect per-mapping failures, correct the
/// offending mappings and re-apply; entities created by the first attempt
/// resolve as existing on the retry.
#[derive(Debug, Clone)]
pub struct ImportReport {
    /// The processed mappings, outcomes populated.
    pub mappings: Vec<Mapping>,
    /// Whether this report came from a dry run.
    pub dry_run: bool,
}

impl ImportReport {
    pub(crate) fn new(mappings: Vec<Mapping>, dry_run: bool) -> Self {
        Self { mappings, dry_run }
    }

    /// Returns true if any mapping failed.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.mappings.iter().any(Mapping::is_failed)
    }

    /// Returns the failed mappings.
    pub fn failures(&self) -> impl Iterator<Item = &Mapping> {
        self.mappings.iter().filter(|m| m.is_failed())
    }

    /// Looks up the outcome for a source entity.
    #[must_use]
    pub fn outcome_of(&self, key: EntityKey) -> Option<&Mapping> {
        self.mappings.iter().find(|m| m.key() == key)
    }

    /// Counts mappings that resolved to the given action.
    #[must_use]
    pub fn count(&self, action: AppliedAction) -> usize {
        self.mappings
            .iter()
            .filter(|m| m.action_taken() == Some(action))
            .count()
    }

    /// Counts failures of the given kind.
    #[must_use]
    pub fn count_failures(&self, kind: MappingErrorKind) -> usize {
        self.mappings
            .iter()
            .filter(|m| m.failure().is_some_and(|f| f.kind == kind))
            .count()
    }

    /// One-line summary for logs and CLI output.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} mappings: {} created, {} existing, {} updated, {} deleted, {} ignored, {} failed{}",
            self.mappings.len(),
            self.count(AppliedAction::CreatedNew),
            self.count(AppliedAction::UsedExisting),
            self.count(AppliedAction::UpdatedExisting),
            self.count(AppliedAction::Deleted),
            self.count(AppliedAction::Ignored),
            self.failures().count(),
            if self.dry_run { " (dry run)" } else { "" },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confmig_model::{EntityId, EntityRef, EntityType, MappingAction};

    fn mapping(applied: Option<AppliedAction>) -> Mapping {
        let mut m = Mapping::new(
            EntityRef::new(EntityType::Service, EntityId::new()),
            MappingAction::NewOrExisting,
        );
        if let Some(action) = applied {
            m.mark_applied(action, Some(EntityId::new()));
        } else {
            m.mark_failed(MappingErrorKind::TargetExists, "boom");
        }
        m
    }

    #[test]
    fn counts_and_errors() {
        let report = ImportReport::new(
            vec![
                mapping(Some(AppliedAction::CreatedNew)),
                mapping(Some(AppliedAction::CreatedNew)),
                mapping(Some(AppliedAction::UsedExisting)),
                mapping(None),
            ],
            false,
        );

        assert!(report.has_errors());
        assert_eq!(report.count(AppliedAction::CreatedNew), 2);
        assert_eq!(report.count(AppliedAction::UsedExisting), 1);
        assert_eq!(report.count_failures(MappingErrorKind::TargetExists), 1);
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn clean_report_has_no_errors() {
        let report = ImportReport::new(vec![mapping(Some(AppliedAction::Ignored))], true);
        assert!(!report.has_errors());
        assert!(report.summary().contains("dry run"));
    }
}
