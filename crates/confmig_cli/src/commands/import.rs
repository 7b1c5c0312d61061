//! Import command.

use crate::commands::load_store;
use confmig_crypto::Passphrase;
use confmig_engine::{ImportOptions, Importer};
use confmig_graph::Registry;
use confmig_model::{Bundle, MappingAction, MappingOutcome};
use std::path::Path;
use tracing::info;

fn parse_action(tag: &str) -> Result<MappingAction, String> {
    match tag {
        "new-or-existing" => Ok(MappingAction::NewOrExisting),
        "new-or-update" => Ok(MappingAction::NewOrUpdate),
        "always-create-new" => Ok(MappingAction::AlwaysCreateNew),
        "delete" => Ok(MappingAction::Delete),
        "ignore" => Ok(MappingAction::Ignore),
        other => Err(format!("unknown action {other:?}")),
    }
}

/// Runs the import command.
pub fn run(
    store_path: &Path,
    bundle_path: &Path,
    dry_run: bool,
    passphrase: Option<&str>,
    default_action: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Importing {:?} into {:?}", bundle_path, store_path);

    let store = load_store(store_path)?;
    let bundle = Bundle::decode(&std::fs::read(bundle_path)?)?;

    let mut options = ImportOptions::new();
    if dry_run {
        options = options.dry_run();
    }
    if let Some(passphrase) = passphrase {
        options = options.with_passphrase(Passphrase::new(passphrase));
    }
    if let Some(action) = default_action {
        options = options.with_default_action(parse_action(action)?);
    }

    let registry = Registry::standard();
    let report = Importer::new(&store, &registry).apply(&bundle, &options)?;

    for mapping in &report.mappings {
        match &mapping.outcome {
            Some(MappingOutcome::Applied(action)) => {
                println!("  {:<40} {:?}", mapping.source.to_string(), action);
            }
            Some(MappingOutcome::Failed(failure)) => {
                println!(
                    "  {:<40} FAILED ({}): {}",
                    mapping.source.to_string(),
                    failure.kind,
                    failure.message
                );
            }
            None => {}
        }
    }
    println!("{}", report.summary());

    if !dry_run {
        crate::commands::save_store(store_path, &store)?;
    }
    if report.has_errors() {
        return Err("bundle import completed with conflicts".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::save_store;
    use confmig_engine::{ExportOptions, Exporter};
    use confmig_model::EntityType;
    use confmig_store::{EntityStore, InMemoryStore};
    use confmig_testkit::sample_gateway;

    #[test]
    fn import_into_empty_store_file() {
        let sample = sample_gateway();
        let registry = Registry::standard();
        let bundle = Exporter::new(&*sample.store, &registry)
            .export_all(&ExportOptions::new())
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let bundle_path = dir.path().join("bundle.cbor");
        std::fs::write(&bundle_path, bundle.encode().unwrap()).unwrap();
        let store_path = dir.path().join("target.json");
        save_store(&store_path, &InMemoryStore::new()).unwrap();

        run(&store_path, &bundle_path, false, None, None).unwrap();

        let target = load_store(&store_path).unwrap();
        assert!(target
            .get(EntityType::Service, sample.service_a.id)
            .unwrap()
            .is_some());
    }

    #[test]
    fn dry_run_leaves_store_file_untouched() {
        let sample = sample_gateway();
        let registry = Registry::standard();
        let bundle = Exporter::new(&*sample.store, &registry)
            .export_all(&ExportOptions::new())
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let bundle_path = dir.path().join("bundle.cbor");
        std::fs::write(&bundle_path, bundle.encode().unwrap()).unwrap();
        let store_path = dir.path().join("target.json");
        save_store(&store_path, &InMemoryStore::new()).unwrap();
        let before = std::fs::read_to_string(&store_path).unwrap();

        run(&store_path, &bundle_path, true, None, None).unwrap();

        let after = std::fs::read_to_string(&store_path).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn parse_action_tags() {
        assert_eq!(
            parse_action("new-or-update").unwrap(),
            MappingAction::NewOrUpdate
        );
        assert!(parse_action("upsert").is_err());
    }
}
