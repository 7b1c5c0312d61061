//! Export command.

use crate::commands::{load_store, parse_root};
use confmig_crypto::Passphrase;
use confmig_engine::{ExportOptions, Exporter};
use confmig_graph::Registry;
use confmig_model::EntityId;
use confmig_store::EntityStore;
use std::path::Path;
use tracing::info;

/// Runs the export command.
#[allow(clippy::too_many_arguments)]
pub fn run(
    store_path: &Path,
    out_path: &Path,
    roots: &[String],
    folder: Option<&str>,
    no_dependencies: bool,
    omit_secrets: bool,
    passphrase: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Exporting bundle from {:?}", store_path);

    let store = load_store(store_path)?;
    let registry = Registry::standard();
    let exporter = Exporter::new(&store, &registry);

    let mut options = ExportOptions::new();
    if no_dependencies {
        options = options.without_dependencies();
    }
    if omit_secrets {
        options = options.omit_secrets();
    }
    if let Some(passphrase) = passphrase {
        options = options.encrypt_secrets(Passphrase::new(passphrase));
    }

    let bundle = if let Some(folder) = folder {
        // folders are addressable by absolute path as well as by id
        let folder_id = if folder.starts_with('/') {
            store
                .find_folder_by_path(folder)?
                .ok_or_else(|| format!("no folder at path {folder:?}"))?
                .id
        } else {
            EntityId::parse(folder).ok_or_else(|| format!("invalid folder id {folder:?}"))?
        };
        exporter.export_folder(folder_id, &options)?
    } else if roots.is_empty() {
        exporter.export_all(&options)?
    } else {
        let roots: Vec<_> = roots
            .iter()
            .map(|arg| parse_root(arg))
            .collect::<Result<_, _>>()?;
        exporter.export(&roots, &options)?
    };

    std::fs::write(out_path, bundle.encode()?)?;
    println!(
        "Exported {} reference(s), {} mapping(s) to {}",
        bundle.references.len(),
        bundle.mappings.len(),
        out_path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::save_store;
    use confmig_model::Bundle;
    use confmig_testkit::sample_gateway;

    #[test]
    fn export_everything_to_file() {
        let sample = sample_gateway();
        let dir = tempfile::tempdir().unwrap();
        let store_path = dir.path().join("store.json");
        let out_path = dir.path().join("bundle.cbor");
        save_store(&store_path, &sample.store.store).unwrap();

        run(&store_path, &out_path, &[], None, false, false, None).unwrap();

        let bundle = Bundle::decode(&std::fs::read(&out_path).unwrap()).unwrap();
        assert!(bundle.mappings.len() > bundle.references.len());
    }

    #[test]
    fn export_folder_subtree_by_path() {
        let sample = sample_gateway();
        let dir = tempfile::tempdir().unwrap();
        let store_path = dir.path().join("store.json");
        let out_path = dir.path().join("bundle.cbor");
        save_store(&store_path, &sample.store.store).unwrap();

        run(
            &store_path,
            &out_path,
            &[],
            Some("/FolderA"),
            false,
            false,
            None,
        )
        .unwrap();

        let bundle = Bundle::decode(&std::fs::read(&out_path).unwrap()).unwrap();
        // root folder, FolderA, ServiceA, alias
        assert_eq!(bundle.mappings.len(), 4);
    }

    #[test]
    fn export_single_root_without_dependencies() {
        let sample = sample_gateway();
        let dir = tempfile::tempdir().unwrap();
        let store_path = dir.path().join("store.json");
        let out_path = dir.path().join("bundle.cbor");
        save_store(&store_path, &sample.store.store).unwrap();

        let root = format!("policy:{}", sample.policy.id);
        run(&store_path, &out_path, &[root], None, true, false, None).unwrap();

        let bundle = Bundle::decode(&std::fs::read(&out_path).unwrap()).unwrap();
        assert_eq!(bundle.mappings.len(), 1);
        assert!(bundle.mappings[0].properties.fail_on_new);
    }
}
