//! Inspect command.

use confmig_model::Bundle;
use std::path::Path;

/// Runs the inspect command.
pub fn run(bundle_path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let bundle = Bundle::decode(&std::fs::read(bundle_path)?)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&bundle)?);
        }
        _ => {
            println!(
                "Bundle: {} reference(s), {} mapping(s)",
                bundle.references.len(),
                bundle.mappings.len()
            );
            if bundle.has_encrypted_secrets() {
                println!("Secrets: encrypted for transit");
            }
            println!();
            for (index, mapping) in bundle.mappings.iter().enumerate() {
                let snapshot = bundle.snapshot(mapping.key());
                println!(
                    "{index:>3}. {:<40} action={} content={}",
                    mapping.source.to_string(),
                    mapping.action,
                    if snapshot.is_some() { "yes" } else { "no" },
                );
                if !mapping.properties.is_default() {
                    println!("     overrides: {:?}", mapping.properties);
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use confmig_engine::{ExportOptions, Exporter};
    use confmig_graph::Registry;
    use confmig_testkit::sample_gateway;

    #[test]
    fn inspect_formats_do_not_error() {
        let sample = sample_gateway();
        let registry = Registry::standard();
        let bundle = Exporter::new(&*sample.store, &registry)
            .export_all(&ExportOptions::new())
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.cbor");
        std::fs::write(&path, bundle.encode().unwrap()).unwrap();

        run(&path, "text").unwrap();
        run(&path, "json").unwrap();
    }
}
