//! Bundle export.

use crate::error::{ExportError, ExportResult};
use crate::options::{ExportOptions, SecretsMode};
use confmig_crypto::TransitCodec;
use confmig_graph::{ClosureBuilder, Registry};
use confmig_model::{
    Bundle, EntityId, EntityRef, EntitySnapshot, Mapping, MappingAction, SecretBlock,
    WrappedSecret,
};
use confmig_store::EntityStore;
use tracing::{debug, info};

/// Packages ordered entity sets into bundles.
///
/// Export is read-only: it never mutates the source store and can run
/// concurrently with anything.
pub struct Exporter<'a, S: EntityStore + ?Sized> {
    store: &'a S,
    registry: &'a Registry,
}

impl<'a, S: EntityStore + ?Sized> Exporter<'a, S> {
    /// Creates an exporter over a source store and registry.
    pub fn new(store: &'a S, registry: &'a Registry) -> Self {
        Self { store, registry }
    }

    /// Exports the given roots, optionally with their dependency closure.
    ///
    /// Every entity gets a fresh `NewOrExisting` mapping. When
    /// `include_dependencies` is off, each mapping additionally gets
    /// `fail_on_new`: the bundle declares that its dependencies already
    /// exist on the target. The well-known root folder gets a mapping but
    /// never a reference snapshot.
    pub fn export(&self, roots: &[EntityRef], options: &ExportOptions) -> ExportResult<Bundle> {
        let builder = ClosureBuilder::new(self.store, self.registry);
        let ordered = builder.build(roots, options.include_dependencies)?;

        let codec = match &options.secrets {
            SecretsMode::Encrypted(passphrase) => Some(TransitCodec::new(passphrase.clone())),
            _ => None,
        };

        let mut bundle = Bundle::new();
        for entity in ordered {
            let mut mapping = Mapping::new(entity.clone(), MappingAction::NewOrExisting);
            if !options.include_dependencies {
                mapping.properties.fail_on_new = true;
            }

            if entity.is_root_folder() {
                bundle.mappings.push(mapping);
                continue;
            }

            let snapshot = self
                .store
                .get(entity.entity_type, entity.id)?
                .ok_or_else(|| ExportError::entity_vanished(entity.to_string()))?;
            let snapshot = self.seal_secret(snapshot, options, codec.as_ref())?;

            bundle.references.push(snapshot);
            bundle.mappings.push(mapping);
        }

        bundle.validate()?;
        info!(
            references = bundle.references.len(),
            mappings = bundle.mappings.len(),
            "bundle exported"
        );
        Ok(bundle)
    }

    /// Exports every exportable entity in the store.
    pub fn export_all(&self, options: &ExportOptions) -> ExportResult<Bundle> {
        let builder = ClosureBuilder::new(self.store, self.registry);
        let roots = builder.all_roots()?;
        debug!(roots = roots.len(), "export-everything root set");
        self.export(&roots, options)
    }

    /// Exports a folder subtree: the folder, its descendants, and everything
    /// residing in them.
    pub fn export_folder(&self, folder: EntityId, options: &ExportOptions) -> ExportResult<Bundle> {
        let builder = ClosureBuilder::new(self.store, self.registry);
        let roots = builder.subtree_roots(folder)?;
        debug!(folder = %folder, roots = roots.len(), "folder subtree root set");
        self.export(&roots, options)
    }

    /// Applies the secret transit mode to one snapshot.
    fn seal_secret(
        &self,
        mut snapshot: EntitySnapshot,
        options: &ExportOptions,
        codec: Option<&TransitCodec>,
    ) -> ExportResult<EntitySnapshot> {
        match (&options.secrets, snapshot.secret.take()) {
            (_, None) => {}
            (SecretsMode::Omit, Some(_)) => {}
            (SecretsMode::Plain, Some(block)) => snapshot.secret = Some(block),
            (SecretsMode::Encrypted(_), Some(SecretBlock::Plain(material))) => {
                let codec = codec.expect("codec present in encrypting mode");
                let envelope = codec.wrap(&material.bytes)?;
                snapshot.secret = Some(SecretBlock::Encrypted(WrappedSecret {
                    kind: material.kind,
                    ciphertext: envelope.ciphertext,
                    wrapped_key: envelope.wrapped_key,
                }));
            }
            // Already wrapped by an earlier hop; pass through untouched.
            (SecretsMode::Encrypted(_), Some(block @ SecretBlock::Encrypted(_))) => {
                snapshot.secret = Some(block);
            }
        }
        Ok(snapshot)
    }
}
