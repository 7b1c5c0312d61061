//! Configuration for export and import calls.

use confmig_crypto::Passphrase;
use confmig_model::MappingAction;

/// How exported secret material travels in the bundle.
#[derive(Debug, Clone)]
pub enum SecretsMode {
    /// Strip secret material from the bundle entirely.
    ///
    /// The target keeps (or later receives) its own key material; importing
    /// such a bundle creates entities without secrets.
    Omit,
    /// Carry secrets in plaintext. Only for a trusted channel.
    Plain,
    /// Encrypt each secret under a passphrase-derived key; plaintext never
    /// appears in the serialized bundle.
    Encrypted(Passphrase),
}

/// Configuration for one export call.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Include the transitive dependency closure of the roots.
    ///
    /// When false, the bundle contains exactly the requested roots and every
    /// mapping gets `fail_on_new`: the operator has declared that the
    /// dependencies already exist on the target.
    pub include_dependencies: bool,
    /// Secret transit mode.
    pub secrets: SecretsMode,
}

impl ExportOptions {
    /// Creates the default options: dependencies included, plaintext secrets.
    #[must_use]
    pub fn new() -> Self {
        Self {
            include_dependencies: true,
            secrets: SecretsMode::Plain,
        }
    }

    /// Exports the roots only, flagging every mapping `fail_on_new`.
    #[must_use]
    pub fn without_dependencies(mut self) -> Self {
        self.include_dependencies = false;
        self
    }

    /// Strips secret material from the bundle.
    #[must_use]
    pub fn omit_secrets(mut self) -> Self {
        self.secrets = SecretsMode::Omit;
        self
    }

    /// Encrypts secret material with the given passphrase.
    #[must_use]
    pub fn encrypt_secrets(mut self, passphrase: Passphrase) -> Self {
        self.secrets = SecretsMode::Encrypted(passphrase);
        self
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for one import call.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Run the whole state machine without mutating the target store.
    ///
    /// The report is the same one a live import would produce.
    pub dry_run: bool,
    /// Passphrase for unwrapping encrypted secrets on arrival.
    pub passphrase: Option<Passphrase>,
    /// Replace every mapping's action before processing.
    ///
    /// The root-folder mapping is exempt; it always resolves as existing.
    pub default_action: Option<MappingAction>,
}

impl ImportOptions {
    /// Creates the default options: live import, no decryption, actions as
    /// carried by the bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates without committing.
    #[must_use]
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Supplies the secret transit passphrase.
    #[must_use]
    pub fn with_passphrase(mut self, passphrase: Passphrase) -> Self {
        self.passphrase = Some(passphrase);
        self
    }

    /// Overrides every non-root mapping's action.
    #[must_use]
    pub fn with_default_action(mut self, action: MappingAction) -> Self {
        self.default_action = Some(action);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_defaults() {
        let options = ExportOptions::new();
        assert!(options.include_dependencies);
        assert!(matches!(options.secrets, SecretsMode::Plain));
    }

    #[test]
    fn export_builders() {
        let options = ExportOptions::new()
            .without_dependencies()
            .encrypt_secrets(Passphrase::new("p"));
        assert!(!options.include_dependencies);
        assert!(matches!(options.secrets, SecretsMode::Encrypted(_)));
    }

    #[test]
    fn import_builders() {
        let options = ImportOptions::new()
            .dry_run()
            .with_default_action(MappingAction::NewOrUpdate);
        assert!(options.dry_run);
        assert_eq!(options.default_action, Some(MappingAction::NewOrUpdate));
        assert!(options.passphrase.is_none());
    }
}
