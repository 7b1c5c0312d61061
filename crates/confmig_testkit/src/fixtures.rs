//! Seeded stores and entity builders for tests.

use confmig_model::{
    EntityId, EntityRef, EntitySnapshot, EntityType, SecretKind, SecretMaterial,
};
use confmig_store::{EntityStore, InMemoryStore};
use uuid::Uuid;

/// An in-memory store with one-liner entity builders.
///
/// Builders panic on store refusal; fixture population is not the thing
/// under test.
pub struct TestStore {
    /// The wrapped store.
    pub store: InMemoryStore,
}

impl TestStore {
    /// Creates a store holding only the root folder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: InMemoryStore::new(),
        }
    }

    /// Adds a folder under a parent.
    pub fn add_folder(&self, name: &str, parent: EntityId) -> EntityRef {
        let entity = EntityRef::new(EntityType::Folder, EntityId::new()).with_name(name);
        self.store
            .create(&EntitySnapshot::new(entity.clone()).in_folder(parent))
            .expect("fixture folder");
        entity
    }

    /// Adds a service in a folder.
    pub fn add_service(&self, name: &str, folder: EntityId) -> EntityRef {
        let entity = EntityRef::new(EntityType::Service, EntityId::new()).with_name(name);
        self.store
            .create(
                &EntitySnapshot::new(entity.clone())
                    .in_folder(folder)
                    .with_attribute("enabled", "true"),
            )
            .expect("fixture service");
        entity
    }

    /// Adds an alias in a folder pointing at a service.
    pub fn add_service_alias(&self, folder: EntityId, target: &EntityRef) -> EntityRef {
        let entity = EntityRef::new(EntityType::ServiceAlias, EntityId::new());
        self.store
            .create(
                &EntitySnapshot::new(entity.clone())
                    .in_folder(folder)
                    .with_link("target", target.clone()),
            )
            .expect("fixture alias");
        entity
    }

    /// Adds a GUID-carrying policy in a folder.
    pub fn add_policy(&self, name: &str, folder: EntityId) -> EntityRef {
        let entity = EntityRef::new(EntityType::Policy, EntityId::new())
            .with_guid(Uuid::new_v4())
            .with_name(name);
        self.store
            .create(
                &EntitySnapshot::new(entity.clone())
                    .in_folder(folder)
                    .with_attribute("xml", format!("<policy name={name:?}/>")),
            )
            .expect("fixture policy");
        entity
    }

    /// Adds a stored password with plaintext secret material.
    pub fn add_stored_password(&self, name: &str, secret: &[u8]) -> EntityRef {
        let entity = EntityRef::new(EntityType::StoredPassword, EntityId::new()).with_name(name);
        self.store
            .create(
                &EntitySnapshot::new(entity.clone())
                    .with_secret(SecretMaterial::new(SecretKind::Password, secret.to_vec())),
            )
            .expect("fixture password");
        entity
    }

    /// Adds a private key entry with PKCS#12 material.
    pub fn add_private_key(&self, alias: &str, material: &[u8]) -> EntityRef {
        let entity = EntityRef::new(EntityType::PrivateKey, EntityId::new()).with_name(alias);
        self.store
            .create(
                &EntitySnapshot::new(entity.clone()).with_secret(SecretMaterial::new(
                    SecretKind::Pkcs12Key,
                    material.to_vec(),
                )),
            )
            .expect("fixture key");
        entity
    }

    /// Adds a connector that references a stored password.
    pub fn add_connector(&self, name: &str, password: &EntityRef) -> EntityRef {
        let entity = EntityRef::new(EntityType::Connector, EntityId::new()).with_name(name);
        self.store
            .create(
                &EntitySnapshot::new(entity.clone())
                    .with_attribute("host", "mq.internal")
                    .with_link("password", password.clone()),
            )
            .expect("fixture connector");
        entity
    }

    /// Adds a user.
    pub fn add_user(&self, login: &str) -> EntityRef {
        let entity = EntityRef::new(EntityType::User, EntityId::new()).with_name(login);
        self.store
            .create(&EntitySnapshot::new(entity.clone()))
            .expect("fixture user");
        entity
    }

    /// Adds a security zone.
    pub fn add_security_zone(&self, name: &str) -> EntityRef {
        let entity = EntityRef::new(EntityType::SecurityZone, EntityId::new()).with_name(name);
        self.store
            .create(&EntitySnapshot::new(entity.clone()))
            .expect("fixture zone");
        entity
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestStore {
    type Target = InMemoryStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// The canonical test population and the references into it.
pub struct SampleGateway {
    /// The populated store.
    pub store: TestStore,
    /// `FolderA` under the root folder.
    pub folder_a: EntityRef,
    /// `ServiceA` in `FolderA`.
    pub service_a: EntityRef,
    /// Alias of `ServiceA`, also in `FolderA`.
    pub alias_a: EntityRef,
    /// A GUID-carrying policy in the root folder.
    pub policy: EntityRef,
    /// A stored password.
    pub password: EntityRef,
    /// A connector referencing the password.
    pub connector: EntityRef,
    /// A private key entry.
    pub key: EntityRef,
}

/// Builds the canonical population: a folder subtree, an alias diamond, a
/// policy, and a connector-password-key secret chain.
#[must_use]
pub fn sample_gateway() -> SampleGateway {
    let store = TestStore::new();
    let folder_a = store.add_folder("FolderA", EntityId::ROOT_FOLDER);
    let service_a = store.add_service("ServiceA", folder_a.id);
    let alias_a = store.add_service_alias(folder_a.id, &service_a);
    let policy = store.add_policy("audit-policy", EntityId::ROOT_FOLDER);
    let password = store.add_stored_password("backend-db", b"hunter2");
    let connector = store.add_connector("mq-main", &password);
    let key = store.add_private_key("ssl", b"\x30\x82pkcs12");
    SampleGateway {
        store,
        folder_a,
        service_a,
        alias_a,
        policy,
        password,
        connector,
        key,
    }
}

/// Runs a test against a fresh seeded store.
pub fn with_store<F, R>(f: F) -> R
where
    F: FnOnce(&TestStore) -> R,
{
    let store = TestStore::new();
    f(&store)
}
