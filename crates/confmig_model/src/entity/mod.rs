//! Entity identity, references and snapshots.

mod id;
mod reference;
mod snapshot;

pub use id::EntityId;
pub use reference::{EntityKey, EntityRef, EntityType};
pub use snapshot::{
    EntityLink, EntitySnapshot, SecretBlock, SecretKind, SecretMaterial, WrappedSecret,
};
