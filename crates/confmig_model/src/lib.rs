//! # confmig model
//!
//! Shared data model for the confmig migration engine.
//!
//! This crate provides:
//! - Entity identity ([`EntityId`], [`EntityType`], [`EntityRef`])
//! - Entity snapshots with embedded cross-references and secret blocks
//! - Mapping directives and outcomes ([`Mapping`], [`MappingAction`])
//! - The order-significant [`Bundle`] with CBOR encode/decode
//!
//! The model is deliberately free of store and engine logic: a bundle is a
//! value that can cross a process or network boundary, and everything in
//! this crate serializes.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod bundle;
mod entity;
mod error;
mod mapping;

pub use bundle::Bundle;
pub use entity::{
    EntityId, EntityKey, EntityLink, EntityRef, EntitySnapshot, EntityType, SecretKind,
    SecretMaterial, SecretBlock, WrappedSecret,
};
pub use error::{ModelError, ModelResult};
pub use mapping::{
    AppliedAction, Mapping, MappingAction, MappingErrorKind, MappingFailure, MappingOutcome,
    MappingProperties, TargetSelector,
};
