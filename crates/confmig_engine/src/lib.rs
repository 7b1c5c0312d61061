//! # confmig engine
//!
//! Bundle exporter and mapping resolution engine.
//!
//! This crate provides:
//! - [`Exporter`] - packages an ordered entity set into a [`Bundle`],
//!   optionally wrapping embedded secrets for transit
//! - [`Importer`] - consumes a bundle and resolves each mapping against the
//!   target store: create, reuse, update, delete or skip
//!
//! ## Key invariants
//!
//! - A bundle's mappings are processed strictly in array order; dependencies
//!   were exported before their dependents and forward-reference rewriting
//!   relies on that. The engine never reorders or parallelizes one apply.
//! - Each mapping's effect commits independently. A failed mapping never
//!   aborts its siblings and earlier side effects are not rolled back; the
//!   report carries the aggregate conflict signal and re-applying a corrected
//!   bundle converges.
//! - Export is read-only and side-effect-free.
//!
//! [`Bundle`]: confmig_model::Bundle

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod export;
mod import;
mod options;
mod report;
mod session;

pub use error::{ExportError, ExportResult, ImportError, ImportResult};
pub use export::Exporter;
pub use import::Importer;
pub use options::{ExportOptions, ImportOptions, SecretsMode};
pub use report::ImportReport;
