//! # confmig testkit
//!
//! Test fixtures and property-test generators for the confmig workspace.
//!
//! Provides a [`TestStore`] with one-liner entity builders, a canonical
//! [`sample_gateway`] population, and proptest strategies for secret
//! material and randomized folder trees.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod fixtures;
mod generators;

pub use fixtures::{sample_gateway, with_store, SampleGateway, TestStore};
pub use generators::{arb_passphrase, arb_secret_bytes, arb_tree_spec, build_tree_store, TreeSpec};
