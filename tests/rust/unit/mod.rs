//! Unit tests - metadata derivation and pipeline compilation through the
//! public API, no driver involved.

#[path = "../fixtures/mod.rs"]
mod fixtures;

mod registry_tests;
mod tag_tests;
