//! Integration tests - Connection, Model and Query end to end against the
//! in-memory driver.

#[path = "../fixtures/mod.rs"]
mod fixtures;

mod model_tests;
mod populate_tests;
mod soft_delete_tests;
