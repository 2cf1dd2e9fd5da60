//! Monger - object-document mapping core
//!
//! This crate maps typed records onto a document store through:
//! - Declared field schemas with tag-driven storage names and relationships
//! - A memoized type metadata registry
//! - Populate paths compiled into correlated lookup pipelines
//! - Create/update lifecycle hooks and `$set` payload shaping
//!
//! Execution is delegated to a [`driver::Driver`].

pub mod config;
pub mod driver;
pub mod errors;
pub mod lifecycle;
pub mod model;
pub mod query_compiler;
pub mod schema;

pub use config::{ConfigError, OdmConfig};
pub use driver::{Document, Driver, DriverError};
pub use errors::OdmError;
pub use lifecycle::{Lifecycle, UpdatePayload};
pub use model::{Cardinality, Connection, Model, Query, ResultSet};
pub use schema::{Fields, Record, RecordBase, RecordId, Registry, Schema};
