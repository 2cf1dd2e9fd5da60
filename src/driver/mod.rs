//! Document store driver contract.
//!
//! The ODM never talks to a database directly. Everything it compiles is
//! handed to a [`Driver`], one call per request; connection handling, wire
//! encoding and execution belong to the implementation. [`memory`] provides
//! an in-process implementation.

pub mod memory;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::query_compiler::SortKey;

/// A stored document or a filter/update/stage document
pub type Document = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DriverError {
    /// No document matched
    #[error("not found")]
    NotFound,

    /// Unique index violation on the given key
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("{0}")]
    Backend(String),
}

/// Modifiers of a `find`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub filter: Document,
    pub projection: Document,
    pub sort: Vec<SortKey>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

impl FindOptions {
    pub fn filter(filter: Document) -> Self {
        FindOptions {
            filter,
            ..Default::default()
        }
    }
}

/// Outcome of a multi-document write
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeInfo {
    pub matched: u64,
    pub updated: u64,
    pub removed: u64,
    pub upserted_id: Option<Value>,
}

pub trait Driver: Send + Sync {
    fn find_all(&self, collection: &str, options: &FindOptions) -> Result<Vec<Document>, DriverError>;

    /// First match, or `DriverError::NotFound`
    fn find_one(&self, collection: &str, options: &FindOptions) -> Result<Document, DriverError> {
        let mut options = options.clone();
        options.limit = Some(1);
        self.find_all(collection, &options)?
            .into_iter()
            .next()
            .ok_or(DriverError::NotFound)
    }

    fn count(&self, collection: &str, filter: &Document) -> Result<u64, DriverError>;

    fn insert(&self, collection: &str, documents: Vec<Document>) -> Result<(), DriverError>;

    /// Update the first match; `DriverError::NotFound` when nothing matched
    fn update(&self, collection: &str, filter: &Document, update: &Document) -> Result<(), DriverError>;

    fn update_all(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
    ) -> Result<ChangeInfo, DriverError>;

    fn upsert(&self, collection: &str, filter: &Document, update: &Document) -> Result<ChangeInfo, DriverError>;

    /// Remove the first match; `DriverError::NotFound` when nothing matched
    fn remove(&self, collection: &str, filter: &Document) -> Result<(), DriverError>;

    fn remove_all(&self, collection: &str, filter: &Document) -> Result<ChangeInfo, DriverError>;

    fn pipeline_all(&self, collection: &str, stages: &[Document]) -> Result<Vec<Document>, DriverError>;

    fn pipeline_one(&self, collection: &str, stages: &[Document]) -> Result<Document, DriverError> {
        self.pipeline_all(collection, stages)?
            .into_iter()
            .next()
            .ok_or(DriverError::NotFound)
    }
}
