//! In-process [`Driver`] over JSON documents.
//!
//! Supports the filter operators, update operators and pipeline stages the
//! ODM emits, records every call, and can be told to fail the next call of
//! a given operation.

mod aggregate;
mod filter;

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use self::aggregate::Collections;
use super::{ChangeInfo, Document, Driver, DriverError, FindOptions};
use crate::schema::{RecordId, ID_FIELD};

pub use self::filter::{matches, values_equal};

/// One recorded driver call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverCall {
    pub operation: &'static str,
    pub collection: String,
}

#[derive(Debug, Default)]
pub struct MemoryDriver {
    collections: Mutex<Collections>,
    calls: Mutex<Vec<DriverCall>>,
    failures: Mutex<HashMap<&'static str, DriverError>>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        MemoryDriver::default()
    }

    /// Append documents as-is, bypassing duplicate checks
    pub fn seed(&self, collection: &str, documents: Vec<Document>) {
        lock(&self.collections)
            .entry(collection.to_string())
            .or_default()
            .extend(documents);
    }

    /// Snapshot of a collection in insertion order
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        lock(&self.collections)
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<DriverCall> {
        lock(&self.calls).clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    /// Fail the next `operation` call (e.g. `"insert"`) with `error`
    pub fn inject_failure(&self, operation: &'static str, error: DriverError) {
        lock(&self.failures).insert(operation, error);
    }

    fn enter(&self, operation: &'static str, collection: &str) -> Result<(), DriverError> {
        lock(&self.calls).push(DriverCall {
            operation,
            collection: collection.to_string(),
        });
        match lock(&self.failures).remove(operation) {
            Some(error) => {
                log::debug!("MemoryDriver: injected failure on {} {}", operation, collection);
                Err(error)
            }
            None => Ok(()),
        }
    }

    fn matching_positions(documents: &[Document], filter: &Document) -> Result<Vec<usize>, DriverError> {
        let vars = Document::new();
        let mut positions = Vec::new();
        for (position, document) in documents.iter().enumerate() {
            if matches(document, filter, &vars)? {
                positions.push(position);
            }
        }
        Ok(positions)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Driver for MemoryDriver {
    fn find_all(&self, collection: &str, options: &FindOptions) -> Result<Vec<Document>, DriverError> {
        self.enter("find", collection)?;
        let collections = lock(&self.collections);
        let documents = collections.get(collection).map(Vec::as_slice).unwrap_or_default();

        let mut found: Vec<Document> = Self::matching_positions(documents, &options.filter)?
            .into_iter()
            .map(|position| documents[position].clone())
            .collect();
        aggregate::sort(&mut found, &options.sort);

        Ok(found
            .into_iter()
            .skip(options.skip.unwrap_or(0) as usize)
            .take(options.limit.map(|n| n as usize).unwrap_or(usize::MAX))
            .map(|document| aggregate::project(&document, &options.projection))
            .collect())
    }

    fn count(&self, collection: &str, filter: &Document) -> Result<u64, DriverError> {
        self.enter("count", collection)?;
        let collections = lock(&self.collections);
        let documents = collections.get(collection).map(Vec::as_slice).unwrap_or_default();
        Ok(Self::matching_positions(documents, filter)?.len() as u64)
    }

    fn insert(&self, collection: &str, documents: Vec<Document>) -> Result<(), DriverError> {
        self.enter("insert", collection)?;
        let mut collections = lock(&self.collections);
        let stored = collections.entry(collection.to_string()).or_default();

        let mut batch = Vec::with_capacity(documents.len());
        for mut document in documents {
            let id = document
                .entry(ID_FIELD.to_string())
                .or_insert_with(|| Value::String(RecordId::generate().to_string()))
                .clone();
            let taken = stored
                .iter()
                .chain(batch.iter())
                .any(|existing: &Document| existing.get(ID_FIELD).is_some_and(|v| values_equal(v, &id)));
            if taken {
                return Err(DriverError::DuplicateKey(format!("{}: {}", ID_FIELD, id)));
            }
            batch.push(document);
        }

        stored.extend(batch);
        Ok(())
    }

    fn update(&self, collection: &str, filter: &Document, update: &Document) -> Result<(), DriverError> {
        self.enter("update", collection)?;
        let mut collections = lock(&self.collections);
        let documents = collections.entry(collection.to_string()).or_default();

        let position = Self::matching_positions(documents, filter)?
            .into_iter()
            .next()
            .ok_or(DriverError::NotFound)?;
        filter::apply_update(&mut documents[position], update)
    }

    fn update_all(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
    ) -> Result<ChangeInfo, DriverError> {
        self.enter("update_all", collection)?;
        let mut collections = lock(&self.collections);
        let documents = collections.entry(collection.to_string()).or_default();

        let positions = Self::matching_positions(documents, filter)?;
        for &position in &positions {
            filter::apply_update(&mut documents[position], update)?;
        }
        Ok(ChangeInfo {
            matched: positions.len() as u64,
            updated: positions.len() as u64,
            ..Default::default()
        })
    }

    fn upsert(&self, collection: &str, filter: &Document, update: &Document) -> Result<ChangeInfo, DriverError> {
        self.enter("upsert", collection)?;
        let mut collections = lock(&self.collections);
        let documents = collections.entry(collection.to_string()).or_default();

        if let Some(position) = Self::matching_positions(documents, filter)?.into_iter().next() {
            filter::apply_update(&mut documents[position], update)?;
            return Ok(ChangeInfo {
                matched: 1,
                updated: 1,
                ..Default::default()
            });
        }

        // equality terms of the filter seed the new document
        let mut created: Document = filter
            .iter()
            .filter(|(key, value)| !key.starts_with('$') && !value.is_object())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        filter::apply_update(&mut created, update)?;
        let id = created
            .entry(ID_FIELD.to_string())
            .or_insert_with(|| Value::String(RecordId::generate().to_string()))
            .clone();
        documents.push(created);

        Ok(ChangeInfo {
            upserted_id: Some(id),
            ..Default::default()
        })
    }

    fn remove(&self, collection: &str, filter: &Document) -> Result<(), DriverError> {
        self.enter("remove", collection)?;
        let mut collections = lock(&self.collections);
        let documents = collections.entry(collection.to_string()).or_default();

        let position = Self::matching_positions(documents, filter)?
            .into_iter()
            .next()
            .ok_or(DriverError::NotFound)?;
        documents.remove(position);
        Ok(())
    }

    fn remove_all(&self, collection: &str, filter: &Document) -> Result<ChangeInfo, DriverError> {
        self.enter("remove_all", collection)?;
        let mut collections = lock(&self.collections);
        let documents = collections.entry(collection.to_string()).or_default();

        let positions = Self::matching_positions(documents, filter)?;
        for &position in positions.iter().rev() {
            documents.remove(position);
        }
        Ok(ChangeInfo {
            matched: positions.len() as u64,
            removed: positions.len() as u64,
            ..Default::default()
        })
    }

    fn pipeline_all(&self, collection: &str, stages: &[Document]) -> Result<Vec<Document>, DriverError> {
        self.enter("pipeline", collection)?;
        let collections = lock(&self.collections);
        let documents = collections.get(collection).cloned().unwrap_or_default();
        aggregate::run(&collections, documents, stages, &Document::new())
    }
}
