//! Model and query facade over a [`Driver`](crate::driver::Driver).
//!
//! ```ignore
//! let conn = Connection::new(Arc::new(MemoryDriver::new()), OdmConfig::default());
//! let members = conn.register::<Member>()?;
//!
//! let mut ada = Member { username: "ada".into(), ..Default::default() };
//! members.create(&mut ada)?;
//!
//! let found = members
//!     .find(doc)
//!     .populate("Profile")
//!     .sort(["-created_at"])
//!     .limit(10)
//!     .all()?;
//! ```

pub mod connection;
pub mod query;

use serde_json::{json, Value};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::config::OdmConfig;
use crate::driver::{ChangeInfo, Document, Driver};
use crate::errors::OdmError;
use crate::lifecycle::{update::timestamp_value, Lifecycle, UpdatePayload};
use crate::query_compiler::{to_documents, Stage};
use crate::schema::{
    Record, RecordId, RecordTypeMetadata, Registry, DELETED_FIELD, ID_FIELD, UPDATED_AT_FIELD,
};

pub use connection::{Connection, RegisteredModel};
pub use query::{Cardinality, Query, ResultSet};

/// Typed handle on one registered record type and its collection
pub struct Model<R> {
    driver: Arc<dyn Driver>,
    registry: Arc<Registry>,
    config: OdmConfig,
    lifecycle: Lifecycle,
    metadata: Arc<RecordTypeMetadata>,
    collection: String,
    soft_deletes: bool,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for Model<R> {
    fn clone(&self) -> Self {
        Model {
            driver: Arc::clone(&self.driver),
            registry: Arc::clone(&self.registry),
            config: self.config.clone(),
            lifecycle: self.lifecycle,
            metadata: Arc::clone(&self.metadata),
            collection: self.collection.clone(),
            soft_deletes: self.soft_deletes,
            _record: PhantomData,
        }
    }
}

impl<R: Record> Model<R> {
    pub(crate) fn new(connection: &Connection, registered: RegisteredModel) -> Self {
        let soft_deletes =
            connection.config().soft_deletes && registered.metadata.has_column(DELETED_FIELD);
        Model {
            driver: Arc::clone(connection.driver()),
            registry: Arc::clone(connection.registry()),
            config: connection.config().clone(),
            lifecycle: connection.lifecycle(),
            metadata: registered.metadata,
            collection: registered.collection,
            soft_deletes,
            _record: PhantomData,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn metadata(&self) -> &Arc<RecordTypeMetadata> {
        &self.metadata
    }

    /// Whether reads hide soft-deleted documents and deletes only flag them
    pub fn soft_deletes(&self) -> bool {
        self.soft_deletes
    }

    /// Same model with soft-delete handling turned off
    pub fn with_deleted(&self) -> Model<R> {
        let mut model = self.clone();
        model.soft_deletes = false;
        model
    }

    /// Query for any number of records
    pub fn find(&self, filter: Document) -> Query<R> {
        Query::new(self.clone(), filter, Cardinality::Many)
    }

    /// Query for a single record
    pub fn first(&self, filter: Document) -> Query<R> {
        Query::new(self.clone(), filter, Cardinality::One)
    }

    pub fn find_one(&self, filter: Document) -> Result<R, OdmError> {
        self.first(filter).one()
    }

    pub fn find_all(&self, filter: Document) -> Result<Vec<R>, OdmError> {
        self.find(filter).all()
    }

    pub fn find_by_id(&self, id: &RecordId) -> Result<R, OdmError> {
        self.find_one(id_filter(id))
    }

    pub fn create(&self, record: &mut R) -> Result<(), OdmError> {
        self.create_many(std::slice::from_mut(record))
    }

    /// One insert for the whole batch; hooks run per record in input order
    pub fn create_many(&self, records: &mut [R]) -> Result<(), OdmError> {
        self.lifecycle.create(&self.metadata, records, |documents| {
            self.driver
                .insert(&self.collection, documents)
                .map_err(|e| OdmError::from_driver(&self.collection, e))
        })
    }

    /// Create when the record has no identifier yet, otherwise upsert by id.
    ///
    /// A record carrying a caller-assigned identifier is always upserted,
    /// never created, so its `before_create` hook does not run.
    pub fn save(&self, record: &mut R) -> Result<(), OdmError> {
        if record.is_new() {
            return self.create(record);
        }
        let id = record.base().id.clone();
        self.upsert_id(&id, UpdatePayload::Record(record)).map(|_| ())
    }

    /// Update the first matching record
    pub fn update(&self, filter: Document, payload: UpdatePayload<'_, R>) -> Result<(), OdmError> {
        let filter = self.scope(filter);
        self.lifecycle.update(&self.metadata, payload, |update| {
            self.driver
                .update(&self.collection, &filter, &update)
                .map_err(|e| OdmError::from_driver(&self.collection, e))
        })
    }

    pub fn update_all(&self, filter: Document, update: Document) -> Result<ChangeInfo, OdmError> {
        let filter = self.scope(filter);
        self.lifecycle
            .update::<R, _, _>(&self.metadata, UpdatePayload::Partial(update), |update| {
                self.driver
                    .update_all(&self.collection, &filter, &update)
                    .map_err(|e| OdmError::from_driver(&self.collection, e))
            })
    }

    pub fn upsert(&self, filter: Document, payload: UpdatePayload<'_, R>) -> Result<ChangeInfo, OdmError> {
        self.lifecycle.update(&self.metadata, payload, |update| {
            self.driver
                .upsert(&self.collection, &filter, &update)
                .map_err(|e| OdmError::from_driver(&self.collection, e))
        })
    }

    pub fn upsert_id(&self, id: &RecordId, payload: UpdatePayload<'_, R>) -> Result<ChangeInfo, OdmError> {
        if id.is_empty() {
            return Err(OdmError::InvalidParams("upsert by id needs an identifier".to_string()));
        }
        self.upsert(id_filter(id), payload)
    }

    /// Count matches; driver failures are returned, not reported as zero
    pub fn count(&self, filter: Document) -> Result<u64, OdmError> {
        self.find(filter).count()
    }

    /// Delete the first match; soft when soft deletes are active
    pub fn delete(&self, filter: Document) -> Result<(), OdmError> {
        if !self.soft_deletes {
            return self.force_delete(filter);
        }
        let filter = self.scope(filter);
        let update = self.deleted_flag(true)?;
        self.driver
            .update(&self.collection, &filter, &update)
            .map_err(|e| OdmError::from_driver(&self.collection, e))
    }

    pub fn delete_all(&self, filter: Document) -> Result<ChangeInfo, OdmError> {
        if !self.soft_deletes {
            return self.force_delete_all(filter);
        }
        let filter = self.scope(filter);
        let update = self.deleted_flag(true)?;
        self.driver
            .update_all(&self.collection, &filter, &update)
            .map_err(|e| OdmError::from_driver(&self.collection, e))
    }

    /// Remove the first match, soft-deleted or not
    pub fn force_delete(&self, filter: Document) -> Result<(), OdmError> {
        self.driver
            .remove(&self.collection, &filter)
            .map_err(|e| OdmError::from_driver(&self.collection, e))
    }

    pub fn force_delete_all(&self, filter: Document) -> Result<ChangeInfo, OdmError> {
        self.driver
            .remove_all(&self.collection, &filter)
            .map_err(|e| OdmError::from_driver(&self.collection, e))
    }

    /// Clear the deleted flag on soft-deleted matches
    pub fn restore(&self, mut filter: Document) -> Result<ChangeInfo, OdmError> {
        if !self.metadata.has_column(DELETED_FIELD) {
            return Err(OdmError::InvalidParams(format!(
                "{} has no `{}` column",
                self.metadata.type_name(),
                DELETED_FIELD
            )));
        }
        filter.insert(DELETED_FIELD.to_string(), Value::Bool(true));
        let update = self.deleted_flag(false)?;
        self.driver
            .update_all(&self.collection, &filter, &update)
            .map_err(|e| OdmError::from_driver(&self.collection, e))
    }

    /// Run caller-built stages, behind a soft-delete match when active
    pub fn aggregate(&self, stages: Vec<Stage>) -> Result<Vec<Document>, OdmError> {
        let mut pipeline = Vec::with_capacity(stages.len() + 1);
        let scope = self.scope(Document::new());
        if !scope.is_empty() {
            pipeline.push(Stage::Match(scope));
        }
        pipeline.extend(stages);

        self.driver
            .pipeline_all(&self.collection, &to_documents(&pipeline))
            .map_err(|e| OdmError::from_driver(&self.collection, e))
    }

    /// Add the not-deleted condition unless the filter already talks about it
    pub(crate) fn scope(&self, mut filter: Document) -> Document {
        if self.soft_deletes && !filter.contains_key(DELETED_FIELD) {
            filter.insert(DELETED_FIELD.to_string(), json!({ "$ne": true }));
        }
        filter
    }

    fn deleted_flag(&self, deleted: bool) -> Result<Document, OdmError> {
        let mut set = Document::new();
        set.insert(DELETED_FIELD.to_string(), Value::Bool(deleted));
        if self.metadata.has_column(UPDATED_AT_FIELD) {
            set.insert(UPDATED_AT_FIELD.to_string(), timestamp_value(self.lifecycle.now())?);
        }
        let mut update = Document::new();
        update.insert("$set".to_string(), Value::Object(set));
        Ok(update)
    }

    pub(crate) fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    pub(crate) fn registry(&self) -> &Registry {
        &self.registry
    }

    pub(crate) fn config(&self) -> &OdmConfig {
        &self.config
    }
}

/// `{"_id": id}`
pub fn id_filter(id: &RecordId) -> Document {
    let mut filter = Document::new();
    filter.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
    filter
}
