//! Create/update coordination around a single driver call.
//!
//! - create: stamp identifier and timestamps, `before_create` for every
//!   record in input order, one insert for the batch, then `after_create`
//!   in input order.
//! - update: refresh `updated_at`, `before_update`, driver call, then
//!   `after_update`. The identifier is never written.
//!
//! A failing hook or driver call stops the sequence; after-hooks only run
//! once the driver call succeeded.

pub mod document;
pub mod update;

use chrono::{DateTime, Utc};

use crate::driver::Document;
use crate::errors::OdmError;
use crate::schema::{Record, RecordId, RecordTypeMetadata, UPDATED_AT_FIELD};

pub use document::{decode, decode_all, encode, is_zero, undeclared_keys};
pub use update::{shape_partial, wrap_record, SET_OPERATOR};

/// Payload of an update or upsert
#[derive(Debug)]
pub enum UpdatePayload<'a, R> {
    /// Whole record, written as a `$set` of its persisted fields
    Record(&'a mut R),
    /// Field map or operator document
    Partial(Document),
}

#[derive(Debug, Clone, Copy)]
pub struct Lifecycle {
    clock: fn() -> DateTime<Utc>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Lifecycle { clock: Utc::now }
    }
}

impl Lifecycle {
    pub fn with_clock(clock: fn() -> DateTime<Utc>) -> Self {
        Lifecycle { clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Identifier (if absent), both timestamps and a cleared deleted flag
    pub fn stamp_create<R: Record>(&self, record: &mut R) {
        let now = self.now();
        let base = record.base_mut();
        if base.id.is_empty() {
            base.id = RecordId::generate();
        }
        base.created_at = Some(now);
        base.updated_at = Some(now);
        base.deleted = false;
    }

    pub fn create<R, F>(&self, metadata: &RecordTypeMetadata, records: &mut [R], insert: F) -> Result<(), OdmError>
    where
        R: Record,
        F: FnOnce(Vec<Document>) -> Result<(), OdmError>,
    {
        if records.is_empty() {
            return Ok(());
        }

        let mut documents = Vec::with_capacity(records.len());
        for record in records.iter_mut() {
            self.stamp_create(record);
            record.before_create()?;
            documents.push(encode(metadata, &*record)?);
        }

        log::debug!(
            "Lifecycle: inserting {} {} record(s)",
            documents.len(),
            metadata.type_name()
        );
        insert(documents)?;

        for record in records.iter_mut() {
            record.after_create()?;
        }
        Ok(())
    }

    pub fn update<R, T, F>(
        &self,
        metadata: &RecordTypeMetadata,
        payload: UpdatePayload<'_, R>,
        call: F,
    ) -> Result<T, OdmError>
    where
        R: Record,
        F: FnOnce(Document) -> Result<T, OdmError>,
    {
        match payload {
            UpdatePayload::Record(record) => {
                record.base_mut().updated_at = Some(self.now());
                record.before_update()?;
                let update = wrap_record(encode(metadata, &*record)?);
                let result = call(update)?;
                record.after_update()?;
                Ok(result)
            }
            UpdatePayload::Partial(fields) => {
                let stamp = metadata
                    .has_column(UPDATED_AT_FIELD)
                    .then(|| self.now());
                call(shape_partial(fields, stamp)?)
            }
        }
    }
}
