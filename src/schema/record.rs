//! Record capabilities.
//!
//! - [`Schema`]: a type that declares its persisted fields. Plain sub-records
//!   used for embedding only need this.
//! - [`Record`]: a stored, relationship-capable record type with an embedded
//!   [`RecordBase`] and optional lifecycle hooks.
//!
//! Whether a field's target is relationship-capable is decided by the
//! declaration call (`Fields::record` requires `Record`, `Fields::nested`
//! only `Schema`) and captured in a [`TypeRef`].

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

use super::field::Fields;
use super::naming;
use crate::errors::OdmError;

/// Primary identifier storage name
pub const ID_FIELD: &str = "_id";
pub const CREATED_AT_FIELD: &str = "created_at";
pub const UPDATED_AT_FIELD: &str = "updated_at";
pub const DELETED_FIELD: &str = "deleted";

/// Declares the persisted fields of a type, in declaration order.
///
/// The storage name of every declared field (its `column=` tag, or the
/// lowercased declared name) must equal the key serde writes for it.
/// Documents are filtered by storage name, so a field whose serde key
/// differs keeps its relationship alias or `omitempty` zero value when
/// encoded; `lifecycle::encode` logs such keys.
pub trait Schema: 'static {
    fn declare(fields: &mut Fields);
}

/// A stored record type
pub trait Record: Schema + Serialize + DeserializeOwned + Send + Sync {
    fn base(&self) -> &RecordBase;

    fn base_mut(&mut self) -> &mut RecordBase;

    /// Explicit collection name; defaults to the snake_case type name
    fn collection_name() -> Option<&'static str> {
        None
    }

    fn before_create(&mut self) -> Result<(), OdmError> {
        Ok(())
    }

    fn after_create(&mut self) -> Result<(), OdmError> {
        Ok(())
    }

    fn before_update(&mut self) -> Result<(), OdmError> {
        Ok(())
    }

    fn after_update(&mut self) -> Result<(), OdmError> {
        Ok(())
    }

    /// New-record check used by `Model::save`.
    ///
    /// Only looks at identifier emptiness, so a caller that pre-assigns ids
    /// for idempotent writes is treated as updating.
    fn is_new(&self) -> bool {
        self.base().is_empty()
    }
}

/// Record identifier. Empty until the record is first created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn generate() -> Self {
        RecordId(Uuid::new_v4().simple().to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        RecordId(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        RecordId(value)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier, timestamps and soft-delete flag shared by every record.
///
/// Embed it with `#[serde(flatten)]` and declare it `inline`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordBase {
    #[serde(rename = "_id", default, skip_serializing_if = "RecordId::is_empty")]
    pub id: RecordId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deleted: bool,
}

impl RecordBase {
    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
    }
}

impl Schema for RecordBase {
    fn declare(fields: &mut Fields) {
        fields
            .scalar("ID", "column=_id,omitempty")
            .time("CreatedAt", "column=created_at,omitempty")
            .time("UpdatedAt", "column=updated_at,omitempty")
            .scalar("Deleted", "column=deleted");
    }
}

/// Identity and declaration entry point of a schema type
#[derive(Clone, Copy)]
pub struct TypeRef {
    id: TypeId,
    name: &'static str,
    declare: fn(&mut Fields),
    collection: Option<fn() -> String>,
}

impl TypeRef {
    /// A plain schema type (embeddable, not relationship-capable)
    pub fn schema<S: Schema>() -> Self {
        TypeRef {
            id: TypeId::of::<S>(),
            name: type_name::<S>(),
            declare: S::declare,
            collection: None,
        }
    }

    /// A relationship-capable record type
    pub fn record<R: Record>() -> Self {
        TypeRef {
            id: TypeId::of::<R>(),
            name: type_name::<R>(),
            declare: R::declare,
            collection: Some(naming::collection_name_of::<R> as fn() -> String),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified Rust type name
    pub fn type_name(&self) -> &'static str {
        self.name
    }

    /// Type name without module path or generics
    pub fn short_name(&self) -> &'static str {
        naming::short_type_name(self.name)
    }

    pub fn is_record(&self) -> bool {
        self.collection.is_some()
    }

    pub fn collection_name(&self) -> String {
        match self.collection {
            Some(collection) => collection(),
            None => naming::default_collection_name(self.name),
        }
    }

    pub(crate) fn declare_fields(&self) -> Fields {
        let mut fields = Fields::new();
        (self.declare)(&mut fields);
        fields
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRef")
            .field("name", &self.name)
            .field("record", &self.is_record())
            .finish()
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeRef {}

impl Hash for TypeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
