//! Record schemas: field declarations, tags, relationships and the registry
//! that turns them into cached [`RecordTypeMetadata`].

pub mod errors;
pub mod field;
pub mod metadata;
pub mod naming;
pub mod record;
pub mod registry;
pub mod relationship;
pub mod tags;


pub use errors::MetadataError;
pub use field::{FieldDeclaration, FieldMetadata, FieldShape, Fields};
pub use metadata::RecordTypeMetadata;
pub use record::{
    Record, RecordBase, RecordId, Schema, TypeRef, CREATED_AT_FIELD, DELETED_FIELD, ID_FIELD,
    UPDATED_AT_FIELD,
};
pub use registry::Registry;
pub use relationship::{Relationship, RelationshipKind};
pub use tags::{TagKey, TagMap};
