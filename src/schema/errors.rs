//! # Metadata Error Types
//!
//! Failures deriving a record type's field table. They are configuration
//! bugs, not transient conditions: the registry caches them, so every later
//! describe of the same type fails with an identical error.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MetadataError {
    #[error("Duplicated storage name '{storage_name}' in record `{record}`")]
    DuplicateStorageName {
        record: String,
        storage_name: String,
    },
    #[error("Invalid inline declaration on `{record}.{field}`: {reason}")]
    MalformedInline {
        record: String,
        field: String,
        reason: String,
    },
    #[error("Conflicting relationship tags on `{record}.{field}` ({tags})")]
    ConflictingRelationshipTags {
        record: String,
        field: String,
        tags: String,
    },
    #[error("Relationship `{kind}` on `{record}.{field}` has no join key (set foreignkey or localfield/foreignfield)")]
    MissingJoinKey {
        record: String,
        field: String,
        kind: String,
    },
}

impl MetadataError {
    /// Record type the error was raised for
    pub fn record(&self) -> &str {
        match self {
            MetadataError::DuplicateStorageName { record, .. }
            | MetadataError::MalformedInline { record, .. }
            | MetadataError::ConflictingRelationshipTags { record, .. }
            | MetadataError::MissingJoinKey { record, .. } => record,
        }
    }
}
