//! Relationship descriptors and their resolution from field declarations.
//!
//! A relationship is only ever created for a field whose declared shape is
//! record-valued (`Fields::record` / `Fields::records`) and whose tag names
//! exactly one relationship kind.
//!
//! | Kind            | Tag        | Shape        | local key      | foreign key    |
//! |-----------------|------------|--------------|----------------|----------------|
//! | `OwningSingle`  | `hasOne`   | single       | `_id`          | `foreignkey`   |
//! | `OwningMany`    | `hasMany`  | collection   | `_id`          | `foreignkey`   |
//! | `OwningReverse` | `belongTo` | single       | `foreignkey`   | `_id`          |
//!
//! `localfield` / `foreignfield` override either default.

use std::fmt;
use std::sync::Arc;

use super::errors::MetadataError;
use super::field::{FieldDeclaration, FieldShape};
use super::metadata::RecordTypeMetadata;
use super::record::{TypeRef, ID_FIELD};
use super::registry::Registry;
use super::tags::{TagKey, TagMap};

/// Which side of the relationship holds the join key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationshipKind {
    /// `hasOne`: the target holds a key pointing back at us
    OwningSingle,
    /// `hasMany`: many targets hold a key pointing back at us
    OwningMany,
    /// `belongTo`: we hold the key pointing at the target
    OwningReverse,
}

impl RelationshipKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::OwningSingle => "hasOne",
            RelationshipKind::OwningMany => "hasMany",
            RelationshipKind::OwningReverse => "belongTo",
        }
    }

    /// Single-valued kinds are flattened after the lookup
    pub fn is_single(&self) -> bool {
        !matches!(self, RelationshipKind::OwningMany)
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared relationship between a record field and another record type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub kind: RelationshipKind,
    /// Target record type; its metadata lives in the registry
    pub target: TypeRef,
    /// Storage location (collection) of the target records
    pub collection: String,
    /// Document key the joined value is written to
    pub alias: String,
    pub local_key: String,
    pub foreign_key: String,
}

impl Relationship {
    /// Metadata of the target type, used for chained populate.
    ///
    /// Targets are described when the owner is described, so this is a cache
    /// hit except for the back-edge of a cycle, which was deferred.
    pub fn target_metadata(
        &self,
        registry: &Registry,
    ) -> Result<Arc<RecordTypeMetadata>, MetadataError> {
        registry.describe_ref(self.target)
    }
}

/// Build the relationship (if any) declared on one field
pub(crate) fn resolve(
    owner: &TypeRef,
    declaration: &FieldDeclaration,
    alias: &str,
    tags: &TagMap,
) -> Result<Option<Relationship>, MetadataError> {
    let kinds = tags.relationship_kinds();
    if kinds.len() > 1 {
        return Err(MetadataError::ConflictingRelationshipTags {
            record: owner.short_name().to_string(),
            field: declaration.name.clone(),
            tags: kinds.iter().map(|k| k.as_str()).collect::<Vec<_>>().join(", "),
        });
    }
    let Some(requested) = kinds.first().copied() else {
        return Ok(None);
    };

    let (target, kind) = match (declaration.shape, requested) {
        (FieldShape::Records(target), RelationshipKind::OwningMany) => (target, requested),
        (FieldShape::Record(target), RelationshipKind::OwningSingle)
        | (FieldShape::Record(target), RelationshipKind::OwningReverse) => (target, requested),
        (FieldShape::Records(_), _) | (FieldShape::Record(_), _) => {
            return Err(MetadataError::ConflictingRelationshipTags {
                record: owner.short_name().to_string(),
                field: declaration.name.clone(),
                tags: format!("{} on a {} field", requested, declaration.shape.label()),
            });
        }
        (shape, _) => {
            log::warn!(
                "{}.{}: `{}` on a {} field is not relationship-capable, ignoring",
                owner.short_name(),
                declaration.name,
                requested,
                shape.label()
            );
            return Ok(None);
        }
    };

    let foreign_key_tag = tags.get(TagKey::ForeignKey);
    let (default_local, default_foreign) = match kind {
        RelationshipKind::OwningSingle | RelationshipKind::OwningMany => {
            (Some(ID_FIELD), foreign_key_tag)
        }
        RelationshipKind::OwningReverse => (foreign_key_tag, Some(ID_FIELD)),
    };

    let local_key = tags.get(TagKey::LocalField).or(default_local);
    let foreign_key = tags.get(TagKey::ForeignField).or(default_foreign);

    let (Some(local_key), Some(foreign_key)) = (local_key, foreign_key) else {
        return Err(MetadataError::MissingJoinKey {
            record: owner.short_name().to_string(),
            field: declaration.name.clone(),
            kind: kind.as_str().to_string(),
        });
    };

    Ok(Some(Relationship {
        kind,
        target,
        collection: target.collection_name(),
        alias: alias.to_string(),
        local_key: local_key.to_string(),
        foreign_key: foreign_key.to_string(),
    }))
}
