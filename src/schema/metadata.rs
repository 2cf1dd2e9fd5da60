use std::any::TypeId;
use std::collections::HashMap;

use super::errors::MetadataError;
use super::field::FieldMetadata;
use super::record::TypeRef;

/// Immutable, flattened field table of one schema type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordTypeMetadata {
    type_ref: TypeRef,
    fields: Vec<FieldMetadata>,
    /// lowercased declared name -> position in `fields`
    by_name: HashMap<String, usize>,
    /// storage name -> position in `fields`
    by_storage: HashMap<String, usize>,
}

impl RecordTypeMetadata {
    pub fn type_ref(&self) -> TypeRef {
        self.type_ref
    }

    pub fn type_id(&self) -> TypeId {
        self.type_ref.type_id()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_ref.short_name()
    }

    pub fn fields(&self) -> &[FieldMetadata] {
        &self.fields
    }

    /// Lookup by declared name, ignoring case
    pub fn field(&self, name: &str) -> Option<&FieldMetadata> {
        self.by_name
            .get(&name.to_lowercase())
            .map(|&position| &self.fields[position])
    }

    pub fn field_by_storage(&self, storage_name: &str) -> Option<&FieldMetadata> {
        self.by_storage
            .get(storage_name)
            .map(|&position| &self.fields[position])
    }

    pub fn has_column(&self, storage_name: &str) -> bool {
        self.field_by_storage(storage_name)
            .is_some_and(FieldMetadata::is_persisted)
    }

    pub fn relation_fields(&self) -> impl Iterator<Item = &FieldMetadata> {
        self.fields.iter().filter(|f| f.relationship.is_some())
    }

    pub fn persisted_fields(&self) -> impl Iterator<Item = &FieldMetadata> {
        self.fields.iter().filter(|f| f.is_persisted())
    }
}

/// Accumulates fields for one type, enforcing storage-name uniqueness
pub(crate) struct MetadataBuilder {
    metadata: RecordTypeMetadata,
}

impl MetadataBuilder {
    pub(crate) fn new(type_ref: TypeRef) -> Self {
        MetadataBuilder {
            metadata: RecordTypeMetadata {
                type_ref,
                fields: Vec::new(),
                by_name: HashMap::new(),
                by_storage: HashMap::new(),
            },
        }
    }

    pub(crate) fn push(&mut self, field: FieldMetadata) -> Result<(), MetadataError> {
        let position = self.metadata.fields.len();

        if !field.ignored {
            if self.metadata.by_storage.contains_key(&field.storage_name) {
                return Err(MetadataError::DuplicateStorageName {
                    record: self.metadata.type_name().to_string(),
                    storage_name: field.storage_name,
                });
            }
            self.metadata
                .by_storage
                .insert(field.storage_name.clone(), position);
        }

        // First declaration wins name lookups; shadowed names stay reachable by storage name
        self.metadata
            .by_name
            .entry(field.name.to_lowercase())
            .or_insert(position);

        self.metadata.fields.push(field);
        Ok(())
    }

    pub(crate) fn finish(self) -> RecordTypeMetadata {
        self.metadata
    }
}
