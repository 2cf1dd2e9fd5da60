//! Record type registry
//!
//! Derives a [`RecordTypeMetadata`] for a schema type on first use and keeps
//! it for the life of the registry.
//!
//! # Caching
//!
//! - Keyed by `TypeId`; successes and failures are both cached, so a type
//!   that failed once fails identically on every later describe.
//! - Reads take the read lock only. Derivation runs without holding any
//!   lock; the result is published with first-writer-wins, so callers racing
//!   on the same type all return the single stored value.
//!
//! # Relationship targets
//!
//! Describing a type also describes every relationship target. A target that
//! is already being described further up the same call (a cycle such as
//! `Member.profile` <-> `Profile.user`) is not re-entered; the relationship
//! keeps the target's [`TypeRef`] and the metadata is fetched from the cache
//! once the outer describe has published it.
//!
//! Types described underneath an outer describe are held back until that
//! outermost describe finishes. They are published with it when it succeeds
//! and discarded when it fails, so a partner that skipped its back-edge to
//! the failed type is derived again against the cached failure.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::errors::MetadataError;
use super::field::{FieldDeclaration, FieldMetadata};
use super::metadata::{MetadataBuilder, RecordTypeMetadata};
use super::record::{Record, Schema, TypeRef};
use super::relationship;
use super::tags::{TagKey, TagMap};

type Cached = Result<Arc<RecordTypeMetadata>, MetadataError>;

/// State of one outermost describe
#[derive(Default)]
struct Resolution {
    in_progress: Vec<TypeId>,
    pending: Vec<(TypeId, Cached)>,
}

/// Process-lifetime metadata cache, shared by the compiler and the facade
#[derive(Debug, Default)]
pub struct Registry {
    cache: RwLock<HashMap<TypeId, Cached>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    pub fn describe<S: Schema>(&self) -> Result<Arc<RecordTypeMetadata>, MetadataError> {
        self.describe_ref(TypeRef::schema::<S>())
    }

    /// Like [`Registry::describe`], keeping the record capability on the
    /// stored type ref
    pub fn describe_record<R: Record>(&self) -> Result<Arc<RecordTypeMetadata>, MetadataError> {
        self.describe_ref(TypeRef::record::<R>())
    }

    pub fn describe_ref(&self, type_ref: TypeRef) -> Result<Arc<RecordTypeMetadata>, MetadataError> {
        self.resolve(type_ref, &mut Resolution::default())
    }

    /// Whether a describe (successful or not) has been cached for `S`
    pub fn contains<S: Schema>(&self) -> bool {
        self.cached(TypeId::of::<S>()).is_some()
    }

    /// Successfully described type by short name, ignoring case
    pub fn lookup(&self, name: &str) -> Option<Arc<RecordTypeMetadata>> {
        let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
        cache
            .values()
            .filter_map(|cached| cached.as_ref().ok())
            .find(|metadata| metadata.type_name().eq_ignore_ascii_case(name))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cached(&self, id: TypeId) -> Option<Cached> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    fn publish(&self, id: TypeId, result: Cached) -> Cached {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        cache.entry(id).or_insert(result).clone()
    }

    fn publish_all(&self, resolved: Vec<(TypeId, Cached)>) {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        for (id, result) in resolved {
            cache.entry(id).or_insert(result);
        }
    }

    fn resolve(&self, type_ref: TypeRef, scope: &mut Resolution) -> Cached {
        let id = type_ref.type_id();
        if let Some(hit) = self.cached(id) {
            return hit;
        }
        if let Some((_, hit)) = scope.pending.iter().find(|(pending, _)| *pending == id) {
            return hit.clone();
        }

        scope.in_progress.push(id);
        let result = self.build(type_ref, scope).map(Arc::new);
        scope.in_progress.pop();

        match &result {
            Ok(metadata) => log::debug!(
                "Registry: described {} ({} fields, {} relationships)",
                type_ref.short_name(),
                metadata.fields().len(),
                metadata.relation_fields().count()
            ),
            Err(e) => log::warn!("Registry: cannot describe {}: {}", type_ref.short_name(), e),
        }

        if !scope.in_progress.is_empty() {
            scope.pending.push((id, result.clone()));
            return result;
        }

        let pending = std::mem::take(&mut scope.pending);
        if result.is_ok() {
            self.publish_all(pending);
        } else if !pending.is_empty() {
            log::debug!(
                "Registry: discarding {} type(s) described under {}",
                pending.len(),
                type_ref.short_name()
            );
        }
        self.publish(id, result)
    }

    fn build(&self, type_ref: TypeRef, scope: &mut Resolution) -> Result<RecordTypeMetadata, MetadataError> {
        let mut builder = MetadataBuilder::new(type_ref);

        for (position, declaration) in type_ref.declare_fields().into_iter().enumerate() {
            let tags = TagMap::parse(&declaration.tag);

            if tags.is_ignored() {
                builder.push(FieldMetadata {
                    storage_name: declaration.name.to_lowercase(),
                    name: declaration.name,
                    shape: declaration.shape,
                    tags,
                    ignored: true,
                    inline: false,
                    index_path: vec![position],
                    omit_empty: false,
                    has_default: false,
                    relationship: None,
                })?;
                continue;
            }

            if tags.contains(TagKey::Inline) {
                self.splice_inline(&mut builder, type_ref, position, &declaration, &tags, scope)?;
                continue;
            }

            let storage_name = tags
                .column()
                .map(str::to_string)
                .unwrap_or_else(|| declaration.name.to_lowercase());

            let relationship = relationship::resolve(&type_ref, &declaration, &storage_name, &tags)?;
            if let Some(rel) = &relationship {
                if !scope.in_progress.contains(&rel.target.type_id()) {
                    self.resolve(rel.target, scope)?;
                }
            }

            builder.push(FieldMetadata {
                name: declaration.name,
                storage_name,
                shape: declaration.shape,
                omit_empty: tags.contains(TagKey::OmitEmpty),
                has_default: tags.contains(TagKey::Default),
                tags,
                ignored: false,
                inline: false,
                index_path: vec![position],
                relationship,
            })?;
        }

        Ok(builder.finish())
    }

    fn splice_inline(
        &self,
        builder: &mut MetadataBuilder,
        owner: TypeRef,
        position: usize,
        declaration: &FieldDeclaration,
        tags: &TagMap,
        scope: &mut Resolution,
    ) -> Result<(), MetadataError> {
        let malformed = |reason: String| MetadataError::MalformedInline {
            record: owner.short_name().to_string(),
            field: declaration.name.clone(),
            reason,
        };

        let Some(target) = declaration.shape.embeddable() else {
            return Err(malformed(format!(
                "a {} field cannot be inlined",
                declaration.shape.label()
            )));
        };
        if !tags.relationship_kinds().is_empty() {
            return Err(malformed("an inlined field cannot declare a relationship".to_string()));
        }
        if scope.in_progress.contains(&target.type_id()) {
            return Err(malformed(format!("`{}` inlines itself", target.short_name())));
        }

        let embedded = self.resolve(target, scope)?;
        for field in embedded.fields() {
            let mut field = field.clone();
            field.inline = true;
            field.index_path.insert(0, position);
            builder.push(field)?;
        }
        Ok(())
    }
}
