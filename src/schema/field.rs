//! Field declarations and the per-field metadata derived from them.

use super::record::{Record, Schema, TypeRef};
use super::relationship::Relationship;
use super::tags::TagMap;

/// Declared value shape of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    /// Any scalar or opaque value
    Scalar,
    /// Timestamp value, never relational
    Time,
    /// Collection of non-record values
    Values,
    /// Plain sub-record; may be inlined
    Nested(TypeRef),
    /// Single record (owned value or pointer)
    Record(TypeRef),
    /// Collection of records
    Records(TypeRef),
}

impl FieldShape {
    pub fn label(&self) -> &'static str {
        match self {
            FieldShape::Scalar => "scalar",
            FieldShape::Time => "time",
            FieldShape::Values => "value collection",
            FieldShape::Nested(_) => "nested record",
            FieldShape::Record(_) => "record",
            FieldShape::Records(_) => "record collection",
        }
    }

    /// Type whose fields an `inline` tag would splice in
    pub fn embeddable(&self) -> Option<TypeRef> {
        match self {
            FieldShape::Nested(target) | FieldShape::Record(target) => Some(*target),
            _ => None,
        }
    }
}

/// One field as written in `Schema::declare`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDeclaration {
    pub name: String,
    pub tag: String,
    pub shape: FieldShape,
}

/// Ordered field declarations of one type.
///
/// ```ignore
/// impl Schema for Member {
///     fn declare(fields: &mut Fields) {
///         fields
///             .nested::<RecordBase>("Base", "inline")
///             .scalar("Username", "username,omitempty")
///             .record::<Profile>("Profile", "profile,omitempty;hasOne;foreignkey=user_id");
///     }
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Fields {
    declarations: Vec<FieldDeclaration>,
}

impl Fields {
    pub fn new() -> Self {
        Fields::default()
    }

    pub fn scalar(&mut self, name: &str, tag: &str) -> &mut Self {
        self.push(name, tag, FieldShape::Scalar)
    }

    pub fn time(&mut self, name: &str, tag: &str) -> &mut Self {
        self.push(name, tag, FieldShape::Time)
    }

    pub fn values(&mut self, name: &str, tag: &str) -> &mut Self {
        self.push(name, tag, FieldShape::Values)
    }

    pub fn nested<S: Schema>(&mut self, name: &str, tag: &str) -> &mut Self {
        self.push(name, tag, FieldShape::Nested(TypeRef::schema::<S>()))
    }

    pub fn record<R: Record>(&mut self, name: &str, tag: &str) -> &mut Self {
        self.push(name, tag, FieldShape::Record(TypeRef::record::<R>()))
    }

    pub fn records<R: Record>(&mut self, name: &str, tag: &str) -> &mut Self {
        self.push(name, tag, FieldShape::Records(TypeRef::record::<R>()))
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDeclaration> {
        self.declarations.iter()
    }

    fn push(&mut self, name: &str, tag: &str, shape: FieldShape) -> &mut Self {
        self.declarations.push(FieldDeclaration {
            name: name.to_string(),
            tag: tag.to_string(),
            shape,
        });
        self
    }
}

impl IntoIterator for Fields {
    type Item = FieldDeclaration;
    type IntoIter = std::vec::IntoIter<FieldDeclaration>;

    fn into_iter(self) -> Self::IntoIter {
        self.declarations.into_iter()
    }
}

/// Flattened, persisted description of one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMetadata {
    /// Declared name
    pub name: String,
    /// Persisted document key
    pub storage_name: String,
    pub shape: FieldShape,
    pub tags: TagMap,
    pub ignored: bool,
    /// Introduced by flattening an `inline` field
    pub inline: bool,
    /// Positions from the outermost type down to this field
    pub index_path: Vec<usize>,
    pub omit_empty: bool,
    pub has_default: bool,
    pub relationship: Option<Relationship>,
}

impl FieldMetadata {
    /// Stored on the record's own document (not ignored, not a join alias)
    pub fn is_persisted(&self) -> bool {
        !self.ignored && self.relationship.is_none()
    }
}
