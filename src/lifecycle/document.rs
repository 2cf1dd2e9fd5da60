//! Record <-> persisted document conversion

use serde_json::Value;

use crate::driver::Document;
use crate::errors::OdmError;
use crate::schema::{Record, RecordTypeMetadata};

/// Persisted form of a record.
///
/// Drops ignored fields, relationship aliases (joined values are never
/// written back) and `omitempty` fields holding a zero value.
pub fn encode<R: Record>(metadata: &RecordTypeMetadata, record: &R) -> Result<Document, OdmError> {
    let mut document = match serde_json::to_value(record)? {
        Value::Object(document) => document,
        other => {
            return Err(OdmError::InvalidParams(format!(
                "{} does not serialize to a document (got {})",
                metadata.type_name(),
                kind_of(&other)
            )))
        }
    };

    for field in metadata.fields() {
        let drop = !field.is_persisted()
            || (field.omit_empty && document.get(&field.storage_name).is_some_and(is_zero));
        if drop {
            document.remove(&field.storage_name);
        }
    }

    let undeclared = undeclared_keys(metadata, &document);
    if !undeclared.is_empty() {
        log::warn!(
            "{} serialized keys with no matching storage name: {}",
            metadata.type_name(),
            undeclared.join(", ")
        );
    }
    Ok(document)
}

/// Document keys that no persisted field declares as its storage name.
///
/// Non-empty when a serde rename disagrees with the declared column, in
/// which case `encode` cannot strip that field.
pub fn undeclared_keys<'d>(metadata: &RecordTypeMetadata, document: &'d Document) -> Vec<&'d str> {
    document
        .keys()
        .filter(|key| {
            !metadata
                .persisted_fields()
                .any(|field| field.storage_name == key.as_str())
        })
        .map(String::as_str)
        .collect()
}

pub fn decode<R: Record>(document: Document) -> Result<R, OdmError> {
    Ok(serde_json::from_value(Value::Object(document))?)
}

pub fn decode_all<R: Record>(documents: Vec<Document>) -> Result<Vec<R>, OdmError> {
    documents.into_iter().map(decode).collect()
}

/// Zero value in the `omitempty` sense
pub fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
