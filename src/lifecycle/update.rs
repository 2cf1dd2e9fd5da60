//! Partial-update document shaping

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::driver::Document;
use crate::errors::OdmError;
use crate::schema::{ID_FIELD, UPDATED_AT_FIELD};

pub const SET_OPERATOR: &str = "$set";

/// `{"$set": <record document>}`, holding everything but the identifier
pub fn wrap_record(mut document: Document) -> Document {
    document.remove(ID_FIELD);
    let mut update = Document::new();
    update.insert(SET_OPERATOR.to_string(), Value::Object(document));
    update
}

/// Normalize a caller-supplied update.
///
/// A plain field map becomes a `$set`; an operator document is kept and
/// `updated_at` is stamped inside its `$set`, which is created when absent.
/// The identifier is never part of the `$set`.
pub fn shape_partial(update: Document, stamp: Option<DateTime<Utc>>) -> Result<Document, OdmError> {
    let operators = update.keys().filter(|key| key.starts_with('$')).count();
    if operators > 0 && operators < update.len() {
        return Err(OdmError::InvalidParams(
            "update mixes operators and plain fields".to_string(),
        ));
    }

    let mut shaped = if operators == 0 {
        let mut shaped = Document::new();
        shaped.insert(SET_OPERATOR.to_string(), Value::Object(update));
        shaped
    } else {
        update
    };

    let set = shaped
        .entry(SET_OPERATOR.to_string())
        .or_insert_with(|| Value::Object(Document::new()));
    let Value::Object(set) = set else {
        return Err(OdmError::InvalidParams(format!(
            "{} must be a document",
            SET_OPERATOR
        )));
    };

    set.remove(ID_FIELD);
    if let Some(now) = stamp {
        set.insert(UPDATED_AT_FIELD.to_string(), timestamp_value(now)?);
    }
    if set.is_empty() {
        shaped.remove(SET_OPERATOR);
    }
    Ok(shaped)
}

/// Timestamp in the same form the record's own serialization uses
pub fn timestamp_value(now: DateTime<Utc>) -> Result<Value, OdmError> {
    Ok(serde_json::to_value(now)?)
}
