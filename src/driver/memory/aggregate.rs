//! In-memory execution of aggregation pipelines and find modifiers.

use serde_json::Value;
use std::collections::HashMap;

use super::filter::{evaluate, get_path, matches, sort_order, truthy};
use crate::driver::{Document, DriverError};
use crate::query_compiler::SortKey;

pub(crate) type Collections = HashMap<String, Vec<Document>>;

pub(crate) fn run(
    store: &Collections,
    mut documents: Vec<Document>,
    stages: &[Document],
    vars: &Document,
) -> Result<Vec<Document>, DriverError> {
    for stage in stages {
        let (operator, body) = single_entry(stage)?;
        documents = match operator {
            "$match" => {
                let filter = as_document(operator, body)?;
                let mut kept = Vec::with_capacity(documents.len());
                for document in documents {
                    if matches(&document, filter, vars)? {
                        kept.push(document);
                    }
                }
                kept
            }
            "$lookup" => lookup(store, documents, as_document(operator, body)?, vars)?,
            "$unwind" => unwind(documents, body)?,
            "$sort" => {
                let keys = as_document(operator, body)?
                    .iter()
                    .map(|(field, direction)| SortKey {
                        field: field.clone(),
                        descending: direction.as_i64() == Some(-1),
                    })
                    .collect::<Vec<_>>();
                sort(&mut documents, &keys);
                documents
            }
            "$skip" => documents.into_iter().skip(as_count(operator, body)?).collect(),
            "$limit" => documents.into_iter().take(as_count(operator, body)?).collect(),
            "$project" => {
                let projection = as_document(operator, body)?;
                documents.iter().map(|d| project(d, projection)).collect()
            }
            "$count" => {
                let name = body
                    .as_str()
                    .ok_or_else(|| DriverError::Backend("$count expects a field name".to_string()))?;
                if documents.is_empty() {
                    Vec::new()
                } else {
                    let mut counted = Document::new();
                    counted.insert(name.to_string(), Value::from(documents.len() as u64));
                    vec![counted]
                }
            }
            other => {
                return Err(DriverError::Backend(format!("unsupported stage {}", other)));
            }
        };
    }
    Ok(documents)
}

pub(crate) fn sort(documents: &mut [Document], keys: &[SortKey]) {
    documents.sort_by(|a, b| {
        for key in keys {
            let ordering = sort_order(get_path(a, &key.field), get_path(b, &key.field));
            let ordering = if key.descending {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering.is_ne() {
                return ordering;
            }
        }
        std::cmp::Ordering::Equal
    });
}

/// Inclusion or exclusion projection over top-level keys
pub(crate) fn project(document: &Document, projection: &Document) -> Document {
    if projection.is_empty() {
        return document.clone();
    }

    let includes = projection
        .iter()
        .any(|(field, flag)| field != "_id" && truthy(flag));

    if includes {
        let mut projected = Document::new();
        let keep_id = projection.get("_id").map(truthy).unwrap_or(true);
        if keep_id {
            if let Some(id) = document.get("_id") {
                projected.insert("_id".to_string(), id.clone());
            }
        }
        for (field, flag) in projection {
            if field != "_id" && truthy(flag) {
                if let Some(value) = document.get(field) {
                    projected.insert(field.clone(), value.clone());
                }
            }
        }
        projected
    } else {
        let mut projected = document.clone();
        for field in projection.keys() {
            projected.remove(field);
        }
        projected
    }
}

fn lookup(
    store: &Collections,
    documents: Vec<Document>,
    body: &Document,
    vars: &Document,
) -> Result<Vec<Document>, DriverError> {
    let field = |name: &str| {
        body.get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| DriverError::Backend(format!("$lookup requires `{}`", name)))
    };
    let from = field("from")?;
    let alias = field("as")?;
    let foreign = store.get(from).cloned().unwrap_or_default();

    let mut joined = Vec::with_capacity(documents.len());
    for mut document in documents {
        let matched = match body.get("pipeline") {
            Some(pipeline) => {
                let mut scope = vars.clone();
                if let Some(Value::Object(bindings)) = body.get("let") {
                    for (name, expression) in bindings {
                        scope.insert(name.clone(), evaluate(expression, &document, vars)?);
                    }
                }
                let stages = pipeline
                    .as_array()
                    .ok_or_else(|| DriverError::Backend("$lookup pipeline must be an array".to_string()))?
                    .iter()
                    .map(|stage| as_document("$lookup", stage).cloned())
                    .collect::<Result<Vec<_>, _>>()?;
                run(store, foreign.clone(), &stages, &scope)?
            }
            None => {
                let local = get_path(&document, field("localField")?).cloned().unwrap_or(Value::Null);
                let foreign_field = field("foreignField")?;
                foreign
                    .iter()
                    .filter(|candidate| {
                        get_path(candidate, foreign_field).cloned().unwrap_or(Value::Null) == local
                    })
                    .cloned()
                    .collect()
            }
        };
        document.insert(
            alias.to_string(),
            Value::Array(matched.into_iter().map(Value::Object).collect()),
        );
        joined.push(document);
    }
    Ok(joined)
}

fn unwind(documents: Vec<Document>, body: &Value) -> Result<Vec<Document>, DriverError> {
    let (path, preserve) = match body {
        Value::String(path) => (path.as_str(), false),
        Value::Object(options) => (
            options
                .get("path")
                .and_then(Value::as_str)
                .ok_or_else(|| DriverError::Backend("$unwind requires `path`".to_string()))?,
            options
                .get("preserveNullAndEmptyArrays")
                .is_some_and(truthy),
        ),
        _ => return Err(DriverError::Backend("$unwind expects a path".to_string())),
    };
    let field = path.trim_start_matches('$');

    let mut unwound = Vec::with_capacity(documents.len());
    for document in documents {
        match document.get(field).cloned() {
            Some(Value::Array(items)) if !items.is_empty() => {
                for item in items {
                    let mut copy = document.clone();
                    copy.insert(field.to_string(), item);
                    unwound.push(copy);
                }
            }
            Some(Value::Array(_)) | Some(Value::Null) | None => {
                if preserve {
                    let mut copy = document;
                    copy.remove(field);
                    unwound.push(copy);
                }
            }
            Some(_) => unwound.push(document),
        }
    }
    Ok(unwound)
}

fn single_entry(stage: &Document) -> Result<(&str, &Value), DriverError> {
    let mut entries = stage.iter();
    match (entries.next(), entries.next()) {
        (Some((operator, body)), None) => Ok((operator.as_str(), body)),
        _ => Err(DriverError::Backend(
            "a stage must have exactly one operator".to_string(),
        )),
    }
}

fn as_document<'a>(operator: &str, body: &'a Value) -> Result<&'a Document, DriverError> {
    body.as_object()
        .ok_or_else(|| DriverError::Backend(format!("{} expects a document", operator)))
}

fn as_count(operator: &str, body: &Value) -> Result<usize, DriverError> {
    body.as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| DriverError::Backend(format!("{} expects a non-negative integer", operator)))
}
