//! Aggregation pipeline stages and their wire documents.

use serde::{Serialize, Serializer};
use serde_json::{json, Value};

use crate::driver::Document;

/// Sort key in driver notation: `"name"` ascending, `"-name"` descending
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

impl SortKey {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.strip_prefix('-') {
            Some(field) => SortKey {
                field: field.to_string(),
                descending: true,
            },
            None => SortKey {
                field: raw.trim_start_matches('+').to_string(),
                descending: false,
            },
        }
    }

    pub fn direction(&self) -> i32 {
        if self.descending {
            -1
        } else {
            1
        }
    }
}

/// Correlated join against another collection
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    /// Target collection
    pub from: String,
    /// Bound variable name (without `$$`)
    pub variable: String,
    /// Local field bound to `variable`
    pub local_field: String,
    /// Sub-pipeline run against `from`, ending in the correlation match
    pub pipeline: Vec<Stage>,
    /// Destination key on the outer document
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Lookup(Lookup),
    Unwind { path: String, preserve_empty: bool },
    Match(Document),
    Project(Document),
    Sort(Vec<SortKey>),
    Skip(u64),
    Limit(u64),
    Group(Document),
    Count(String),
    /// Caller-supplied stage passed through unchanged
    Raw(Document),
}

impl Stage {
    /// `$match` binding `foreign` on the joined collection to `$$variable`
    pub fn correlation_match(foreign: &str, variable: &str) -> Stage {
        let mut condition = Document::new();
        condition.insert(
            "$expr".to_string(),
            json!({ "$eq": [format!("${}", foreign), format!("$${}", variable)] }),
        );
        Stage::Match(condition)
    }

    /// Flatten a single-valued join, keeping records with no related row
    pub fn unwind(alias: &str) -> Stage {
        Stage::Unwind {
            path: alias.to_string(),
            preserve_empty: true,
        }
    }

    /// Stage operator, e.g. `$lookup`
    pub fn operator(&self) -> &str {
        match self {
            Stage::Lookup(_) => "$lookup",
            Stage::Unwind { .. } => "$unwind",
            Stage::Match(_) => "$match",
            Stage::Project(_) => "$project",
            Stage::Sort(_) => "$sort",
            Stage::Skip(_) => "$skip",
            Stage::Limit(_) => "$limit",
            Stage::Group(_) => "$group",
            Stage::Count(_) => "$count",
            Stage::Raw(document) => document.keys().next().map(String::as_str).unwrap_or(""),
        }
    }

    pub fn to_document(&self) -> Document {
        let body = match self {
            Stage::Lookup(lookup) => {
                let mut bindings = Document::new();
                bindings.insert(
                    lookup.variable.clone(),
                    Value::String(format!("${}", lookup.local_field)),
                );
                json!({
                    "from": lookup.from,
                    "let": bindings,
                    "pipeline": to_documents(&lookup.pipeline),
                    "as": lookup.alias,
                })
            }
            Stage::Unwind {
                path,
                preserve_empty,
            } => json!({
                "path": format!("${}", path),
                "preserveNullAndEmptyArrays": preserve_empty,
            }),
            Stage::Match(document) | Stage::Project(document) | Stage::Group(document) => {
                Value::Object(document.clone())
            }
            Stage::Sort(keys) => {
                let mut order = Document::new();
                for key in keys {
                    order.insert(key.field.clone(), Value::from(key.direction()));
                }
                Value::Object(order)
            }
            Stage::Skip(n) | Stage::Limit(n) => Value::from(*n),
            Stage::Count(name) => Value::String(name.clone()),
            Stage::Raw(document) => return document.clone(),
        };

        let mut stage = Document::new();
        stage.insert(self.operator().to_string(), body);
        stage
    }
}

impl Serialize for Stage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_document().serialize(serializer)
    }
}

/// Wire form of a whole pipeline
pub fn to_documents(stages: &[Stage]) -> Vec<Document> {
    stages.iter().map(Stage::to_document).collect()
}
