//! Filter evaluation and update application over JSON documents.

use serde_json::Value;
use std::cmp::Ordering;

use crate::driver::{Document, DriverError};

/// Value at a dotted path
pub fn get_path<'a>(document: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn set_path(document: &mut Document, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            document.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = document
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Document::new()));
            if !child.is_object() {
                *child = Value::Object(Document::new());
            }
            if let Value::Object(child) = child {
                set_path(child, rest, value);
            }
        }
    }
}

fn unset_path(document: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            document.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Value::Object(child)) = document.get_mut(head) {
                unset_path(child, rest);
            }
        }
    }
}

/// Equality with numbers compared by value (`1 == 1.0`)
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| values_equal(a, b))
        }
        _ => a == b,
    }
}

/// Ordering for sort and range operators; `None` across incompatible types
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Sort order with missing/null values first
pub fn sort_order(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare_values(a, b).unwrap_or(Ordering::Equal),
    }
}

pub fn matches(document: &Document, filter: &Document, vars: &Document) -> Result<bool, DriverError> {
    for (key, condition) in filter {
        let satisfied = match key.as_str() {
            "$and" => {
                let mut all = true;
                for clause in each_clause(condition)? {
                    if !matches(document, clause, vars)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => {
                let mut any = false;
                for clause in each_clause(condition)? {
                    if matches(document, clause, vars)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            "$expr" => truthy(&evaluate(condition, document, vars)?),
            operator if operator.starts_with('$') => {
                return Err(DriverError::Backend(format!(
                    "unsupported top-level operator {}",
                    operator
                )))
            }
            path => field_matches(get_path(document, path), condition)?,
        };
        if !satisfied {
            return Ok(false);
        }
    }
    Ok(true)
}

fn each_clause(condition: &Value) -> Result<Vec<&Document>, DriverError> {
    condition
        .as_array()
        .ok_or_else(|| DriverError::Backend("$and/$or expects an array".to_string()))?
        .iter()
        .map(|clause| {
            clause
                .as_object()
                .ok_or_else(|| DriverError::Backend("$and/$or clauses must be documents".to_string()))
        })
        .collect()
}

fn is_operator_document(condition: &Value) -> bool {
    condition
        .as_object()
        .is_some_and(|map| !map.is_empty() && map.keys().all(|k| k.starts_with('$')))
}

fn equals_or_contains(value: Option<&Value>, expected: &Value) -> bool {
    match value {
        Some(Value::Array(items)) if !expected.is_array() => {
            items.iter().any(|item| values_equal(item, expected))
        }
        Some(value) => values_equal(value, expected),
        // missing field matches null
        None => expected.is_null(),
    }
}

fn field_matches(value: Option<&Value>, condition: &Value) -> Result<bool, DriverError> {
    let Some(operators) = condition.as_object().filter(|_| is_operator_document(condition)) else {
        return Ok(equals_or_contains(value, condition));
    };

    for (operator, operand) in operators {
        let satisfied = match operator.as_str() {
            "$eq" => equals_or_contains(value, operand),
            "$ne" => !equals_or_contains(value, operand),
            "$in" => in_list(value, operand)?,
            "$nin" => !in_list(value, operand)?,
            "$exists" => value.is_some() == truthy(operand),
            "$gt" | "$gte" | "$lt" | "$lte" => {
                let Some(ordering) = value.and_then(|v| compare_values(v, operand)) else {
                    return Ok(false);
                };
                match operator.as_str() {
                    "$gt" => ordering == Ordering::Greater,
                    "$gte" => ordering != Ordering::Less,
                    "$lt" => ordering == Ordering::Less,
                    _ => ordering != Ordering::Greater,
                }
            }
            other => {
                return Err(DriverError::Backend(format!("unsupported operator {}", other)));
            }
        };
        if !satisfied {
            return Ok(false);
        }
    }
    Ok(true)
}

fn in_list(value: Option<&Value>, operand: &Value) -> Result<bool, DriverError> {
    let candidates = operand
        .as_array()
        .ok_or_else(|| DriverError::Backend("$in/$nin expects an array".to_string()))?;
    Ok(candidates
        .iter()
        .any(|candidate| equals_or_contains(value, candidate)))
}

pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => true,
    }
}

/// Aggregation expression: `"$field"`, `"$$var"`, `$eq`/`$ne`/`$and`/`$or`
/// operators, or a literal
pub fn evaluate(expression: &Value, document: &Document, vars: &Document) -> Result<Value, DriverError> {
    match expression {
        Value::String(s) if s.starts_with("$$") => Ok(vars.get(&s[2..]).cloned().unwrap_or(Value::Null)),
        Value::String(s) if s.starts_with('$') => {
            Ok(get_path(document, &s[1..]).cloned().unwrap_or(Value::Null))
        }
        Value::Object(map) if map.len() == 1 && is_operator_document(expression) => {
            let Some((operator, operands)) = map.iter().next() else {
                return Ok(Value::Null);
            };
            let operands = operands
                .as_array()
                .ok_or_else(|| DriverError::Backend(format!("{} expects an array", operator)))?
                .iter()
                .map(|operand| evaluate(operand, document, vars))
                .collect::<Result<Vec<_>, _>>()?;

            let result = match (operator.as_str(), operands.as_slice()) {
                ("$eq", [a, b]) => values_equal(a, b),
                ("$ne", [a, b]) => !values_equal(a, b),
                ("$and", all) => all.iter().all(truthy),
                ("$or", any) => any.iter().any(truthy),
                (other, _) => {
                    return Err(DriverError::Backend(format!(
                        "unsupported expression {}",
                        other
                    )))
                }
            };
            Ok(Value::Bool(result))
        }
        literal => Ok(literal.clone()),
    }
}

/// `$set`/`$unset` operators, or a replacement document that keeps `_id`
pub fn apply_update(document: &mut Document, update: &Document) -> Result<(), DriverError> {
    if !update.keys().any(|k| k.starts_with('$')) {
        let id = document.get("_id").cloned();
        *document = update.clone();
        if let Some(id) = id {
            document.insert("_id".to_string(), id);
        }
        return Ok(());
    }

    for (operator, fields) in update {
        let fields = fields
            .as_object()
            .ok_or_else(|| DriverError::Backend(format!("{} expects a document", operator)))?;
        match operator.as_str() {
            "$set" => {
                for (path, value) in fields {
                    set_path(document, path, value.clone());
                }
            }
            "$unset" => {
                for path in fields.keys() {
                    unset_path(document, path);
                }
            }
            other => {
                return Err(DriverError::Backend(format!("unsupported update operator {}", other)));
            }
        }
    }
    Ok(())
}
