//! Rich query engine
//!
//! Evaluates selector-based queries over JSON documents. The accepted
//! language is a subset of CouchDB Mango:
//!
//! - `selector` (required): implicit equality, nested objects as dotted
//!   paths, `$and`, `$or`, `$not`, `$eq`, `$ne`, `$gt`, `$gte`, `$lt`,
//!   `$lte`, `$in`, `$nin`, `$exists`
//! - `sort`: array of `"field"` or `{"field": "asc"|"desc"}`
//! - `limit`, `skip`: non-negative integers
//! - `fields`: projection onto the listed paths
//! - `use_index`: design document name, or `[ddoc, name]`
//!
//! Comparisons follow CouchDB collation: `null < false < true < numbers <
//! strings < arrays < objects`. A condition on a field the document does not
//! have never matches, except `$exists: false`.
//!
//! Stored values that are not JSON are skipped. Without a `sort` clause
//! results come back in key order. Without a `fields` clause stored bytes are
//! returned untouched.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use sealbook_core::{KeyValue, StoreError, StoreResult};

use crate::index_def::SortDirection;

const DESIGN_PREFIX: &str = "_design/";

/// Comparison applied to one field
#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Exists(bool),
}

/// Parsed selector tree
#[derive(Debug, Clone, PartialEq)]
enum Selector {
    All(Vec<Selector>),
    Any(Vec<Selector>),
    Not(Box<Selector>),
    Field {
        path: Vec<String>,
        condition: Condition,
    },
}

/// A parsed rich query
#[derive(Debug, Clone, PartialEq)]
pub struct RichQuery {
    selector: Selector,
    sort: Vec<(Vec<String>, SortDirection)>,
    limit: Option<usize>,
    skip: usize,
    fields: Option<Vec<Vec<String>>>,
    use_index: Option<Vec<String>>,
}

fn malformed(message: impl Into<String>) -> StoreError {
    StoreError::MalformedQuery(message.into())
}

fn split_path(path: &str) -> Vec<String> {
    path.split('.').map(str::to_string).collect()
}

impl RichQuery {
    /// Parse a query string
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MalformedQuery`] if the string is not a JSON
    /// object, lacks a `selector`, or uses an unsupported clause or operator.
    pub fn parse(query: &str) -> StoreResult<Self> {
        let value: Value = serde_json::from_str(query)
            .map_err(|e| malformed(format!("query is not valid JSON: {}", e)))?;
        let Value::Object(clauses) = value else {
            return Err(malformed("query must be a JSON object"));
        };

        let mut selector = None;
        let mut query = RichQuery {
            selector: Selector::All(Vec::new()),
            sort: Vec::new(),
            limit: None,
            skip: 0,
            fields: None,
            use_index: None,
        };

        for (clause, value) in clauses {
            match clause.as_str() {
                "selector" => selector = Some(parse_selector(&value)?),
                "sort" => query.sort = parse_sort(&value)?,
                "limit" => query.limit = Some(parse_count("limit", &value)?),
                "skip" => query.skip = parse_count("skip", &value)?,
                "fields" => query.fields = Some(parse_fields(&value)?),
                "use_index" => query.use_index = Some(parse_use_index(&value)?),
                other => return Err(malformed(format!("unsupported clause '{}'", other))),
            }
        }

        query.selector = selector.ok_or_else(|| malformed("query has no selector"))?;
        Ok(query)
    }

    /// Design document named by `use_index`, without the `_design/` prefix
    pub fn use_index_ddoc(&self) -> Option<&str> {
        self.use_index
            .as_ref()
            .and_then(|parts| parts.first())
            .map(|ddoc| ddoc.strip_prefix(DESIGN_PREFIX).unwrap_or(ddoc))
    }

    /// Index name named by `use_index`, if the array form was used
    pub fn use_index_name(&self) -> Option<&str> {
        self.use_index
            .as_ref()
            .and_then(|parts| parts.get(1))
            .map(String::as_str)
    }

    /// Whether a document matches the selector
    pub fn matches(&self, document: &Value) -> bool {
        self.selector.matches(document)
    }

    /// Evaluate the query over entries given in key order
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if a projected document cannot be
    /// serialized.
    pub fn execute(&self, entries: Vec<KeyValue>) -> StoreResult<Vec<KeyValue>> {
        let mut matched: Vec<(KeyValue, Value)> = entries
            .into_iter()
            .filter_map(|entry| {
                let document: Value = serde_json::from_slice(&entry.value).ok()?;
                self.matches(&document).then_some((entry, document))
            })
            .collect();

        if !self.sort.is_empty() {
            matched.sort_by(|(_, a), (_, b)| self.compare_for_sort(a, b));
        }

        let window = matched
            .into_iter()
            .skip(self.skip)
            .take(self.limit.unwrap_or(usize::MAX));

        match &self.fields {
            None => Ok(window.map(|(entry, _)| entry).collect()),
            Some(fields) => window
                .map(|(entry, document)| {
                    let projected = project(&document, fields);
                    let value = serde_json::to_vec(&projected)
                        .map_err(|e| StoreError::backend(format!("projection failed: {}", e)))?;
                    Ok(KeyValue::new(entry.key, value))
                })
                .collect(),
        }
    }

    fn compare_for_sort(&self, a: &Value, b: &Value) -> Ordering {
        for (path, direction) in &self.sort {
            let ordering = match (lookup(a, path), lookup(b, path)) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(x), Some(y)) => collate(x, y),
            };
            let ordering = match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

fn parse_selector(value: &Value) -> StoreResult<Selector> {
    let Value::Object(map) = value else {
        return Err(malformed("selector must be a JSON object"));
    };
    let mut parts = Vec::new();
    for (key, value) in map {
        match key.as_str() {
            "$and" => parts.push(Selector::All(parse_selector_list(key, value)?)),
            "$or" => parts.push(Selector::Any(parse_selector_list(key, value)?)),
            "$not" => parts.push(Selector::Not(Box::new(parse_selector(value)?))),
            op if op.starts_with('$') => {
                return Err(malformed(format!("unsupported combination operator '{}'", op)))
            }
            field => parse_field(split_path(field), value, &mut parts)?,
        }
    }
    Ok(match parts.len() {
        1 => parts.remove(0),
        _ => Selector::All(parts),
    })
}

fn parse_selector_list(op: &str, value: &Value) -> StoreResult<Vec<Selector>> {
    let Value::Array(items) = value else {
        return Err(malformed(format!("'{}' expects an array of selectors", op)));
    };
    items.iter().map(parse_selector).collect()
}

fn parse_field(path: Vec<String>, value: &Value, parts: &mut Vec<Selector>) -> StoreResult<()> {
    let Value::Object(map) = value else {
        parts.push(Selector::Field {
            path,
            condition: Condition::Eq(value.clone()),
        });
        return Ok(());
    };
    if map.is_empty() {
        parts.push(Selector::Field {
            path,
            condition: Condition::Eq(value.clone()),
        });
        return Ok(());
    }
    if !map.keys().any(|k| k.starts_with('$')) {
        for (key, nested) in map {
            let mut nested_path = path.clone();
            nested_path.extend(split_path(key));
            parse_field(nested_path, nested, parts)?;
        }
        return Ok(());
    }
    for (op, operand) in map {
        let condition = match op.as_str() {
            "$eq" => Condition::Eq(operand.clone()),
            "$ne" => Condition::Ne(operand.clone()),
            "$gt" => Condition::Gt(operand.clone()),
            "$gte" => Condition::Gte(operand.clone()),
            "$lt" => Condition::Lt(operand.clone()),
            "$lte" => Condition::Lte(operand.clone()),
            "$in" => Condition::In(operand_list(op, operand)?),
            "$nin" => Condition::Nin(operand_list(op, operand)?),
            "$exists" => match operand {
                Value::Bool(b) => Condition::Exists(*b),
                _ => return Err(malformed("'$exists' expects a boolean")),
            },
            "$not" => {
                let mut inner = Vec::new();
                parse_field(path.clone(), operand, &mut inner)?;
                parts.push(Selector::Not(Box::new(Selector::All(inner))));
                continue;
            }
            other if other.starts_with('$') => {
                return Err(malformed(format!("unsupported operator '{}'", other)))
            }
            other => {
                return Err(malformed(format!(
                    "field '{}' mixes operators with sub-field '{}'",
                    path.join("."),
                    other
                )))
            }
        };
        parts.push(Selector::Field {
            path: path.clone(),
            condition,
        });
    }
    Ok(())
}

fn operand_list(op: &str, operand: &Value) -> StoreResult<Vec<Value>> {
    match operand {
        Value::Array(items) => Ok(items.clone()),
        _ => Err(malformed(format!("'{}' expects an array", op))),
    }
}

fn parse_sort(value: &Value) -> StoreResult<Vec<(Vec<String>, SortDirection)>> {
    let Value::Array(items) = value else {
        return Err(malformed("sort must be an array"));
    };
    items
        .iter()
        .map(|item| match item {
            Value::String(field) => Ok((split_path(field), SortDirection::Asc)),
            Value::Object(map) if map.len() == 1 => {
                let (field, direction) = map
                    .iter()
                    .next()
                    .ok_or_else(|| malformed("empty sort entry"))?;
                let direction = match direction.as_str() {
                    Some("asc") => SortDirection::Asc,
                    Some("desc") => SortDirection::Desc,
                    _ => return Err(malformed(format!("bad sort direction for '{}'", field))),
                };
                Ok((split_path(field), direction))
            }
            _ => Err(malformed("sort entries must be a field name or {field: direction}")),
        })
        .collect()
}

fn parse_count(clause: &str, value: &Value) -> StoreResult<usize> {
    value
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| malformed(format!("'{}' must be a non-negative integer", clause)))
}

fn parse_fields(value: &Value) -> StoreResult<Vec<Vec<String>>> {
    let Value::Array(items) = value else {
        return Err(malformed("fields must be an array"));
    };
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(split_path)
                .ok_or_else(|| malformed("fields entries must be strings"))
        })
        .collect()
}

fn parse_use_index(value: &Value) -> StoreResult<Vec<String>> {
    match value {
        Value::String(ddoc) => Ok(vec![ddoc.clone()]),
        Value::Array(items) if (1..=2).contains(&items.len()) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| malformed("use_index entries must be strings"))
            })
            .collect(),
        _ => Err(malformed("use_index must be a string or [ddoc, name]")),
    }
}

impl Selector {
    fn matches(&self, document: &Value) -> bool {
        match self {
            Selector::All(parts) => parts.iter().all(|s| s.matches(document)),
            Selector::Any(parts) => parts.iter().any(|s| s.matches(document)),
            Selector::Not(inner) => !inner.matches(document),
            Selector::Field { path, condition } => {
                let found = lookup(document, path);
                if let Condition::Exists(expected) = condition {
                    return found.is_some() == *expected;
                }
                match found {
                    Some(value) => condition.matches(value),
                    None => false,
                }
            }
        }
    }
}

impl Condition {
    fn matches(&self, value: &Value) -> bool {
        match self {
            Condition::Eq(x) => collate(value, x) == Ordering::Equal,
            Condition::Ne(x) => collate(value, x) != Ordering::Equal,
            Condition::Gt(x) => collate(value, x) == Ordering::Greater,
            Condition::Gte(x) => collate(value, x) != Ordering::Less,
            Condition::Lt(x) => collate(value, x) == Ordering::Less,
            Condition::Lte(x) => collate(value, x) != Ordering::Greater,
            Condition::In(xs) => xs.iter().any(|x| collate(value, x) == Ordering::Equal),
            Condition::Nin(xs) => xs.iter().all(|x| collate(value, x) != Ordering::Equal),
            Condition::Exists(_) => true,
        }
    }
}

fn lookup<'a>(document: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter()
        .try_fold(document, |current, segment| current.as_object()?.get(segment))
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values following CouchDB view collation
fn collate(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y.iter())
            .map(|(l, r)| collate(l, r))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Value::Object(x), Value::Object(y)) => x
            .iter()
            .zip(y.iter())
            .map(|((lk, lv), (rk, rv))| lk.cmp(rk).then_with(|| collate(lv, rv)))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn project(document: &Value, fields: &[Vec<String>]) -> Value {
    let mut out = Map::new();
    for path in fields {
        if let Some(value) = lookup(document, path) {
            insert_path(&mut out, path, value.clone());
        }
    }
    Value::Object(out)
}

fn insert_path(target: &mut Map<String, Value>, path: &[String], value: Value) {
    match path {
        [] => {}
        [last] => {
            target.insert(last.clone(), value);
        }
        [head, rest @ ..] => {
            let slot = target
                .entry(head.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(next) = slot {
                insert_path(next, rest, value);
            }
        }
    }
}
