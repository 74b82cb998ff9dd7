//! An in-memory document source that evaluates pipelines.
//!
//! Supports the stage kinds and operator vocabulary the built-in catalog
//! uses: dotted-path match predicates (`$eq`, `$ne`, `$gt`, `$gte`, `$lt`,
//! `$lte`, `$exists`, `$size`, `$and`, `$or`), project expressions
//! (`$sum`, `$cond`, `$concat`, `$ifNull`, comparisons), `$sum` group
//! accumulators, and multi-key sorts. Group output order is deterministic
//! (sorted by grouping key).

use crate::expr::Expr;
use crate::source::{Document, DocumentSource, DocumentStream, SourceError};
use crate::stage::{SortOrder, Stage};
use anyhow::anyhow;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::{Map, Number, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// An in-memory store of named collections.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    collections: HashMap<String, Vec<Document>>,
}

impl MemorySource {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a collection of documents.
    #[must_use]
    pub fn with_collection(
        mut self,
        name: impl Into<String>,
        documents: Vec<Document>,
    ) -> Self {
        self.collections.insert(name.into(), documents);
        self
    }

    /// Appends a document to a collection, creating it if needed.
    pub fn insert(&mut self, collection: impl Into<String>, document: Document) {
        self.collections
            .entry(collection.into())
            .or_default()
            .push(document);
    }
}

#[async_trait]
impl DocumentSource for MemorySource {
    async fn aggregate(
        &self,
        collection: &str,
        stages: &[Value],
    ) -> Result<DocumentStream, SourceError> {
        let mut docs = self.collections.get(collection).cloned().unwrap_or_default();
        for raw in stages {
            let stage = Stage::from_value(raw).map_err(|e| -> SourceError { Box::new(e) })?;
            docs = apply_stage(&stage, docs)?;
        }
        let items: Vec<Result<Document, SourceError>> = docs.into_iter().map(Ok).collect();
        Ok(stream::iter(items).boxed())
    }
}

fn apply_stage(stage: &Stage, docs: Vec<Document>) -> Result<Vec<Document>, SourceError> {
    match stage {
        Stage::Match(predicate) => {
            let mut kept = Vec::new();
            for doc in docs {
                if matches(predicate, &doc)? {
                    kept.push(doc);
                }
            }
            Ok(kept)
        }
        Stage::Project(entries) => docs.iter().map(|doc| project(entries, doc)).collect(),
        Stage::Group { id, accumulators } => group(id, accumulators, &docs),
        Stage::Sort(keys) => Ok(sort(keys, docs)),
    }
}

/// Looks a dotted path up in a document.
fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut value = doc.get(segments.next()?)?;
    for segment in segments {
        value = value.as_object()?.get(segment)?;
    }
    Some(value)
}

fn matches(predicate: &Expr, doc: &Document) -> Result<bool, SourceError> {
    match predicate {
        Expr::Map(entries) => {
            for (path, pred) in entries {
                if !field_matches(path, pred, doc)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Expr::Op { name, args } => match name.as_str() {
            "and" => {
                for arg in args {
                    if !matches(arg, doc)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            "or" => {
                for arg in args {
                    if matches(arg, doc)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            other => Err(anyhow!("unsupported match combinator '${other}'").into()),
        },
        other => Err(anyhow!("match predicate must be a document, got {other:?}").into()),
    }
}

fn field_matches(path: &str, pred: &Expr, doc: &Document) -> Result<bool, SourceError> {
    let actual = lookup(doc, path);
    match pred {
        Expr::Literal(expected) => Ok(value_eq(actual, expected)),
        Expr::Map(_) => Ok(actual == Some(&pred.to_value())),
        Expr::Op { name, args } => field_op(name, args, actual),
        Expr::Field(_) => Err(anyhow!("field reference is not a valid predicate").into()),
    }
}

fn field_op(name: &str, args: &[Expr], actual: Option<&Value>) -> Result<bool, SourceError> {
    match name {
        "exists" => match args {
            [Expr::Literal(Value::Bool(wanted))] => Ok(actual.is_some() == *wanted),
            _ => Err(anyhow!("$exists takes a boolean").into()),
        },
        "eq" => Ok(value_eq(actual, &literal_arg(name, args)?)),
        "ne" => Ok(!value_eq(actual, &literal_arg(name, args)?)),
        "gt" | "gte" | "lt" | "lte" => {
            let expected = literal_arg(name, args)?;
            let Some(actual) = actual else {
                return Ok(false);
            };
            let Some(order) = compare_values(actual, &expected) else {
                return Ok(false);
            };
            Ok(match name {
                "gt" => order == Ordering::Greater,
                "gte" => order != Ordering::Less,
                "lt" => order == Ordering::Less,
                _ => order != Ordering::Greater,
            })
        }
        "size" => {
            let expected = literal_arg(name, args)?.as_u64();
            let len = actual.and_then(Value::as_array).map(|a| a.len() as u64);
            Ok(expected.is_some() && len == expected)
        }
        other => Err(anyhow!("unsupported query operator '${other}'").into()),
    }
}

fn literal_arg(name: &str, args: &[Expr]) -> Result<Value, SourceError> {
    match args {
        [Expr::Literal(value)] => Ok(value.clone()),
        // An empty-array operand parses as an empty argument list.
        [] => Ok(Value::Array(Vec::new())),
        _ => Err(anyhow!("${name} takes a single literal operand").into()),
    }
}

fn value_eq(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        Some(value) => values_equal(value, expected),
        None => expected.is_null(),
    }
}

/// Numeric-aware equality: `1` and `1.0` compare equal, as in the store.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => (x - y).abs() < f64::EPSILON,
        _ => a == b,
    }
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}

fn eval(expr: &Expr, doc: &Document) -> Result<Value, SourceError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Field(path) => Ok(lookup(doc, path).cloned().unwrap_or(Value::Null)),
        Expr::Map(entries) => {
            let mut map = Map::new();
            for (key, value) in entries {
                map.insert(key.clone(), eval(value, doc)?);
            }
            Ok(Value::Object(map))
        }
        Expr::Op { name, args } => eval_op(name, args, doc),
    }
}

fn eval_op(name: &str, args: &[Expr], doc: &Document) -> Result<Value, SourceError> {
    match name {
        "sum" => {
            let values: Vec<Value> = args
                .iter()
                .map(|arg| eval(arg, doc))
                .collect::<Result<_, _>>()?;
            Ok(numeric_sum(&values))
        }
        "cond" => {
            let [condition, then, otherwise] = args else {
                return Err(anyhow!("$cond takes three branches").into());
            };
            if truthy(&eval(condition, doc)?) {
                eval(then, doc)
            } else {
                eval(otherwise, doc)
            }
        }
        "ifNull" => {
            let [value, fallback] = args else {
                return Err(anyhow!("$ifNull takes a value and a fallback").into());
            };
            let value = eval(value, doc)?;
            if value.is_null() {
                eval(fallback, doc)
            } else {
                Ok(value)
            }
        }
        "concat" => {
            let mut out = String::new();
            for arg in args {
                match eval(arg, doc)? {
                    Value::Null => return Ok(Value::Null),
                    Value::String(s) => out.push_str(&s),
                    other => {
                        return Err(anyhow!("$concat takes strings, got {other}").into());
                    }
                }
            }
            Ok(Value::String(out))
        }
        "eq" | "ne" | "gt" | "gte" | "lt" | "lte" => {
            let [left, right] = args else {
                return Err(anyhow!("${name} takes two operands").into());
            };
            let left = eval(left, doc)?;
            let right = eval(right, doc)?;
            let equal = values_equal(&left, &right);
            let order = compare_values(&left, &right);
            Ok(Value::Bool(match name {
                "eq" => equal,
                "ne" => !equal,
                "gt" => order == Some(Ordering::Greater),
                "gte" => equal || order == Some(Ordering::Greater),
                "lt" => order == Some(Ordering::Less),
                _ => equal || order == Some(Ordering::Less),
            }))
        }
        other => Err(anyhow!("unsupported aggregation operator '${other}'").into()),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() != Some(0.0),
        _ => true,
    }
}

fn numeric_sum(values: &[Value]) -> Value {
    let mut total = 0.0;
    let mut all_int = true;
    for value in values {
        match value {
            Value::Number(n) => {
                total += n.as_f64().unwrap_or(0.0);
                all_int &= n.is_i64() || n.is_u64();
            }
            Value::Array(items) => {
                if let Value::Number(inner) = numeric_sum(items) {
                    total += inner.as_f64().unwrap_or(0.0);
                    all_int &= inner.is_i64() || inner.is_u64();
                }
            }
            // Non-numeric values are ignored, as the store does.
            _ => {}
        }
    }
    finalize_number(total, all_int)
}

#[allow(clippy::cast_possible_truncation)]
fn finalize_number(total: f64, all_int: bool) -> Value {
    if all_int && total.fract() == 0.0 {
        Value::from(total as i64)
    } else {
        Number::from_f64(total).map_or(Value::Null, Value::Number)
    }
}

fn project(entries: &[(String, Expr)], doc: &Document) -> Result<Document, SourceError> {
    let mut out = Map::new();

    let has_id_entry = entries.iter().any(|(key, _)| key == "_id");
    if !has_id_entry {
        if let Some(id) = doc.get("_id") {
            out.insert("_id".to_string(), id.clone());
        }
    }

    for (key, expr) in entries {
        match expr {
            // Inclusion flags copy the document's own field when present.
            Expr::Literal(flag) if is_inclusion_flag(flag) => {
                if let Some(value) = lookup(doc, key) {
                    out.insert(key.clone(), value.clone());
                }
            }
            Expr::Literal(flag) if key == "_id" && is_exclusion_flag(flag) => {
                out.remove("_id");
            }
            Expr::Field(path) => {
                if let Some(value) = lookup(doc, path) {
                    out.insert(key.clone(), value.clone());
                }
            }
            other => {
                out.insert(key.clone(), eval(other, doc)?);
            }
        }
    }
    Ok(out)
}

fn is_inclusion_flag(value: &Value) -> bool {
    value == &Value::Bool(true) || value.as_i64() == Some(1)
}

fn is_exclusion_flag(value: &Value) -> bool {
    value == &Value::Bool(false) || value.as_i64() == Some(0)
}

fn group(
    id: &Expr,
    accumulators: &[(String, Expr)],
    docs: &[Document],
) -> Result<Vec<Document>, SourceError> {
    struct Bucket {
        id: Value,
        totals: Vec<(f64, bool)>,
    }

    let mut inner_exprs = Vec::with_capacity(accumulators.len());
    for (field, expr) in accumulators {
        let Expr::Op { name, args } = expr else {
            return Err(anyhow!("accumulator '{field}' must be an operator").into());
        };
        if name != "sum" || args.len() != 1 {
            return Err(anyhow!("unsupported accumulator '${name}' for '{field}'").into());
        }
        inner_exprs.push(&args[0]);
    }

    let mut buckets: BTreeMap<String, Bucket> = BTreeMap::new();
    for doc in docs {
        let key_value = eval(id, doc)?;
        let key = key_value.to_string();
        let bucket = buckets.entry(key).or_insert_with(|| Bucket {
            id: key_value,
            totals: vec![(0.0, true); accumulators.len()],
        });

        for (slot, inner) in bucket.totals.iter_mut().zip(&inner_exprs) {
            if let Value::Number(n) = eval(inner, doc)? {
                slot.0 += n.as_f64().unwrap_or(0.0);
                slot.1 &= n.is_i64() || n.is_u64();
            }
        }
    }

    let mut out = Vec::with_capacity(buckets.len());
    for bucket in buckets.into_values() {
        let mut doc = Map::new();
        doc.insert("_id".to_string(), bucket.id);
        for ((field, _), (total, all_int)) in accumulators.iter().zip(bucket.totals) {
            doc.insert(field.clone(), finalize_number(total, all_int));
        }
        out.push(doc);
    }
    Ok(out)
}

fn sort(keys: &[(String, SortOrder)], mut docs: Vec<Document>) -> Vec<Document> {
    docs.sort_by(|a, b| {
        for (path, order) in keys {
            let ordering = match (lookup(a, path), lookup(b, path)) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
            };
            let ordering = match order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
    docs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::document;
    use futures::StreamExt;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    async fn run(source: &MemorySource, collection: &str, stages: Vec<Value>) -> Vec<Document> {
        let mut stream = source.aggregate(collection, &stages).await.unwrap();
        let mut docs = Vec::new();
        while let Some(item) = stream.next().await {
            docs.push(item.unwrap());
        }
        docs
    }

    #[tokio::test]
    async fn test_match_on_dotted_path() {
        let source = MemorySource::new().with_collection(
            "tweets",
            vec![
                document(json!({ "tweet_obj": { "user": { "screen_name": "a" } } })),
                document(json!({ "tweet_obj": { "user": { "screen_name": "b" } } })),
            ],
        );

        let docs = run(
            &source,
            "tweets",
            vec![json!({ "$match": { "tweet_obj.user.screen_name": "a" } })],
        )
        .await;
        assert_eq!(docs.len(), 1);
    }

    #[tokio::test]
    async fn test_group_counts_per_key() {
        let source = MemorySource::new().with_collection(
            "tweets",
            vec![
                document(json!({ "tweet_py_date": "2018-04-01" })),
                document(json!({ "tweet_py_date": "2018-04-01" })),
                document(json!({ "tweet_py_date": "2018-04-02" })),
            ],
        );

        let docs = run(
            &source,
            "tweets",
            vec![json!({ "$group": { "_id": "$tweet_py_date", "count": { "$sum": 1 } } })],
        )
        .await;

        assert_eq!(
            docs,
            vec![
                document(json!({ "_id": "2018-04-01", "count": 2 })),
                document(json!({ "_id": "2018-04-02", "count": 1 })),
            ]
        );
    }

    #[tokio::test]
    async fn test_project_cond_and_if_null() {
        let source = MemorySource::new().with_collection(
            "tweets",
            vec![document(json!({
                "tweet_obj": { "is_quote_status": true },
                "sentimiento": {},
            }))],
        );

        let docs = run(
            &source,
            "tweets",
            vec![json!({ "$project": {
                "quoted": { "$cond": [
                    { "$eq": ["$tweet_obj.is_quote_status", true] }, 1, 0,
                ] },
                "sentiment": { "$ifNull": ["$sentimiento.score", "Unspecified"] },
            } })],
        )
        .await;

        assert_eq!(
            docs,
            vec![document(json!({ "quoted": 1, "sentiment": "Unspecified" }))]
        );
    }

    #[tokio::test]
    async fn test_sort_descending() {
        let source = MemorySource::new().with_collection(
            "users",
            vec![
                document(json!({ "party": "anr" })),
                document(json!({ "party": "plra" })),
            ],
        );

        let docs = run(
            &source,
            "users",
            vec![json!({ "$sort": { "party": -1 } })],
        )
        .await;
        assert_eq!(docs[0].get("party").unwrap(), "plra");
    }

    #[tokio::test]
    async fn test_exists_and_size_predicates() {
        let source = MemorySource::new().with_collection(
            "tweets",
            vec![
                document(json!({ "urls": ["a", "b"], "media": 1 })),
                document(json!({ "urls": [] })),
            ],
        );

        let docs = run(
            &source,
            "tweets",
            vec![json!({ "$match": {
                "media": { "$exists": false },
                "urls": { "$ne": [] },
            } })],
        )
        .await;
        assert!(docs.is_empty());

        let docs = run(
            &source,
            "tweets",
            vec![json!({ "$match": { "urls": { "$size": 2 } } })],
        )
        .await;
        assert_eq!(docs.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_collection_is_empty() {
        let source = MemorySource::new();
        let docs = run(&source, "nowhere", vec![]).await;
        assert!(docs.is_empty());
    }
}
