//! Pipeline stage types.
//!
//! A stage is one step of an aggregation pipeline: filter, reshape,
//! group-and-aggregate, or sort. Stages render to the store's wire documents
//! (`{"$match": ...}` and friends) and parse back from them.

use crate::errors::DefinitionError;
use crate::expr::Expr;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Sort direction for a sort-stage key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending, wire form `1`.
    Ascending,
    /// Descending, wire form `-1`.
    Descending,
}

impl SortOrder {
    fn to_value(self) -> Value {
        match self {
            Self::Ascending => Value::from(1),
            Self::Descending => Value::from(-1),
        }
    }

    fn from_value(value: &Value) -> Result<Self, DefinitionError> {
        match value.as_i64() {
            Some(1) => Ok(Self::Ascending),
            Some(-1) => Ok(Self::Descending),
            _ => Err(DefinitionError::new(format!(
                "sort direction must be 1 or -1, got {value}"
            ))),
        }
    }
}

/// One stage of an aggregation pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Filter documents by a predicate expression.
    Match(Expr),

    /// Reshape documents; entries are evaluated in order.
    Project(Vec<(String, Expr)>),

    /// Group documents by a key expression and accumulate fields.
    Group {
        /// The grouping key expression (`_id`).
        id: Expr,
        /// Accumulator expressions keyed by output field.
        accumulators: Vec<(String, Expr)>,
    },

    /// Sort documents by the given keys, in order.
    Sort(Vec<(String, SortOrder)>),
}

impl Stage {
    /// Creates a match stage.
    #[must_use]
    pub fn match_on(predicate: Expr) -> Self {
        Self::Match(predicate)
    }

    /// Creates a project stage.
    #[must_use]
    pub fn project<K: Into<String>>(entries: impl IntoIterator<Item = (K, Expr)>) -> Self {
        Self::Project(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Creates a group stage.
    #[must_use]
    pub fn group<K: Into<String>>(
        id: Expr,
        accumulators: impl IntoIterator<Item = (K, Expr)>,
    ) -> Self {
        Self::Group {
            id,
            accumulators: accumulators.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Creates a sort stage.
    #[must_use]
    pub fn sort<K: Into<String>>(keys: impl IntoIterator<Item = (K, SortOrder)>) -> Self {
        Self::Sort(keys.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Renders the stage as its wire document.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let (key, body) = match self {
            Self::Match(predicate) => ("$match", predicate.to_value()),
            Self::Project(entries) => {
                let mut map = Map::new();
                for (field, expr) in entries {
                    map.insert(field.clone(), expr.to_value());
                }
                ("$project", Value::Object(map))
            }
            Self::Group { id, accumulators } => {
                let mut map = Map::new();
                map.insert("_id".to_string(), id.to_value());
                for (field, expr) in accumulators {
                    map.insert(field.clone(), expr.to_value());
                }
                ("$group", Value::Object(map))
            }
            Self::Sort(keys) => {
                let mut map = Map::new();
                for (field, order) in keys {
                    map.insert(field.clone(), order.to_value());
                }
                ("$sort", Value::Object(map))
            }
        };

        let mut stage = Map::new();
        stage.insert(key.to_string(), body);
        Value::Object(stage)
    }

    /// Parses a stage from its wire document.
    pub fn from_value(value: &Value) -> Result<Self, DefinitionError> {
        let map = value
            .as_object()
            .ok_or_else(|| DefinitionError::new(format!("stage must be a document, got {value}")))?;
        if map.len() != 1 {
            return Err(DefinitionError::new(
                "stage document must have exactly one operator key",
            ));
        }
        let (key, body) = map
            .iter()
            .next()
            .ok_or_else(|| DefinitionError::new("empty stage document"))?;

        match key.as_str() {
            "$match" => Ok(Self::Match(Expr::from_value(body)?)),
            "$project" => {
                let body = Self::stage_body(key, body)?;
                let mut entries = Vec::with_capacity(body.len());
                for (field, raw) in body {
                    entries.push((field.clone(), Expr::from_value(raw)?));
                }
                Ok(Self::Project(entries))
            }
            "$group" => {
                let body = Self::stage_body(key, body)?;
                let id = body
                    .get("_id")
                    .ok_or_else(|| DefinitionError::new("$group stage is missing _id"))?;
                let id = Expr::from_value(id)?;
                let mut accumulators = Vec::new();
                for (field, raw) in body {
                    if field != "_id" {
                        accumulators.push((field.clone(), Expr::from_value(raw)?));
                    }
                }
                Ok(Self::Group { id, accumulators })
            }
            "$sort" => {
                let body = Self::stage_body(key, body)?;
                let mut keys = Vec::with_capacity(body.len());
                for (field, raw) in body {
                    keys.push((field.clone(), SortOrder::from_value(raw)?));
                }
                Ok(Self::Sort(keys))
            }
            other => Err(DefinitionError::new(format!(
                "unsupported stage operator '{other}'"
            ))),
        }
    }

    fn stage_body<'a>(
        key: &str,
        body: &'a Value,
    ) -> Result<&'a Map<String, Value>, DefinitionError> {
        body.as_object()
            .ok_or_else(|| DefinitionError::new(format!("{key} body must be a document")))
    }
}

impl Serialize for Stage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Stage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).map_err(D::Error::custom)
    }
}
