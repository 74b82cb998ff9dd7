//! Aggregation expression tree.
//!
//! Expressions mirror the document store's aggregation language without
//! coupling to any client library's types: a value is either a literal, a
//! reference to a document field, an operator applied to nested expressions,
//! or a keyed sub-document. No semantic validation happens here; anything
//! syntactically well-formed is rendered verbatim and the store decides
//! validity.
//!
//! Rendering produces one canonical wire shape. Parsing accepts the messier
//! conventions found in hand-exported queries (`$exists: 0`, documents mixing
//! field keys with `$and`/`$or` at the top level) and normalizes them into
//! the same canonical grammar.

use crate::errors::DefinitionError;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// A node in an aggregation expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal value, rendered as-is.
    ///
    /// String literals beginning with `$` render wrapped in `$literal` so the
    /// store does not misread them as field paths.
    Literal(Value),

    /// A reference to a document field by dotted path, rendered `"$path"`.
    Field(String),

    /// An operator applied to nested expressions, rendered `{"$name": args}`.
    ///
    /// A single argument renders bare; multiple arguments render as an
    /// array. The operator name is carried as data so the tree stays open to
    /// any operator the store understands.
    Op {
        /// The operator name, without the leading `$`.
        name: String,
        /// The operand expressions.
        args: Vec<Expr>,
    },

    /// A keyed sub-document of expressions, in insertion order.
    Map(Vec<(String, Expr)>),
}

impl Expr {
    /// Creates a literal expression.
    #[must_use]
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    /// Creates a field reference from a dotted path (no leading `$`).
    #[must_use]
    pub fn field(path: impl Into<String>) -> Self {
        Self::Field(path.into())
    }

    /// Creates an operator application.
    #[must_use]
    pub fn op(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::Op {
            name: name.into(),
            args,
        }
    }

    /// Creates a keyed sub-document.
    #[must_use]
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Expr)>) -> Self {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        )
    }

    /// `$and` over the given predicates.
    #[must_use]
    pub fn and(predicates: Vec<Expr>) -> Self {
        Self::op("and", predicates)
    }

    /// `$or` over the given predicates.
    #[must_use]
    pub fn or(predicates: Vec<Expr>) -> Self {
        Self::op("or", predicates)
    }

    /// `$exists` field predicate.
    #[must_use]
    pub fn exists(yes: bool) -> Self {
        Self::op("exists", vec![Self::literal(yes)])
    }

    /// `$sum` over a single expression.
    #[must_use]
    pub fn sum(expr: Expr) -> Self {
        Self::op("sum", vec![expr])
    }

    /// `$cond` in canonical array form.
    #[must_use]
    pub fn cond(condition: Expr, then: Expr, otherwise: Expr) -> Self {
        Self::op("cond", vec![condition, then, otherwise])
    }

    /// `$concat` over the given expressions.
    #[must_use]
    pub fn concat(parts: Vec<Expr>) -> Self {
        Self::op("concat", parts)
    }

    /// `$ifNull` with a fallback.
    #[must_use]
    pub fn if_null(expr: Expr, fallback: Expr) -> Self {
        Self::op("ifNull", vec![expr, fallback])
    }

    /// Renders the expression in its canonical wire shape.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Literal(Value::String(s)) if s.starts_with('$') => {
                let mut map = Map::new();
                map.insert("$literal".to_string(), Value::String(s.clone()));
                Value::Object(map)
            }
            Self::Literal(value) => value.clone(),
            Self::Field(path) => Value::String(format!("${path}")),
            Self::Op { name, args } => {
                // Logical and membership operators always take an array.
                let always_array = matches!(name.as_str(), "and" | "or" | "nor" | "in" | "nin");
                let rendered = if args.len() == 1 && !always_array {
                    args[0].to_value()
                } else {
                    Value::Array(args.iter().map(Self::to_value).collect())
                };
                let mut map = Map::new();
                map.insert(format!("${name}"), rendered);
                Value::Object(map)
            }
            Self::Map(entries) => {
                let mut map = Map::new();
                for (key, expr) in entries {
                    map.insert(key.clone(), expr.to_value());
                }
                Value::Object(map)
            }
        }
    }

    /// Parses an expression from its wire shape.
    ///
    /// Non-canonical conventions are normalized: numeric `$exists` arguments
    /// become booleans, and documents mixing field keys with operator keys
    /// collapse into a single `$and`.
    pub fn from_value(value: &Value) -> Result<Self, DefinitionError> {
        match value {
            Value::String(s) if s.starts_with('$') && !s.starts_with("$$") => {
                Ok(Self::Field(s[1..].to_string()))
            }
            Value::Object(map) => Self::from_object(map),
            other => Ok(Self::Literal(other.clone())),
        }
    }

    fn from_object(map: &Map<String, Value>) -> Result<Self, DefinitionError> {
        if map.len() == 1 {
            if let Some(literal) = map.get("$literal") {
                return Ok(Self::Literal(literal.clone()));
            }
        }

        let has_operator = map.keys().any(|k| k.starts_with('$'));
        let has_field = map.keys().any(|k| !k.starts_with('$'));

        if has_operator && !has_field && map.len() == 1 {
            let (key, raw_args) = map
                .iter()
                .next()
                .ok_or_else(|| DefinitionError::new("empty operator document"))?;
            return Self::parse_operator(&key[1..], raw_args);
        }

        if has_operator {
            // Mixed field and operator keys: canonicalize into a single $and,
            // splicing nested $and branches flat.
            let mut branches = Vec::new();
            for (key, raw) in map {
                if let Some(name) = key.strip_prefix('$') {
                    match Self::parse_operator(name, raw)? {
                        Self::Op { name, args } if name == "and" => branches.extend(args),
                        other => branches.push(other),
                    }
                } else {
                    branches.push(Self::Map(vec![(key.clone(), Self::from_value(raw)?)]));
                }
            }
            return Ok(Self::and(branches));
        }

        let mut entries = Vec::with_capacity(map.len());
        for (key, raw) in map {
            entries.push((key.clone(), Self::from_value(raw)?));
        }
        Ok(Self::Map(entries))
    }

    fn parse_operator(name: &str, raw_args: &Value) -> Result<Self, DefinitionError> {
        if name.is_empty() {
            return Err(DefinitionError::new("operator name is empty"));
        }

        let args = match raw_args {
            Value::Array(items) => items
                .iter()
                .map(Self::from_value)
                .collect::<Result<Vec<_>, _>>()?,
            other => vec![Self::from_value(other)?],
        };

        // Hand-exported queries use 0/1 for $exists; canonicalize to booleans.
        if name == "exists" {
            if let [Self::Literal(Value::Number(n))] = args.as_slice() {
                return Ok(Self::exists(n.as_i64() != Some(0)));
            }
        }

        // $cond also appears in keyed form; canonicalize to the array form.
        if name == "cond" {
            if let [Self::Map(entries)] = args.as_slice() {
                let branch = |wanted: &str| {
                    entries
                        .iter()
                        .find(|(key, _)| key == wanted)
                        .map(|(_, expr)| expr.clone())
                };
                if let (Some(condition), Some(then), Some(otherwise)) =
                    (branch("if"), branch("then"), branch("else"))
                {
                    return Ok(Self::cond(condition, then, otherwise));
                }
            }
        }

        Ok(Self::Op {
            name: name.to_string(),
            args,
        })
    }
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Expr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).map_err(D::Error::custom)
    }
}
