//! Error types for the queryflow library.
//!
//! The taxonomy mirrors the failure modes of the catalog and runner:
//! registration collisions, unknown lookups, malformed definitions, and
//! store-level execution failures. All failures surface to the immediate
//! caller; nothing is retried or silently degraded.

use crate::source::SourceError;
use thiserror::Error;

/// The main error type for queryflow operations.
#[derive(Debug, Error)]
pub enum QueryflowError {
    /// A pipeline name was already registered.
    #[error("{0}")]
    Duplicate(#[from] DuplicateNameError),

    /// An unknown pipeline name was requested.
    #[error("{0}")]
    NotFound(#[from] NotFoundError),

    /// The document store failed while executing a pipeline.
    #[error("{0}")]
    Execution(#[from] QueryExecutionError),

    /// A run was cancelled before or during execution.
    #[error("query cancelled: {0}")]
    Cancelled(String),

    /// A pipeline definition was malformed.
    #[error("{0}")]
    Definition(#[from] DefinitionError),

    /// Catalog configuration could not be loaded.
    #[error("{0}")]
    Config(#[from] ConfigError),
}

/// Error raised when registering a pipeline under a name already in use.
///
/// The registration that collides is rejected; the existing definition is
/// retained untouched.
#[derive(Debug, Clone, Error)]
#[error("pipeline '{name}' is already registered")]
pub struct DuplicateNameError {
    /// The colliding pipeline name.
    pub name: String,
}

impl DuplicateNameError {
    /// Creates a new duplicate-name error.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Error raised when a requested pipeline name is not in the catalog.
#[derive(Debug, Clone, Error)]
#[error("no pipeline registered under '{name}'")]
pub struct NotFoundError {
    /// The unknown pipeline name.
    pub name: String,
}

impl NotFoundError {
    /// Creates a new not-found error.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Error raised when the document store fails while executing a pipeline.
///
/// The store-level cause is attached as the error source and is never
/// swallowed. Covers malformed stages, type mismatches, and connectivity
/// loss alike; the distinction lives in the wrapped cause.
#[derive(Debug, Error)]
#[error("query '{pipeline}' failed against collection '{collection}'")]
pub struct QueryExecutionError {
    /// The pipeline that was running.
    pub pipeline: String,
    /// The target collection.
    pub collection: String,
    /// The underlying store error.
    #[source]
    pub source: SourceError,
}

impl QueryExecutionError {
    /// Creates a new execution error wrapping a store-level cause.
    #[must_use]
    pub fn new(
        pipeline: impl Into<String>,
        collection: impl Into<String>,
        source: SourceError,
    ) -> Self {
        Self {
            pipeline: pipeline.into(),
            collection: collection.into(),
            source,
        }
    }
}

/// Error raised when a pipeline definition is syntactically malformed.
#[derive(Debug, Clone, Error)]
#[error("invalid pipeline definition: {message}")]
pub struct DefinitionError {
    /// What was malformed.
    pub message: String,
}

impl DefinitionError {
    /// Creates a new definition error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors raised while loading a catalog configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read catalog config: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration was not valid JSON.
    #[error("failed to parse catalog config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A definition in the configuration was malformed.
    #[error("{0}")]
    Definition(#[from] DefinitionError),

    /// Two definitions in the configuration share a name.
    #[error("{0}")]
    Duplicate(#[from] DuplicateNameError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_name_display() {
        let err = DuplicateNameError::new("activity_per_type_of_bots");
        assert_eq!(
            err.to_string(),
            "pipeline 'activity_per_type_of_bots' is already registered"
        );
    }

    #[test]
    fn test_not_found_display() {
        let err = NotFoundError::new("missing");
        assert_eq!(err.to_string(), "no pipeline registered under 'missing'");
    }

    #[test]
    fn test_execution_error_keeps_cause() {
        let cause: SourceError = "connection reset".into();
        let err = QueryExecutionError::new("tweets_with_links", "tweets", cause);

        assert!(err.to_string().contains("tweets_with_links"));
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("connection reset"));
    }

    #[test]
    fn test_top_level_conversions() {
        let err: QueryflowError = NotFoundError::new("x").into();
        assert!(matches!(err, QueryflowError::NotFound(_)));

        let err: QueryflowError = DuplicateNameError::new("x").into();
        assert!(matches!(err, QueryflowError::Duplicate(_)));
    }
}
