//! The document-store seam.
//!
//! The runner consumes, and never implements, an aggregation capability:
//! given a collection name and rendered stage documents, a source returns a
//! lazy stream of result documents or a store-level error. Timeouts belong
//! to the store client behind this trait; the runner only propagates
//! cancellation and wraps errors.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value;

/// A result document as returned by the store.
pub type Document = serde_json::Map<String, Value>;

/// A store-level error cause.
pub type SourceError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A lazy, finite stream of result documents.
///
/// Not restartable; re-running a pipeline re-issues the query. Dropping the
/// stream releases the underlying cursor.
pub type DocumentStream = BoxStream<'static, Result<Document, SourceError>>;

/// An aggregation-capable document store.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Executes an aggregation pipeline against a collection.
    ///
    /// The stage documents arrive rendered and in order; implementations
    /// must not reorder or coalesce them.
    async fn aggregate(
        &self,
        collection: &str,
        stages: &[Value],
    ) -> Result<DocumentStream, SourceError>;
}

/// A source with no data; every aggregation yields an empty stream.
///
/// Useful as a default collaborator in wiring and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSource;

#[async_trait]
impl DocumentSource for NullSource {
    async fn aggregate(
        &self,
        _collection: &str,
        _stages: &[Value],
    ) -> Result<DocumentStream, SourceError> {
        Ok(stream::empty().boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_source_is_empty() {
        let source = NullSource;
        let mut stream = source.aggregate("tweets", &[]).await.unwrap();
        assert!(stream.next().await.is_none());
    }
}
