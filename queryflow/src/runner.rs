//! Executing catalog definitions against a document source.
//!
//! A run is a single request/response call: look the definition up, render
//! its stages verbatim, issue exactly one aggregation, and hand back the
//! store's lazy stream with errors wrapped and cancellation observed. No
//! retries, no fallback queries, no partial-result suppression.

use crate::cancellation::CancellationToken;
use crate::catalog::Catalog;
use crate::errors::{NotFoundError, QueryExecutionError, QueryflowError};
use crate::source::{Document, DocumentSource, DocumentStream};
use crate::stage::Stage;
use crate::utils::{generate_run_id, iso_timestamp};
use futures::stream::Stream;
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::debug;

/// Per-run options.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Cancellation token observed before the query is issued and at each
    /// document boundary of the result stream.
    pub cancellation: Option<Arc<CancellationToken>>,
}

impl RunOptions {
    /// Creates default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: Arc<CancellationToken>) -> Self {
        self.cancellation = Some(token);
        self
    }
}

/// Executes pipeline definitions from a shared catalog.
#[derive(Debug, Clone)]
pub struct Runner {
    catalog: Arc<Catalog>,
}

impl Runner {
    /// Creates a runner over a catalog.
    #[must_use]
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    /// Returns the underlying catalog.
    #[must_use]
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Runs a registered pipeline against a source.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown name (the source is never contacted),
    /// `Execution` wrapping the store cause if the aggregation call fails.
    pub async fn run(
        &self,
        name: &str,
        source: &dyn DocumentSource,
    ) -> Result<ResultStream, QueryflowError> {
        self.run_with_options(name, source, RunOptions::default())
            .await
    }

    /// Runs a registered pipeline with explicit options.
    ///
    /// # Errors
    ///
    /// As [`Runner::run`], plus `Cancelled` if the token was cancelled
    /// before the query was issued.
    pub async fn run_with_options(
        &self,
        name: &str,
        source: &dyn DocumentSource,
        options: RunOptions,
    ) -> Result<ResultStream, QueryflowError> {
        let def = self
            .catalog
            .get(name)
            .ok_or_else(|| NotFoundError::new(name))?;

        if let Some(token) = &options.cancellation {
            if token.is_cancelled() {
                return Err(QueryflowError::Cancelled(cancel_reason(token)));
            }
        }

        let stages: Vec<Value> = def.stages.iter().map(Stage::to_value).collect();
        let run_id = generate_run_id();
        debug!(
            pipeline = %def.name,
            collection = %def.collection,
            run_id = %run_id,
            stage_count = stages.len(),
            started_at = %iso_timestamp(),
            "issuing aggregation"
        );

        let inner = source
            .aggregate(&def.collection, &stages)
            .await
            .map_err(|cause| QueryExecutionError::new(&def.name, &def.collection, cause))?;

        debug!(pipeline = %def.name, run_id = %run_id, "aggregation accepted");

        Ok(ResultStream {
            inner,
            pipeline: def.name.clone(),
            collection: def.collection.clone(),
            cancellation: options.cancellation,
            done: false,
        })
    }
}

fn cancel_reason(token: &CancellationToken) -> String {
    token.reason().unwrap_or_else(|| "cancelled".to_string())
}

/// The lazy result stream of one run.
///
/// Wraps the store's stream: per-document store errors surface as
/// `Execution` errors, cancellation is observed at each document boundary,
/// and the stream fuses after the first error or end of input. Dropping it
/// on any path drops the underlying cursor stream.
pub struct ResultStream {
    inner: DocumentStream,
    pipeline: String,
    collection: String,
    cancellation: Option<Arc<CancellationToken>>,
    done: bool,
}

impl Stream for ResultStream {
    type Item = Result<Document, QueryflowError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        if let Some(token) = &this.cancellation {
            if token.is_cancelled() {
                this.done = true;
                return Poll::Ready(Some(Err(QueryflowError::Cancelled(cancel_reason(token)))));
            }
        }

        match this.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(doc))) => Poll::Ready(Some(Ok(doc))),
            Poll::Ready(Some(Err(cause))) => {
                this.done = true;
                Poll::Ready(Some(Err(QueryExecutionError::new(
                    &this.pipeline,
                    &this.collection,
                    cause,
                )
                .into())))
            }
            Poll::Ready(None) => {
                this.done = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl std::fmt::Debug for ResultStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultStream")
            .field("pipeline", &self.pipeline)
            .field("collection", &self.collection)
            .field("done", &self.done)
            .finish()
    }
}
