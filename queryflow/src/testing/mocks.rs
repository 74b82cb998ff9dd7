//! Recording and failing sources.

use crate::source::{Document, DocumentSource, DocumentStream, SourceError};
use anyhow::anyhow;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;

/// One recorded `aggregate` call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// The collection that was queried.
    pub collection: String,
    /// The stage documents exactly as received.
    pub stages: Vec<Value>,
}

/// A source that records every call and echoes back canned documents.
#[derive(Debug, Default)]
pub struct RecordingSource {
    calls: Mutex<Vec<RecordedCall>>,
    documents: Mutex<Vec<Document>>,
    trailing_error: Option<String>,
}

impl RecordingSource {
    /// Creates a source with no canned documents.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the documents every call streams back.
    #[must_use]
    pub fn with_documents(self, documents: Vec<Document>) -> Self {
        *self.documents.lock() = documents;
        self
    }

    /// Makes every returned stream end with a store error after the canned
    /// documents.
    #[must_use]
    pub fn with_trailing_error(mut self, message: impl Into<String>) -> Self {
        self.trailing_error = Some(message.into());
        self
    }

    /// Returns the number of `aggregate` calls received.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns the recorded calls.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Clears recorded calls.
    pub fn reset(&self) {
        self.calls.lock().clear();
    }
}

#[async_trait]
impl DocumentSource for RecordingSource {
    async fn aggregate(
        &self,
        collection: &str,
        stages: &[Value],
    ) -> Result<DocumentStream, SourceError> {
        self.calls.lock().push(RecordedCall {
            collection: collection.to_string(),
            stages: stages.to_vec(),
        });

        let mut items: Vec<Result<Document, SourceError>> =
            self.documents.lock().iter().cloned().map(Ok).collect();
        if let Some(message) = &self.trailing_error {
            items.push(Err(anyhow!("{message}").into()));
        }
        Ok(stream::iter(items).boxed())
    }
}

/// A source whose `aggregate` call always fails.
#[derive(Debug, Clone)]
pub struct FailingSource {
    message: String,
}

impl FailingSource {
    /// Creates a source failing with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl DocumentSource for FailingSource {
    async fn aggregate(
        &self,
        _collection: &str,
        _stages: &[Value],
    ) -> Result<DocumentStream, SourceError> {
        Err(anyhow!("{}", self.message).into())
    }
}
