//! Pipeline definitions.
//!
//! A definition names a target collection and an ordered stage sequence. It
//! is immutable once registered; the builder methods consume and return the
//! value so construction reads as a single expression.

use crate::errors::DefinitionError;
use crate::stage::Stage;
use serde::{Deserialize, Serialize};

/// A named, immutable aggregation-pipeline definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDef {
    /// The unique catalog name of the pipeline.
    pub name: String,
    /// The target collection.
    pub collection: String,
    /// The ordered stage sequence.
    #[serde(default)]
    pub stages: Vec<Stage>,
}

impl PipelineDef {
    /// Creates a definition with no stages.
    #[must_use]
    pub fn new(name: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collection: collection.into(),
            stages: Vec::new(),
        }
    }

    /// Appends a stage.
    #[must_use]
    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Replaces the stage sequence.
    #[must_use]
    pub fn with_stages(mut self, stages: impl IntoIterator<Item = Stage>) -> Self {
        self.stages = stages.into_iter().collect();
        self
    }

    /// Validates the definition.
    ///
    /// # Errors
    ///
    /// Returns an error if the name or collection is empty or
    /// whitespace-only. An empty stage sequence is allowed; it asks the
    /// store for the collection unchanged.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.name.trim().is_empty() {
            return Err(DefinitionError::new(
                "pipeline name cannot be empty or whitespace-only",
            ));
        }
        if self.collection.trim().is_empty() {
            return Err(DefinitionError::new(format!(
                "pipeline '{}' has an empty collection name",
                self.name
            )));
        }
        Ok(())
    }

    /// Renders the stage sequence as wire documents, in order.
    #[must_use]
    pub fn rendered_stages(&self) -> Vec<serde_json::Value> {
        self.stages.iter().map(Stage::to_value).collect()
    }
}
