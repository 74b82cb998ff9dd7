//! Loading pipeline definitions from configuration.
//!
//! A catalog configuration is a JSON document with a `pipelines` array;
//! each entry is a definition in wire form (name, collection, stage
//! documents). Loading happens once at startup and the resulting catalog is
//! immutable.

use crate::catalog::Catalog;
use crate::definition::PipelineDef;
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A set of pipeline definitions loaded from configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// The pipeline definitions, in file order.
    #[serde(default)]
    pub pipelines: Vec<PipelineDef>,
}

impl CatalogConfig {
    /// Parses a configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns a parse error for invalid JSON or malformed stage documents.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an io error if the file cannot be read, or a parse error for
    /// invalid content.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Validates every definition and registers them into a catalog.
    ///
    /// # Errors
    ///
    /// Returns the first invalid definition or duplicate name encountered;
    /// file order decides which definition wins a name.
    pub fn into_catalog(self) -> Result<Catalog, ConfigError> {
        let mut catalog = Catalog::new();
        for def in self.pipelines {
            def.validate()?;
            catalog.register(def)?;
        }
        Ok(catalog)
    }
}
