//! The query catalog.
//!
//! A catalog holds named pipeline definitions. Registration happens at
//! startup through `&mut self`; afterwards the catalog is shared read-only
//! (typically behind an `Arc`), so concurrent runs need no locking.

use crate::definition::PipelineDef;
use crate::errors::DuplicateNameError;
use std::collections::HashMap;
use std::sync::Arc;

/// A named set of immutable pipeline definitions.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    definitions: HashMap<String, Arc<PipelineDef>>,
}

impl Catalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a definition under its name.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateNameError` if the name is already registered; the
    /// existing definition is retained and the new one is dropped.
    pub fn register(&mut self, def: PipelineDef) -> Result<(), DuplicateNameError> {
        if self.definitions.contains_key(&def.name) {
            return Err(DuplicateNameError::new(&def.name));
        }
        self.definitions.insert(def.name.clone(), Arc::new(def));
        Ok(())
    }

    /// Looks up a definition by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<PipelineDef>> {
        self.definitions.get(name).cloned()
    }

    /// Returns whether a name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// Enumerates registered names, sorted.
    #[must_use]
    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.definitions.keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the number of registered definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
