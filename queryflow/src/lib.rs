//! # Queryflow
//!
//! A typed catalog and runner for document-store aggregation pipelines.
//!
//! Queryflow replaces hand-pasted query scripts with structured data plus a
//! single execution path:
//!
//! - **Typed pipelines**: match / project / group / sort stages over a
//!   tagged expression tree, rendered to the store's wire documents
//! - **A named catalog**: immutable definitions registered once at startup
//! - **One runner**: exactly one aggregation call per run, lazy result
//!   streams, wrapped errors, cooperative cancellation
//! - **A store seam**: any aggregation-capable client fits behind the
//!   [`source::DocumentSource`] trait
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use queryflow::prelude::*;
//!
//! let catalog = Arc::new(builtin_catalog());
//! let runner = Runner::new(catalog);
//!
//! let mut results = runner.run("activity_per_type_of_bots", &source).await?;
//! while let Some(doc) = results.next().await {
//!     println!("{:?}", doc?);
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod builtins;
pub mod cancellation;
pub mod catalog;
pub mod config;
pub mod definition;
pub mod errors;
pub mod expr;
pub mod observability;
pub mod runner;
pub mod source;
pub mod stage;
pub mod testing;
pub mod utils;

#[cfg(test)]
mod integration_tests;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::builtins::builtin_catalog;
    pub use crate::cancellation::CancellationToken;
    pub use crate::catalog::Catalog;
    pub use crate::config::CatalogConfig;
    pub use crate::definition::PipelineDef;
    pub use crate::errors::{
        ConfigError, DefinitionError, DuplicateNameError, NotFoundError,
        QueryExecutionError, QueryflowError,
    };
    pub use crate::expr::Expr;
    pub use crate::runner::{ResultStream, RunOptions, Runner};
    pub use crate::source::{
        Document, DocumentSource, DocumentStream, NullSource, SourceError,
    };
    pub use crate::stage::{SortOrder, Stage};
    pub use crate::utils::{generate_run_id, iso_timestamp};
}
