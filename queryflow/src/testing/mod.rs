//! Test doubles and fixtures for exercising catalogs and runners.
//!
//! `RecordingSource` and `FailingSource` assert on the runner's contract
//! (verbatim stage delivery, error wrapping); `MemorySource` evaluates
//! pipelines over seeded documents so end-to-end tests can assert real
//! aggregate outputs.

mod fixtures;
mod memory;
mod mocks;

pub use fixtures::{bot_user, dated_tweet, document, troll_user};
pub use memory::MemorySource;
pub use mocks::{FailingSource, RecordedCall, RecordingSource};
