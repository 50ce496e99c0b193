//! Lettings Store crate - SQLite document collections and the data-access
//! executor.
//!
//! Properties and residents are stored as JSON documents in a WAL-mode
//! SQLite database. The [`DocumentExecutor`] answers dot-namespaced
//! request envelopes against those collections.

pub mod db;
pub mod documents;
pub mod executor;
pub mod migrations;
pub mod seed;

pub use db::Database;
pub use documents::{Collection, Condition, DocumentStore, Page, SearchPage, UpdateOutcome};
pub use executor::{DataExecutor, DocumentExecutor};
pub use seed::{seed_sample_data, SeedReport};
