//! XML-backed feed storage.
//!
//! - [`FeedRepository`] holds the in-memory collection and drives load,
//!   commit, rollback and reload
//! - [`document`] reads and writes the store file format

pub mod document;
mod repository;
mod types;

pub use repository::FeedRepository;
pub use types::{RepositoryError, StoreError};
