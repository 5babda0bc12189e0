use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

use crate::util::UriError;

// ============================================================================
// Error Types
// ============================================================================

/// Failures reading or writing the XML feed store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store file could not be read (missing, permissions, ...)
    #[error("Failed to read feed store '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The store file could not be replaced
    #[error("Failed to write feed store '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is not well-formed XML
    #[error("Malformed feed store: {0}")]
    Xml(String),

    /// A `feed` element has no `id` child
    #[error("Feed entry without an id")]
    MissingId,

    /// The `id` text is not a UUID
    #[error("Invalid feed id '{0}'")]
    InvalidId(String),

    /// The `path` text is present but not an absolute URI
    #[error("Invalid path for feed {id}: {source}")]
    InvalidPath {
        id: Uuid,
        #[source]
        source: UriError,
    },
}

/// Errors returned by [`FeedRepository`](super::FeedRepository) operations.
///
/// `DuplicateId` and `NotFound` are local, recoverable conditions that leave
/// the collection unchanged. `Load` and `Save` wrap store failures.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// `add` was given a feed whose identity is already held
    #[error("A feed with id {0} already exists")]
    DuplicateId(Uuid),

    /// `delete` was given an identity that is not held
    #[error("No feed with id {0}")]
    NotFound(Uuid),

    /// The store could not be loaded
    #[error("Failed to load feeds: {0}")]
    Load(#[source] StoreError),

    /// The store could not be written
    #[error("Failed to save feeds: {0}")]
    Save(#[source] StoreError),
}
