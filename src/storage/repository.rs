use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::document::{read_store, write_store};
use super::types::RepositoryError;
use crate::feed::Feed;

/// In-memory feed collection synchronized with an XML store file.
///
/// Edits (add, delete, in-place changes through [`get_mut`](Self::get_mut))
/// only touch memory until [`commit`](Self::commit) rewrites the whole store.
/// [`rollback`](Self::rollback) overlays the stored state back onto memory;
/// [`reload`](Self::reload) discards memory and starts over from the store.
///
/// Not thread-safe by intent: one owner drives it, and the store file is
/// last-writer-wins against external edits.
#[derive(Debug)]
pub struct FeedRepository {
    path: PathBuf,
    feeds: HashMap<Uuid, Feed>,
    dirty: bool,
}

impl FeedRepository {
    /// Opens the store at `path` and loads every feed in it.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::Load`] if the file is missing, unreadable or malformed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let mut repo = Self {
            path: path.into(),
            feeds: HashMap::new(),
            dirty: false,
        };
        let stored = repo.read()?;
        repo.merge(stored);
        repo.dirty = false;
        tracing::debug!(path = %repo.path.display(), count = repo.feeds.len(), "Loaded feed store");
        Ok(repo)
    }

    /// Opens the store at `path`, first writing an empty store if no file exists.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let path = path.into();
        if !path.exists() {
            write_store(&path, std::iter::empty::<&Feed>()).map_err(RepositoryError::Save)?;
            tracing::info!(path = %path.display(), "Created empty feed store");
        }
        Self::open(path)
    }

    /// Location of the backing store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.feeds.contains_key(id)
    }

    /// True when memory may differ from the store: set by add, delete,
    /// `get_mut` and `rollback`; cleared by `commit` and `reload`.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Snapshot of every held feed, sorted by name then id.
    pub fn feeds(&self) -> Vec<Feed> {
        let mut all: Vec<Feed> = self.feeds.values().cloned().collect();
        all.sort_by(|a, b| a.name().cmp(b.name()).then_with(|| a.id().cmp(&b.id())));
        all
    }

    /// Looks up a feed by identity. A missing identity is `None`, never an error.
    pub fn get(&self, id: &Uuid) -> Option<&Feed> {
        self.feeds.get(id)
    }

    /// Mutable access for in-place edits. Marks the repository dirty when found.
    pub fn get_mut(&mut self, id: &Uuid) -> Option<&mut Feed> {
        let feed = self.feeds.get_mut(id)?;
        self.dirty = true;
        Some(feed)
    }

    /// Builds a feed with a fresh identity. It is not added to the repository.
    pub fn create_feed(&self) -> Feed {
        Feed::new(Uuid::new_v4())
    }

    /// Inserts `feed` into memory.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::DuplicateId`] if the identity is already held; the
    /// collection is left unchanged.
    pub fn add(&mut self, feed: Feed) -> Result<(), RepositoryError> {
        let id = feed.id();
        if self.feeds.contains_key(&id) {
            return Err(RepositoryError::DuplicateId(id));
        }
        self.feeds.insert(id, feed);
        self.dirty = true;
        tracing::debug!(%id, "Added feed");
        Ok(())
    }

    /// Removes the feed with identity `id` from memory and returns it.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] if no such feed is held.
    pub fn delete(&mut self, id: &Uuid) -> Result<Feed, RepositoryError> {
        let feed = self
            .feeds
            .remove(id)
            .ok_or(RepositoryError::NotFound(*id))?;
        self.dirty = true;
        tracing::debug!(%id, "Deleted feed");
        Ok(feed)
    }

    /// Replaces the store contents with exactly the in-memory collection.
    pub fn commit(&mut self) -> Result<(), RepositoryError> {
        let feeds = self.feeds();
        write_store(&self.path, &feeds).map_err(RepositoryError::Save)?;
        self.dirty = false;
        tracing::info!(path = %self.path.display(), count = feeds.len(), "Committed feed store");
        Ok(())
    }

    /// Re-reads the store and overlays it onto memory.
    ///
    /// Stored fields overwrite the matching in-memory feed, and stored feeds
    /// missing from memory are added back. Feeds that exist only in memory
    /// are kept: this is a merge, not a discard. Use [`reload`](Self::reload)
    /// to drop uncommitted feeds as well.
    ///
    /// The store is parsed in full before anything is merged, so a load error
    /// leaves memory untouched.
    pub fn rollback(&mut self) -> Result<(), RepositoryError> {
        let stored = self.read()?;
        let count = stored.len();
        self.merge(stored);
        // memory-only feeds may survive the merge
        self.dirty = true;
        tracing::debug!(path = %self.path.display(), count, "Rolled back from feed store");
        Ok(())
    }

    /// Discards all in-memory state and loads the store afresh.
    ///
    /// On a load error memory is left untouched.
    pub fn reload(&mut self) -> Result<(), RepositoryError> {
        let stored = self.read()?;
        self.feeds.clear();
        self.merge(stored);
        self.dirty = false;
        tracing::debug!(path = %self.path.display(), count = self.feeds.len(), "Reloaded feed store");
        Ok(())
    }

    fn read(&self) -> Result<Vec<Feed>, RepositoryError> {
        read_store(&self.path).map_err(RepositoryError::Load)
    }

    /// Additive merge: update by identity, insert what is missing, remove nothing.
    fn merge(&mut self, stored: Vec<Feed>) {
        for feed in stored {
            match self.feeds.entry(feed.id()) {
                Entry::Occupied(mut existing) => existing.get_mut().overlay(&feed),
                Entry::Vacant(slot) => {
                    slot.insert(feed);
                }
            }
        }
    }
}
