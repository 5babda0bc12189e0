use serde::Serialize;
use url::Url;
use uuid::Uuid;

use crate::util::strip_control_chars;

/// A feed source managed by the repository.
///
/// The identity is fixed at construction. Every setter bumps `revision`, which
/// lets a presentation layer detect edits without registering callbacks.
/// `revision` is in-memory bookkeeping only: it is not persisted and does not
/// take part in equality.
#[derive(Debug, Clone, Serialize)]
pub struct Feed {
    id: Uuid,
    name: String,
    description: String,
    path: Option<Url>,
    tags: String,
    #[serde(skip)]
    revision: u64,
}

impl Feed {
    /// Creates an empty feed with the given identity.
    ///
    /// Most callers want [`FeedRepository::create_feed`](crate::storage::FeedRepository::create_feed),
    /// which generates a fresh identity.
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            name: String::new(),
            description: String::new(),
            path: None,
            tags: String::new(),
            revision: 0,
        }
    }

    /// Rebuilds a feed read back from the store, with a fresh revision counter.
    ///
    /// Text fields get the same SEC-001 stripping as the setters.
    pub(crate) fn from_parts(
        id: Uuid,
        name: String,
        description: String,
        path: Option<Url>,
        tags: String,
    ) -> Self {
        Self {
            id,
            name: strip_control_chars(&name).into_owned(),
            description: strip_control_chars(&description).into_owned(),
            path,
            tags: strip_control_chars(&tags).into_owned(),
            revision: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn path(&self) -> Option<&Url> {
        self.path.as_ref()
    }

    pub fn tags(&self) -> &str {
        &self.tags
    }

    /// Number of setter calls since construction.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// SEC-001: control characters are stripped so names are safe to echo.
    pub fn set_name(&mut self, name: &str) {
        self.name = strip_control_chars(name).into_owned();
        self.touch();
    }

    pub fn set_description(&mut self, description: &str) {
        self.description = strip_control_chars(description).into_owned();
        self.touch();
    }

    pub fn set_path(&mut self, path: Option<Url>) {
        self.path = path;
        self.touch();
    }

    pub fn set_tags(&mut self, tags: &str) {
        self.tags = strip_control_chars(tags).into_owned();
        self.touch();
    }

    /// Splits the free-text tags on commas and whitespace.
    ///
    /// ```
    /// use feedboard::feed::Feed;
    /// use uuid::Uuid;
    ///
    /// let mut feed = Feed::new(Uuid::new_v4());
    /// feed.set_tags("rust, linux  news");
    /// assert_eq!(feed.tag_list().collect::<Vec<_>>(), ["rust", "linux", "news"]);
    /// ```
    pub fn tag_list(&self) -> impl Iterator<Item = &str> {
        self.tags
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
    }

    /// Case-insensitive tag membership test.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tag_list().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Copies the persisted fields of `other` onto `self`, keeping the identity.
    ///
    /// Counts as a single edit.
    pub(crate) fn overlay(&mut self, other: &Feed) {
        self.name.clone_from(&other.name);
        self.description.clone_from(&other.description);
        self.path.clone_from(&other.path);
        self.tags.clone_from(&other.tags);
        self.touch();
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

impl PartialEq for Feed {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.description == other.description
            && self.path == other.path
            && self.tags == other.tags
    }
}

impl Eq for Feed {}
