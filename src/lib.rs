//! Manage a list of RSS feed sources backed by an XML file.
//!
//! [`storage::FeedRepository`] keeps feeds in memory and synchronizes them with
//! the store through explicit commit, rollback and reload.
//!
//! ```no_run
//! use feedboard::storage::FeedRepository;
//! use feedboard::util::parse_absolute_uri;
//!
//! let mut repo = FeedRepository::open("feeds.xml")?;
//! let mut feed = repo.create_feed();
//! feed.set_name("Tech News");
//! feed.set_path(Some(parse_absolute_uri("http://example.com/feed.xml")?));
//! repo.add(feed)?;
//! repo.commit()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod config;
pub mod feed;
pub mod storage;
pub mod util;
