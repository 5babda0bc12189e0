//! Feed entities and OPML interchange.
//!
//! - [`Feed`] - the record managed by [`FeedRepository`](crate::storage::FeedRepository)
//! - [`opml`] - import subscriptions from and export them to OPML 2.0 files
//!
//! # Example
//!
//! ```no_run
//! use feedboard::feed::opml;
//! use feedboard::storage::FeedRepository;
//! use std::path::Path;
//!
//! let mut repo = FeedRepository::open("/path/to/feeds.xml")?;
//! let entries = opml::parse(Path::new("/path/to/subscriptions.opml"))?;
//! let report = opml::import_into(&mut repo, entries)?;
//! repo.commit()?;
//! println!("{} added, {} already present", report.added, report.skipped);
//! # Ok::<(), anyhow::Error>(())
//! ```

mod model;
pub mod opml;

pub use model::Feed;
pub use opml::{ImportReport, OpmlFeed};
