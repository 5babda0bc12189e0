//! Utility functions shared by the store, OPML interchange and CLI.
//!
//! - **Atomic file replacement**: store and OPML writes never leave partial files
//! - **URI parsing**: feed paths must be absolute URIs
//! - **Text processing**: control-character stripping and column-aligned output
//!
//! # Examples
//!
//! ```
//! use feedboard::util::{parse_absolute_uri, truncate_to_width};
//!
//! let url = parse_absolute_uri("https://example.com/feed.xml").unwrap();
//! assert_eq!(url.scheme(), "https");
//!
//! assert_eq!(truncate_to_width("A rather long feed name", 10), "A rathe...");
//! ```

mod fs;
mod text;
mod uri;

pub use fs::atomic_write;
pub use text::{display_width, pad_to_width, strip_control_chars, truncate_to_width};
pub use uri::{parse_absolute_uri, require_web_scheme, UriError};
