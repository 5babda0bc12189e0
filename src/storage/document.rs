//! Reader and writer for the XML feed store.
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <feeds>
//!   <feed>
//!     <id>0f8fad5b-d9cb-469f-a165-70867728950e</id>
//!     <name>Tech News</name>
//!     <path>http://example.com/feed.xml</path>
//!     <description></description>
//!     <tags></tags>
//!   </feed>
//! </feeds>
//! ```
//!
//! Every `feed` element in the document is read regardless of the root's name.
//! Child order is free, unknown children are skipped, and missing
//! `description`/`tags` read as empty strings.
use std::fmt::Display;
use std::io::Cursor;
use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use uuid::Uuid;

use super::types::StoreError;
use crate::feed::Feed;
use crate::util::{atomic_write, parse_absolute_uri};

const ROOT: &str = "feeds";
const FEED: &str = "feed";

/// Child elements of `<feed>` that carry data.
#[derive(Debug, Clone, Copy)]
enum Field {
    Id,
    Name,
    Path,
    Description,
    Tags,
}

impl Field {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"id" => Some(Self::Id),
            b"name" => Some(Self::Name),
            b"path" => Some(Self::Path),
            b"description" => Some(Self::Description),
            b"tags" => Some(Self::Tags),
            _ => None,
        }
    }
}

/// Text collected for one `<feed>` before validation.
#[derive(Debug, Default)]
struct RawFeed {
    id: Option<String>,
    name: String,
    path: String,
    description: String,
    tags: String,
}

impl RawFeed {
    fn set(&mut self, field: Field, value: String) {
        match field {
            Field::Id => self.id = Some(value),
            Field::Name => self.name = value,
            Field::Path => self.path = value,
            Field::Description => self.description = value,
            Field::Tags => self.tags = value,
        }
    }

    fn into_feed(self) -> Result<Feed, StoreError> {
        let id_text = self.id.ok_or(StoreError::MissingId)?;
        let id = Uuid::parse_str(id_text.trim())
            .map_err(|_| StoreError::InvalidId(id_text.trim().to_owned()))?;

        let path = if self.path.trim().is_empty() {
            None
        } else {
            Some(
                parse_absolute_uri(&self.path)
                    .map_err(|source| StoreError::InvalidPath { id, source })?,
            )
        };

        Ok(Feed::from_parts(
            id,
            self.name,
            self.description,
            path,
            self.tags,
        ))
    }
}

fn xml_error(reader: &Reader<&[u8]>, e: impl Display) -> StoreError {
    StoreError::Xml(format!(
        "{} (at byte {})",
        e,
        reader.buffer_position()
    ))
}

/// Parses a store document into feeds, in document order.
///
/// Duplicate identities are returned as-is; the repository's merge decides
/// which entry wins.
///
/// # Errors
///
/// - [`StoreError::Xml`] if the document is not well-formed or has no root element
/// - [`StoreError::MissingId`] / [`StoreError::InvalidId`] for a bad `id`
/// - [`StoreError::InvalidPath`] for a non-empty `path` that is not an absolute URI
pub fn parse_document(content: &str) -> Result<Vec<Feed>, StoreError> {
    // SEC-002: quick-xml (0.37) never expands <!ENTITY> declarations; unknown
    // entity references fail in `unescape()` instead of pulling in content.
    let mut reader = Reader::from_str(content);

    let mut feeds = Vec::new();
    let mut saw_root = false;
    // Some(..) while inside a <feed>; `depth` counts open elements within it
    let mut current: Option<RawFeed> = None;
    let mut depth: usize = 0;
    let mut field: Option<Field> = None;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                saw_root = true;
                if current.is_some() {
                    depth += 1;
                    if depth == 2 {
                        field = Field::from_name(e.name().as_ref());
                        text.clear();
                    }
                } else if e.name().as_ref() == FEED.as_bytes() {
                    current = Some(RawFeed::default());
                    depth = 1;
                }
            }
            Ok(Event::Empty(e)) => {
                saw_root = true;
                match current.as_mut() {
                    None if e.name().as_ref() == FEED.as_bytes() => {
                        feeds.push(RawFeed::default().into_feed()?);
                    }
                    Some(raw) if depth == 1 => {
                        if let Some(f) = Field::from_name(e.name().as_ref()) {
                            raw.set(f, String::new());
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(t)) if depth == 2 && field.is_some() => {
                let value = t.unescape().map_err(|e| xml_error(&reader, e))?;
                text.push_str(&value);
            }
            Ok(Event::CData(c)) if depth == 2 && field.is_some() => {
                let value = std::str::from_utf8(&c).map_err(|e| xml_error(&reader, e))?;
                text.push_str(value);
            }
            Ok(Event::End(_)) if current.is_some() => {
                if depth == 1 {
                    if let Some(raw) = current.take() {
                        feeds.push(raw.into_feed()?);
                    }
                    depth = 0;
                } else {
                    if depth == 2 {
                        if let (Some(f), Some(raw)) = (field.take(), current.as_mut()) {
                            raw.set(f, std::mem::take(&mut text));
                        }
                    }
                    depth -= 1;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(&reader, e)),
            _ => {}
        }
    }

    if !saw_root {
        return Err(StoreError::Xml("document has no root element".to_string()));
    }
    if current.is_some() {
        return Err(StoreError::Xml("unterminated feed element".to_string()));
    }

    Ok(feeds)
}

/// Renders feeds as a complete store document.
pub fn render_document<'a, I>(feeds: I) -> Result<String, StoreError>
where
    I: IntoIterator<Item = &'a Feed>,
{
    fn write_err(e: impl Display) -> StoreError {
        StoreError::Xml(format!("failed to render document: {e}"))
    }

    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(write_err)?;
    writer
        .write_event(Event::Start(BytesStart::new(ROOT)))
        .map_err(write_err)?;

    for feed in feeds {
        writer
            .write_event(Event::Start(BytesStart::new(FEED)))
            .map_err(write_err)?;

        let id = feed.id().hyphenated().to_string();
        let path = feed.path().map(|p| p.as_str()).unwrap_or_default();
        let fields = [
            ("id", id.as_str()),
            ("name", feed.name()),
            ("path", path),
            ("description", feed.description()),
            ("tags", feed.tags()),
        ];
        for (name, value) in fields {
            // Start/Text/End keeps empty values as <x></x> on one line; an
            // indented <x>\n</x> would read back as whitespace
            writer
                .create_element(name)
                .write_text_content(BytesText::new(value))
                .map_err(write_err)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new(FEED)))
            .map_err(write_err)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new(ROOT)))
        .map_err(write_err)?;

    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).map_err(write_err)
}

/// Reads and parses the store file at `path`.
pub fn read_store(path: &Path) -> Result<Vec<Feed>, StoreError> {
    let content = std::fs::read_to_string(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_document(&content)
}

/// Replaces the store file at `path` with exactly `feeds`.
pub fn write_store<'a, I>(path: &Path, feeds: I) -> Result<(), StoreError>
where
    I: IntoIterator<Item = &'a Feed>,
{
    let content = render_document(feeds)?;
    atomic_write(path, content.as_bytes()).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use url::Url;

    const G1: &str = "0f8fad5b-d9cb-469f-a165-70867728950e";

    fn sample_feed() -> Feed {
        let mut feed = Feed::new(Uuid::parse_str(G1).unwrap());
        feed.set_name("Tech News");
        feed.set_path(Some(Url::parse("http://example.com/feed.xml").unwrap()));
        feed.set_description("All the tech");
        feed.set_tags("tech news");
        feed
    }

    #[test]
    fn test_parse_single_feed() {
        let content = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<feeds>
  <feed>
    <id>{G1}</id>
    <name>Tech News</name>
    <path>http://example.com/feed.xml</path>
    <description></description>
    <tags></tags>
  </feed>
</feeds>"#
        );

        let feeds = parse_document(&content).unwrap();
        assert_eq!(feeds.len(), 1);
        let feed = &feeds[0];
        assert_eq!(feed.id().to_string(), G1);
        assert_eq!(feed.name(), "Tech News");
        assert_eq!(
            feed.path().map(Url::as_str),
            Some("http://example.com/feed.xml")
        );
        assert_eq!(feed.description(), "");
        assert_eq!(feed.tags(), "");
        assert_eq!(feed.revision(), 0);
    }

    #[test]
    fn test_missing_optional_fields_default_to_empty() {
        let content = format!(
            "<root><feed><path>https://a.example/rss</path><id>{G1}</id><name>A</name></feed></root>"
        );
        let feeds = parse_document(&content).unwrap();
        assert_eq!(feeds[0].description(), "");
        assert_eq!(feeds[0].tags(), "");
        assert_eq!(feeds[0].name(), "A");
    }

    #[test]
    fn test_self_closing_children_are_empty() {
        let content = format!("<feeds><feed><id>{G1}</id><name/><path/><tags/></feed></feeds>");
        let feeds = parse_document(&content).unwrap();
        assert_eq!(feeds[0].name(), "");
        assert!(feeds[0].path().is_none());
    }

    #[test]
    fn test_control_char_references_stripped_on_load() {
        let content = format!(
            "<feeds><feed><id>{G1}</id><name>&#x1b;[31mRed&#x7;</name>\
             <description>a&#x7f;b</description><tags>x&#x1b;[0m</tags></feed></feeds>"
        );
        let feeds = parse_document(&content).unwrap();
        assert_eq!(feeds[0].name(), "Red");
        assert_eq!(feeds[0].description(), "ab");
        assert_eq!(feeds[0].tags(), "x");
    }

    #[test]
    fn test_unknown_children_ignored() {
        let content = format!(
            "<feeds><feed><id>{G1}</id><extra><name>nested</name></extra><name>Real</name></feed></feeds>"
        );
        let feeds = parse_document(&content).unwrap();
        assert_eq!(feeds[0].name(), "Real");
    }

    #[test]
    fn test_empty_root_has_no_feeds() {
        assert!(parse_document("<feeds/>").unwrap().is_empty());
        assert!(parse_document("<feeds></feeds>").unwrap().is_empty());
    }

    #[test]
    fn test_escaped_text_and_cdata() {
        let content = format!(
            "<feeds><feed><id>{G1}</id><name>A &amp; B</name><description><![CDATA[<b>bold</b>]]></description></feed></feeds>"
        );
        let feeds = parse_document(&content).unwrap();
        assert_eq!(feeds[0].name(), "A & B");
        assert_eq!(feeds[0].description(), "<b>bold</b>");
    }

    #[test]
    fn test_empty_document_rejected() {
        assert!(matches!(parse_document(""), Err(StoreError::Xml(_))));
        assert!(matches!(parse_document("   \n"), Err(StoreError::Xml(_))));
    }

    #[test]
    fn test_malformed_xml_rejected() {
        assert!(matches!(
            parse_document("<feeds><feed>"),
            Err(StoreError::Xml(_))
        ));
        assert!(matches!(
            parse_document("<feeds><feed></fed></feeds>"),
            Err(StoreError::Xml(_))
        ));
    }

    #[test]
    fn test_missing_id_rejected() {
        let result = parse_document("<feeds><feed><name>x</name></feed></feeds>");
        assert!(matches!(result, Err(StoreError::MissingId)));
        assert!(matches!(
            parse_document("<feeds><feed/></feeds>"),
            Err(StoreError::MissingId)
        ));
    }

    #[test]
    fn test_invalid_id_rejected() {
        let result = parse_document("<feeds><feed><id>not-a-guid</id></feed></feeds>");
        assert!(matches!(result, Err(StoreError::InvalidId(s)) if s == "not-a-guid"));
    }

    #[test]
    fn test_relative_path_rejected() {
        let content = format!("<feeds><feed><id>{G1}</id><path>feed.xml</path></feed></feeds>");
        assert!(matches!(
            parse_document(&content),
            Err(StoreError::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_undeclared_entity_not_expanded() {
        // SEC-002: DOCTYPE entities must never reach feed data
        let content = format!(
            r#"<?xml version="1.0"?>
<!DOCTYPE feeds [<!ENTITY xxe SYSTEM "file:///etc/passwd">]>
<feeds><feed><id>{G1}</id><name>&xxe;</name></feed></feeds>"#
        );
        match parse_document(&content) {
            Ok(feeds) => assert!(!feeds[0].name().contains("root:")),
            Err(e) => assert!(matches!(e, StoreError::Xml(_))),
        }
    }

    #[test]
    fn test_render_then_parse_preserves_fields() {
        let mut bare = Feed::new(Uuid::new_v4());
        bare.set_name("  padded  ");
        let feeds = vec![sample_feed(), bare];

        let doc = render_document(&feeds).unwrap();
        assert!(doc.starts_with("<?xml"));
        assert!(doc.contains("<description></description>"));

        let parsed = parse_document(&doc).unwrap();
        assert_eq!(parsed, feeds);
    }

    #[test]
    fn test_render_escapes_markup() {
        let mut feed = sample_feed();
        feed.set_name("<script> & co");
        let doc = render_document([&feed]).unwrap();
        assert!(!doc.contains("<script>"));
        assert_eq!(parse_document(&doc).unwrap()[0].name(), "<script> & co");
    }

    #[test]
    fn test_read_missing_store_is_read_error() {
        let path = std::env::temp_dir().join("feedboard_definitely_missing_store.xml");
        assert!(matches!(read_store(&path), Err(StoreError::Read { .. })));
    }

    #[test]
    fn test_write_then_read_store() {
        let dir = std::env::temp_dir().join("feedboard_document_write_read");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("feeds.xml");

        write_store(&path, &[sample_feed()]).unwrap();
        assert_eq!(read_store(&path).unwrap(), vec![sample_feed()]);

        write_store(&path, &[]).unwrap();
        assert!(read_store(&path).unwrap().is_empty());

        std::fs::remove_dir_all(&dir).ok();
    }
}
