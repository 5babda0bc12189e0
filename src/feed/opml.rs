use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;
use url::Url;

use super::Feed;
use crate::storage::{FeedRepository, RepositoryError};
use crate::util::{atomic_write, parse_absolute_uri, require_web_scheme};

/// SEC-003: Maximum allowed nesting depth for OPML outline elements.
/// Prevents stack overflow attacks from maliciously crafted deeply nested OPMLs.
const MAX_OPML_DEPTH: usize = 50;

/// Errors that can occur during OPML parsing.
#[derive(Debug, Error)]
pub enum OpmlError {
    /// SEC-003: OPML nesting depth exceeds safety limit.
    #[error("OPML nesting depth exceeds maximum of {0} levels")]
    MaxDepthExceeded(usize),

    /// XML parsing failed.
    #[error("XML parse error: {0}")]
    XmlParse(String),

    /// File I/O error.
    #[error("Failed to read OPML file: {0}")]
    Io(#[from] std::io::Error),
}

/// A feed subscription extracted from an OPML `<outline>` with an `xmlUrl`.
#[derive(Debug, Clone, PartialEq)]
pub struct OpmlFeed {
    /// `title`, falling back to `text`, then to the feed URL itself.
    pub title: String,
    /// Feed URL; always an absolute http(s) URI.
    pub xml_url: Url,
    /// OPML 2.0 `description` attribute.
    pub description: Option<String>,
    /// OPML 2.0 `category` attribute (comma-separated).
    pub category: Option<String>,
}

/// Outcome of [`import_into`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub added: usize,
    /// Entries whose URL is already held by some feed.
    pub skipped: usize,
}

/// Parses an OPML file from disk and extracts feed subscriptions.
///
/// # Errors
///
/// Fails if the file cannot be read or is not well-formed XML, or if outlines
/// nest deeper than 50 levels. Outlines whose `xmlUrl` is not an absolute
/// http(s) URI are skipped with a warning, not reported as errors.
pub fn parse(path: &Path) -> Result<Vec<OpmlFeed>> {
    let content = std::fs::read_to_string(path)
        .map_err(OpmlError::Io)
        .with_context(|| format!("Failed to read OPML file: {}", path.display()))?;
    parse_opml_content(&content)
}

/// Parses OPML content and extracts feed subscriptions at any nesting depth.
///
/// Folder outlines (no `xmlUrl`) are traversed but not returned.
pub fn parse_opml_content(content: &str) -> Result<Vec<OpmlFeed>> {
    // SEC-002: quick-xml (0.37) never parses <!ENTITY> declarations; custom
    // entity references fail in `decode_and_unescape_value()`.
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut feeds = Vec::new();
    let mut depth: usize = 0;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"outline" => {
                depth += 1;
                if depth > MAX_OPML_DEPTH {
                    return Err(OpmlError::MaxDepthExceeded(MAX_OPML_DEPTH).into());
                }
                feeds.extend(parse_outline(&e, &reader)?);
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"outline" => {
                feeds.extend(parse_outline(&e, &reader)?);
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"outline" => {
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(OpmlError::XmlParse(e.to_string()).into()),
            _ => {}
        }
    }

    Ok(feeds)
}

/// Returns `Some` for outlines carrying a usable `xmlUrl`, `None` for folders
/// and for outlines whose URL is rejected.
fn parse_outline(e: &BytesStart<'_>, reader: &Reader<&[u8]>) -> Result<Option<OpmlFeed>> {
    let mut xml_url = None;
    let mut title = None;
    let mut text = None;
    let mut description = None;
    let mut category = None;

    let decoder = reader.decoder();
    for attr_result in e.attributes() {
        let attr = match attr_result {
            Ok(attr) => attr,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed OPML attribute");
                continue;
            }
        };
        let value = attr.decode_and_unescape_value(decoder)?.into_owned();
        match attr.key.as_ref() {
            b"xmlUrl" => xml_url = Some(value),
            b"title" => title = Some(value),
            b"text" => text = Some(value),
            b"description" => description = Some(value),
            b"category" => category = Some(value),
            _ => {}
        }
    }

    let Some(raw_url) = xml_url else {
        return Ok(None);
    };

    let url = match parse_absolute_uri(&raw_url) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(url = %raw_url, error = %e, "Skipping invalid feed URL");
            return Ok(None);
        }
    };
    if let Err(e) = require_web_scheme(&url) {
        tracing::warn!(url = %raw_url, error = %e, "Skipping non-web feed URL");
        return Ok(None);
    }

    let title = title
        .or(text)
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| url.to_string());

    Ok(Some(OpmlFeed {
        title,
        xml_url: url,
        description: description.filter(|d| !d.is_empty()),
        category: category.filter(|c| !c.is_empty()),
    }))
}

/// Adds OPML entries to `repo` as new feeds. Nothing is committed.
///
/// Entries whose URL matches a held feed's path, or an earlier entry in the
/// same import, are skipped.
///
/// # Errors
///
/// Stops at the first entry the repository refuses. Entries added before it
/// stay in the repository, uncommitted.
pub fn import_into(
    repo: &mut FeedRepository,
    entries: Vec<OpmlFeed>,
) -> Result<ImportReport, RepositoryError> {
    let mut known: HashSet<Url> = repo
        .feeds()
        .into_iter()
        .filter_map(|f| f.path().cloned())
        .collect();

    let mut report = ImportReport::default();
    for entry in entries {
        if !known.insert(entry.xml_url.clone()) {
            tracing::debug!(url = %entry.xml_url, "Feed already present, skipping");
            report.skipped += 1;
            continue;
        }

        let mut feed = repo.create_feed();
        feed.set_name(&entry.title);
        feed.set_path(Some(entry.xml_url));
        if let Some(description) = entry.description {
            feed.set_description(&description);
        }
        if let Some(category) = entry.category {
            feed.set_tags(&category);
        }

        repo.add(feed)?;
        report.added += 1;
    }
    Ok(report)
}

/// Exports feeds as an OPML 2.0 document.
///
/// Feeds without a path have nothing to subscribe to and are left out.
/// Descriptions and tags map to the `description` and `category` attributes.
pub fn export_opml(feeds: &[Feed]) -> Result<String> {
    use quick_xml::events::{BytesDecl, BytesEnd, BytesText};
    use quick_xml::Writer;
    use std::io::Cursor;

    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .context("Failed to write XML declaration")?;

    let mut opml = BytesStart::new("opml");
    opml.push_attribute(("version", "2.0"));
    writer
        .write_event(Event::Start(opml))
        .context("Failed to write opml element")?;

    writer
        .write_event(Event::Start(BytesStart::new("head")))
        .context("Failed to write head element")?;
    writer
        .create_element("title")
        .write_text_content(BytesText::new("feedboard subscriptions"))
        .context("Failed to write title element")?;
    writer
        .write_event(Event::End(BytesEnd::new("head")))
        .context("Failed to write head end")?;

    writer
        .write_event(Event::Start(BytesStart::new("body")))
        .context("Failed to write body element")?;

    for feed in feeds {
        let Some(url) = feed.path() else {
            continue;
        };
        let title = if feed.name().is_empty() {
            url.as_str()
        } else {
            feed.name()
        };

        let mut outline = BytesStart::new("outline");
        outline.push_attribute(("type", "rss"));
        outline.push_attribute(("text", title));
        outline.push_attribute(("title", title));
        outline.push_attribute(("xmlUrl", url.as_str()));
        if !feed.description().is_empty() {
            outline.push_attribute(("description", feed.description()));
        }
        if !feed.tags().is_empty() {
            let category = feed.tag_list().collect::<Vec<_>>().join(",");
            outline.push_attribute(("category", category.as_str()));
        }
        writer
            .write_event(Event::Empty(outline))
            .context("Failed to write outline element")?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("body")))
        .context("Failed to write body end")?;
    writer
        .write_event(Event::End(BytesEnd::new("opml")))
        .context("Failed to write opml end")?;

    let result = writer.into_inner().into_inner();
    String::from_utf8(result).context("Generated OPML contains invalid UTF-8")
}

/// Exports feeds to an OPML file, replacing it atomically.
pub fn export_to_file(feeds: &[Feed], path: &Path) -> Result<()> {
    let content = export_opml(feeds)?;
    atomic_write(path, content.as_bytes())
        .with_context(|| format!("Failed to write OPML file '{}'", path.display()))
}
