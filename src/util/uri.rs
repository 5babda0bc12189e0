use thiserror::Error;
use url::Url;

/// Errors produced when a feed path is not a usable absolute URI.
#[derive(Error, Debug)]
pub enum UriError {
    /// Nothing but whitespace was given.
    #[error("URI is empty")]
    Empty,
    /// The text parses only relative to a base, e.g. `feeds/rss.xml`.
    #[error("URI is not absolute: {0}")]
    Relative(String),
    /// The text could not be parsed at all.
    #[error("Invalid URI '{input}': {source}")]
    Invalid {
        input: String,
        #[source]
        source: url::ParseError,
    },
    /// The URI is absolute but not fetchable over the web.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
}

/// Parses the text form of a feed path into an absolute [`Url`].
///
/// Surrounding whitespace is ignored. Any scheme is accepted here; callers
/// that need a web source follow up with [`require_web_scheme`].
///
/// # Examples
///
/// ```
/// use feedboard::util::parse_absolute_uri;
///
/// let url = parse_absolute_uri("http://example.com/feed.xml").unwrap();
/// assert_eq!(url.host_str(), Some("example.com"));
///
/// assert!(parse_absolute_uri("feed.xml").is_err());
/// assert!(parse_absolute_uri("   ").is_err());
/// ```
pub fn parse_absolute_uri(input: &str) -> Result<Url, UriError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UriError::Empty);
    }

    Url::parse(trimmed).map_err(|source| match source {
        url::ParseError::RelativeUrlWithoutBase => UriError::Relative(trimmed.to_owned()),
        source => UriError::Invalid {
            input: trimmed.to_owned(),
            source,
        },
    })
}

/// Rejects URIs whose scheme is not `http` or `https`.
///
/// Used on OPML import, where `file://` and friends never name a real feed.
pub fn require_web_scheme(url: &Url) -> Result<(), UriError> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(UriError::UnsupportedScheme(scheme.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_uris() {
        assert!(parse_absolute_uri("https://example.com/feed.xml").is_ok());
        assert!(parse_absolute_uri("http://news.example.org").is_ok());
        assert!(parse_absolute_uri("file:///var/feeds/local.xml").is_ok());
    }

    #[test]
    fn test_whitespace_trimmed() {
        let url = parse_absolute_uri("  http://example.com/rss  ").unwrap();
        assert_eq!(url.as_str(), "http://example.com/rss");
    }

    #[test]
    fn test_empty_rejected() {
        assert!(matches!(parse_absolute_uri(""), Err(UriError::Empty)));
        assert!(matches!(parse_absolute_uri(" \t"), Err(UriError::Empty)));
    }

    #[test]
    fn test_relative_rejected() {
        let err = parse_absolute_uri("feeds/rss.xml").unwrap_err();
        assert!(matches!(err, UriError::Relative(_)));
        assert!(err.to_string().contains("not absolute"));
    }

    #[test]
    fn test_garbage_rejected() {
        let err = parse_absolute_uri("http://[::1").unwrap_err();
        assert!(matches!(err, UriError::Invalid { .. }));
    }

    #[test]
    fn test_web_scheme() {
        let http = parse_absolute_uri("https://example.com").unwrap();
        assert!(require_web_scheme(&http).is_ok());

        let file = parse_absolute_uri("file:///etc/passwd").unwrap();
        assert!(matches!(
            require_web_scheme(&file),
            Err(UriError::UnsupportedScheme(s)) if s == "file"
        ));
    }
}
