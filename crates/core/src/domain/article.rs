use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Maximum number of characters of article text handed to the analyzer.
pub const CONTENT_CHAR_CAP: usize = 12_000;
pub const TRUNCATION_MARKER: &str = "...";
/// Below this many characters an extraction is considered unusable.
pub const MIN_CONTENT_CHARS: usize = 100;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleContent {
    pub title: String,
    pub content: String,
}

impl ArticleContent {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self { title: title.into(), content: content.into() }
    }

    pub fn has_sufficient_content(&self) -> bool {
        self.content.chars().count() >= MIN_CONTENT_CHARS
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum UrlValidationError {
    #[error("url is empty")]
    Empty,
    #[error("url could not be parsed: {0}")]
    Malformed(String),
    #[error("unsupported url scheme `{0}` (expected http or https)")]
    UnsupportedScheme(String),
    #[error("url has no host")]
    MissingHost,
}

pub fn validate_article_url(raw: &str) -> Result<Url, UrlValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UrlValidationError::Empty);
    }

    let url = Url::parse(trimmed).map_err(|error| UrlValidationError::Malformed(error.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(UrlValidationError::UnsupportedScheme(other.to_owned())),
    }
    if url.host_str().map(str::is_empty).unwrap_or(true) {
        return Err(UrlValidationError::MissingHost);
    }

    Ok(url)
}

/// Collapses every run of whitespace into a single space and trims the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Caps `content` at [`CONTENT_CHAR_CAP`] characters, appending [`TRUNCATION_MARKER`] when cut.
pub fn truncate_content(content: &str) -> String {
    match content.char_indices().nth(CONTENT_CHAR_CAP) {
        Some((byte_index, _)) => {
            let mut truncated = String::with_capacity(byte_index + TRUNCATION_MARKER.len());
            truncated.push_str(&content[..byte_index]);
            truncated.push_str(TRUNCATION_MARKER);
            truncated
        }
        None => content.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        normalize_whitespace, truncate_content, validate_article_url, ArticleContent,
        UrlValidationError, CONTENT_CHAR_CAP, TRUNCATION_MARKER,
    };

    #[test]
    fn content_over_cap_is_cut_to_cap_plus_marker() {
        let content = "a".repeat(CONTENT_CHAR_CAP + 500);
        let truncated = truncate_content(&content);

        assert_eq!(truncated.chars().count(), CONTENT_CHAR_CAP + TRUNCATION_MARKER.len());
        assert!(truncated.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn content_at_or_under_cap_is_untouched() {
        let exact = "b".repeat(CONTENT_CHAR_CAP);
        assert_eq!(truncate_content(&exact), exact);
        assert_eq!(truncate_content("short body"), "short body");
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let content = "é".repeat(CONTENT_CHAR_CAP + 1);
        let truncated = truncate_content(&content);

        assert_eq!(truncated.chars().count(), CONTENT_CHAR_CAP + TRUNCATION_MARKER.len());
    }

    #[test]
    fn whitespace_runs_collapse_to_single_spaces() {
        assert_eq!(normalize_whitespace("  one\n\n two\t three  "), "one two three");
    }

    #[test]
    fn http_and_https_urls_validate() {
        assert!(validate_article_url("https://example.com/a").is_ok());
        assert!(validate_article_url(" http://blog.example.org/post?id=1 ").is_ok());
    }

    #[test]
    fn non_urls_and_foreign_schemes_are_rejected() {
        assert!(matches!(validate_article_url("not-a-url"), Err(UrlValidationError::Malformed(_))));
        assert!(matches!(
            validate_article_url("ftp://example.com/file"),
            Err(UrlValidationError::UnsupportedScheme(scheme)) if scheme == "ftp"
        ));
        assert_eq!(validate_article_url("   "), Err(UrlValidationError::Empty));
    }

    #[test]
    fn sufficient_content_threshold() {
        assert!(!ArticleContent::new("t", "too short").has_sufficient_content());
        assert!(ArticleContent::new("t", "x".repeat(100)).has_sufficient_content());
    }
}
