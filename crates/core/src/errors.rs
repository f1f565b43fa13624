use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchFailureKind {
    InvalidUrl,
    Timeout,
    Unreachable,
    ConnectionRefused,
    HttpStatus(u16),
    Other,
}

impl FetchFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidUrl => "invalid_url",
            Self::Timeout => "timeout",
            Self::Unreachable => "network_unreachable",
            Self::ConnectionRefused => "connection_refused",
            Self::HttpStatus(_) => "http_status",
            Self::Other => "other",
        }
    }
}

/// Failures that end up in front of the invoking user as ephemeral text.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum UserFacingError {
    #[error("missing required parameter `{0}`")]
    MissingParameter(&'static str),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("article fetch failed ({}): {detail}", kind.as_str())]
    Fetch { kind: FetchFailureKind, detail: String },
    #[error("extracted article content is too short")]
    InsufficientContent,
    #[error("content analysis failed: {0}")]
    Analysis(String),
    #[error("stored reference `{0}` not found")]
    NotFound(String),
    #[error("stored reference lookup failed: {0}")]
    StoreUnavailable(String),
}

impl UserFacingError {
    pub fn category(&self) -> &'static str {
        match self {
            Self::MissingParameter(_) | Self::InvalidUrl(_) => "input_validation",
            Self::Fetch { .. } | Self::InsufficientContent => "fetch",
            Self::Analysis(_) => "analysis",
            Self::NotFound(_) => "store_miss",
            Self::StoreUnavailable(_) => "store_unavailable",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::MissingParameter("url") => "❌ URL is required".to_owned(),
            Self::MissingParameter(name) => format!("❌ `{name}` is required"),
            Self::InvalidUrl(_) => "❌ Invalid URL format. Please provide a valid URL.".to_owned(),
            Self::Fetch { kind, detail } => {
                format!("❌ Failed to summarize the article: {}", fetch_failure_text(*kind, detail))
            }
            Self::InsufficientContent => {
                "❌ Unable to extract sufficient content from this URL.".to_owned()
            }
            Self::Analysis(_) => {
                "❌ Failed to summarize the article: the language model request failed.".to_owned()
            }
            Self::NotFound(_) => "❌ Data not found. The bot may have restarted.".to_owned(),
            Self::StoreUnavailable(_) => {
                "❌ Stored data is temporarily unavailable. Please retry shortly.".to_owned()
            }
        }
    }
}

fn fetch_failure_text(kind: FetchFailureKind, detail: &str) -> String {
    match kind {
        FetchFailureKind::InvalidUrl => "Invalid URL format.".to_owned(),
        FetchFailureKind::Timeout => "Timeout: Article took too long to load.".to_owned(),
        FetchFailureKind::Unreachable => {
            "Network error: Cannot reach the URL. Check if the URL is accessible.".to_owned()
        }
        FetchFailureKind::ConnectionRefused => {
            "Connection refused: The server is not responding.".to_owned()
        }
        FetchFailureKind::HttpStatus(status) => format!("HTTP {status}: Failed to fetch article"),
        FetchFailureKind::Other => format!("Could not fetch the article ({detail})."),
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{FetchFailureKind, UserFacingError};

    #[test]
    fn missing_url_uses_dedicated_message() {
        assert_eq!(UserFacingError::MissingParameter("url").user_message(), "❌ URL is required");
    }

    #[test]
    fn fetch_failures_name_their_category() {
        let timeout =
            UserFacingError::Fetch { kind: FetchFailureKind::Timeout, detail: String::new() };
        assert!(timeout.user_message().contains("Timeout"));

        let refused = UserFacingError::Fetch {
            kind: FetchFailureKind::ConnectionRefused,
            detail: "tcp connect error".to_owned(),
        };
        assert!(refused.user_message().contains("Connection refused"));

        let status = UserFacingError::Fetch {
            kind: FetchFailureKind::HttpStatus(503),
            detail: "service unavailable".to_owned(),
        };
        assert!(status.user_message().contains("HTTP 503"));
        assert_eq!(status.category(), "fetch");
    }

    #[test]
    fn not_found_message_is_stable() {
        let first = UserFacingError::NotFound("1".to_owned()).user_message();
        let second = UserFacingError::NotFound("42".to_owned()).user_message();

        assert_eq!(first, second);
        assert_eq!(first, "❌ Data not found. The bot may have restarted.");
    }

    #[test]
    fn analysis_errors_do_not_leak_provider_detail() {
        let error = UserFacingError::Analysis("401 unauthorized: sk-test".to_owned());
        assert!(!error.user_message().contains("sk-test"));
        assert_eq!(error.category(), "analysis");
    }
}
