pub mod config;
pub mod domain;
pub mod errors;

pub use domain::analysis::AnalysisResult;
pub use domain::article::{
    normalize_whitespace, truncate_content, validate_article_url, ArticleContent, UrlValidationError,
    CONTENT_CHAR_CAP, MIN_CONTENT_CHARS, TRUNCATION_MARKER,
};
pub use domain::reference::{ReferenceId, StoredReference};
pub use errors::{FetchFailureKind, UserFacingError};
