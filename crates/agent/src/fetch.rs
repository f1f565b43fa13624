use std::error::Error as _;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{redirect, Client};
use thiserror::Error;
use tracing::{debug, warn};

use curabot_core::config::FetchConfig;
use curabot_core::{validate_article_url, ArticleContent, FetchFailureKind, UserFacingError};

use crate::extract::extract_article;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("request timed out")]
    Timeout,
    #[error("host unreachable: {0}")]
    Unreachable(String),
    #[error("connection refused: {0}")]
    ConnectionRefused(String),
    #[error("http status {status}")]
    HttpStatus { status: u16 },
    #[error("fetch failed: {0}")]
    Other(String),
}

impl FetchError {
    pub fn kind(&self) -> FetchFailureKind {
        match self {
            Self::InvalidUrl(_) => FetchFailureKind::InvalidUrl,
            Self::Timeout => FetchFailureKind::Timeout,
            Self::Unreachable(_) => FetchFailureKind::Unreachable,
            Self::ConnectionRefused(_) => FetchFailureKind::ConnectionRefused,
            Self::HttpStatus { status } => FetchFailureKind::HttpStatus(*status),
            Self::Other(_) => FetchFailureKind::Other,
        }
    }

    pub fn to_user_facing(&self) -> UserFacingError {
        UserFacingError::Fetch { kind: self.kind(), detail: self.to_string() }
    }
}

#[async_trait]
pub trait ArticleFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<ArticleContent, FetchError>;
}

#[derive(Clone, Debug)]
pub struct FetchSettings {
    pub timeout: Duration,
    pub max_redirects: usize,
    pub user_agent: String,
}

impl From<&FetchConfig> for FetchSettings {
    fn from(config: &FetchConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            max_redirects: config.max_redirects,
            user_agent: config.user_agent.clone(),
        }
    }
}

pub struct HttpArticleFetcher {
    client: Client,
}

impl HttpArticleFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(settings.user_agent)
            .timeout(settings.timeout)
            .redirect(redirect::Policy::limited(settings.max_redirects))
            .build()
            .map_err(|error| FetchError::Other(error.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ArticleFetcher for HttpArticleFetcher {
    async fn fetch(&self, url: &str) -> Result<ArticleContent, FetchError> {
        let url = validate_article_url(url).map_err(|error| FetchError::InvalidUrl(error.to_string()))?;

        let response = self.client.get(url.clone()).send().await.map_err(classify)?;
        let status = response.status();
        debug!(url = %url, status = status.as_u16(), "article response received");

        if status.is_server_error() {
            return Err(FetchError::HttpStatus { status: status.as_u16() });
        }

        let body = response.text().await.map_err(classify)?;
        let article = extract_article(&body);

        if status.is_client_error() {
            if article.content.is_empty() {
                return Err(FetchError::HttpStatus { status: status.as_u16() });
            }
            warn!(
                url = %url,
                status = status.as_u16(),
                "article returned a client error status but had readable content"
            );
        }

        debug!(
            url = %url,
            title_chars = article.title.chars().count(),
            content_chars = article.content.chars().count(),
            "article extracted"
        );
        Ok(article)
    }
}

fn classify(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        return FetchError::Timeout;
    }
    if error.is_connect() {
        if has_io_kind(&error, io::ErrorKind::ConnectionRefused) {
            return FetchError::ConnectionRefused(error.to_string());
        }
        return FetchError::Unreachable(error.to_string());
    }
    if error.is_redirect() {
        return FetchError::Other(format!("too many redirects: {error}"));
    }
    FetchError::Other(error.to_string())
}

fn has_io_kind(error: &reqwest::Error, kind: io::ErrorKind) -> bool {
    let mut source = error.source();
    while let Some(inner) = source {
        if inner.downcast_ref::<io::Error>().is_some_and(|io_error| io_error.kind() == kind) {
            return true;
        }
        source = inner.source();
    }
    false
}
