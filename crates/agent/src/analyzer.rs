use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use curabot_core::{AnalysisResult, ArticleContent, UserFacingError};

use crate::llm::{ChatCompletionClient, ChatMessage, ChatRequest, LlmError};

pub const FALLBACK_TAGS: &str = "Technology";
pub const FALLBACK_SUMMARY: &str = "Unable to generate summary.";
pub const FALLBACK_INTEREST: &str = "This article provides valuable insights.";

pub const DEBUG_TITLE: &str = "Debug Mode - Mock Article";
pub const DEBUG_TAGS: &str = "Debug / Mock Data";
pub const DEBUG_SUMMARY: &str = "This is a DEBUG summary. Neither article fetching nor the language model was called. This response confirms that Discord communication (receiving commands and sending responses) is working correctly.";
pub const DEBUG_INTEREST: &str = "This DEBUG mode helps identify if the issue is with external dependencies (article fetching/language model) or Discord communication. If you see this message, your bot's Discord integration is working perfectly!";

const TAGS_CONTEXT_CHARS: usize = 2_000;
const INTEREST_CONTEXT_CHARS: usize = 3_000;

const TAGS_SYSTEM_PROMPT: &str = "You are a technical content classifier. Generate 1-3 relevant tags for technical articles. Format: 'Tag1 / Tag2' or just 'Tag1'. Keep tags concise and technical.";
const SUMMARY_SYSTEM_PROMPT: &str = "You are a technical content summarizer for developers. Write direct, technical summaries without meta-commentary. Never start with phrases like 'The article discusses', 'This article', 'The author explains', etc. Start immediately with the technical content.";
const INTEREST_SYSTEM_PROMPT: &str = "You are a technical content analyst for developers. Explain the practical value and relevance directly. Never start with 'This article', 'The content', 'It is interesting', etc. Be direct and specific about technical benefits, use cases, or learning opportunities.";

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("{section} generation failed: {source}")]
    Llm {
        section: &'static str,
        #[source]
        source: LlmError,
    },
}

impl AnalysisError {
    pub fn to_user_facing(&self) -> UserFacingError {
        UserFacingError::Analysis(self.to_string())
    }
}

#[async_trait]
pub trait ContentAnalyzer: Send + Sync {
    async fn analyze(&self, article: &ArticleContent) -> Result<AnalysisResult, AnalysisError>;
}

pub struct LlmContentAnalyzer {
    client: Arc<dyn ChatCompletionClient>,
}

impl LlmContentAnalyzer {
    pub fn new(client: Arc<dyn ChatCompletionClient>) -> Self {
        Self { client }
    }

    async fn ask(
        &self,
        section: &'static str,
        request: ChatRequest,
        fallback: &str,
    ) -> Result<String, AnalysisError> {
        let answer =
            self.client.complete(request).await.map_err(|source| AnalysisError::Llm { section, source })?;
        if answer.trim().is_empty() {
            debug!(section, "empty completion, using fallback text");
            return Ok(fallback.to_owned());
        }
        Ok(answer)
    }
}

#[async_trait]
impl ContentAnalyzer for LlmContentAnalyzer {
    async fn analyze(&self, article: &ArticleContent) -> Result<AnalysisResult, AnalysisError> {
        let (tags, summary, interest) = tokio::try_join!(
            self.ask("tags", tags_request(article), FALLBACK_TAGS),
            self.ask("summary", summary_request(article), FALLBACK_SUMMARY),
            self.ask("interest", interest_request(article), FALLBACK_INTEREST),
        )?;

        Ok(AnalysisResult::new(tags, summary, interest))
    }
}

fn leading_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

fn tags_request(article: &ArticleContent) -> ChatRequest {
    ChatRequest {
        messages: vec![
            ChatMessage::system(TAGS_SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "Based on this title and content, generate relevant technical tags:\n\nTitle: {}\n\nContent: {}",
                article.title,
                leading_chars(&article.content, TAGS_CONTEXT_CHARS)
            )),
        ],
        max_tokens: 50,
        temperature: 0.5,
    }
}

fn summary_request(article: &ArticleContent) -> ChatRequest {
    ChatRequest {
        messages: vec![
            ChatMessage::system(SUMMARY_SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "Write a concise 3-4 sentence summary focusing on the core technical concepts, implementations, or solutions. Start directly with the technical information:\n\n{}",
                article.content
            )),
        ],
        max_tokens: 300,
        temperature: 0.7,
    }
}

fn interest_request(article: &ArticleContent) -> ChatRequest {
    ChatRequest {
        messages: vec![
            ChatMessage::system(INTEREST_SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "Explain in 2-3 sentences why this is technically valuable for developers. Focus on practical applications, skills gained, or problems solved:\n\n{}",
                leading_chars(&article.content, INTEREST_CONTEXT_CHARS)
            )),
        ],
        max_tokens: 200,
        temperature: 0.7,
    }
}

/// Returns fixed debug values without any I/O.
#[derive(Clone, Copy, Debug, Default)]
pub struct MockContentAnalyzer;

impl MockContentAnalyzer {
    pub fn result(&self) -> AnalysisResult {
        AnalysisResult::new(DEBUG_TAGS, DEBUG_SUMMARY, DEBUG_INTEREST)
    }
}

#[async_trait]
impl ContentAnalyzer for MockContentAnalyzer {
    async fn analyze(&self, _article: &ArticleContent) -> Result<AnalysisResult, AnalysisError> {
        Ok(self.result())
    }
}
