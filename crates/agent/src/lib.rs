//! Article acquisition and language-model analysis.
//!
//! The crate turns a url into a [`curabot_core::AnalysisResult`] in two steps:
//!
//! 1. **Fetch** (`fetch`, `extract`) - download the page and pull out a title and readable text.
//! 2. **Analyze** (`analyzer`, `llm`) - ask a chat-completion model for tags, a summary and a
//!    "why it's interesting" note, concurrently.
//!
//! Both steps sit behind traits so the interaction layer can swap in fakes or the debug
//! analyzer without touching the network.

pub mod analyzer;
pub mod extract;
pub mod fetch;
pub mod llm;

pub use analyzer::{AnalysisError, ContentAnalyzer, LlmContentAnalyzer, MockContentAnalyzer};
pub use extract::extract_article;
pub use fetch::{ArticleFetcher, FetchError, FetchSettings, HttpArticleFetcher};
pub use llm::{ChatCompletionClient, ChatMessage, ChatRequest, ChatRole, LlmError, OpenAiChatClient};
