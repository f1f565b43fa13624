use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info};

use curabot_agent::analyzer::{MockContentAnalyzer, DEBUG_TITLE};
use curabot_agent::{AnalysisError, ArticleFetcher, ContentAnalyzer, FetchError};
use curabot_core::{StoredReference, UserFacingError};
use curabot_store::{ReferenceStore, StoreError};

use crate::commands::{INTEREST_FIELD, SUMMARY_FIELD, TAG_FIELD};
use crate::components::{summary_message, MessagePayload, RenderMode, SummaryCard, EDITED_TITLE};
use crate::events::EventContext;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("extracted article content is too short")]
    InsufficientContent,
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error("could not store reference: {0}")]
    Store(#[from] StoreError),
}

impl PipelineError {
    pub fn to_user_facing(&self) -> UserFacingError {
        match self {
            Self::Fetch(error) => error.to_user_facing(),
            Self::InsufficientContent => UserFacingError::InsufficientContent,
            Self::Analysis(error) => error.to_user_facing(),
            Self::Store(error) => UserFacingError::StoreUnavailable(error.to_string()),
        }
    }
}

/// User-supplied replacement text from the edit form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditedSummary {
    pub tags: String,
    pub summary: String,
    pub interest: String,
}

impl EditedSummary {
    /// `None` when any of the three form fields is absent.
    pub fn from_fields(fields: &BTreeMap<String, String>) -> Option<Self> {
        Some(Self {
            tags: fields.get(TAG_FIELD)?.clone(),
            summary: fields.get(SUMMARY_FIELD)?.clone(),
            interest: fields.get(INTEREST_FIELD)?.clone(),
        })
    }
}

pub type Clock = fn() -> DateTime<Utc>;

pub struct SummarizePipeline {
    fetcher: Arc<dyn ArticleFetcher>,
    analyzer: Arc<dyn ContentAnalyzer>,
    store: Arc<dyn ReferenceStore>,
    clock: Clock,
}

impl SummarizePipeline {
    pub fn new(
        fetcher: Arc<dyn ArticleFetcher>,
        analyzer: Arc<dyn ContentAnalyzer>,
        store: Arc<dyn ReferenceStore>,
    ) -> Self {
        Self { fetcher, analyzer, store, clock: Utc::now }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Fetch, analyze, store and render one article.
    pub async fn run(&self, url: &str, ctx: &EventContext) -> Result<MessagePayload, PipelineError> {
        let article = self.fetcher.fetch(url).await?;
        if !article.has_sufficient_content() {
            debug!(
                correlation_id = %ctx.correlation_id,
                url,
                content_chars = article.content.chars().count(),
                "insufficient content"
            );
            return Err(PipelineError::InsufficientContent);
        }

        let analysis = self.analyzer.analyze(&article).await?;
        let reference = self.store.put(url, &analysis.tags).await?;
        info!(
            event_name = "discord.summarize.completed",
            correlation_id = %ctx.correlation_id,
            url,
            reference_id = %reference,
            "article summarized"
        );

        Ok(summary_message(
            &SummaryCard {
                title: &article.title,
                url,
                tags: &analysis.tags,
                summary: &analysis.summary,
                interest: &analysis.interest,
                mode: RenderMode::Normal,
                timestamp: (self.clock)(),
            },
            &reference,
        ))
    }

    /// Renders fixed mock content without touching the network or the language model.
    pub async fn run_debug(&self, url: &str, ctx: &EventContext) -> Result<MessagePayload, PipelineError> {
        let analysis = MockContentAnalyzer.result();
        let reference = self.store.put(url, &analysis.tags).await?;
        info!(
            event_name = "discord.summarize.debug_rendered",
            correlation_id = %ctx.correlation_id,
            url,
            reference_id = %reference,
            "debug summary rendered"
        );

        Ok(summary_message(
            &SummaryCard {
                title: DEBUG_TITLE,
                url,
                tags: &analysis.tags,
                summary: &analysis.summary,
                interest: &analysis.interest,
                mode: RenderMode::Debug,
                timestamp: (self.clock)(),
            },
            &reference,
        ))
    }

    /// Re-renders a stored summary with user-edited text, keeping its reference id.
    pub fn render_edited(&self, reference: &StoredReference, edited: &EditedSummary) -> MessagePayload {
        summary_message(
            &SummaryCard {
                title: EDITED_TITLE,
                url: &reference.url,
                tags: &edited.tags,
                summary: &edited.summary,
                interest: &edited.interest,
                mode: RenderMode::Edited,
                timestamp: (self.clock)(),
            },
            &reference.id,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};

    use curabot_agent::{AnalysisError, ArticleFetcher, ContentAnalyzer, FetchError};
    use curabot_core::{AnalysisResult, ArticleContent, ReferenceId, StoredReference, UserFacingError};
    use curabot_store::{InMemoryReferenceStore, ReferenceStore};

    use super::{EditedSummary, PipelineError, SummarizePipeline};
    use crate::events::EventContext;

    struct StaticFetcher {
        content: String,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ArticleFetcher for StaticFetcher {
        async fn fetch(&self, _url: &str) -> Result<ArticleContent, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ArticleContent::new("Title", self.content.clone()))
        }
    }

    struct StaticAnalyzer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ContentAnalyzer for StaticAnalyzer {
        async fn analyze(&self, _article: &ArticleContent) -> Result<AnalysisResult, AnalysisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(AnalysisResult::new("Rust", "Summary.", "Interest."))
        }
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().expect("log buffer")).into_owned()
        }
    }

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("log buffer").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn fixed_clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).single().unwrap_or_default()
    }

    fn pipeline(
        content: &str,
    ) -> (SummarizePipeline, Arc<StaticFetcher>, Arc<StaticAnalyzer>, Arc<InMemoryReferenceStore>) {
        let fetcher = Arc::new(StaticFetcher { content: content.to_owned(), calls: AtomicUsize::new(0) });
        let analyzer = Arc::new(StaticAnalyzer { calls: AtomicUsize::new(0) });
        let store = Arc::new(InMemoryReferenceStore::new());
        let pipeline = SummarizePipeline::new(fetcher.clone(), analyzer.clone(), store.clone())
            .with_clock(fixed_clock);
        (pipeline, fetcher, analyzer, store)
    }

    #[tokio::test]
    async fn run_stores_reference_and_renders_normal_mode() {
        let (pipeline, _, _, store) = pipeline(&"content ".repeat(20));

        let message = pipeline.run("https://example.com/a", &EventContext::default()).await.expect("pipeline");

        let embed = &message.embeds[0];
        assert_eq!(embed.title, "Title");
        assert!(embed.description.contains("https://example.com/a"));
        assert_eq!(embed.footer.text, "CuraBot - AI-Powered Summarization");
        assert_eq!(embed.timestamp, "2024-01-02T03:04:05.000Z");

        let stored = store.get("0").await.expect("get").expect("stored");
        assert_eq!(stored.url, "https://example.com/a");
        assert_eq!(stored.tags, "Rust");
    }

    #[tokio::test]
    async fn short_content_stops_before_analysis() {
        let (pipeline, _, analyzer, store) = pipeline("too short");

        let error = pipeline.run("https://example.com/a", &EventContext::default()).await.expect_err("insufficient");

        assert!(matches!(error, PipelineError::InsufficientContent));
        assert_eq!(error.to_user_facing(), UserFacingError::InsufficientContent);
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 0);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn debug_run_makes_no_external_calls() {
        let (pipeline, fetcher, analyzer, store) = pipeline("unused");

        let message = pipeline.run_debug("https://example.com/a", &EventContext::default()).await.expect("debug");

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(message.embeds[0].title, "Debug Mode - Mock Article");
        assert_eq!(message.embeds[0].color, 0xFF9900);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn completion_logs_carry_the_interaction_correlation_id() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt().with_writer(logs.clone()).with_ansi(false).finish();
        let _guard = tracing::subscriber::set_default(subscriber);
        let ctx = EventContext { correlation_id: "corr-run-7".to_owned() };
        let (pipeline, _, _, _) = pipeline(&"content ".repeat(20));

        pipeline.run("https://example.com/a", &ctx).await.expect("pipeline");
        pipeline.run_debug("https://example.com/b", &ctx).await.expect("debug");

        let output = logs.text();
        let completed = output.lines().find(|line| line.contains("discord.summarize.completed"));
        let rendered = output.lines().find(|line| line.contains("discord.summarize.debug_rendered"));
        assert!(completed.is_some_and(|line| line.contains("corr-run-7")), "logs: {output}");
        assert!(rendered.is_some_and(|line| line.contains("corr-run-7")), "logs: {output}");
    }

    #[test]
    fn edited_render_keeps_reference_and_stored_url() {
        let (pipeline, _, _, _) = pipeline("unused");
        let reference = StoredReference {
            id: ReferenceId("5".to_owned()),
            url: "https://example.com/b".to_owned(),
            tags: "Old".to_owned(),
        };
        let edited = EditedSummary {
            tags: "New".to_owned(),
            summary: "Edited summary.".to_owned(),
            interest: "Edited interest.".to_owned(),
        };

        let message = pipeline.render_edited(&reference, &edited);

        assert_eq!(message.embeds[0].title, "Edited Summary");
        assert!(message.embeds[0].description.contains("🏷️ **Tag:** New"));
        assert!(message.embeds[0].description.contains("https://example.com/b"));
        assert_eq!(message.embeds[0].footer.text, "CuraBot - Manually Edited");
        let buttons = serde_json::to_value(&message.components).expect("json");
        assert_eq!(buttons[0]["components"][0]["custom_id"], "regenerate_5");
    }

    #[test]
    fn edited_summary_requires_all_three_fields() {
        let mut fields = BTreeMap::new();
        fields.insert("tag_text".to_owned(), "AI".to_owned());
        fields.insert("summary_text".to_owned(), "S".to_owned());
        assert_eq!(EditedSummary::from_fields(&fields), None);

        fields.insert("interest_text".to_owned(), "I".to_owned());
        assert!(EditedSummary::from_fields(&fields).is_some());
    }
}
