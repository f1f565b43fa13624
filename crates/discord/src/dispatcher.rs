use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use curabot_core::{validate_article_url, StoredReference, UserFacingError};
use curabot_store::ReferenceStore;

use crate::commands::{CustomId, SummarizeRequest, SUMMARIZE};
use crate::components::{edit_modal, error_message, InteractionResponse};
use crate::events::{CommandInvocation, Correlation, EventContext, InteractionEvent};
use crate::platform::PlatformClient;
use crate::summarize::{EditedSummary, SummarizePipeline};

/// Protocol violations; the webhook answers these with a client error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    #[error("unknown component `{0}`")]
    UnknownComponent(String),
    #[error("unknown interaction type {0}")]
    UnknownInteractionType(u8),
    #[error("form `{0}` is missing required fields")]
    IncompleteForm(String),
}

impl DispatchError {
    pub fn marker(&self) -> &'static str {
        match self {
            Self::UnknownCommand(_) => "unknown command",
            Self::UnknownComponent(_) => "unknown component",
            Self::UnknownInteractionType(_) => "unknown interaction type",
            Self::IncompleteForm(_) => "unknown form submission",
        }
    }
}

/// Work that continues after the initial response has been sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeferredTask {
    Summarize { correlation: Correlation, url: String },
    Regenerate { correlation: Correlation, reference: StoredReference },
    ApplyEdit { correlation: Correlation, reference: StoredReference, edited: EditedSummary },
}

impl DeferredTask {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Summarize { .. } => "summarize",
            Self::Regenerate { .. } => "regenerate",
            Self::ApplyEdit { .. } => "apply_edit",
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub response: InteractionResponse,
    pub deferred: Option<DeferredTask>,
}

impl DispatchOutcome {
    fn respond(response: InteractionResponse) -> Self {
        Self { response, deferred: None }
    }

    fn defer(response: InteractionResponse, task: DeferredTask) -> Self {
        Self { response, deferred: Some(task) }
    }

    fn user_error(error: &UserFacingError) -> Self {
        Self::respond(InteractionResponse::ChannelMessage(error_message(error)))
    }
}

enum Lookup {
    Found(StoredReference),
    Answered(DispatchOutcome),
}

pub struct InteractionDispatcher {
    pipeline: SummarizePipeline,
    store: Arc<dyn ReferenceStore>,
    platform: Arc<dyn PlatformClient>,
    in_flight: Mutex<JoinSet<()>>,
}

impl InteractionDispatcher {
    pub fn new(
        pipeline: SummarizePipeline,
        store: Arc<dyn ReferenceStore>,
        platform: Arc<dyn PlatformClient>,
    ) -> Self {
        Self { pipeline, store, platform, in_flight: Mutex::new(JoinSet::new()) }
    }

    /// Produces the initial response and, for deferred flows, the task to run afterwards.
    pub async fn dispatch(
        &self,
        event: InteractionEvent,
        ctx: &EventContext,
    ) -> Result<DispatchOutcome, DispatchError> {
        info!(
            event_name = "discord.interaction.received",
            correlation_id = %ctx.correlation_id,
            interaction_kind = event.kind_name(),
            "interaction received"
        );

        match event {
            InteractionEvent::Ping => Ok(DispatchOutcome::respond(InteractionResponse::Pong)),
            InteractionEvent::SlashCommand { correlation, command } => {
                self.handle_command(correlation, command, ctx).await
            }
            InteractionEvent::ComponentClick { correlation, custom_id } => {
                match CustomId::parse(&custom_id) {
                    Some(CustomId::Regenerate(id)) => {
                        Ok(match self.lookup(&id, ctx).await {
                            Lookup::Answered(outcome) => outcome,
                            Lookup::Found(reference) => DispatchOutcome::defer(
                                InteractionResponse::DeferredUpdateMessage,
                                DeferredTask::Regenerate { correlation, reference },
                            ),
                        })
                    }
                    Some(CustomId::Edit(id)) => Ok(match self.lookup(&id, ctx).await {
                        Lookup::Answered(outcome) => outcome,
                        Lookup::Found(reference) => {
                            DispatchOutcome::respond(InteractionResponse::Modal(edit_modal(&reference)))
                        }
                    }),
                    _ => Err(DispatchError::UnknownComponent(custom_id)),
                }
            }
            InteractionEvent::FormSubmit { correlation, custom_id, fields } => {
                let Some(CustomId::EditModal(id)) = CustomId::parse(&custom_id) else {
                    return Err(DispatchError::UnknownComponent(custom_id));
                };
                let Some(edited) = EditedSummary::from_fields(&fields) else {
                    return Err(DispatchError::IncompleteForm(custom_id));
                };

                Ok(match self.lookup(&id, ctx).await {
                    Lookup::Answered(outcome) => outcome,
                    Lookup::Found(reference) => DispatchOutcome::defer(
                        InteractionResponse::DeferredUpdateMessage,
                        DeferredTask::ApplyEdit { correlation, reference, edited },
                    ),
                })
            }
            InteractionEvent::Unsupported { kind } => Err(DispatchError::UnknownInteractionType(kind)),
        }
    }

    async fn handle_command(
        &self,
        correlation: Correlation,
        command: CommandInvocation,
        ctx: &EventContext,
    ) -> Result<DispatchOutcome, DispatchError> {
        if command.name != SUMMARIZE {
            return Err(DispatchError::UnknownCommand(command.name));
        }

        let request = SummarizeRequest::from_invocation(&command);
        let Some(url) = request.url else {
            return Ok(DispatchOutcome::user_error(&UserFacingError::MissingParameter("url")));
        };
        if let Err(invalid) = validate_article_url(&url) {
            info!(
                event_name = "discord.summarize.invalid_url",
                correlation_id = %ctx.correlation_id,
                url = %url,
                reason = %invalid,
                "rejected summarize request"
            );
            return Ok(DispatchOutcome::user_error(&UserFacingError::InvalidUrl(url)));
        }

        if request.debug {
            return Ok(match self.pipeline.run_debug(&url, ctx).await {
                Ok(message) => DispatchOutcome::respond(InteractionResponse::ChannelMessage(message)),
                Err(failure) => {
                    warn!(
                        event_name = "discord.summarize.debug_failed",
                        correlation_id = %ctx.correlation_id,
                        error = %failure,
                        "debug summarize failed"
                    );
                    DispatchOutcome::user_error(&failure.to_user_facing())
                }
            });
        }

        Ok(DispatchOutcome::defer(
            InteractionResponse::DeferredChannelMessage,
            DeferredTask::Summarize { correlation, url },
        ))
    }

    async fn lookup(&self, id: &str, ctx: &EventContext) -> Lookup {
        match self.store.get(id).await {
            Ok(Some(reference)) => Lookup::Found(reference),
            Ok(None) => {
                info!(
                    event_name = "discord.store.miss",
                    correlation_id = %ctx.correlation_id,
                    reference_id = id,
                    "stored reference not found"
                );
                Lookup::Answered(DispatchOutcome::user_error(&UserFacingError::NotFound(id.to_owned())))
            }
            Err(failure) => {
                error!(
                    event_name = "discord.store.unavailable",
                    correlation_id = %ctx.correlation_id,
                    reference_id = id,
                    backend = self.store.backend_name(),
                    error = %failure,
                    "stored reference lookup failed"
                );
                Lookup::Answered(DispatchOutcome::user_error(&UserFacingError::StoreUnavailable(
                    failure.to_string(),
                )))
            }
        }
    }

    /// Runs one deferred task to completion. Failures are logged, never returned.
    pub async fn run_deferred(&self, task: DeferredTask, ctx: &EventContext) {
        let kind = task.kind_name();
        info!(
            event_name = "discord.deferred.started",
            correlation_id = %ctx.correlation_id,
            task = kind,
            "deferred task started"
        );

        let delivered = match task {
            DeferredTask::Summarize { correlation, url } => {
                let message = match self.pipeline.run(&url, ctx).await {
                    Ok(message) => message,
                    Err(failure) => {
                        let user_error = failure.to_user_facing();
                        warn!(
                            event_name = "discord.summarize.failed",
                            correlation_id = %ctx.correlation_id,
                            url = %url,
                            category = user_error.category(),
                            error = %failure,
                            "summarize pipeline failed"
                        );
                        error_message(&user_error)
                    }
                };
                self.platform.create_follow_up(&correlation, &message).await
            }
            DeferredTask::Regenerate { correlation, reference } => {
                match self.pipeline.run(&reference.url, ctx).await {
                    Ok(message) => self.platform.edit_original(&correlation, &message).await,
                    Err(failure) => {
                        warn!(
                            event_name = "discord.regenerate.failed",
                            correlation_id = %ctx.correlation_id,
                            reference_id = %reference.id,
                            error = %failure,
                            "regenerate failed; leaving message unchanged"
                        );
                        return;
                    }
                }
            }
            DeferredTask::ApplyEdit { correlation, reference, edited } => {
                let message = self.pipeline.render_edited(&reference, &edited);
                self.platform.edit_original(&correlation, &message).await
            }
        };

        match delivered {
            Ok(()) => info!(
                event_name = "discord.deferred.completed",
                correlation_id = %ctx.correlation_id,
                task = kind,
                "deferred task completed"
            ),
            Err(failure) => error!(
                event_name = "discord.deferred.delivery_failed",
                correlation_id = %ctx.correlation_id,
                task = kind,
                error = %failure,
                "could not deliver deferred result"
            ),
        }
    }

    /// Runs `task` in the background, tracked so shutdown can wait for it.
    pub fn spawn_deferred(self: &Arc<Self>, task: DeferredTask, ctx: EventContext) {
        let dispatcher = Arc::clone(self);
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        while in_flight.try_join_next().is_some() {}
        in_flight.spawn(async move { dispatcher.run_deferred(task, &ctx).await });
    }

    pub fn in_flight(&self) -> usize {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        while in_flight.try_join_next().is_some() {}
        in_flight.len()
    }

    /// Waits up to `grace` for tracked deferred tasks, then aborts the rest.
    /// Returns how many were still running when the grace period ended.
    pub async fn drain(&self, grace: Duration) -> usize {
        let mut in_flight =
            std::mem::take(&mut *self.in_flight.lock().unwrap_or_else(PoisonError::into_inner));
        let waiting = in_flight.len();

        let finished = tokio::time::timeout(grace, async {
            while in_flight.join_next().await.is_some() {}
        })
        .await;

        let abandoned = in_flight.len();
        if finished.is_err() {
            warn!(
                event_name = "discord.deferred.abandoned",
                abandoned,
                grace_secs = grace.as_secs(),
                "grace period ended with deferred tasks still running"
            );
            in_flight.shutdown().await;
        } else {
            info!(event_name = "discord.deferred.drained", waited_for = waiting, "deferred tasks drained");
        }
        abandoned
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use curabot_agent::{AnalysisError, ArticleFetcher, ContentAnalyzer, FetchError};
    use curabot_core::{AnalysisResult, ArticleContent, ReferenceId, StoredReference};
    use curabot_store::{InMemoryReferenceStore, ReferenceStore, StoreError};

    use super::{DeferredTask, DispatchError, InteractionDispatcher};
    use crate::components::{InteractionResponse, MessagePayload};
    use crate::events::{CommandInvocation, CommandOption, Correlation, EventContext, InteractionEvent, OptionValue};
    use crate::platform::{PlatformClient, PlatformError};
    use crate::summarize::SummarizePipeline;

    #[derive(Default)]
    struct RecordingPlatform {
        follow_ups: Mutex<Vec<MessagePayload>>,
        edits: Mutex<Vec<MessagePayload>>,
        delay: Duration,
    }

    #[async_trait]
    impl PlatformClient for RecordingPlatform {
        async fn create_follow_up(
            &self,
            _correlation: &Correlation,
            message: &MessagePayload,
        ) -> Result<(), PlatformError> {
            tokio::time::sleep(self.delay).await;
            self.follow_ups.lock().await.push(message.clone());
            Ok(())
        }

        async fn edit_original(
            &self,
            _correlation: &Correlation,
            message: &MessagePayload,
        ) -> Result<(), PlatformError> {
            self.edits.lock().await.push(message.clone());
            Ok(())
        }
    }

    struct CountingFetcher {
        calls: AtomicUsize,
        result: fn() -> Result<ArticleContent, FetchError>,
    }

    #[async_trait]
    impl ArticleFetcher for CountingFetcher {
        async fn fetch(&self, _url: &str) -> Result<ArticleContent, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    struct CountingAnalyzer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ContentAnalyzer for CountingAnalyzer {
        async fn analyze(&self, _article: &ArticleContent) -> Result<AnalysisResult, AnalysisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(AnalysisResult::new("Rust", "A summary.", "An interest note."))
        }
    }

    struct FailingStore;

    #[async_trait]
    impl ReferenceStore for FailingStore {
        async fn put(&self, _url: &str, _tags: &str) -> Result<ReferenceId, StoreError> {
            Err(StoreError::Transport("connection reset".to_owned()))
        }

        async fn get(&self, _id: &str) -> Result<Option<StoredReference>, StoreError> {
            Err(StoreError::Transport("connection reset".to_owned()))
        }

        fn backend_name(&self) -> &'static str {
            "failing"
        }
    }

    fn good_article() -> Result<ArticleContent, FetchError> {
        Ok(ArticleContent::new("Title", "readable article text ".repeat(10)))
    }

    fn unreachable_article() -> Result<ArticleContent, FetchError> {
        Err(FetchError::Unreachable("dns error".to_owned()))
    }

    struct Harness {
        dispatcher: Arc<InteractionDispatcher>,
        platform: Arc<RecordingPlatform>,
        fetcher: Arc<CountingFetcher>,
        analyzer: Arc<CountingAnalyzer>,
        store: Arc<dyn ReferenceStore>,
    }

    fn harness_with(
        store: Arc<dyn ReferenceStore>,
        result: fn() -> Result<ArticleContent, FetchError>,
    ) -> Harness {
        harness_with_platform(store, result, RecordingPlatform::default())
    }

    fn harness_with_platform(
        store: Arc<dyn ReferenceStore>,
        result: fn() -> Result<ArticleContent, FetchError>,
        platform: RecordingPlatform,
    ) -> Harness {
        let platform = Arc::new(platform);
        let fetcher = Arc::new(CountingFetcher { calls: AtomicUsize::new(0), result });
        let analyzer = Arc::new(CountingAnalyzer { calls: AtomicUsize::new(0) });
        let pipeline = SummarizePipeline::new(fetcher.clone(), analyzer.clone(), store.clone());
        let dispatcher =
            Arc::new(InteractionDispatcher::new(pipeline, store.clone(), platform.clone()));
        Harness { dispatcher, platform, fetcher, analyzer, store }
    }

    fn harness() -> Harness {
        harness_with(Arc::new(InMemoryReferenceStore::new()), good_article)
    }

    fn correlation() -> Correlation {
        Correlation { application_id: "123".to_owned(), token: "tok".to_owned() }
    }

    fn summarize(url: Option<&str>, debug: bool) -> InteractionEvent {
        let mut options = Vec::new();
        if let Some(url) = url {
            options.push(CommandOption { name: "url".to_owned(), value: OptionValue::String(url.to_owned()) });
        }
        if debug {
            options.push(CommandOption { name: "debug".to_owned(), value: OptionValue::Boolean(true) });
        }
        InteractionEvent::SlashCommand {
            correlation: correlation(),
            command: CommandInvocation { name: "summarize".to_owned(), options },
        }
    }

    fn click(custom_id: &str) -> InteractionEvent {
        InteractionEvent::ComponentClick { correlation: correlation(), custom_id: custom_id.to_owned() }
    }

    fn submit(custom_id: &str, fields: &[(&str, &str)]) -> InteractionEvent {
        InteractionEvent::FormSubmit {
            correlation: correlation(),
            custom_id: custom_id.to_owned(),
            fields: fields
                .iter()
                .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn ctx() -> EventContext {
        EventContext::default()
    }

    fn button_ids(response: &InteractionResponse) -> Vec<String> {
        let value = serde_json::to_value(response).expect("json");
        value["data"]["components"][0]["components"]
            .as_array()
            .map(|buttons| {
                buttons.iter().filter_map(|button| button["custom_id"].as_str().map(str::to_owned)).collect()
            })
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn ping_answers_pong() {
        let outcome = harness().dispatcher.dispatch(InteractionEvent::Ping, &ctx()).await.expect("dispatch");
        assert_eq!(outcome.response, InteractionResponse::Pong);
        assert!(outcome.deferred.is_none());
    }

    #[tokio::test]
    async fn summarize_defers_then_follows_up_with_embed() {
        let harness = harness();
        let outcome = harness
            .dispatcher
            .dispatch(summarize(Some("https://example.com/a"), false), &ctx())
            .await
            .expect("dispatch");

        assert_eq!(outcome.response, InteractionResponse::DeferredChannelMessage);
        assert_eq!(serde_json::to_value(&outcome.response).expect("json"), serde_json::json!({"type": 5}));
        let task = outcome.deferred.expect("deferred task");

        harness.dispatcher.spawn_deferred(task, ctx());
        assert_eq!(harness.dispatcher.drain(Duration::from_secs(5)).await, 0);

        let follow_ups = harness.platform.follow_ups.lock().await;
        assert_eq!(follow_ups.len(), 1);
        assert!(follow_ups[0].embeds[0].description.contains("https://example.com/a"));
        assert_eq!(harness.fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn drain_waits_for_in_flight_follow_ups() {
        let platform = RecordingPlatform { delay: Duration::from_millis(100), ..RecordingPlatform::default() };
        let harness = harness_with_platform(Arc::new(InMemoryReferenceStore::new()), good_article, platform);
        let outcome = harness
            .dispatcher
            .dispatch(summarize(Some("https://example.com/a"), false), &ctx())
            .await
            .expect("dispatch");

        harness.dispatcher.spawn_deferred(outcome.deferred.expect("task"), ctx());
        assert_eq!(harness.dispatcher.in_flight(), 1);
        assert!(harness.platform.follow_ups.lock().await.is_empty());

        assert_eq!(harness.dispatcher.drain(Duration::from_secs(5)).await, 0);

        assert_eq!(harness.platform.follow_ups.lock().await.len(), 1);
        assert_eq!(harness.dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn drain_gives_up_after_grace_period() {
        let platform = RecordingPlatform { delay: Duration::from_secs(30), ..RecordingPlatform::default() };
        let harness = harness_with_platform(Arc::new(InMemoryReferenceStore::new()), good_article, platform);
        let outcome = harness
            .dispatcher
            .dispatch(summarize(Some("https://example.com/a"), false), &ctx())
            .await
            .expect("dispatch");

        harness.dispatcher.spawn_deferred(outcome.deferred.expect("task"), ctx());

        assert_eq!(harness.dispatcher.drain(Duration::from_millis(50)).await, 1);
        assert!(harness.platform.follow_ups.lock().await.is_empty());
    }

    #[tokio::test]
    async fn fetch_failure_becomes_ephemeral_follow_up() {
        let harness = harness_with(Arc::new(InMemoryReferenceStore::new()), unreachable_article);
        let outcome = harness
            .dispatcher
            .dispatch(summarize(Some("https://unreachable.invalid/"), false), &ctx())
            .await
            .expect("dispatch");

        harness.dispatcher.run_deferred(outcome.deferred.expect("task"), &ctx()).await;

        let follow_ups = harness.platform.follow_ups.lock().await;
        assert_eq!(follow_ups.len(), 1);
        assert!(follow_ups[0].is_ephemeral());
        assert!(follow_ups[0].content.as_deref().unwrap_or_default().contains("Network error"));
        assert_eq!(harness.analyzer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn debug_summarize_is_synchronous_and_buttons_resolve() {
        let harness = harness();
        let outcome = harness
            .dispatcher
            .dispatch(summarize(Some("https://example.com/a"), true), &ctx())
            .await
            .expect("dispatch");

        assert!(outcome.deferred.is_none());
        assert_eq!(harness.fetcher.calls.load(Ordering::SeqCst), 0);
        assert_eq!(harness.analyzer.calls.load(Ordering::SeqCst), 0);

        let ids = button_ids(&outcome.response);
        assert_eq!(ids.len(), 2);
        let regenerate = ids[0].strip_prefix("regenerate_").expect("regenerate id");
        let edit = ids[1].strip_prefix("edit_").expect("edit id");
        assert_eq!(regenerate, edit);
        let stored = harness.store.get(regenerate).await.expect("get").expect("stored");
        assert_eq!(stored.url, "https://example.com/a");
    }

    #[tokio::test]
    async fn invalid_url_is_rejected_without_side_effects() {
        for debug in [true, false] {
            let harness = harness();
            let outcome = harness
                .dispatcher
                .dispatch(summarize(Some("not-a-url"), debug), &ctx())
                .await
                .expect("dispatch");

            let InteractionResponse::ChannelMessage(message) = &outcome.response else {
                panic!("expected ephemeral message");
            };
            assert!(message.is_ephemeral());
            assert_eq!(
                message.content.as_deref(),
                Some("❌ Invalid URL format. Please provide a valid URL.")
            );
            assert!(outcome.deferred.is_none());
            assert!(harness.store.get("0").await.expect("get").is_none());
        }
    }

    #[tokio::test]
    async fn missing_url_is_an_ephemeral_error() {
        let outcome = harness().dispatcher.dispatch(summarize(None, false), &ctx()).await.expect("dispatch");
        assert_eq!(
            serde_json::to_value(&outcome.response).expect("json"),
            serde_json::json!({"type": 4, "data": {"content": "❌ URL is required", "flags": 64}})
        );
    }

    #[tokio::test]
    async fn unknown_ids_give_identical_not_found_for_regenerate_and_edit() {
        let harness = harness();
        let regenerate = harness.dispatcher.dispatch(click("regenerate_42"), &ctx()).await.expect("dispatch");
        let edit = harness.dispatcher.dispatch(click("edit_42"), &ctx()).await.expect("dispatch");

        assert_eq!(regenerate, edit);
        assert_eq!(
            serde_json::to_value(&edit.response).expect("json"),
            serde_json::json!({
                "type": 4,
                "data": {"content": "❌ Data not found. The bot may have restarted.", "flags": 64}
            })
        );
    }

    #[tokio::test]
    async fn edit_form_for_unknown_id_matches_button_not_found() {
        let harness = harness();
        let regenerate = harness.dispatcher.dispatch(click("regenerate_42"), &ctx()).await.expect("dispatch");
        let submitted = harness
            .dispatcher
            .dispatch(
                submit(
                    "edit_modal_42",
                    &[("tag_text", "New"), ("summary_text", "New summary."), ("interest_text", "New interest.")],
                ),
                &ctx(),
            )
            .await
            .expect("dispatch");

        assert_eq!(submitted, regenerate);
        assert!(submitted.deferred.is_none());
        assert!(harness.platform.edits.lock().await.is_empty());
    }

    #[tokio::test]
    async fn regenerate_defers_update_and_edits_original() {
        let harness = harness();
        let id = harness.store.put("https://example.com/r", "Old").await.expect("put");

        let outcome = harness
            .dispatcher
            .dispatch(click(&format!("regenerate_{id}")), &ctx())
            .await
            .expect("dispatch");
        assert_eq!(outcome.response, InteractionResponse::DeferredUpdateMessage);

        harness.dispatcher.run_deferred(outcome.deferred.expect("task"), &ctx()).await;

        let edits = harness.platform.edits.lock().await;
        assert_eq!(edits.len(), 1);
        assert!(edits[0].embeds[0].description.contains("https://example.com/r"));
        assert!(harness.platform.follow_ups.lock().await.is_empty());
    }

    #[tokio::test]
    async fn failed_regenerate_leaves_message_untouched() {
        let harness = harness_with(Arc::new(InMemoryReferenceStore::new()), unreachable_article);
        let id = harness.store.put("https://example.com/r", "Old").await.expect("put");
        let outcome = harness
            .dispatcher
            .dispatch(click(&format!("regenerate_{id}")), &ctx())
            .await
            .expect("dispatch");

        harness.dispatcher.run_deferred(outcome.deferred.expect("task"), &ctx()).await;

        assert!(harness.platform.edits.lock().await.is_empty());
        assert!(harness.platform.follow_ups.lock().await.is_empty());
    }

    #[tokio::test]
    async fn edit_click_opens_prefilled_modal() {
        let harness = harness();
        let id = harness.store.put("https://example.com/e", "AI / Rust").await.expect("put");

        let outcome = harness.dispatcher.dispatch(click(&format!("edit_{id}")), &ctx()).await.expect("dispatch");

        let value = serde_json::to_value(&outcome.response).expect("json");
        assert_eq!(value["type"], 9);
        assert_eq!(value["data"]["custom_id"], format!("edit_modal_{id}"));
        assert_eq!(value["data"]["components"][0]["components"][0]["value"], "AI / Rust");
        assert!(outcome.deferred.is_none());
    }

    #[tokio::test]
    async fn form_submit_renders_edited_message_without_fetching() {
        let harness = harness();
        let id = harness.store.put("https://example.com/e", "AI").await.expect("put");
        let event = submit(
            &format!("edit_modal_{id}"),
            &[("tag_text", "Edited tag"), ("summary_text", "Edited summary"), ("interest_text", "Edited why")],
        );

        let outcome = harness.dispatcher.dispatch(event, &ctx()).await.expect("dispatch");
        assert_eq!(outcome.response, InteractionResponse::DeferredUpdateMessage);
        let task = outcome.deferred.expect("task");
        assert!(matches!(task, DeferredTask::ApplyEdit { .. }));

        harness.dispatcher.run_deferred(task, &ctx()).await;

        let edits = harness.platform.edits.lock().await;
        assert_eq!(edits[0].embeds[0].title, "Edited Summary");
        assert!(edits[0].embeds[0].description.contains("Edited tag"));
        assert!(edits[0].embeds[0].description.contains("https://example.com/e"));
        assert_eq!(harness.fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn incomplete_form_and_unknown_ids_are_protocol_errors() {
        let harness = harness();
        let incomplete = harness
            .dispatcher
            .dispatch(submit("edit_modal_0", &[("tag_text", "x")]), &ctx())
            .await
            .expect_err("incomplete form");
        assert_eq!(incomplete.marker(), "unknown form submission");

        let unknown_button =
            harness.dispatcher.dispatch(click("delete_0"), &ctx()).await.expect_err("unknown button");
        assert_eq!(unknown_button, DispatchError::UnknownComponent("delete_0".to_owned()));

        let unknown_type = harness
            .dispatcher
            .dispatch(InteractionEvent::Unsupported { kind: 4 }, &ctx())
            .await
            .expect_err("unknown type");
        assert_eq!(unknown_type.marker(), "unknown interaction type");

        let unknown_command = harness
            .dispatcher
            .dispatch(
                InteractionEvent::SlashCommand {
                    correlation: correlation(),
                    command: CommandInvocation { name: "translate".to_owned(), options: Vec::new() },
                },
                &ctx(),
            )
            .await
            .expect_err("unknown command");
        assert_eq!(unknown_command.marker(), "unknown command");
    }

    #[tokio::test]
    async fn store_outage_is_distinct_from_not_found() {
        let harness = harness_with(Arc::new(FailingStore), good_article);
        let outcome = harness.dispatcher.dispatch(click("edit_1"), &ctx()).await.expect("dispatch");

        let InteractionResponse::ChannelMessage(message) = &outcome.response else {
            panic!("expected ephemeral message");
        };
        assert_eq!(
            message.content.as_deref(),
            Some("❌ Stored data is temporarily unavailable. Please retry shortly.")
        );
    }
}
