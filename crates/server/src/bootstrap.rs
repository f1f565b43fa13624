use std::sync::Arc;

use curabot_agent::{
    FetchError, FetchSettings, HttpArticleFetcher, LlmContentAnalyzer, LlmError, OpenAiChatClient,
};
use curabot_core::config::{AppConfig, ConfigError};
use curabot_discord::{
    DiscordRestClient, InteractionDispatcher, InteractionVerifier, PlatformError, SummarizePipeline,
    VerifyError,
};
use curabot_store::{build_reference_store, ReferenceStore, StoreError};
use thiserror::Error;
use tracing::{error, info};

pub struct Application {
    pub config: AppConfig,
    pub store: Arc<dyn ReferenceStore>,
    pub verifier: InteractionVerifier,
    pub dispatcher: Arc<InteractionDispatcher>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("reference store setup failed: {0}")]
    Store(#[source] StoreError),
    #[error("article fetcher setup failed: {0}")]
    Fetcher(#[source] FetchError),
    #[error("language model client setup failed: {0}")]
    Llm(#[source] LlmError),
    #[error("platform client setup failed: {0}")]
    Platform(#[source] PlatformError),
    #[error("discord.public_key rejected: {0}")]
    PublicKey(#[source] VerifyError),
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", correlation_id = "bootstrap", "starting application bootstrap");
    if let Err(invalid) = config.validate() {
        error!(
            event_name = "system.config.invalid",
            correlation_id = "bootstrap",
            error = %invalid,
            "configuration failed validation"
        );
        return Err(invalid.into());
    }

    let verifier =
        InteractionVerifier::from_hex(&config.discord.public_key).map_err(BootstrapError::PublicKey)?;

    let store = build_reference_store(&config.store).map_err(BootstrapError::Store)?;
    info!(
        event_name = "system.bootstrap.store_ready",
        correlation_id = "bootstrap",
        backend = store.backend_name(),
        ttl_secs = config.store.ttl_secs,
        "reference store ready"
    );

    let fetcher = HttpArticleFetcher::new(FetchSettings::from(&config.fetch))
        .map_err(BootstrapError::Fetcher)?;
    let chat = OpenAiChatClient::new(&config.llm).map_err(BootstrapError::Llm)?;
    let analyzer = LlmContentAnalyzer::new(Arc::new(chat));
    let platform =
        DiscordRestClient::new(config.discord.api_base_url.clone()).map_err(BootstrapError::Platform)?;

    let pipeline = SummarizePipeline::new(Arc::new(fetcher), Arc::new(analyzer), store.clone());
    let dispatcher = Arc::new(InteractionDispatcher::new(pipeline, store.clone(), Arc::new(platform)));

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        llm_model = %config.llm.model,
        "interaction dispatcher assembled"
    );

    Ok(Application { config, store, verifier, dispatcher })
}
