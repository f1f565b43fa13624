use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::info;

use crate::commands::CommandDefinition;
use crate::components::MessagePayload;
use crate::events::Correlation;

const PLATFORM_USER_AGENT: &str = "DiscordBot (https://github.com/curabot/curabot, 0.1.0)";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("platform client misconfigured: {0}")]
    Configuration(String),
    #[error("platform request failed: {0}")]
    Transport(String),
    #[error("platform returned status {status}: {body}")]
    Status { status: u16, body: String },
}

/// Outbound calls made on behalf of an interaction after its initial response.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    async fn create_follow_up(
        &self,
        correlation: &Correlation,
        message: &MessagePayload,
    ) -> Result<(), PlatformError>;

    async fn edit_original(
        &self,
        correlation: &Correlation,
        message: &MessagePayload,
    ) -> Result<(), PlatformError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistrationScope {
    Global,
    Guild(String),
}

pub struct DiscordRestClient {
    client: Client,
    api_base_url: String,
}

impl DiscordRestClient {
    pub fn new(api_base_url: impl Into<String>) -> Result<Self, PlatformError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(PLATFORM_USER_AGENT));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| PlatformError::Configuration(error.to_string()))?;

        Ok(Self { client, api_base_url: api_base_url.into().trim_end_matches('/').to_owned() })
    }

    fn webhook_url(&self, correlation: &Correlation) -> String {
        format!("{}/webhooks/{}/{}", self.api_base_url, correlation.application_id, correlation.token)
    }

    pub fn commands_url(&self, application_id: &str, scope: &RegistrationScope) -> String {
        match scope {
            RegistrationScope::Global => {
                format!("{}/applications/{application_id}/commands", self.api_base_url)
            }
            RegistrationScope::Guild(guild_id) => format!(
                "{}/applications/{application_id}/guilds/{guild_id}/commands",
                self.api_base_url
            ),
        }
    }

    /// Replaces the registered command set in one request.
    pub async fn bulk_overwrite_commands(
        &self,
        application_id: &str,
        scope: &RegistrationScope,
        bot_token: &SecretString,
        commands: &[CommandDefinition],
    ) -> Result<(), PlatformError> {
        let mut authorization = HeaderValue::from_str(&format!("Bot {}", bot_token.expose_secret()))
            .map_err(|error| PlatformError::Configuration(format!("invalid bot token: {error}")))?;
        authorization.set_sensitive(true);

        let request = self
            .client
            .put(self.commands_url(application_id, scope))
            .header(AUTHORIZATION, authorization)
            .json(commands);
        send(request).await?;

        info!(
            event_name = "system.discord.commands_registered",
            command_count = commands.len(),
            scope = ?scope,
            "slash commands registered"
        );
        Ok(())
    }
}

async fn send(request: reqwest::RequestBuilder) -> Result<(), PlatformError> {
    let response =
        request.send().await.map_err(|error| PlatformError::Transport(error.to_string()))?;
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    Err(PlatformError::Status { status: status.as_u16(), body })
}

#[async_trait]
impl PlatformClient for DiscordRestClient {
    async fn create_follow_up(
        &self,
        correlation: &Correlation,
        message: &MessagePayload,
    ) -> Result<(), PlatformError> {
        send(self.client.post(self.webhook_url(correlation)).json(message)).await
    }

    async fn edit_original(
        &self,
        correlation: &Correlation,
        message: &MessagePayload,
    ) -> Result<(), PlatformError> {
        let url = format!("{}/messages/@original", self.webhook_url(correlation));
        send(self.client.patch(url).json(message)).await
    }
}
