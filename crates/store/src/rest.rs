//! Redis-over-HTTP backing compatible with the Upstash REST protocol.
//!
//! Every command is a `POST` of a JSON array (`["GET", "key"]`) to the base url with a bearer
//! token; replies are `{"result": ...}` or `{"error": "..."}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use curabot_core::{ReferenceId, StoredReference};

use crate::{ReferenceStore, StoreError};

const COUNTER_KEY: &str = "curabot:ref:counter";
const KEY_PREFIX: &str = "curabot:ref:";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

pub struct RestKvConfig {
    pub url: String,
    pub token: SecretString,
    pub ttl: Duration,
}

impl RestKvConfig {
    pub fn new(url: impl Into<String>, token: SecretString, ttl: Duration) -> Self {
        Self { url: url.into(), token, ttl }
    }
}

#[derive(Serialize, Deserialize)]
struct StoredValue {
    url: String,
    tags: String,
}

#[derive(Deserialize)]
struct CommandReply {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

pub struct RestKvReferenceStore {
    client: Client,
    url: String,
    token: SecretString,
    ttl_secs: u64,
}

impl RestKvReferenceStore {
    pub fn new(config: RestKvConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| StoreError::Configuration(error.to_string()))?;

        Ok(Self {
            client,
            url: config.url.trim_end_matches('/').to_owned(),
            token: config.token,
            ttl_secs: config.ttl.as_secs().max(1),
        })
    }

    fn key_for(id: &str) -> String {
        format!("{KEY_PREFIX}{id}")
    }

    async fn command(&self, args: &[&str]) -> Result<Value, StoreError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(self.token.expose_secret())
            .json(&args)
            .send()
            .await
            .map_err(|error| StoreError::Transport(error.to_string()))?;

        let status = response.status();
        let body = response.text().await.map_err(|error| StoreError::Transport(error.to_string()))?;
        let reply: CommandReply = serde_json::from_str(&body).map_err(|error| {
            if status.is_success() {
                StoreError::Decode(error.to_string())
            } else {
                StoreError::Api { status: status.as_u16(), message: body.clone() }
            }
        })?;

        if let Some(message) = reply.error {
            return Err(StoreError::Api { status: status.as_u16(), message });
        }
        if !status.is_success() {
            return Err(StoreError::Api { status: status.as_u16(), message: body });
        }

        debug!(command = args.first().copied().unwrap_or_default(), "store command completed");
        Ok(reply.result)
    }
}

#[async_trait]
impl ReferenceStore for RestKvReferenceStore {
    async fn put(&self, url: &str, tags: &str) -> Result<ReferenceId, StoreError> {
        let counter = self.command(&["INCR", COUNTER_KEY]).await?;
        let id = counter
            .as_u64()
            .ok_or_else(|| StoreError::Decode(format!("INCR returned `{counter}`")))?
            .to_string();

        let value = serde_json::to_string(&StoredValue { url: url.to_owned(), tags: tags.to_owned() })
            .map_err(|error| StoreError::Decode(error.to_string()))?;
        let ttl = self.ttl_secs.to_string();
        self.command(&["SET", &Self::key_for(&id), &value, "EX", &ttl]).await?;

        Ok(ReferenceId(id))
    }

    async fn get(&self, id: &str) -> Result<Option<StoredReference>, StoreError> {
        if id.is_empty() {
            return Ok(None);
        }

        let result = self.command(&["GET", &Self::key_for(id)]).await?;
        let raw = match result {
            Value::Null => return Ok(None),
            Value::String(raw) => raw,
            other => return Err(StoreError::Decode(format!("GET returned `{other}`"))),
        };

        let value: StoredValue =
            serde_json::from_str(&raw).map_err(|error| StoreError::Decode(error.to_string()))?;
        Ok(Some(StoredReference { id: ReferenceId(id.to_owned()), url: value.url, tags: value.tags }))
    }

    fn backend_name(&self) -> &'static str {
        "rest_kv"
    }
}
