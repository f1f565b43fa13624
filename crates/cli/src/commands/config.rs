use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use curabot_core::config::{AppConfig, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

use crate::commands::CommandResult;

struct Field {
    key: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

impl Field {
    fn new(key: &'static str, env_keys: &'static [&'static str], value: impl Into<String>) -> Self {
        Self { key, env_keys, value: value.into() }
    }
}

pub fn run() -> CommandResult {
    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => CommandResult::text(0, render(&config)),
        Err(error) => CommandResult::text(2, format!("config validation failed: {error}")),
    }
}

pub fn render(config: &AppConfig) -> String {
    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(config) {
        let source =
            field_source(field.key, field.env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(format!("- {} = {} (source: {source})", field.key, field.value));
    }

    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let discord = &config.discord;
    let llm = &config.llm;
    let store = &config.store;

    vec![
        Field::new("discord.application_id", &["CURABOT_DISCORD_APPLICATION_ID"], &discord.application_id),
        Field::new("discord.public_key", &["CURABOT_DISCORD_PUBLIC_KEY"], &discord.public_key),
        Field::new("discord.bot_token", &["CURABOT_DISCORD_BOT_TOKEN"], redact_optional(discord.bot_token.as_ref())),
        Field::new("discord.guild_id", &["CURABOT_DISCORD_GUILD_ID"], discord.guild_id.as_deref().unwrap_or("<unset>")),
        Field::new("discord.api_base_url", &["CURABOT_DISCORD_API_BASE_URL"], &discord.api_base_url),
        Field::new("llm.api_key", &["CURABOT_LLM_API_KEY"], redact_secret(&llm.api_key)),
        Field::new("llm.base_url", &["CURABOT_LLM_BASE_URL"], &llm.base_url),
        Field::new("llm.model", &["CURABOT_LLM_MODEL"], &llm.model),
        Field::new("llm.timeout_secs", &["CURABOT_LLM_TIMEOUT_SECS"], llm.timeout_secs.to_string()),
        Field::new("fetch.timeout_secs", &["CURABOT_FETCH_TIMEOUT_SECS"], config.fetch.timeout_secs.to_string()),
        Field::new("fetch.max_redirects", &["CURABOT_FETCH_MAX_REDIRECTS"], config.fetch.max_redirects.to_string()),
        Field::new("fetch.user_agent", &["CURABOT_FETCH_USER_AGENT"], &config.fetch.user_agent),
        Field::new("store.backend", &[], store.backend().as_str()),
        Field::new("store.url", &["CURABOT_STORE_URL"], store.url.as_deref().unwrap_or("<unset>")),
        Field::new("store.token", &["CURABOT_STORE_TOKEN"], redact_optional(store.token.as_ref())),
        Field::new("store.ttl_secs", &["CURABOT_STORE_TTL_SECS"], store.ttl_secs.to_string()),
        Field::new("server.bind_address", &["CURABOT_SERVER_BIND_ADDRESS"], &config.server.bind_address),
        Field::new("server.port", &["CURABOT_SERVER_PORT", "PORT"], config.server.port.to_string()),
        Field::new(
            "server.graceful_shutdown_secs",
            &["CURABOT_SERVER_GRACEFUL_SHUTDOWN_SECS"],
            config.server.graceful_shutdown_secs.to_string(),
        ),
        Field::new("logging.level", &["CURABOT_LOGGING_LEVEL", "CURABOT_LOG_LEVEL"], &config.logging.level),
        Field::new(
            "logging.format",
            &["CURABOT_LOGGING_FORMAT", "CURABOT_LOG_FORMAT"],
            format!("{:?}", config.logging.format).to_lowercase(),
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("curabot.toml"), PathBuf::from("config/curabot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env_keys.is_empty() {
        return "derived".to_string();
    }

    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn redact_optional(secret: Option<&SecretString>) -> String {
    secret.map(redact_secret).unwrap_or_else(|| "<unset>".to_string())
}

/// Keeps a recognisable prefix such as `sk-` and hides everything else.
fn redact_secret(secret: &SecretString) -> String {
    let trimmed = secret.expose_secret().trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    match trimmed.split_once('-') {
        Some((prefix, _)) if prefix.len() <= 4 => format!("{prefix}-***"),
        _ => "<redacted>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use toml::Value;

    use super::{contains_path, redact_secret};

    #[test]
    fn redaction_keeps_only_short_prefixes() {
        assert_eq!(redact_secret(&SecretString::from("sk-live-abcdef".to_string())), "sk-***");
        assert_eq!(redact_secret(&SecretString::from("MTIzNDU2.bot-token".to_string())), "<redacted>");
        assert_eq!(redact_secret(&SecretString::from("   ".to_string())), "<empty>");
    }

    #[test]
    fn nested_keys_are_found_in_file_documents() {
        let doc = "[llm]\nmodel = \"gpt-4o-mini\"\n".parse::<Value>().expect("toml");

        assert!(contains_path(&doc, "llm.model"));
        assert!(!contains_path(&doc, "llm.base_url"));
        assert!(!contains_path(&doc, "store.url"));
    }
}
