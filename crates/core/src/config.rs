use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_DISCORD_API_BASE_URL: &str = "https://discord.com/api/v10";
pub const DEFAULT_FETCH_USER_AGENT: &str = "Mozilla/5.0 (compatible; CuraBot/1.0)";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub discord: DiscordConfig,
    pub llm: LlmConfig,
    pub fetch: FetchConfig,
    pub store: StoreConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DiscordConfig {
    pub application_id: String,
    pub public_key: String,
    pub bot_token: Option<SecretString>,
    pub guild_id: Option<String>,
    pub api_base_url: String,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub max_redirects: usize,
    pub user_agent: String,
}

#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub url: Option<String>,
    pub token: Option<SecretString>,
    pub ttl_secs: u64,
}

impl StoreConfig {
    pub fn backend(&self) -> StoreBackend {
        if self.url.is_some() {
            StoreBackend::RestKv
        } else {
            StoreBackend::Memory
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    RestKv,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::RestKv => "rest_kv",
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub application_id: Option<String>,
    pub public_key: Option<String>,
    pub bot_token: Option<String>,
    pub guild_id: Option<String>,
    pub discord_api_base_url: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
    pub store_url: Option<String>,
    pub store_token: Option<String>,
    pub server_port: Option<u16>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            discord: DiscordConfig {
                application_id: String::new(),
                public_key: String::new(),
                bot_token: None,
                guild_id: None,
                api_base_url: DEFAULT_DISCORD_API_BASE_URL.to_string(),
            },
            llm: LlmConfig {
                api_key: String::new().into(),
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-3.5-turbo".to_string(),
                timeout_secs: 30,
            },
            fetch: FetchConfig {
                timeout_secs: 10,
                max_redirects: 5,
                user_agent: DEFAULT_FETCH_USER_AGENT.to_string(),
            },
            store: StoreConfig { url: None, token: None, ttl_secs: 86_400 },
            server: ServerConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 3000,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let config = Self::resolve(options)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies every layer without validating, for commands that need only part of the config.
    pub fn resolve(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("curabot.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(discord) = patch.discord {
            if let Some(application_id) = discord.application_id {
                self.discord.application_id = application_id;
            }
            if let Some(public_key) = discord.public_key {
                self.discord.public_key = public_key;
            }
            if let Some(bot_token_value) = discord.bot_token {
                self.discord.bot_token = Some(secret_value(bot_token_value));
            }
            if let Some(guild_id) = discord.guild_id {
                self.discord.guild_id = Some(guild_id);
            }
            if let Some(api_base_url) = discord.api_base_url {
                self.discord.api_base_url = api_base_url;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = secret_value(llm_api_key_value);
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(fetch) = patch.fetch {
            if let Some(timeout_secs) = fetch.timeout_secs {
                self.fetch.timeout_secs = timeout_secs;
            }
            if let Some(max_redirects) = fetch.max_redirects {
                self.fetch.max_redirects = max_redirects;
            }
            if let Some(user_agent) = fetch.user_agent {
                self.fetch.user_agent = user_agent;
            }
        }

        if let Some(store) = patch.store {
            if let Some(url) = store.url {
                self.store.url = Some(url);
            }
            if let Some(store_token_value) = store.token {
                self.store.token = Some(secret_value(store_token_value));
            }
            if let Some(ttl_secs) = store.ttl_secs {
                self.store.ttl_secs = ttl_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CURABOT_DISCORD_APPLICATION_ID") {
            self.discord.application_id = value;
        }
        if let Some(value) = read_env("CURABOT_DISCORD_PUBLIC_KEY") {
            self.discord.public_key = value;
        }
        if let Some(value) = read_env("CURABOT_DISCORD_BOT_TOKEN") {
            self.discord.bot_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("CURABOT_DISCORD_GUILD_ID") {
            self.discord.guild_id = Some(value);
        }
        if let Some(value) = read_env("CURABOT_DISCORD_API_BASE_URL") {
            self.discord.api_base_url = value;
        }

        if let Some(value) = read_env("CURABOT_LLM_API_KEY") {
            self.llm.api_key = secret_value(value);
        }
        if let Some(value) = read_env("CURABOT_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("CURABOT_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("CURABOT_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("CURABOT_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("CURABOT_FETCH_TIMEOUT_SECS") {
            self.fetch.timeout_secs = parse_u64("CURABOT_FETCH_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("CURABOT_FETCH_MAX_REDIRECTS") {
            self.fetch.max_redirects = parse_usize("CURABOT_FETCH_MAX_REDIRECTS", &value)?;
        }
        if let Some(value) = read_env("CURABOT_FETCH_USER_AGENT") {
            self.fetch.user_agent = value;
        }

        if let Some(value) = read_env("CURABOT_STORE_URL") {
            self.store.url = Some(value);
        }
        if let Some(value) = read_env("CURABOT_STORE_TOKEN") {
            self.store.token = Some(secret_value(value));
        }
        if let Some(value) = read_env("CURABOT_STORE_TTL_SECS") {
            self.store.ttl_secs = parse_u64("CURABOT_STORE_TTL_SECS", &value)?;
        }

        if let Some(value) = read_env("CURABOT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        let port = read_env("CURABOT_SERVER_PORT").map(|value| ("CURABOT_SERVER_PORT", value));
        if let Some((key, value)) = port.or_else(|| read_env("PORT").map(|value| ("PORT", value))) {
            self.server.port = parse_u16(key, &value)?;
        }
        if let Some(value) = read_env("CURABOT_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("CURABOT_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level = read_env("CURABOT_LOGGING_LEVEL").or_else(|| read_env("CURABOT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("CURABOT_LOGGING_FORMAT").or_else(|| read_env("CURABOT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(application_id) = overrides.application_id {
            self.discord.application_id = application_id;
        }
        if let Some(public_key) = overrides.public_key {
            self.discord.public_key = public_key;
        }
        if let Some(bot_token) = overrides.bot_token {
            self.discord.bot_token = Some(secret_value(bot_token));
        }
        if let Some(guild_id) = overrides.guild_id {
            self.discord.guild_id = Some(guild_id);
        }
        if let Some(api_base_url) = overrides.discord_api_base_url {
            self.discord.api_base_url = api_base_url;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = secret_value(llm_api_key);
        }
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = llm_base_url;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(store_url) = overrides.store_url {
            self.store.url = Some(store_url);
        }
        if let Some(store_token) = overrides.store_token {
            self.store.token = Some(secret_value(store_token));
        }
        if let Some(server_port) = overrides.server_port {
            self.server.port = server_port;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_discord(&self.discord)?;
        validate_llm(&self.llm)?;
        validate_fetch(&self.fetch)?;
        validate_store(&self.store)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }

    /// Registration needs the application id, an optional guild, the api base url and the bot token.
    pub fn validate_for_registration(&self) -> Result<&SecretString, ConfigError> {
        validate_application(&self.discord)?;
        self.require_bot_token()
    }

    /// Command registration is the only operation that talks to the platform with the bot token.
    pub fn require_bot_token(&self) -> Result<&SecretString, ConfigError> {
        self.discord
            .bot_token
            .as_ref()
            .filter(|token| !token.expose_secret().trim().is_empty())
            .ok_or_else(|| {
                ConfigError::Validation(
                    "discord.bot_token is required for command registration. Get it from https://discord.com/developers/applications > Your App > Bot > Reset Token".to_string(),
                )
            })
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("curabot.toml"), PathBuf::from("config/curabot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn is_snowflake(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|ch| ch.is_ascii_digit())
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn validate_discord(discord: &DiscordConfig) -> Result<(), ConfigError> {
    validate_application(discord)?;

    let public_key = discord.public_key.trim();
    if public_key.is_empty() {
        return Err(ConfigError::Validation(
            "discord.public_key is required. Get it from https://discord.com/developers/applications > Your App > General Information > Public Key".to_string(),
        ));
    }
    if public_key.len() != 64 || !public_key.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return Err(ConfigError::Validation(
            "discord.public_key must be 64 hexadecimal characters (the Ed25519 application public key)"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_application(discord: &DiscordConfig) -> Result<(), ConfigError> {
    let application_id = discord.application_id.trim();
    if application_id.is_empty() {
        return Err(ConfigError::Validation(
            "discord.application_id is required. Get it from https://discord.com/developers/applications > Your App > General Information > Application ID".to_string(),
        ));
    }
    if !is_snowflake(application_id) {
        return Err(ConfigError::Validation(
            "discord.application_id must be a numeric Discord snowflake".to_string(),
        ));
    }

    if let Some(guild_id) = &discord.guild_id {
        if !is_snowflake(guild_id.trim()) {
            return Err(ConfigError::Validation(
                "discord.guild_id must be a numeric Discord snowflake when set".to_string(),
            ));
        }
    }

    if !is_http_url(&discord.api_base_url) {
        return Err(ConfigError::Validation(
            "discord.api_base_url must start with http:// or https://".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.api_key.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "llm.api_key is required (set CURABOT_LLM_API_KEY to your OpenAI-compatible API key)"
                .to_string(),
        ));
    }

    if !is_http_url(&llm.base_url) {
        return Err(ConfigError::Validation(
            "llm.base_url must start with http:// or https://".to_string(),
        ));
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_fetch(fetch: &FetchConfig) -> Result<(), ConfigError> {
    if fetch.timeout_secs == 0 || fetch.timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "fetch.timeout_secs must be in range 1..=120".to_string(),
        ));
    }

    if fetch.max_redirects > 20 {
        return Err(ConfigError::Validation(
            "fetch.max_redirects must be at most 20".to_string(),
        ));
    }

    if fetch.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation("fetch.user_agent must not be empty".to_string()));
    }

    Ok(())
}

fn validate_store(store: &StoreConfig) -> Result<(), ConfigError> {
    let has_token =
        store.token.as_ref().map(|token| !token.expose_secret().trim().is_empty()).unwrap_or(false);

    match (&store.url, has_token) {
        (Some(url), true) => {
            if !is_http_url(url) {
                return Err(ConfigError::Validation(
                    "store.url must start with http:// or https://".to_string(),
                ));
            }
        }
        (Some(_), false) => {
            return Err(ConfigError::Validation(
                "store.token is required when store.url is set".to_string(),
            ));
        }
        (None, true) => {
            return Err(ConfigError::Validation(
                "store.url is required when store.token is set".to_string(),
            ));
        }
        (None, false) => {}
    }

    if store.ttl_secs == 0 {
        return Err(ConfigError::Validation(
            "store.ttl_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    discord: Option<DiscordPatch>,
    llm: Option<LlmPatch>,
    fetch: Option<FetchPatch>,
    store: Option<StorePatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DiscordPatch {
    application_id: Option<String>,
    public_key: Option<String>,
    bot_token: Option<String>,
    guild_id: Option<String>,
    api_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct FetchPatch {
    timeout_secs: Option<u64>,
    max_redirects: Option<usize>,
    user_agent: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StorePatch {
    url: Option<String>,
    token: Option<String>,
    ttl_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
