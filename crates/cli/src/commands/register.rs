use curabot_core::config::{AppConfig, LoadOptions};
use curabot_discord::commands::command_definitions;
use curabot_discord::platform::RegistrationScope;
use curabot_discord::DiscordRestClient;

use crate::commands::CommandResult;

// Registration never verifies signatures or calls the LLM, so only its own fields are validated.
pub fn run(global: bool) -> CommandResult {
    match AppConfig::resolve(LoadOptions::default()) {
        Ok(config) => register_with(&config, global),
        Err(error) => CommandResult::failure(
            "register",
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        ),
    }
}

pub fn scope_for(config: &AppConfig, global: bool) -> RegistrationScope {
    match (&config.discord.guild_id, global) {
        (Some(guild_id), false) => RegistrationScope::Guild(guild_id.clone()),
        _ => RegistrationScope::Global,
    }
}

pub fn register_with(config: &AppConfig, global: bool) -> CommandResult {
    let bot_token = match config.validate_for_registration() {
        Ok(token) => token,
        Err(error) => return CommandResult::failure("register", "config_validation", error.to_string(), 2),
    };

    let client = match DiscordRestClient::new(config.discord.api_base_url.clone()) {
        Ok(client) => client,
        Err(error) => return CommandResult::failure("register", "client_init", error.to_string(), 3),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "register",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let scope = scope_for(config, global);
    let commands = command_definitions();
    let result = runtime.block_on(client.bulk_overwrite_commands(
        &config.discord.application_id,
        &scope,
        bot_token,
        &commands,
    ));

    match result {
        Ok(()) => {
            let target = match &scope {
                RegistrationScope::Global => "globally (may take up to an hour to appear)".to_string(),
                RegistrationScope::Guild(guild_id) => format!("for guild {guild_id}"),
            };
            CommandResult::success("register", format!("registered {} command(s) {target}", commands.len()))
        }
        Err(error) => CommandResult::failure("register", "platform_request", error.to_string(), 4),
    }
}
