pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "curabot",
    about = "CuraBot operator CLI",
    long_about = "Register CuraBot's slash commands, inspect effective configuration, and check runtime readiness.",
    after_help = "Examples:\n  curabot register\n  curabot register --global\n  curabot config\n  curabot doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Replace the registered slash commands (guild-scoped when discord.guild_id is set)"
    )]
    Register {
        #[arg(long, help = "Register globally even when discord.guild_id is configured")]
        global: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, signing key, language model client and store readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Register { global } => commands::register::run(global),
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
