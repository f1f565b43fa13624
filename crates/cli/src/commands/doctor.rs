use curabot_agent::OpenAiChatClient;
use curabot_core::config::{AppConfig, LoadOptions, StoreBackend};
use curabot_discord::InteractionVerifier;
use curabot_store::build_reference_store;
use serde::Serialize;

use crate::commands::CommandResult;

const STORE_CHECK_KEY: &str = "doctor-check";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into() }
    }

    fn skipped(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Skipped, details: details.into() }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    if json_output {
        let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
        return CommandResult::text(exit_code, output);
    }

    CommandResult::text(exit_code, render_human(&report))
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck::pass("config_validation", "configuration loaded and validated"));
            checks.push(check_public_key(&config));
            checks.push(check_bot_token(&config));
            checks.push(check_llm_client(&config));
            checks.push(check_store(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck::fail("config_validation", error.to_string()));
            for name in ["public_key", "bot_token", "llm_client", "reference_store"] {
                checks.push(DoctorCheck::skipped(name, "skipped because configuration did not load"));
            }
        }
    }

    // Skipped checks are informational; only failures make the report fail.
    let failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_public_key(config: &AppConfig) -> DoctorCheck {
    match InteractionVerifier::from_hex(&config.discord.public_key) {
        Ok(_) => DoctorCheck::pass("public_key", "Ed25519 public key decodes to a valid curve point"),
        Err(error) => DoctorCheck::fail("public_key", error.to_string()),
    }
}

fn check_bot_token(config: &AppConfig) -> DoctorCheck {
    match config.require_bot_token() {
        Ok(_) => DoctorCheck::pass("bot_token", "bot token present; `curabot register` can run"),
        Err(_) => DoctorCheck::skipped("bot_token", "bot token unset; only needed for `curabot register`"),
    }
}

fn check_llm_client(config: &AppConfig) -> DoctorCheck {
    match OpenAiChatClient::new(&config.llm) {
        Ok(_) => DoctorCheck::pass(
            "llm_client",
            format!("client ready for model `{}` at {}", config.llm.model, config.llm.base_url),
        ),
        Err(error) => DoctorCheck::fail("llm_client", error.to_string()),
    }
}

fn check_store(config: &AppConfig) -> DoctorCheck {
    let store = match build_reference_store(&config.store) {
        Ok(store) => store,
        Err(error) => return DoctorCheck::fail("reference_store", error.to_string()),
    };

    if config.store.backend() == StoreBackend::Memory {
        return DoctorCheck::pass(
            "reference_store",
            "in-memory backing; stored references do not survive restarts",
        );
    }

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck::fail(
                "reference_store",
                format!("failed to initialize async runtime: {error}"),
            );
        }
    };

    match runtime.block_on(store.get(STORE_CHECK_KEY)) {
        Ok(_) => DoctorCheck::pass(
            "reference_store",
            format!("{} backing answered a read", store.backend_name()),
        ),
        Err(error) => DoctorCheck::fail("reference_store", error.to_string()),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
