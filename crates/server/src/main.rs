mod bootstrap;
mod health;
mod interactions;

use std::time::Duration;

use anyhow::Result;
use axum::Router;
use curabot_core::config::{AppConfig, LoadOptions};

use crate::bootstrap::Application;
use crate::health::HealthState;
use crate::interactions::InteractionState;

fn init_logging(config: &AppConfig) {
    use curabot_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

fn app_router(app: &Application) -> Router {
    health::router(HealthState::new(app.store.clone())).merge(interactions::router(
        InteractionState::new(app.verifier.clone(), app.dispatcher.clone()),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Validation runs inside bootstrap, after logging is up, so invalid settings are logged.
    let config = AppConfig::resolve(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config)?;
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        store_backend = app.store.backend_name(),
        "curabot-server listening"
    );

    axum::serve(listener, app_router(&app)).with_graceful_shutdown(wait_for_shutdown()).await?;

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        grace_secs = grace.as_secs(),
        in_flight = app.dispatcher.in_flight(),
        "curabot-server stopping; letting in-flight follow-ups finish"
    );
    app.dispatcher.drain(grace).await;

    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(
            event_name = "system.server.signal_error",
            correlation_id = "shutdown",
            error = %error,
            "could not listen for shutdown signal"
        );
        std::future::pending::<()>().await;
    }
}
