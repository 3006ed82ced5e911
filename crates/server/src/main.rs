mod bootstrap;
mod health;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use quvvat_core::config::{AppConfig, LoadOptions};
use quvvat_core::sessions::SessionStore;
use quvvat_telegram::PollingRunner;
use tokio::sync::Notify;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` directives win over the configured level when they parse.
fn log_filter(level: &str, rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(level.trim()))
}

fn init_logging(config: &AppConfig) {
    use quvvat_core::config::LogFormat::*;

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = log_filter(&config.logging.level, rust_log.as_deref());

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Logging depends on the loaded config, so load it before anything else.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        health::HealthState::new(app.controller.clone(), app.runner.transport_kind()),
    )
    .await?;

    info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        transport_mode = app.runner.transport_kind(),
        "quvvat-server started"
    );

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    poll_until_shutdown(&app.runner, grace).await?;

    info!(
        event_name = "system.server.stopped",
        correlation_id = "shutdown",
        active_sessions = app.controller.sessions().len(),
        "quvvat-server stopped"
    );
    Ok(())
}

async fn poll_until_shutdown(runner: &PollingRunner, grace: Duration) -> Result<()> {
    let stop = Arc::new(Notify::new());
    let waiter = Arc::clone(&stop);
    let polling = runner.run(async move { waiter.notified().await });
    tokio::pin!(polling);

    let outcome = tokio::select! {
        outcome = &mut polling => match outcome {
            Ok(summary) => {
                info!(
                    event_name = "system.server.polling_finished",
                    correlation_id = "shutdown",
                    updates_seen = summary.updates_seen,
                    "update transport closed; waiting for shutdown signal"
                );
                wait_for_shutdown().await;
                return Ok(());
            }
            Err(error) => Some(Err(error)),
        },
        () = wait_for_shutdown() => {
            info!(
                event_name = "system.server.stopping",
                correlation_id = "shutdown",
                grace_secs = grace.as_secs(),
                "shutdown requested; finishing in-flight updates"
            );
            stop.notify_one();
            tokio::time::timeout(grace, &mut polling).await.ok()
        }
    };

    match outcome {
        Some(Ok(summary)) => {
            info!(
                event_name = "system.server.polling_finished",
                correlation_id = "shutdown",
                updates_seen = summary.updates_seen,
                messages_handled = summary.messages_handled,
                "polling stopped cleanly"
            );
            Ok(())
        }
        Some(Err(error)) => Err(error.into()),
        None => {
            warn!(
                event_name = "system.server.shutdown_timeout",
                correlation_id = "shutdown",
                grace_secs = grace.as_secs(),
                "in-flight updates did not finish within the grace period"
            );
            Ok(())
        }
    }
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(
            event_name = "system.server.signal_error",
            correlation_id = "shutdown",
            error = %error,
            "could not listen for ctrl-c; running until killed"
        );
        std::future::pending::<()>().await;
    }
}
