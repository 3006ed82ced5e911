use std::sync::Arc;

use quvvat_core::config::{AppConfig, ConfigError};
use quvvat_core::flows::ConversationController;
use quvvat_telegram::{
    BotApiTransport, PollingRunner, ReconnectPolicy, StaticCatalog, TransportError,
    UpdateHandler, UpdateTransport,
};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub controller: Arc<ConversationController>,
    pub runner: PollingRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("telegram transport setup failed: {0}")]
    Transport(#[from] TransportError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let transport = BotApiTransport::new(
        config.telegram.api_base_url.clone(),
        config.telegram.bot_token.clone(),
        config.telegram.poll_timeout_secs,
    )?;
    bootstrap_with_transport(config, Arc::new(transport))
}

pub fn bootstrap_with_transport(
    config: AppConfig,
    transport: Arc<dyn UpdateTransport>,
) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        transport_mode = transport.kind(),
        "starting application bootstrap"
    );
    config.validate()?;
    let tariff = config.tariff_calculator()?;
    let solar = config.solar_estimator();
    let catalog = Arc::new(StaticCatalog::new(config.telegram.registration_url.clone()));

    let controller = Arc::new(ConversationController::in_memory(tariff, solar, catalog.clone()));
    info!(
        event_name = "system.bootstrap.controller_ready",
        correlation_id = "bootstrap",
        tariff_bands = config.tariff.bands.len(),
        legal_rate = %config.tariff.legal_rate,
        "conversation controller initialized"
    );

    let runner = PollingRunner::new(
        transport,
        UpdateHandler::new(Arc::clone(&controller), catalog),
        ReconnectPolicy::default(),
    );
    info!(
        event_name = "system.bootstrap.transport_ready",
        correlation_id = "bootstrap",
        transport_mode = runner.transport_kind(),
        "telegram transport initialized"
    );

    Ok(Application { config, controller, runner })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use quvvat_core::config::AppConfig;
    use quvvat_core::flows::{ConversationState, InboundEvent};
    use quvvat_core::l10n::MessageRef;
    use quvvat_core::SessionId;
    use quvvat_telegram::NoopUpdateTransport;

    use crate::bootstrap::{bootstrap_with_config, bootstrap_with_transport};

    fn config_with_token(token: &str) -> AppConfig {
        AppConfig {
            telegram: quvvat_core::config::TelegramConfig {
                bot_token: token.to_owned().into(),
                ..AppConfig::default().telegram
            },
            ..AppConfig::default()
        }
    }

    fn valid_config() -> AppConfig {
        config_with_token("123456:test-secret")
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_with_malformed_bot_token() {
        let result = bootstrap_with_config(config_with_token("invalid-token")).await;

        assert!(result.is_err());
        let message = result.err().map(|error| error.to_string()).unwrap_or_default();
        assert!(message.contains("telegram.bot_token"));
    }

    #[test]
    fn invalid_server_config_is_rejected_before_wiring() {
        let mut config = valid_config();
        config.server.health_check_port = 0;

        let result = bootstrap_with_transport(config, Arc::new(NoopUpdateTransport));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn smoke_wires_controller_to_configured_calculators() {
        let app = bootstrap_with_transport(valid_config(), Arc::new(NoopUpdateTransport))
            .expect("bootstrap with noop transport");
        assert_eq!(app.runner.transport_kind(), "noop");

        let id = SessionId::from(77);
        let start = app.controller.handle_event(&id, InboundEvent::Start);
        assert_eq!(start.state, Some(ConversationState::AwaitingLocale));
        app.controller.handle_event(&id, InboundEvent::Text("🇺🇿 O'zbek tili".to_owned()));
        app.controller.handle_event(&id, InboundEvent::Text("🏠 Jismoniy shaxs".to_owned()));
        let result = app.controller.handle_event(&id, InboundEvent::Text("200".to_owned()));

        let Some(MessageRef::CalculationResult(summary)) =
            result.effects.first().map(|effect| &effect.message)
        else {
            panic!("expected calculation result, got {:?}", result.effects);
        };
        assert_eq!(summary.bill.amount.to_string(), "90450");

        let summary = app.runner.run(std::future::pending()).await.expect("noop runner");
        assert_eq!(summary.updates_seen, 0);
    }
}
