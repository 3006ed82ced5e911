//! Bot API transport over HTTPS long polling.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::keyboard::OutgoingMessage;
use crate::polling::{TransportError, UpdateTransport};
use crate::updates::TelegramUpdate;

/// Headroom on top of the long-poll window before the HTTP client times out.
const REQUEST_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct GetUpdatesRequest<'a> {
    offset: i64,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

pub struct BotApiTransport {
    client: reqwest::Client,
    api_base_url: String,
    bot_token: SecretString,
    poll_timeout_secs: u64,
}

impl BotApiTransport {
    pub fn new(
        api_base_url: impl Into<String>,
        bot_token: SecretString,
        poll_timeout_secs: u64,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(poll_timeout_secs) + REQUEST_GRACE)
            .build()
            .map_err(|error| TransportError::Receive(error.without_url().to_string()))?;

        let api_base_url: String = api_base_url.into();
        Ok(Self {
            client,
            api_base_url: api_base_url.trim_end_matches('/').to_owned(),
            bot_token,
            poll_timeout_secs,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base_url, self.bot_token.expose_secret())
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<Option<T>, reqwest::Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.client.post(self.method_url(method)).json(body).send().await?;
        let envelope = response.json::<ApiResponse<T>>().await?;
        if envelope.ok {
            Ok(envelope.result)
        } else {
            debug!(
                event_name = "egress.telegram.api_rejected",
                method,
                description = envelope.description.as_deref().unwrap_or("none"),
                "bot api returned ok=false"
            );
            Ok(None)
        }
    }
}

#[async_trait]
impl UpdateTransport for BotApiTransport {
    async fn fetch_updates(
        &self,
        offset: i64,
    ) -> Result<Option<Vec<TelegramUpdate>>, TransportError> {
        let request =
            GetUpdatesRequest { offset, timeout: self.poll_timeout_secs, allowed_updates: &["message"] };

        match self.call::<_, Vec<TelegramUpdate>>("getUpdates", &request).await {
            Ok(Some(updates)) => Ok(Some(updates)),
            Ok(None) => Err(TransportError::Rejected("getUpdates".to_owned())),
            Err(error) => Err(TransportError::Receive(error.without_url().to_string())),
        }
    }

    async fn send_message(&self, message: &OutgoingMessage) -> Result<(), TransportError> {
        match self.call::<_, serde_json::Value>("sendMessage", message).await {
            Ok(Some(_)) => Ok(()),
            Ok(None) => Err(TransportError::Rejected("sendMessage".to_owned())),
            Err(error) => Err(TransportError::Send(error.without_url().to_string())),
        }
    }

    fn kind(&self) -> &'static str {
        "bot_api"
    }
}
