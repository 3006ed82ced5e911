use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use quvvat_core::sessions::{InMemorySessionStore, SessionStore};
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::handler::UpdateHandler;
use crate::keyboard::OutgoingMessage;
use crate::updates::{ChatText, TelegramUpdate};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("fetching updates failed: {0}")]
    Receive(String),
    #[error("sending message failed: {0}")]
    Send(String),
    #[error("bot api rejected the request: {0}")]
    Rejected(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PollingError {
    #[error("giving up after {attempts} consecutive failed polls: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: TransportError },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Consecutive failed polls tolerated before the runner gives up.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 8, base_delay_ms: 250, max_delay_ms: 30_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

#[async_trait]
pub trait UpdateTransport: Send + Sync {
    /// Returns updates with `update_id >= offset`. `Ok(None)` means the
    /// transport has closed and no further updates will arrive.
    async fn fetch_updates(&self, offset: i64)
        -> Result<Option<Vec<TelegramUpdate>>, TransportError>;
    async fn send_message(&self, message: &OutgoingMessage) -> Result<(), TransportError>;

    /// Short label for logs and health output.
    fn kind(&self) -> &'static str;
}

/// Transport with nothing behind it; the runner exits on its first poll.
#[derive(Default)]
pub struct NoopUpdateTransport;

#[async_trait]
impl UpdateTransport for NoopUpdateTransport {
    async fn fetch_updates(
        &self,
        _offset: i64,
    ) -> Result<Option<Vec<TelegramUpdate>>, TransportError> {
        Ok(None)
    }

    async fn send_message(&self, _message: &OutgoingMessage) -> Result<(), TransportError> {
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "noop"
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PollingSummary {
    pub updates_seen: u64,
    pub messages_handled: u64,
    pub next_offset: i64,
}

pub struct PollingRunner<S = InMemorySessionStore> {
    transport: Arc<dyn UpdateTransport>,
    handler: UpdateHandler<S>,
    reconnect_policy: ReconnectPolicy,
}

impl<S> PollingRunner<S>
where
    S: SessionStore + 'static,
{
    pub fn new(
        transport: Arc<dyn UpdateTransport>,
        handler: UpdateHandler<S>,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, handler, reconnect_policy }
    }

    pub fn handler(&self) -> &UpdateHandler<S> {
        &self.handler
    }

    pub fn transport_kind(&self) -> &'static str {
        self.transport.kind()
    }

    /// Polls until the transport closes, `shutdown` resolves, or the retry
    /// budget is spent. A batch that is already being handled is finished
    /// before shutdown is honoured.
    pub async fn run<F>(&self, shutdown: F) -> Result<PollingSummary, PollingError>
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);
        let mut summary = PollingSummary::default();
        let mut failures: u32 = 0;

        loop {
            let fetched = tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!(
                        event_name = "ingress.telegram.polling_stopped",
                        next_offset = summary.next_offset,
                        "shutdown requested; polling stopped"
                    );
                    return Ok(summary);
                }
                fetched = self.transport.fetch_updates(summary.next_offset) => fetched,
            };

            match fetched {
                Ok(Some(updates)) => {
                    failures = 0;
                    self.process_batch(updates, &mut summary).await;
                }
                Ok(None) => {
                    info!(
                        event_name = "ingress.telegram.transport_closed",
                        next_offset = summary.next_offset,
                        "update transport closed"
                    );
                    return Ok(summary);
                }
                Err(error) => {
                    failures += 1;
                    warn!(
                        event_name = "ingress.telegram.poll_failed",
                        attempt = failures,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %error,
                        "polling for updates failed"
                    );
                    if failures > self.reconnect_policy.max_retries {
                        return Err(PollingError::RetriesExhausted {
                            attempts: failures,
                            last_error: error,
                        });
                    }

                    let delay = self.reconnect_policy.backoff(failures - 1);
                    if !delay.is_zero() {
                        tokio::select! {
                            biased;
                            () = &mut shutdown => return Ok(summary),
                            () = tokio::time::sleep(delay) => {}
                        }
                    }
                }
            }
        }
    }

    /// Chats in a batch are handled concurrently; messages within one chat
    /// keep their arrival order.
    async fn process_batch(&self, updates: Vec<TelegramUpdate>, summary: &mut PollingSummary) {
        let mut per_chat: BTreeMap<i64, Vec<ChatText>> = BTreeMap::new();
        for update in &updates {
            summary.updates_seen += 1;
            summary.next_offset = summary.next_offset.max(update.update_id + 1);
            match update.chat_text() {
                Some(text) => per_chat.entry(text.chat_id).or_default().push(text),
                None => debug!(
                    event_name = "ingress.telegram.update_skipped",
                    update_id = update.update_id,
                    "update carries no text message"
                ),
            }
        }

        let mut tasks = JoinSet::new();
        for (chat_id, messages) in per_chat {
            let handler = self.handler.clone();
            let transport = Arc::clone(&self.transport);
            tasks.spawn(async move {
                let mut handled = 0_u64;
                for message in messages {
                    for reply in handler.handle(&message) {
                        if let Err(error) = transport.send_message(&reply).await {
                            warn!(
                                event_name = "egress.telegram.send_failed",
                                correlation_id = %message.correlation_id(),
                                chat_id,
                                error = %error,
                                "failed to deliver reply"
                            );
                        }
                    }
                    handled += 1;
                }
                handled
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(handled) => summary.messages_handled += handled,
                Err(error) => warn!(
                    event_name = "ingress.telegram.chat_task_failed",
                    error = %error,
                    "chat task terminated abnormally"
                ),
            }
        }
    }
}
