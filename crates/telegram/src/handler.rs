use std::sync::Arc;

use quvvat_core::flows::{ConversationController, HandleOutcome};
use quvvat_core::l10n::LocalizationProvider;
use quvvat_core::sessions::{InMemorySessionStore, SessionStore};
use tracing::{debug, info};

use crate::keyboard::{MessageBuilder, OutgoingMessage};
use crate::updates::ChatText;

/// Feeds chat text into the conversation controller and renders the
/// resulting effects as Bot API messages.
pub struct UpdateHandler<S = InMemorySessionStore> {
    controller: Arc<ConversationController<S>>,
    catalog: Arc<dyn LocalizationProvider>,
}

impl<S> Clone for UpdateHandler<S> {
    fn clone(&self) -> Self {
        Self { controller: Arc::clone(&self.controller), catalog: Arc::clone(&self.catalog) }
    }
}

impl<S> UpdateHandler<S>
where
    S: SessionStore,
{
    pub fn new(
        controller: Arc<ConversationController<S>>,
        catalog: Arc<dyn LocalizationProvider>,
    ) -> Self {
        Self { controller, catalog }
    }

    pub fn controller(&self) -> &ConversationController<S> {
        &self.controller
    }

    pub fn handle(&self, message: &ChatText) -> Vec<OutgoingMessage> {
        let correlation_id = message.correlation_id();
        let session_id = message.session_id();
        let event = message.inbound_event();

        info!(
            event_name = "ingress.telegram.update_received",
            correlation_id = %correlation_id,
            session_id = %session_id,
            "received telegram text message"
        );

        let outcome = self.controller.handle_correlated(&session_id, event, &correlation_id);
        let replies = render(message.chat_id, &outcome, self.catalog.as_ref());

        debug!(
            event_name = "ingress.telegram.update_handled",
            correlation_id = %correlation_id,
            session_id = %session_id,
            state = ?outcome.state,
            replies = replies.len(),
            "telegram update handled"
        );
        replies
    }
}

pub fn render(
    chat_id: i64,
    outcome: &HandleOutcome,
    catalog: &dyn LocalizationProvider,
) -> Vec<OutgoingMessage> {
    outcome
        .effects
        .iter()
        .map(|effect| {
            let mut builder =
                MessageBuilder::new(chat_id, catalog.render(outcome.locale, &effect.message));
            if effect.message.uses_markdown() {
                builder = builder.markdown();
            }
            if let Some(suggestions) = effect.suggestions {
                builder = builder.keyboard_row(catalog.suggestion_labels(outcome.locale, suggestions));
            }
            builder.build()
        })
        .collect()
}
