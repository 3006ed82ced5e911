//! Bot API update payloads and their mapping onto conversation events.

use quvvat_core::domain::session::SessionId;
use quvvat_core::flows::InboundEvent;
use serde::Deserialize;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<IncomingMessage>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct IncomingMessage {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// A text message addressed to one chat, the unit the runner dispatches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatText {
    pub update_id: i64,
    pub chat_id: i64,
    pub text: String,
}

impl ChatText {
    pub fn session_id(&self) -> SessionId {
        SessionId::from(self.chat_id)
    }

    pub fn correlation_id(&self) -> String {
        format!("upd-{}", self.update_id)
    }

    pub fn inbound_event(&self) -> InboundEvent {
        match parse_command(&self.text) {
            Some("start") => InboundEvent::Start,
            Some("cancel") => InboundEvent::Cancel,
            Some(other) => InboundEvent::Command(other.to_owned()),
            None => InboundEvent::Text(self.text.clone()),
        }
    }
}

impl TelegramUpdate {
    /// Only text messages take part in the conversation; stickers, photos and
    /// service updates are skipped.
    pub fn chat_text(&self) -> Option<ChatText> {
        let message = self.message.as_ref()?;
        let text = message.text.as_ref()?;
        Some(ChatText { update_id: self.update_id, chat_id: message.chat.id, text: text.clone() })
    }
}

/// `/name`, `/name@bot` and `/name args` all yield `name`.
pub fn parse_command(text: &str) -> Option<&str> {
    let rest = text.trim_start().strip_prefix('/')?;
    let word = rest.split_whitespace().next()?;
    let name = word.split_once('@').map_or(word, |(name, _)| name);
    (!name.is_empty()).then_some(name)
}
