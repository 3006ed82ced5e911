//! Telegram channel for the quvvat bot.
//!
//! - `updates`: Bot API update payloads and `/start`, `/cancel` parsing
//! - `catalog`: Russian and Uzbek texts, button labels, number formatting
//! - `keyboard`: `sendMessage` payloads with one-time reply keyboards
//! - `handler`: runs chat text through the conversation controller
//! - `polling`: long-poll loop with offset tracking and retry backoff
//! - `bot_api`: `reqwest` transport against the HTTPS Bot API
//!
//! ```text
//! getUpdates → PollingRunner → UpdateHandler → ConversationController
//!                                   ↓
//!            sendMessage ← StaticCatalog + MessageBuilder
//! ```

pub mod bot_api;
pub mod catalog;
pub mod handler;
pub mod keyboard;
pub mod polling;
pub mod updates;

pub use bot_api::BotApiTransport;
pub use catalog::StaticCatalog;
pub use handler::UpdateHandler;
pub use polling::{
    NoopUpdateTransport, PollingError, PollingRunner, PollingSummary, ReconnectPolicy,
    TransportError, UpdateTransport,
};
