//! Outgoing `sendMessage` payloads and reply keyboards.

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ParseMode {
    Markdown,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct KeyboardButton {
    pub text: String,
}

impl KeyboardButton {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReplyKeyboardMarkup {
    pub keyboard: Vec<Vec<KeyboardButton>>,
    pub one_time_keyboard: bool,
    pub resize_keyboard: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OutgoingMessage {
    pub chat_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<ReplyKeyboardMarkup>,
}

pub struct MessageBuilder {
    chat_id: i64,
    text: String,
    parse_mode: Option<ParseMode>,
    rows: Vec<Vec<KeyboardButton>>,
}

impl MessageBuilder {
    pub fn new(chat_id: i64, text: impl Into<String>) -> Self {
        Self { chat_id, text: text.into(), parse_mode: None, rows: Vec::new() }
    }

    pub fn markdown(mut self) -> Self {
        self.parse_mode = Some(ParseMode::Markdown);
        self
    }

    pub fn keyboard_row<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let row: Vec<KeyboardButton> = labels.into_iter().map(KeyboardButton::new).collect();
        if !row.is_empty() {
            self.rows.push(row);
        }
        self
    }

    /// Keyboards are always one-shot and resized to fit the buttons.
    pub fn build(self) -> OutgoingMessage {
        let reply_markup = (!self.rows.is_empty()).then(|| ReplyKeyboardMarkup {
            keyboard: self.rows,
            one_time_keyboard: true,
            resize_keyboard: true,
        });

        OutgoingMessage {
            chat_id: self.chat_id,
            text: self.text,
            parse_mode: self.parse_mode,
            reply_markup,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{MessageBuilder, ParseMode};

    #[test]
    fn plain_message_omits_optional_fields() {
        let message = MessageBuilder::new(42, "Jarayon bekor qilindi.").build();

        let payload = serde_json::to_value(&message).expect("serialize");
        assert_eq!(payload, json!({ "chat_id": 42, "text": "Jarayon bekor qilindi." }));
    }

    #[test]
    fn keyboard_is_one_time_and_resized() {
        let message = MessageBuilder::new(7, "Tilni tanlang.")
            .keyboard_row(["🇷🇺 Русский язык", "🇺🇿 O'zbek tili"])
            .build();

        let payload = serde_json::to_value(&message).expect("serialize");
        assert_eq!(
            payload["reply_markup"],
            json!({
                "keyboard": [[{ "text": "🇷🇺 Русский язык" }, { "text": "🇺🇿 O'zbek tili" }]],
                "one_time_keyboard": true,
                "resize_keyboard": true
            })
        );
    }

    #[test]
    fn markdown_sets_parse_mode() {
        let message = MessageBuilder::new(1, "*90,450*").markdown().build();

        assert_eq!(message.parse_mode, Some(ParseMode::Markdown));
        let payload = serde_json::to_value(&message).expect("serialize");
        assert_eq!(payload["parse_mode"], "Markdown");
    }

    #[test]
    fn empty_rows_do_not_produce_a_keyboard() {
        let message = MessageBuilder::new(1, "text").keyboard_row(Vec::<String>::new()).build();
        assert!(message.reply_markup.is_none());
    }
}
