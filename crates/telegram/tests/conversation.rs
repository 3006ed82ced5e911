use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use quvvat_core::flows::{ConversationController, ConversationState};
use quvvat_core::sessions::SessionStore;
use quvvat_core::solar::SolarSizingEstimator;
use quvvat_core::tariff::TariffCalculator;
use quvvat_core::SessionId;
use quvvat_telegram::keyboard::{OutgoingMessage, ParseMode};
use quvvat_telegram::updates::{Chat, IncomingMessage, TelegramUpdate};
use quvvat_telegram::{
    PollingRunner, ReconnectPolicy, StaticCatalog, TransportError, UpdateHandler, UpdateTransport,
};
use tokio::sync::Mutex;

const CHAT: i64 = 9_001;

#[derive(Default)]
struct RecordingTransport {
    batches: Mutex<VecDeque<Vec<TelegramUpdate>>>,
    sent: Mutex<Vec<OutgoingMessage>>,
}

#[async_trait]
impl UpdateTransport for RecordingTransport {
    async fn fetch_updates(
        &self,
        _offset: i64,
    ) -> Result<Option<Vec<TelegramUpdate>>, TransportError> {
        Ok(self.batches.lock().await.pop_front())
    }

    async fn send_message(&self, message: &OutgoingMessage) -> Result<(), TransportError> {
        self.sent.lock().await.push(message.clone());
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "recording"
    }
}

fn batches(texts: &[&str]) -> VecDeque<Vec<TelegramUpdate>> {
    texts
        .iter()
        .enumerate()
        .map(|(index, text)| {
            let update_id = index as i64 + 100;
            vec![TelegramUpdate {
                update_id,
                message: Some(IncomingMessage {
                    message_id: update_id,
                    chat: Chat { id: CHAT },
                    text: Some((*text).to_owned()),
                }),
            }]
        })
        .collect()
}

async fn run_script(texts: &[&str]) -> (Vec<OutgoingMessage>, Arc<ConversationController>) {
    let catalog = Arc::new(StaticCatalog::new("https://forms.gle/Tszp1DBT3vw4SB8A7"));
    let controller = Arc::new(ConversationController::in_memory(
        TariffCalculator::default(),
        SolarSizingEstimator::default(),
        catalog.clone(),
    ));
    let transport = Arc::new(RecordingTransport {
        batches: Mutex::new(batches(texts)),
        sent: Mutex::new(Vec::new()),
    });
    let runner = PollingRunner::new(
        transport.clone(),
        UpdateHandler::new(Arc::clone(&controller), catalog),
        ReconnectPolicy { max_retries: 0, base_delay_ms: 0, max_delay_ms: 0 },
    );

    runner.run(std::future::pending()).await.expect("script runs to completion");
    let sent = transport.sent.lock().await.clone();
    (sent, controller)
}

#[tokio::test]
async fn russian_residential_customer_registers_after_estimate() {
    let (sent, controller) = run_script(&[
        "/start",
        "🇷🇺 Русский язык",
        "🏠 Физическое лицо",
        "пятьсот",
        "500",
        "Я хочу купить 💰",
        "ещё раз?",
    ])
    .await;

    let texts: Vec<&str> = sent.iter().map(|message| message.text.as_str()).collect();
    assert_eq!(texts[0], "Tilni tanlang. Выберите язык.");
    assert_eq!(texts[1], "Выберите подходящий раздел.");
    assert_eq!(texts[2], "Введите месячное потребление ✏️: (кВт)");
    assert_eq!(texts[3], "Неверные данные, попробуйте снова.🔄");
    assert_eq!(
        texts[4],
        "🏠 Физическое лицо Потребление электроэнергии за 1 месяц: *360,450* сум.\n\
         Необходимая мощность СФЭС: *4* кВт\n\
         Требуемая площадь: *40* м²\n\
         Примерные стоимость: *24,000,000* сум"
    );
    assert_eq!(sent[4].parse_mode, Some(ParseMode::Markdown));
    assert_eq!(texts[5], "Выберите дальнейшее действие:");
    assert_eq!(
        texts[6],
        "Зарегистрируйтесь по ссылке на Google Forms. Наши специалисты скоро с вами свяжутся 😊: [https://forms.gle/Tszp1DBT3vw4SB8A7]"
    );
    assert_eq!(sent.len(), 7, "terminated session stays silent");

    let session = controller.sessions().get(&SessionId::from(CHAT)).expect("session kept");
    assert_eq!(session.state, ConversationState::Terminated);
}

#[tokio::test]
async fn uzbek_business_recomputes_then_cancels() {
    let (sent, controller) = run_script(&[
        "/start@QuvvatBot",
        "🇺🇿 O'zbek tili",
        "🏢 Yuridik shaxs",
        "1.000",
        "Qayta hisoblash 🔄",
        "🏢 Yuridik shaxs",
        "/cancel",
        "/start",
    ])
    .await;

    let texts: Vec<&str> = sent.iter().map(|message| message.text.as_str()).collect();
    assert!(texts[3].starts_with("🏢 Yuridik shaxsning 1 oylik elektor energiya istemoli: *900,000* so'm."));
    assert!(texts[3].contains("Sizga kerakli СФЭС quvvati: *8* kWt"));
    assert_eq!(texts[5], "Iltimos, o'zingizga mos keladigan bo'limni tanlang.");
    assert_eq!(texts[6], "Bir oylik istemolingizni kiriting ✏️: (kWt)");
    assert_eq!(texts[7], "Jarayon bekor qilindi.");
    assert_eq!(texts[8], "Tilni tanlang. Выберите язык.");

    let session = controller.sessions().get(&SessionId::from(CHAT)).expect("session kept");
    assert_eq!(session.state, ConversationState::AwaitingLocale);
    assert_eq!(session.locale, None);
}
