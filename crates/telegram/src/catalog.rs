//! Russian and Uzbek texts, button labels and result formatting.

use quvvat_core::domain::session::{CalculationSummary, Locale};
use quvvat_core::flows::{ClassSelection, FinalChoiceSelection, LocaleSelection};
use quvvat_core::l10n::{LocalizationProvider, MessageRef, SelectionDecoder, SuggestionSet};
use rust_decimal::{Decimal, RoundingStrategy};

const LOCALE_PROMPT: &str = "Tilni tanlang. Выберите язык.";
const LOCALE_LABELS: [&str; 2] = ["🇷🇺 Русский язык", "🇺🇿 O'zbek tili"];
const RUSSIAN_MARKER: &str = "Русский";
const UZBEK_MARKER: &str = "O'zbek";

struct Texts {
    class_prompt: &'static str,
    residential_label: &'static str,
    commercial_label: &'static str,
    usage_prompt: &'static str,
    usage_retry: &'static str,
    final_prompt: &'static str,
    recompute_label: &'static str,
    purchase_label: &'static str,
    registration: &'static str,
    cancelled: &'static str,
}

const RU: Texts = Texts {
    class_prompt: "Выберите подходящий раздел.",
    residential_label: "🏠 Физическое лицо",
    commercial_label: "🏢 Юридическое лицо",
    usage_prompt: "Введите месячное потребление ✏️: (кВт)",
    usage_retry: "Неверные данные, попробуйте снова.🔄",
    final_prompt: "Выберите дальнейшее действие:",
    recompute_label: "Пересчитать 🔄",
    purchase_label: "Я хочу купить 💰",
    registration: "Зарегистрируйтесь по ссылке на Google Forms. Наши специалисты скоро с вами свяжутся 😊",
    cancelled: "Процесс отменен.",
};

const UZ: Texts = Texts {
    class_prompt: "Iltimos, o'zingizga mos keladigan bo'limni tanlang.",
    residential_label: "🏠 Jismoniy shaxs",
    commercial_label: "🏢 Yuridik shaxs",
    usage_prompt: "Bir oylik istemolingizni kiriting ✏️: (kWt)",
    usage_retry: "Xato ma'lumot kiritilgan, qaytadan urunib ko'ring.🔄",
    final_prompt: "Davom etishni tanlang:",
    recompute_label: "Qayta hisoblash 🔄",
    purchase_label: "Men sotib olmoqchiman 💰",
    registration: "Google Forms havolasi orqali ro'yxatdan o'ting. Mutahassislarimiz siz bilan yaqin orada bog'lanishadi 😊",
    cancelled: "Jarayon bekor qilindi.",
};

fn texts(locale: Locale) -> &'static Texts {
    match locale {
        Locale::Ru => &RU,
        Locale::Uz => &UZ,
    }
}

/// Built-in catalogue for both supported locales.
#[derive(Clone, Debug)]
pub struct StaticCatalog {
    registration_url: String,
}

impl StaticCatalog {
    pub fn new(registration_url: impl Into<String>) -> Self {
        Self { registration_url: registration_url.into() }
    }

    pub fn registration_url(&self) -> &str {
        &self.registration_url
    }

    fn render_result(&self, locale: Locale, summary: &CalculationSummary) -> String {
        let label = escape_markdown(&summary.class_label);
        let bill = group_thousands(summary.bill.amount);
        let capacity = whole_units(summary.estimate.required_capacity_kw);
        let area = whole_units(summary.estimate.required_area_m2);
        let cost = group_thousands(summary.estimate.estimated_cost);

        match locale {
            Locale::Ru => format!(
                "{label} Потребление электроэнергии за 1 месяц: *{bill}* сум.\n\
                 Необходимая мощность СФЭС: *{capacity}* кВт\n\
                 Требуемая площадь: *{area}* м²\n\
                 Примерные стоимость: *{cost}* сум"
            ),
            Locale::Uz => format!(
                "{label}ning 1 oylik elektor energiya istemoli: *{bill}* so'm.\n\
                 Sizga kerakli СФЭС quvvati: *{capacity}* kWt\n\
                 Kerakli yer maydoni: *{area}* m²\n\
                 Tahminiy narx: *{cost}* so'm"
            ),
        }
    }
}

impl LocalizationProvider for StaticCatalog {
    fn render(&self, locale: Locale, message: &MessageRef) -> String {
        let texts = texts(locale);
        match message {
            MessageRef::LocalePrompt => LOCALE_PROMPT.to_owned(),
            MessageRef::CustomerClassPrompt => texts.class_prompt.to_owned(),
            MessageRef::UsagePrompt => texts.usage_prompt.to_owned(),
            MessageRef::UsageRetry => texts.usage_retry.to_owned(),
            MessageRef::CalculationResult(summary) => self.render_result(locale, summary),
            MessageRef::FinalChoicePrompt => texts.final_prompt.to_owned(),
            MessageRef::RegistrationHandoff => {
                format!("{}: [{}]", texts.registration, self.registration_url)
            }
            MessageRef::Cancelled => texts.cancelled.to_owned(),
        }
    }

    fn suggestion_labels(&self, locale: Locale, suggestions: SuggestionSet) -> Vec<String> {
        let texts = texts(locale);
        let labels: [&str; 2] = match suggestions {
            SuggestionSet::Locales => LOCALE_LABELS,
            SuggestionSet::CustomerClasses => [texts.residential_label, texts.commercial_label],
            SuggestionSet::FinalChoices => [texts.recompute_label, texts.purchase_label],
        };
        labels.iter().map(|label| (*label).to_owned()).collect()
    }
}

impl SelectionDecoder for StaticCatalog {
    fn decode_locale(&self, raw: &str) -> LocaleSelection {
        if raw.contains(RUSSIAN_MARKER) {
            LocaleSelection::Known(Locale::Ru)
        } else if raw.contains(UZBEK_MARKER) {
            LocaleSelection::Known(Locale::Uz)
        } else {
            LocaleSelection::Unrecognized(raw.to_owned())
        }
    }

    fn decode_customer_class(&self, raw: &str) -> ClassSelection {
        if [RU.residential_label, UZ.residential_label].contains(&raw) {
            ClassSelection::Residential
        } else if [RU.commercial_label, UZ.commercial_label].contains(&raw) {
            ClassSelection::Commercial
        } else {
            ClassSelection::Unrecognized(raw.to_owned())
        }
    }

    fn decode_final_choice(&self, raw: &str) -> FinalChoiceSelection {
        if [RU.recompute_label, UZ.recompute_label].contains(&raw) {
            FinalChoiceSelection::Recompute
        } else if [RU.purchase_label, UZ.purchase_label].contains(&raw) {
            FinalChoiceSelection::Purchase
        } else {
            FinalChoiceSelection::Unrecognized(raw.to_owned())
        }
    }
}

fn round_whole(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
}

/// Rounds half-to-even and prints without a fractional part.
pub fn whole_units(value: Decimal) -> String {
    let rounded = round_whole(value);
    if rounded.is_zero() {
        return "0".to_owned();
    }
    rounded.trunc().to_string()
}

/// Rounds half-to-even and groups thousands with `,`.
pub fn group_thousands(value: Decimal) -> String {
    let rounded = round_whole(value);
    if rounded.is_zero() {
        return "0".to_owned();
    }

    let digits = rounded.abs().trunc().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded.is_sign_negative() {
        grouped.push('-');
    }
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

/// Escapes characters that legacy Markdown would treat as entity markers.
fn escape_markdown(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
