//! Locale-neutral message references handed to the localization layer.
//!
//! The conversation core never produces display text. It emits
//! [`OutboundEffect`]s naming a [`MessageRef`] and an optional
//! [`SuggestionSet`]; a [`LocalizationProvider`] turns those into text and
//! button labels, and a [`SelectionDecoder`] maps tapped labels back into
//! selections.

use serde::{Deserialize, Serialize};

use crate::domain::session::{CalculationSummary, Locale};
use crate::flows::states::{ClassSelection, FinalChoiceSelection, LocaleSelection};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum MessageRef {
    LocalePrompt,
    CustomerClassPrompt,
    UsagePrompt,
    UsageRetry,
    CalculationResult(Box<CalculationSummary>),
    FinalChoicePrompt,
    RegistrationHandoff,
    Cancelled,
}

impl MessageRef {
    /// Messages whose rendered text carries Markdown emphasis.
    pub fn uses_markdown(&self) -> bool {
        matches!(self, Self::CalculationResult(_))
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::LocalePrompt => "locale_prompt",
            Self::CustomerClassPrompt => "customer_class_prompt",
            Self::UsagePrompt => "usage_prompt",
            Self::UsageRetry => "usage_retry",
            Self::CalculationResult(_) => "calculation_result",
            Self::FinalChoicePrompt => "final_choice_prompt",
            Self::RegistrationHandoff => "registration_handoff",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionSet {
    Locales,
    CustomerClasses,
    FinalChoices,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundEffect {
    pub message: MessageRef,
    pub suggestions: Option<SuggestionSet>,
}

impl OutboundEffect {
    pub fn message(message: MessageRef) -> Self {
        Self { message, suggestions: None }
    }

    pub fn with_suggestions(message: MessageRef, suggestions: SuggestionSet) -> Self {
        Self { message, suggestions: Some(suggestions) }
    }
}

pub trait LocalizationProvider: Send + Sync {
    fn render(&self, locale: Locale, message: &MessageRef) -> String;
    fn suggestion_labels(&self, locale: Locale, suggestions: SuggestionSet) -> Vec<String>;
}

pub trait SelectionDecoder: Send + Sync {
    fn decode_locale(&self, raw: &str) -> LocaleSelection;
    fn decode_customer_class(&self, raw: &str) -> ClassSelection;
    fn decode_final_choice(&self, raw: &str) -> FinalChoiceSelection;
}
