use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::session::{CustomerClass, Locale};
use crate::input::ParseError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    AwaitingLocale,
    AwaitingCustomerClass,
    AwaitingUsage,
    AwaitingFinalChoice,
    Terminated,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocaleSelection {
    Known(Locale),
    Unrecognized(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassSelection {
    Residential,
    Commercial,
    Unrecognized(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinalChoiceSelection {
    Recompute,
    Purchase,
    Unrecognized(String),
}

/// Events after raw inbound text has been interpreted for the current state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversationEvent {
    Start,
    LocaleChosen(LocaleSelection),
    ClassChosen { selection: ClassSelection, label: String },
    UsageEntered(String),
    FinalChoice(FinalChoiceSelection),
    Cancel,
    Command(String),
    /// Free text the current state gives no meaning to.
    Text(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowAction {
    PromptLocale,
    RecordLocale(Locale),
    PromptCustomerClass,
    RecordCustomerClass { class: CustomerClass, label: String },
    PromptUsage,
    RejectUsage(ParseError),
    PublishEstimate { monthly_usage: Decimal },
    PromptFinalChoice,
    SendRegistrationLink,
    AcknowledgeCancel,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: ConversationState,
    pub to: ConversationState,
    pub event: ConversationEvent,
    pub actions: Vec<FlowAction>,
}
