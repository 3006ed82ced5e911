use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::session::{CustomerClass, Locale};
use crate::flows::states::{
    ClassSelection, ConversationEvent, ConversationState, FinalChoiceSelection, FlowAction,
    LocaleSelection, TransitionOutcome,
};
use crate::input::parse_usage;

pub trait FlowDefinition {
    fn initial_state(&self) -> ConversationState;
    fn entry_actions(&self) -> Vec<FlowAction>;
    fn transition(
        &self,
        current: ConversationState,
        event: &ConversationEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError>;
}

/// Language → customer class → monthly usage → bill and SFES estimate →
/// recompute or register.
#[derive(Clone, Debug, Default)]
pub struct TariffEstimateFlow;

impl FlowDefinition for TariffEstimateFlow {
    fn initial_state(&self) -> ConversationState {
        ConversationState::AwaitingLocale
    }

    fn entry_actions(&self) -> Vec<FlowAction> {
        vec![FlowAction::PromptLocale]
    }

    fn transition(
        &self,
        current: ConversationState,
        event: &ConversationEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_tariff_estimate(current, event)
    }
}

pub struct FlowEngine<F> {
    flow: F,
}

impl<F> FlowEngine<F>
where
    F: FlowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn initial_state(&self) -> ConversationState {
        self.flow.initial_state()
    }

    pub fn entry_actions(&self) -> Vec<FlowAction> {
        self.flow.entry_actions()
    }

    pub fn apply(
        &self,
        current: ConversationState,
        event: &ConversationEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        self.flow.transition(current, event)
    }

    pub fn apply_with_audit<S>(
        &self,
        current: ConversationState,
        event: &ConversationEvent,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.apply(current, event);
        match &result {
            Ok(outcome) => {
                sink.emit(
                    AuditEvent::new(
                        audit,
                        "flow.transition_applied",
                        AuditCategory::Flow,
                        AuditOutcome::Success,
                    )
                    .with_metadata("from", format!("{:?}", outcome.from))
                    .with_metadata("to", format!("{:?}", outcome.to))
                    .with_metadata("event", event_name(&outcome.event)),
                );
            }
            Err(error) => {
                sink.emit(
                    AuditEvent::new(
                        audit,
                        "flow.transition_rejected",
                        AuditCategory::Flow,
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }
}

impl Default for FlowEngine<TariffEstimateFlow> {
    fn default() -> Self {
        Self::new(TariffEstimateFlow)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("no transition from {state:?} for {event}")]
    InvalidTransition { state: ConversationState, event: String },
}

/// Event name without payload, safe to log.
pub fn event_name(event: &ConversationEvent) -> &'static str {
    match event {
        ConversationEvent::Start => "start",
        ConversationEvent::LocaleChosen(_) => "locale_chosen",
        ConversationEvent::ClassChosen { .. } => "class_chosen",
        ConversationEvent::UsageEntered(_) => "usage_entered",
        ConversationEvent::FinalChoice(_) => "final_choice",
        ConversationEvent::Cancel => "cancel",
        ConversationEvent::Command(_) => "command",
        ConversationEvent::Text(_) => "text",
    }
}

fn transition_tariff_estimate(
    current: ConversationState,
    event: &ConversationEvent,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use ConversationEvent::{Cancel, ClassChosen, FinalChoice, LocaleChosen, UsageEntered};
    use ConversationState::{
        AwaitingCustomerClass, AwaitingFinalChoice, AwaitingLocale, AwaitingUsage, Terminated,
    };
    use FlowAction::{
        AcknowledgeCancel, PromptCustomerClass, PromptFinalChoice, PromptUsage, PublishEstimate,
        RecordCustomerClass, RecordLocale, RejectUsage, SendRegistrationLink,
    };

    let (to, actions) = match (current, event) {
        (Terminated, _) => (Terminated, Vec::new()),
        (_, Cancel) => (Terminated, vec![AcknowledgeCancel]),
        (AwaitingLocale, LocaleChosen(selection)) => {
            let locale = match selection {
                LocaleSelection::Known(locale) => *locale,
                LocaleSelection::Unrecognized(_) => Locale::FALLBACK,
            };
            (AwaitingCustomerClass, vec![RecordLocale(locale), PromptCustomerClass])
        }
        (AwaitingCustomerClass, ClassChosen { selection, label }) => {
            let class = match selection {
                ClassSelection::Residential => CustomerClass::Residential,
                ClassSelection::Commercial => CustomerClass::Commercial,
                ClassSelection::Unrecognized(raw) => CustomerClass::Unrecognized(raw.clone()),
            };
            (AwaitingUsage, vec![RecordCustomerClass { class, label: label.clone() }, PromptUsage])
        }
        (AwaitingUsage, UsageEntered(raw)) => match parse_usage(raw) {
            Ok(monthly_usage) => {
                (AwaitingFinalChoice, vec![PublishEstimate { monthly_usage }, PromptFinalChoice])
            }
            Err(error) => (AwaitingUsage, vec![RejectUsage(error)]),
        },
        (AwaitingFinalChoice, FinalChoice(FinalChoiceSelection::Recompute)) => {
            (AwaitingCustomerClass, vec![PromptCustomerClass])
        }
        (AwaitingFinalChoice, FinalChoice(FinalChoiceSelection::Purchase)) => {
            (Terminated, vec![SendRegistrationLink])
        }
        _ => {
            return Err(FlowTransitionError::InvalidTransition {
                state: current,
                event: event_name(event).to_owned(),
            });
        }
    };

    Ok(TransitionOutcome { from: current, to, event: event.clone(), actions })
}
