use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, TracingAuditSink,
};
use crate::domain::session::{CalculationSummary, CustomerClass, Locale, Session, SessionId};
use crate::errors::DomainError;
use crate::flows::engine::{event_name, FlowEngine, TariffEstimateFlow};
use crate::flows::states::{ConversationEvent, ConversationState, FlowAction};
use crate::l10n::{MessageRef, OutboundEffect, SelectionDecoder, SuggestionSet};
use crate::sessions::{InMemorySessionStore, SessionStore};
use crate::solar::SolarSizingEstimator;
use crate::tariff::TariffCalculator;

const MONTHS_PER_YEAR: i64 = 12;

/// What the message channel delivers for a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InboundEvent {
    Start,
    Cancel,
    /// Any other slash command, without the leading `/`.
    Command(String),
    Text(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleOutcome {
    pub session_id: SessionId,
    /// `None` when the event did not belong to any session.
    pub state: Option<ConversationState>,
    /// Locale the effects must be rendered in.
    pub locale: Locale,
    pub effects: Vec<OutboundEffect>,
}

impl HandleOutcome {
    fn ignored(session_id: &SessionId, session: Option<&Session>) -> Self {
        Self {
            session_id: session_id.clone(),
            state: session.map(|session| session.state),
            locale: session.map(Session::effective_locale).unwrap_or(Locale::FALLBACK),
            effects: Vec::new(),
        }
    }
}

/// Drives one conversation per session id through the tariff estimate flow.
///
/// The controller performs no I/O: every reply is returned as an
/// [`OutboundEffect`] for the channel to render and send.
pub struct ConversationController<S = InMemorySessionStore> {
    engine: FlowEngine<TariffEstimateFlow>,
    tariff: TariffCalculator,
    solar: SolarSizingEstimator,
    decoder: Arc<dyn SelectionDecoder>,
    sessions: S,
    audit: Arc<dyn AuditSink>,
}

impl ConversationController<InMemorySessionStore> {
    pub fn in_memory(
        tariff: TariffCalculator,
        solar: SolarSizingEstimator,
        decoder: Arc<dyn SelectionDecoder>,
    ) -> Self {
        Self::new(tariff, solar, decoder, InMemorySessionStore::new())
    }
}

impl<S> ConversationController<S>
where
    S: SessionStore,
{
    pub fn new(
        tariff: TariffCalculator,
        solar: SolarSizingEstimator,
        decoder: Arc<dyn SelectionDecoder>,
        sessions: S,
    ) -> Self {
        Self {
            engine: FlowEngine::default(),
            tariff,
            solar,
            decoder,
            sessions,
            audit: Arc::new(TracingAuditSink),
        }
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn sessions(&self) -> &S {
        &self.sessions
    }

    pub fn handle_event(&self, session_id: &SessionId, event: InboundEvent) -> HandleOutcome {
        self.handle_correlated(session_id, event, "unassigned")
    }

    /// Applies one inbound event. Never fails: parse errors, unknown labels
    /// and events without a transition all resolve to a state plus effects.
    pub fn handle_correlated(
        &self,
        session_id: &SessionId,
        event: InboundEvent,
        correlation_id: &str,
    ) -> HandleOutcome {
        let audit = AuditContext::new(Some(session_id.clone()), correlation_id, "conversation");

        if event == InboundEvent::Start {
            return self.sessions.with_or_insert(
                session_id,
                || Session::new(session_id.clone(), self.engine.initial_state()),
                |session, created| self.start(session, created, &audit),
            );
        }

        self.sessions
            .with_existing(session_id, |session| self.advance(session, event, &audit))
            .unwrap_or_else(|| {
                debug!(
                    event_name = "flow.event_ignored",
                    correlation_id,
                    session_id = %session_id,
                    reason = "no_session",
                    "event for unknown session ignored"
                );
                HandleOutcome::ignored(session_id, None)
            })
    }

    fn start(&self, session: &mut Session, created: bool, audit: &AuditContext) -> HandleOutcome {
        if !created && !session.is_terminated() {
            // A live conversation ignores re-entry; run it through the engine
            // so the rejection is audited like any other unhandled event.
            return self.advance(session, InboundEvent::Start, audit);
        }

        *session = Session::new(session.id.clone(), self.engine.initial_state());
        debug!(
            event_name = "flow.session_started",
            correlation_id = %audit.correlation_id,
            session_id = %session.id,
            "conversation session started"
        );

        // Entry actions only prompt, so they cannot fail.
        let effects =
            self.execute(session, self.engine.entry_actions(), audit).unwrap_or_default();
        HandleOutcome {
            session_id: session.id.clone(),
            state: Some(session.state),
            locale: session.effective_locale(),
            effects,
        }
    }

    fn advance(
        &self,
        session: &mut Session,
        event: InboundEvent,
        audit: &AuditContext,
    ) -> HandleOutcome {
        let event = self.interpret(session.state, event);

        match self.engine.apply_with_audit(session.state, &event, self.audit.as_ref(), audit) {
            Ok(outcome) => {
                let effects = match self.execute(session, outcome.actions, audit) {
                    Ok(effects) => {
                        session.state = outcome.to;
                        effects
                    }
                    Err(error) => {
                        debug!(
                            event_name = "flow.calculation_failed",
                            correlation_id = %audit.correlation_id,
                            session_id = %session.id,
                            error = %error,
                            "estimate could not be computed; asking for usage again"
                        );
                        vec![OutboundEffect::message(MessageRef::UsageRetry)]
                    }
                };
                HandleOutcome {
                    session_id: session.id.clone(),
                    state: Some(session.state),
                    locale: session.effective_locale(),
                    effects,
                }
            }
            Err(error) => {
                debug!(
                    event_name = "flow.event_ignored",
                    correlation_id = %audit.correlation_id,
                    session_id = %session.id,
                    event = event_name(&event),
                    error = %error,
                    "event has no transition from current state"
                );
                HandleOutcome::ignored(&session.id, Some(&*session))
            }
        }
    }

    /// Gives raw text its meaning for the state the session is in.
    fn interpret(&self, state: ConversationState, event: InboundEvent) -> ConversationEvent {
        let text = match event {
            InboundEvent::Start => return ConversationEvent::Start,
            InboundEvent::Cancel => return ConversationEvent::Cancel,
            InboundEvent::Command(name) => return ConversationEvent::Command(name),
            InboundEvent::Text(text) => text,
        };

        match state {
            ConversationState::AwaitingLocale => {
                ConversationEvent::LocaleChosen(self.decoder.decode_locale(&text))
            }
            ConversationState::AwaitingCustomerClass => ConversationEvent::ClassChosen {
                selection: self.decoder.decode_customer_class(&text),
                label: text,
            },
            ConversationState::AwaitingUsage => ConversationEvent::UsageEntered(text),
            ConversationState::AwaitingFinalChoice => {
                ConversationEvent::FinalChoice(self.decoder.decode_final_choice(&text))
            }
            ConversationState::Terminated => ConversationEvent::Text(text),
        }
    }

    /// Runs the actions in order. A failed calculation aborts the rest and
    /// leaves the session state untouched.
    fn execute(
        &self,
        session: &mut Session,
        actions: Vec<FlowAction>,
        audit: &AuditContext,
    ) -> Result<Vec<OutboundEffect>, DomainError> {
        let mut effects = Vec::new();
        for action in actions {
            match action {
                FlowAction::PromptLocale => effects.push(OutboundEffect::with_suggestions(
                    MessageRef::LocalePrompt,
                    SuggestionSet::Locales,
                )),
                FlowAction::RecordLocale(locale) => session.locale = Some(locale),
                FlowAction::PromptCustomerClass => effects.push(OutboundEffect::with_suggestions(
                    MessageRef::CustomerClassPrompt,
                    SuggestionSet::CustomerClasses,
                )),
                FlowAction::RecordCustomerClass { class, label } => {
                    session.customer_class = Some(class);
                    session.class_label = Some(label);
                }
                FlowAction::PromptUsage => {
                    effects.push(OutboundEffect::message(MessageRef::UsagePrompt))
                }
                FlowAction::RejectUsage(error) => {
                    debug!(
                        event_name = "flow.usage_rejected",
                        session_id = %session.id,
                        error = %error,
                        "usage input could not be parsed"
                    );
                    effects.push(OutboundEffect::message(MessageRef::UsageRetry));
                }
                FlowAction::PublishEstimate { monthly_usage } => {
                    let summary = self.calculate(session, monthly_usage, audit)?;
                    session.last_result = Some(summary.clone());
                    effects.push(OutboundEffect::message(MessageRef::CalculationResult(Box::new(
                        summary,
                    ))));
                }
                FlowAction::PromptFinalChoice => effects.push(OutboundEffect::with_suggestions(
                    MessageRef::FinalChoicePrompt,
                    SuggestionSet::FinalChoices,
                )),
                FlowAction::SendRegistrationLink => {
                    effects.push(OutboundEffect::message(MessageRef::RegistrationHandoff))
                }
                FlowAction::AcknowledgeCancel => {
                    effects.push(OutboundEffect::message(MessageRef::Cancelled))
                }
            }
        }
        Ok(effects)
    }

    fn calculate(
        &self,
        session: &Session,
        monthly_usage: Decimal,
        audit: &AuditContext,
    ) -> Result<CalculationSummary, DomainError> {
        // The usage state is only reachable after a class was recorded.
        let customer_class = session
            .customer_class
            .clone()
            .unwrap_or_else(|| CustomerClass::Unrecognized(String::new()));
        let class_label = session.class_label.clone().unwrap_or_default();

        let result = monthly_usage
            .checked_mul(Decimal::from(MONTHS_PER_YEAR))
            .ok_or(DomainError::AnnualUsageOverflow { monthly_usage })
            .and_then(|annual_usage| {
                let bill = self.tariff.bill(customer_class.tariff_kind(), monthly_usage)?;
                let estimate = self.solar.estimate(annual_usage)?;
                Ok((annual_usage, bill, estimate))
            });

        match result {
            Ok((annual_usage, bill, estimate)) => {
                self.audit.emit(
                    AuditEvent::new(
                        audit,
                        "calculation.completed",
                        AuditCategory::Calculation,
                        AuditOutcome::Success,
                    )
                    .with_metadata("tariff", format!("{:?}", customer_class.tariff_kind()))
                    .with_metadata("monthly_usage", monthly_usage.to_string())
                    .with_metadata("bill", bill.amount.to_string()),
                );
                Ok(CalculationSummary {
                    customer_class,
                    class_label,
                    monthly_usage,
                    annual_usage,
                    bill,
                    estimate,
                })
            }
            Err(error) => {
                self.audit.emit(
                    AuditEvent::new(
                        audit,
                        "calculation.failed",
                        AuditCategory::Calculation,
                        AuditOutcome::Failed,
                    )
                    .with_metadata("monthly_usage", monthly_usage.to_string())
                    .with_metadata("error", error.to_string()),
                );
                Err(error)
            }
        }
    }
}
