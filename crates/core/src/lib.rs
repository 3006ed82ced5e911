//! Conversation and calculation core for the quvvat tariff bot.
//!
//! Holds the billing and solar sizing calculators, the usage parser, the
//! conversation state machine with its per-session store, and the shared
//! config, error and audit plumbing. Nothing here performs network I/O.

pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod input;
pub mod l10n;
pub mod sessions;
pub mod solar;
pub mod tariff;

pub use domain::session::{CalculationSummary, CustomerClass, Locale, Session, SessionId};
pub use errors::DomainError;
pub use flows::{ConversationController, ConversationState, HandleOutcome, InboundEvent};
pub use input::{parse_usage, ParseError};
pub use l10n::{LocalizationProvider, MessageRef, OutboundEffect, SelectionDecoder, SuggestionSet};
pub use sessions::{InMemorySessionStore, SessionStore};
pub use solar::{SolarConstants, SolarError, SolarEstimate, SolarSizingEstimator};
pub use tariff::{
    BillResult, TariffBand, TariffCalculator, TariffError, TariffKind, TariffSchedule,
};
