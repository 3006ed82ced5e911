use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::flows::states::ConversationState;
use crate::solar::SolarEstimate;
use crate::tariff::{BillResult, TariffKind};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for SessionId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

/// Conversation language. Codes are opaque to the core; the catalogue maps
/// them to prompts and button labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    Ru,
    Uz,
}

impl Locale {
    /// Used before a language is chosen and when the choice is not understood.
    pub const FALLBACK: Self = Self::Uz;

    pub const fn code(self) -> &'static str {
        match self {
            Self::Ru => "ru",
            Self::Uz => "uz",
        }
    }
}

/// The customer class picked from the menu. A label outside the known menu is
/// kept verbatim and billed like a commercial customer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerClass {
    Residential,
    Commercial,
    Unrecognized(String),
}

impl CustomerClass {
    pub fn tariff_kind(&self) -> TariffKind {
        match self {
            Self::Residential => TariffKind::Residential,
            Self::Commercial | Self::Unrecognized(_) => TariffKind::Commercial,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationSummary {
    pub customer_class: CustomerClass,
    /// Raw menu label as the user sent it; echoed back in the result message.
    pub class_label: String,
    pub monthly_usage: Decimal,
    pub annual_usage: Decimal,
    pub bill: BillResult,
    pub estimate: SolarEstimate,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub state: ConversationState,
    pub locale: Option<Locale>,
    pub customer_class: Option<CustomerClass>,
    pub class_label: Option<String>,
    pub last_result: Option<CalculationSummary>,
}

impl Session {
    pub fn new(id: SessionId, state: ConversationState) -> Self {
        Self { id, state, locale: None, customer_class: None, class_label: None, last_result: None }
    }

    pub fn effective_locale(&self) -> Locale {
        self.locale.unwrap_or(Locale::FALLBACK)
    }

    pub fn is_terminated(&self) -> bool {
        self.state == ConversationState::Terminated
    }
}

#[cfg(test)]
mod tests {
    use super::{CustomerClass, Locale, Session, SessionId};
    use crate::flows::states::ConversationState;
    use crate::tariff::TariffKind;

    #[test]
    fn unset_locale_renders_as_fallback() {
        let mut session = Session::new(SessionId::from(42), ConversationState::AwaitingLocale);
        assert_eq!(session.effective_locale(), Locale::Uz);

        session.locale = Some(Locale::Ru);
        assert_eq!(session.effective_locale(), Locale::Ru);
        assert_eq!(session.id.to_string(), "42");
    }

    #[test]
    fn unrecognized_class_bills_at_commercial_rate() {
        assert_eq!(CustomerClass::Residential.tariff_kind(), TariffKind::Residential);
        assert_eq!(CustomerClass::Commercial.tariff_kind(), TariffKind::Commercial);
        assert_eq!(
            CustomerClass::Unrecognized("Fermer xo'jaligi".to_owned()).tariff_kind(),
            TariffKind::Commercial
        );
    }
}
