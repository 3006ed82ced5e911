use rust_decimal::Decimal;
use thiserror::Error;

use crate::{solar::SolarError, tariff::TariffError};

/// Why a parsed usage figure could not be turned into an estimate.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("annual usage for {monthly_usage} kWh per month is out of range")]
    AnnualUsageOverflow { monthly_usage: Decimal },
    #[error(transparent)]
    Tariff(#[from] TariffError),
    #[error(transparent)]
    Solar(#[from] SolarError),
}
