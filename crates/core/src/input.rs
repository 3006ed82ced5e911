use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Characters removed from usage text before it is read as a number.
///
/// Both the thousands separator and the decimal point are dropped, so
/// `"1,234.56"` and `"123456"` normalize to the same value.
pub const STRIPPED_SEPARATORS: [char; 2] = [',', '.'];

/// Largest monthly usage accepted, in kWh.
pub const MAX_MONTHLY_USAGE_KWH: i64 = 1_000_000_000_000;

#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseError {
    #[error("usage text is empty after normalization")]
    Empty,
    #[error("usage text `{raw}` is not a number")]
    NotANumber { raw: String },
    #[error("usage `{raw}` must not be negative")]
    Negative { raw: String },
    #[error("usage `{raw}` exceeds {} kWh", MAX_MONTHLY_USAGE_KWH)]
    OutOfRange { raw: String },
}

/// Normalizes raw monthly usage text into an integer-valued kWh figure.
pub fn parse_usage(raw: &str) -> Result<Decimal, ParseError> {
    let cleaned: String =
        raw.trim().chars().filter(|ch| !STRIPPED_SEPARATORS.contains(ch)).collect();

    if cleaned.is_empty() {
        return Err(ParseError::Empty);
    }

    let digits = cleaned.strip_prefix('+').unwrap_or(&cleaned);
    let (negative, digits) = match digits.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, digits),
    };

    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(ParseError::NotANumber { raw: raw.to_owned() });
    }

    // Only digits remain, so a failed conversion means too many of them.
    let value = Decimal::from_str(digits)
        .map_err(|_| ParseError::OutOfRange { raw: raw.to_owned() })?;

    if negative && !value.is_zero() {
        return Err(ParseError::Negative { raw: raw.to_owned() });
    }
    if value > Decimal::from(MAX_MONTHLY_USAGE_KWH) {
        return Err(ParseError::OutOfRange { raw: raw.to_owned() });
    }

    Ok(value)
}
