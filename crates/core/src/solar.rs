use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sizing constants for a solar power station (SFES).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolarConstants {
    /// kWh produced per installed kW per year.
    pub annual_yield_kwh_per_kw: Decimal,
    pub area_m2_per_kw: Decimal,
    /// so'm per installed kW.
    pub cost_per_kw: Decimal,
}

impl Default for SolarConstants {
    fn default() -> Self {
        Self {
            annual_yield_kwh_per_kw: Decimal::from(1_500),
            area_m2_per_kw: Decimal::from(10),
            cost_per_kw: Decimal::from(6_000_000),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolarEstimate {
    pub required_capacity_kw: Decimal,
    pub required_area_m2: Decimal,
    pub estimated_cost: Decimal,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SolarError {
    #[error("solar estimate for {annual_usage} kWh per year is out of range")]
    OutOfRange { annual_usage: Decimal },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SolarSizingEstimator {
    constants: SolarConstants,
}

impl SolarSizingEstimator {
    pub fn new(constants: SolarConstants) -> Self {
        Self { constants }
    }

    pub fn constants(&self) -> &SolarConstants {
        &self.constants
    }

    /// Sizes an installation covering `annual_usage` kWh per year. Callers
    /// pass `monthly * 12`.
    pub fn estimate(&self, annual_usage: Decimal) -> Result<SolarEstimate, SolarError> {
        let out_of_range = || SolarError::OutOfRange { annual_usage };
        let constants = &self.constants;

        let required_capacity_kw = annual_usage
            .checked_div(constants.annual_yield_kwh_per_kw)
            .ok_or_else(out_of_range)?;
        Ok(SolarEstimate {
            required_capacity_kw,
            required_area_m2: required_capacity_kw
                .checked_mul(constants.area_m2_per_kw)
                .ok_or_else(out_of_range)?,
            estimated_cost: required_capacity_kw
                .checked_mul(constants.cost_per_kw)
                .ok_or_else(out_of_range)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{SolarConstants, SolarError, SolarSizingEstimator};

    #[test]
    fn capacity_area_and_cost_follow_reference_constants() {
        let estimate =
            SolarSizingEstimator::default().estimate(Decimal::from(6_000)).expect("in range");

        assert_eq!(estimate.required_capacity_kw, Decimal::from(4));
        assert_eq!(estimate.required_area_m2, Decimal::from(40));
        assert_eq!(estimate.estimated_cost, Decimal::from(24_000_000));
    }

    #[test]
    fn doubling_annual_usage_doubles_every_output() {
        let estimator = SolarSizingEstimator::default();
        for annual in [0, 1_500, 6_000, 12_000, 45_000, 150_000] {
            let single = estimator.estimate(Decimal::from(annual)).expect("in range");
            let double = estimator.estimate(Decimal::from(annual * 2)).expect("in range");
            let two = Decimal::TWO;

            assert_eq!(double.required_capacity_kw, single.required_capacity_kw * two);
            assert_eq!(double.required_area_m2, single.required_area_m2 * two);
            assert_eq!(double.estimated_cost, single.estimated_cost * two);
        }
    }

    #[test]
    fn fractional_capacity_is_not_rounded() {
        let estimate =
            SolarSizingEstimator::default().estimate(Decimal::from(2_250)).expect("in range");
        assert_eq!(estimate.required_capacity_kw, Decimal::new(15, 1));
        assert_eq!(estimate.required_area_m2, Decimal::from(15));
        assert_eq!(estimate.estimated_cost, Decimal::from(9_000_000));
    }

    #[test]
    fn custom_constants_are_honoured() {
        let estimator = SolarSizingEstimator::new(SolarConstants {
            annual_yield_kwh_per_kw: Decimal::from(1_200),
            area_m2_per_kw: Decimal::from(8),
            cost_per_kw: Decimal::from(5_000_000),
        });
        let estimate = estimator.estimate(Decimal::from(2_400)).expect("in range");

        assert_eq!(estimate.required_capacity_kw, Decimal::from(2));
        assert_eq!(estimate.required_area_m2, Decimal::from(16));
        assert_eq!(estimate.estimated_cost, Decimal::from(10_000_000));
    }

    #[test]
    fn estimate_beyond_decimal_range_is_rejected() {
        let estimator = SolarSizingEstimator::default();
        assert_eq!(
            estimator.estimate(Decimal::MAX),
            Err(SolarError::OutOfRange { annual_usage: Decimal::MAX })
        );
    }
}
