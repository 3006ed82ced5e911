use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One pricing tier of the residential schedule. `upper_bound = None` marks
/// the final, unbounded band.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TariffBand {
    pub lower_bound: Decimal,
    pub upper_bound: Option<Decimal>,
    pub rate: Decimal,
}

impl TariffBand {
    pub fn bounded(lower_bound: i64, upper_bound: i64, rate: i64) -> Self {
        Self {
            lower_bound: Decimal::from(lower_bound),
            upper_bound: Some(Decimal::from(upper_bound)),
            rate: Decimal::from(rate),
        }
    }

    pub fn unbounded(lower_bound: i64, rate: i64) -> Self {
        Self { lower_bound: Decimal::from(lower_bound), upper_bound: None, rate: Decimal::from(rate) }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TariffError {
    #[error("tariff schedule must contain at least one band")]
    Empty,
    #[error("first tariff band must start at 0, found {found}")]
    FirstBandNotAtZero { found: Decimal },
    #[error("tariff band {index} must start at {expected}, found {found}")]
    NotContiguous { index: usize, expected: Decimal, found: Decimal },
    #[error("tariff band {index} has upper bound {upper} below its lower bound {lower}")]
    InvertedBand { index: usize, lower: Decimal, upper: Decimal },
    #[error("only the last tariff band may be unbounded (band {index} is not last)")]
    UnboundedBeforeEnd { index: usize },
    #[error("last tariff band must be unbounded")]
    BoundedFinalBand,
    #[error("tariff band {index} has a negative rate {rate}")]
    NegativeRate { index: usize, rate: Decimal },
    #[error("bill for {usage} kWh is out of range")]
    Overflow { usage: Decimal },
}

/// Ordered, contiguous residential bands. Only constructible through
/// [`TariffSchedule::new`], which enforces the band invariants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TariffSchedule {
    bands: Vec<TariffBand>,
}

impl TariffSchedule {
    pub fn new(bands: Vec<TariffBand>) -> Result<Self, TariffError> {
        let Some(first) = bands.first() else {
            return Err(TariffError::Empty);
        };
        if !first.lower_bound.is_zero() {
            return Err(TariffError::FirstBandNotAtZero { found: first.lower_bound });
        }

        let last_index = bands.len() - 1;
        let mut expected_lower = Decimal::ZERO;
        for (index, band) in bands.iter().enumerate() {
            if band.lower_bound != expected_lower {
                return Err(TariffError::NotContiguous {
                    index,
                    expected: expected_lower,
                    found: band.lower_bound,
                });
            }
            if band.rate < Decimal::ZERO {
                return Err(TariffError::NegativeRate { index, rate: band.rate });
            }

            match band.upper_bound {
                Some(_) if index == last_index => return Err(TariffError::BoundedFinalBand),
                Some(upper) => {
                    if upper < band.lower_bound {
                        return Err(TariffError::InvertedBand {
                            index,
                            lower: band.lower_bound,
                            upper,
                        });
                    }
                    expected_lower = upper + Decimal::ONE;
                }
                None if index != last_index => {
                    return Err(TariffError::UnboundedBeforeEnd { index });
                }
                None => {}
            }
        }

        Ok(Self { bands })
    }

    /// Reference residential schedule in so'm per kWh.
    pub fn standard() -> Self {
        Self {
            bands: vec![
                TariffBand::bounded(0, 200, 450),
                TariffBand::bounded(201, 1_000, 900),
                TariffBand::bounded(1_001, 5_000, 1_350),
                TariffBand::bounded(5_001, 10_000, 1_575),
                TariffBand::unbounded(10_001, 1_800),
            ],
        }
    }

    pub fn bands(&self) -> &[TariffBand] {
        &self.bands
    }
}

impl Default for TariffSchedule {
    fn default() -> Self {
        Self::standard()
    }
}

pub const STANDARD_LEGAL_RATE: i64 = 900;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TariffKind {
    Residential,
    Commercial,
}

/// Monthly bill in so'm.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillResult {
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TariffCalculator {
    schedule: TariffSchedule,
    legal_rate: Decimal,
}

impl TariffCalculator {
    pub fn new(schedule: TariffSchedule, legal_rate: Decimal) -> Self {
        Self { schedule, legal_rate }
    }

    pub fn schedule(&self) -> &TariffSchedule {
        &self.schedule
    }

    pub fn legal_rate(&self) -> Decimal {
        self.legal_rate
    }

    pub fn bill(&self, kind: TariffKind, usage: Decimal) -> Result<BillResult, TariffError> {
        match kind {
            TariffKind::Residential => self.residential(usage),
            TariffKind::Commercial => self.commercial(usage),
        }
    }

    /// Tiered residential bill.
    ///
    /// Every band is charged with `+ 1` on its span: a fully consumed band
    /// bills `upper - lower + 1` units and the band holding `usage` bills
    /// `usage - lower + 1`. Both endpoints count as inclusive, so a usage of
    /// 0 still costs one unit and each crossed band edge adds one extra unit
    /// at the next band's rate. Billing has always worked this way; keep it
    /// until pricing explicitly decides otherwise.
    pub fn residential(&self, usage: Decimal) -> Result<BillResult, TariffError> {
        let overflow = || TariffError::Overflow { usage };
        let mut amount = Decimal::ZERO;
        for band in &self.schedule.bands {
            let (end, last) = match band.upper_bound {
                Some(upper) if usage > upper => (upper, false),
                _ => (usage, true),
            };
            let units = end
                .checked_sub(band.lower_bound)
                .and_then(|span| span.checked_add(Decimal::ONE))
                .ok_or_else(overflow)?;
            let charge = units.checked_mul(band.rate).ok_or_else(overflow)?;
            amount = amount.checked_add(charge).ok_or_else(overflow)?;
            if last {
                break;
            }
        }
        Ok(BillResult { amount })
    }

    pub fn commercial(&self, usage: Decimal) -> Result<BillResult, TariffError> {
        usage
            .checked_mul(self.legal_rate)
            .map(|amount| BillResult { amount })
            .ok_or(TariffError::Overflow { usage })
    }
}

impl Default for TariffCalculator {
    fn default() -> Self {
        Self::new(TariffSchedule::standard(), Decimal::from(STANDARD_LEGAL_RATE))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{TariffBand, TariffCalculator, TariffError, TariffKind, TariffSchedule};

    fn kwh(value: i64) -> Decimal {
        Decimal::from(value)
    }

    #[test]
    fn first_band_edge_bills_inclusive_span() {
        let calculator = TariffCalculator::default();
        assert_eq!(calculator.residential(kwh(200)).expect("in range").amount, kwh(90_450));
    }

    #[test]
    fn zero_usage_still_bills_one_unit() {
        let calculator = TariffCalculator::default();
        assert_eq!(calculator.residential(kwh(0)).expect("in range").amount, kwh(450));
    }

    #[test]
    fn crossing_a_band_edge_adds_the_boundary_unit_again() {
        let calculator = TariffCalculator::default();
        // 201 * 450 + (1200 - 201 + 1) * 900
        assert_eq!(calculator.residential(kwh(1_200)).expect("in range").amount, kwh(991_350));
        // 201 * 450 + (201 - 201 + 1) * 900
        assert_eq!(calculator.residential(kwh(201)).expect("in range").amount, kwh(91_350));
    }

    #[test]
    fn usage_in_unbounded_band_walks_every_tier() {
        let calculator = TariffCalculator::default();
        let expected = kwh(201 * 450)
            + kwh(800 * 900)
            + kwh(4_000 * 1_350)
            + kwh(5_000 * 1_575)
            + kwh((12_000 - 10_001 + 1) * 1_800);
        assert_eq!(calculator.residential(kwh(12_000)).expect("in range").amount, expected);
    }

    #[test]
    fn residential_is_monotonic() {
        let calculator = TariffCalculator::default();
        let mut previous = calculator.residential(kwh(0)).expect("in range").amount;
        for usage in (1..=12_500).step_by(7) {
            let current = calculator.residential(kwh(usage)).expect("in range").amount;
            assert!(current >= previous, "bill decreased at usage {usage}");
            previous = current;
        }
    }

    #[test]
    fn commercial_is_flat_rate() {
        let calculator = TariffCalculator::default();
        for usage in [0, 1, 200, 201, 999, 10_001, 123_456] {
            let bill = calculator.commercial(kwh(usage)).expect("in range");
            assert_eq!(bill.amount, kwh(usage * 900));
        }
        let bill = calculator.bill(TariffKind::Commercial, kwh(500)).expect("in range");
        assert_eq!(bill.amount, kwh(450_000));
        assert_eq!(
            calculator.bill(TariffKind::Residential, kwh(500)),
            calculator.residential(kwh(500))
        );
    }

    #[test]
    fn standard_schedule_passes_validation() {
        let validated = TariffSchedule::new(TariffSchedule::standard().bands().to_vec())
            .expect("standard schedule is valid");
        assert_eq!(validated, TariffSchedule::standard());
    }

    #[test]
    fn schedule_validation_rejects_malformed_bands() {
        assert_eq!(TariffSchedule::new(Vec::new()), Err(TariffError::Empty));
        assert!(matches!(
            TariffSchedule::new(vec![TariffBand::unbounded(1, 450)]),
            Err(TariffError::FirstBandNotAtZero { .. })
        ));
        assert!(matches!(
            TariffSchedule::new(vec![
                TariffBand::bounded(0, 200, 450),
                TariffBand::unbounded(202, 900),
            ]),
            Err(TariffError::NotContiguous { index: 1, .. })
        ));
        assert_eq!(
            TariffSchedule::new(vec![TariffBand::bounded(0, 200, 450)]),
            Err(TariffError::BoundedFinalBand)
        );
        assert_eq!(
            TariffSchedule::new(vec![
                TariffBand::unbounded(0, 450),
                TariffBand::unbounded(201, 900),
            ]),
            Err(TariffError::UnboundedBeforeEnd { index: 0 })
        );
        assert!(matches!(
            TariffSchedule::new(vec![TariffBand::bounded(0, -1, 450), TariffBand::unbounded(0, 1)]),
            Err(TariffError::InvertedBand { index: 0, .. })
        ));
        assert!(matches!(
            TariffSchedule::new(vec![TariffBand::unbounded(0, -450)]),
            Err(TariffError::NegativeRate { index: 0, .. })
        ));
    }

    #[test]
    fn custom_schedule_drives_residential_bill() {
        let schedule = TariffSchedule::new(vec![
            TariffBand::bounded(0, 99, 100),
            TariffBand::unbounded(100, 200),
        ])
        .expect("valid schedule");
        let calculator = TariffCalculator::new(schedule, kwh(150));

        let residential = calculator.residential(kwh(150)).expect("in range");
        assert_eq!(residential.amount, kwh(100 * 100 + 51 * 200));
        assert_eq!(calculator.commercial(kwh(10)).expect("in range").amount, kwh(1_500));
    }

    #[test]
    fn bills_beyond_decimal_range_report_overflow() {
        let calculator = TariffCalculator::default();
        let huge = Decimal::from_i128_with_scale(10_i128.pow(28), 0);

        assert_eq!(calculator.residential(huge), Err(TariffError::Overflow { usage: huge }));
        assert_eq!(calculator.commercial(huge), Err(TariffError::Overflow { usage: huge }));
        assert_eq!(
            calculator.bill(TariffKind::Residential, Decimal::MAX),
            Err(TariffError::Overflow { usage: Decimal::MAX })
        );

        let priced_out = TariffCalculator::new(TariffSchedule::standard(), Decimal::MAX);
        assert!(priced_out.commercial(kwh(2)).is_err());
        assert_eq!(priced_out.commercial(kwh(1)).map(|bill| bill.amount), Ok(Decimal::MAX));
    }
}
