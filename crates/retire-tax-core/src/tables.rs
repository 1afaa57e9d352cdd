use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{FilingStatus, Money, Rate};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A closed-open progressive-tax segment. `max: None` marks the unbounded
/// top bracket. For a given filing status brackets are contiguous, ordered
/// ascending by `min`, and have non-decreasing rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxBracket {
    pub min: Money,
    pub max: Option<Money>,
    pub rate: Rate,
}

impl TaxBracket {
    /// Width of the bracket above `floor`, unbounded for the top bracket.
    pub fn room_above(&self, floor: Money) -> Option<Money> {
        self.max.map(|max| (max - floor).max(Decimal::ZERO))
    }
}

/// Provisional-income thresholds for Social Security taxability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SsThresholds {
    pub zero_threshold: Money,
    pub fifty_threshold: Money,
}

/// One value per filing status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerStatus<T> {
    pub single: T,
    pub married_joint: T,
    pub married_separate: T,
    pub head_of_household: T,
}

impl<T> PerStatus<T> {
    pub fn get(&self, status: FilingStatus) -> &T {
        match status {
            FilingStatus::Single => &self.single,
            FilingStatus::MarriedJoint => &self.married_joint,
            FilingStatus::MarriedSeparate => &self.married_separate,
            FilingStatus::HeadOfHousehold => &self.head_of_household,
        }
    }
}

/// The constant data the engine is parameterised over: bracket tables,
/// deductions, Social Security thresholds, and the RMD life-expectancy table
/// for one tax year. Injected at startup, never computed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxTables {
    pub year: u32,
    pub ordinary: PerStatus<Vec<TaxBracket>>,
    pub capital_gains: PerStatus<Vec<TaxBracket>>,
    pub standard_deduction: PerStatus<Money>,
    /// Threshold rows exist for single and joint filers only. Married-separate
    /// and head-of-household resolve to the single row; this mirrors the
    /// simplification the surrounding narrative assumes.
    pub ss_thresholds_single: SsThresholds,
    pub ss_thresholds_joint: SsThresholds,
    pub rmd_start_age: u32,
    /// Uniform Lifetime Table divisors, one entry per age, ascending.
    pub rmd_divisors: Vec<(u32, Decimal)>,
}

impl TaxTables {
    pub fn ordinary_brackets(&self, status: FilingStatus) -> &[TaxBracket] {
        self.ordinary.get(status)
    }

    pub fn capital_gains_brackets(&self, status: FilingStatus) -> &[TaxBracket] {
        self.capital_gains.get(status)
    }

    pub fn standard_deduction(&self, status: FilingStatus) -> Money {
        *self.standard_deduction.get(status)
    }

    pub fn ss_thresholds(&self, status: FilingStatus) -> &SsThresholds {
        match status {
            FilingStatus::MarriedJoint => &self.ss_thresholds_joint,
            _ => &self.ss_thresholds_single,
        }
    }

    /// Life-expectancy divisor for `age`. Ages beyond the table clamp to the
    /// last entry; ages below the first entry return None.
    pub fn rmd_divisor(&self, age: u32) -> Option<Decimal> {
        let first = self.rmd_divisors.first()?;
        if age < first.0 {
            return None;
        }
        match self.rmd_divisors.iter().find(|(a, _)| *a == age) {
            Some((_, divisor)) => Some(*divisor),
            None => self.rmd_divisors.last().map(|(_, d)| *d),
        }
    }

    /// Federal constants for tax year 2024.
    pub fn federal_2024() -> Self {
        fn brackets(bounds: &[(Decimal, Rate)]) -> Vec<TaxBracket> {
            let mut out = Vec::with_capacity(bounds.len());
            let mut min = Decimal::ZERO;
            for (i, (bound, rate)) in bounds.iter().enumerate() {
                let max = if i == bounds.len() - 1 {
                    None
                } else {
                    Some(*bound)
                };
                out.push(TaxBracket {
                    min,
                    max,
                    rate: *rate,
                });
                min = *bound;
            }
            out
        }

        let ordinary = PerStatus {
            single: brackets(&[
                (dec!(11_600), dec!(0.10)),
                (dec!(47_150), dec!(0.12)),
                (dec!(100_525), dec!(0.22)),
                (dec!(191_950), dec!(0.24)),
                (dec!(243_725), dec!(0.32)),
                (dec!(609_350), dec!(0.35)),
                (Decimal::ZERO, dec!(0.37)),
            ]),
            married_joint: brackets(&[
                (dec!(23_200), dec!(0.10)),
                (dec!(94_300), dec!(0.12)),
                (dec!(201_050), dec!(0.22)),
                (dec!(383_900), dec!(0.24)),
                (dec!(487_450), dec!(0.32)),
                (dec!(731_200), dec!(0.35)),
                (Decimal::ZERO, dec!(0.37)),
            ]),
            married_separate: brackets(&[
                (dec!(11_600), dec!(0.10)),
                (dec!(47_150), dec!(0.12)),
                (dec!(100_525), dec!(0.22)),
                (dec!(191_950), dec!(0.24)),
                (dec!(243_725), dec!(0.32)),
                (dec!(365_600), dec!(0.35)),
                (Decimal::ZERO, dec!(0.37)),
            ]),
            head_of_household: brackets(&[
                (dec!(16_550), dec!(0.10)),
                (dec!(63_100), dec!(0.12)),
                (dec!(100_500), dec!(0.22)),
                (dec!(191_950), dec!(0.24)),
                (dec!(243_700), dec!(0.32)),
                (dec!(609_350), dec!(0.35)),
                (Decimal::ZERO, dec!(0.37)),
            ]),
        };

        let capital_gains = PerStatus {
            single: brackets(&[
                (dec!(47_025), dec!(0.0)),
                (dec!(518_900), dec!(0.15)),
                (Decimal::ZERO, dec!(0.20)),
            ]),
            married_joint: brackets(&[
                (dec!(94_050), dec!(0.0)),
                (dec!(583_750), dec!(0.15)),
                (Decimal::ZERO, dec!(0.20)),
            ]),
            married_separate: brackets(&[
                (dec!(47_025), dec!(0.0)),
                (dec!(291_850), dec!(0.15)),
                (Decimal::ZERO, dec!(0.20)),
            ]),
            head_of_household: brackets(&[
                (dec!(63_000), dec!(0.0)),
                (dec!(551_350), dec!(0.15)),
                (Decimal::ZERO, dec!(0.20)),
            ]),
        };

        let standard_deduction = PerStatus {
            single: dec!(14_600),
            married_joint: dec!(29_200),
            married_separate: dec!(14_600),
            head_of_household: dec!(21_900),
        };

        // IRS Uniform Lifetime Table (2022 revision), ages 72 through 120+.
        let rmd_divisors = vec![
            (72, dec!(27.4)),
            (73, dec!(26.5)),
            (74, dec!(25.5)),
            (75, dec!(24.6)),
            (76, dec!(23.7)),
            (77, dec!(22.9)),
            (78, dec!(22.0)),
            (79, dec!(21.1)),
            (80, dec!(20.2)),
            (81, dec!(19.4)),
            (82, dec!(18.5)),
            (83, dec!(17.7)),
            (84, dec!(16.8)),
            (85, dec!(16.0)),
            (86, dec!(15.2)),
            (87, dec!(14.4)),
            (88, dec!(13.7)),
            (89, dec!(12.9)),
            (90, dec!(12.2)),
            (91, dec!(11.5)),
            (92, dec!(10.8)),
            (93, dec!(10.1)),
            (94, dec!(9.5)),
            (95, dec!(8.9)),
            (96, dec!(8.4)),
            (97, dec!(7.8)),
            (98, dec!(7.3)),
            (99, dec!(6.8)),
            (100, dec!(6.4)),
            (101, dec!(6.0)),
            (102, dec!(5.6)),
            (103, dec!(5.2)),
            (104, dec!(4.9)),
            (105, dec!(4.6)),
            (106, dec!(4.3)),
            (107, dec!(4.1)),
            (108, dec!(3.9)),
            (109, dec!(3.7)),
            (110, dec!(3.5)),
            (111, dec!(3.4)),
            (112, dec!(3.3)),
            (113, dec!(3.1)),
            (114, dec!(3.0)),
            (115, dec!(2.9)),
            (116, dec!(2.8)),
            (117, dec!(2.7)),
            (118, dec!(2.5)),
            (119, dec!(2.3)),
            (120, dec!(2.0)),
        ];

        TaxTables {
            year: 2024,
            ordinary,
            capital_gains,
            standard_deduction,
            ss_thresholds_single: SsThresholds {
                zero_threshold: dec!(25_000),
                fifty_threshold: dec!(34_000),
            },
            ss_thresholds_joint: SsThresholds {
                zero_threshold: dec!(32_000),
                fifty_threshold: dec!(44_000),
            },
            rmd_start_age: 73,
            rmd_divisors,
        }
    }
}
