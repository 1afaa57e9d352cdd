use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::tables::TaxTables;
use crate::types::{round_dollars, Money, Rate};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RmdInfo {
    pub is_required: bool,
    pub amount: Money,
    pub age: u32,
    pub prior_year_balance: Money,
    /// Life-expectancy divisor used, absent when no RMD is required.
    pub distribution_period: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RmdScheduleYear {
    pub age: u32,
    pub starting_balance: Money,
    pub distribution_period: Decimal,
    pub rmd: Money,
}

// ---------------------------------------------------------------------------
// Core functions
// ---------------------------------------------------------------------------

/// Required minimum distribution for one year.
///
/// Required only from the start age (73) onward and only while a balance
/// remains. Ages beyond the divisor table clamp to its last entry.
pub fn required_minimum_distribution(
    age: u32,
    prior_year_balance: Money,
    tables: &TaxTables,
) -> RmdInfo {
    if age < tables.rmd_start_age || prior_year_balance <= Decimal::ZERO {
        return RmdInfo {
            is_required: false,
            amount: Decimal::ZERO,
            age,
            prior_year_balance,
            distribution_period: None,
        };
    }

    match tables.rmd_divisor(age) {
        Some(divisor) if divisor > Decimal::ZERO => RmdInfo {
            is_required: true,
            amount: round_dollars(prior_year_balance / divisor),
            age,
            prior_year_balance,
            distribution_period: Some(divisor),
        },
        _ => RmdInfo {
            is_required: false,
            amount: Decimal::ZERO,
            age,
            prior_year_balance,
            distribution_period: None,
        },
    }
}

/// Stand-alone multi-year RMD schedule: each year the RMD is taken from the
/// balance and the remainder grows. Used for RMD visualisations; the main
/// projection engine computes its own RMDs year by year.
pub fn rmd_schedule(
    current_age: u32,
    balance: Money,
    growth_rate: Rate,
    end_age: u32,
    tables: &TaxTables,
) -> Vec<RmdScheduleYear> {
    let mut schedule = Vec::new();
    let mut running = balance;
    let growth_factor = Decimal::ONE + growth_rate;

    for age in current_age..=end_age {
        if age >= tables.rmd_start_age && running > Decimal::ZERO {
            let info = required_minimum_distribution(age, running, tables);
            if let Some(divisor) = info.distribution_period {
                schedule.push(RmdScheduleYear {
                    age,
                    starting_balance: running,
                    distribution_period: divisor,
                    rmd: info.amount,
                });
                running = (running - info.amount).max(Decimal::ZERO);
            }
        }
        running *= growth_factor;
    }

    schedule
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_not_required_below_start_age() {
        let tables = TaxTables::federal_2024();
        let info = required_minimum_distribution(72, dec!(500_000), &tables);
        assert!(!info.is_required);
        assert_eq!(info.amount, Decimal::ZERO);
        assert_eq!(info.distribution_period, None);
    }

    #[test]
    fn test_required_at_73() {
        let tables = TaxTables::federal_2024();
        let info = required_minimum_distribution(73, dec!(500_000), &tables);
        assert!(info.is_required);
        // 500,000 / 26.5 = 18,867.92... rounds to 18,868
        assert_eq!(info.amount, dec!(18_868));
        assert_eq!(info.distribution_period, Some(dec!(26.5)));
    }

    #[test]
    fn test_not_required_with_zero_balance() {
        let tables = TaxTables::federal_2024();
        let info = required_minimum_distribution(80, Decimal::ZERO, &tables);
        assert!(!info.is_required);
        assert_eq!(info.amount, Decimal::ZERO);
    }

    #[test]
    fn test_age_beyond_table_clamps() {
        let tables = TaxTables::federal_2024();
        let info = required_minimum_distribution(125, dec!(100_000), &tables);
        assert!(info.is_required);
        assert_eq!(info.distribution_period, Some(dec!(2.0)));
        assert_eq!(info.amount, dec!(50_000));
    }

    #[test]
    fn test_schedule_starts_at_rmd_age() {
        let tables = TaxTables::federal_2024();
        let schedule = rmd_schedule(70, dec!(400_000), dec!(0.05), 76, &tables);
        assert_eq!(schedule.first().map(|y| y.age), Some(73));
        assert_eq!(schedule.last().map(|y| y.age), Some(76));
        assert_eq!(schedule.len(), 4);
    }

    #[test]
    fn test_schedule_balance_grows_before_first_rmd() {
        let tables = TaxTables::federal_2024();
        let schedule = rmd_schedule(71, dec!(100_000), dec!(0.10), 73, &tables);
        // Two years of 10% growth before age 73
        assert_eq!(schedule[0].starting_balance, dec!(121_000.00));
    }

    #[test]
    fn test_schedule_rmd_share_increases_with_age() {
        let tables = TaxTables::federal_2024();
        let schedule = rmd_schedule(73, dec!(1_000_000), dec!(0.0), 90, &tables);
        let first_pct = schedule.first().unwrap().rmd / schedule.first().unwrap().starting_balance;
        let last_pct = schedule.last().unwrap().rmd / schedule.last().unwrap().starting_balance;
        assert!(last_pct > first_pct);
    }
}
