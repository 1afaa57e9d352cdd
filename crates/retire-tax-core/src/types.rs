use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Federal filing status. Selects the bracket/threshold table row everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilingStatus {
    Single,
    MarriedJoint,
    MarriedSeparate,
    HeadOfHousehold,
}

/// Brokerage account holding after-tax money with embedded unrealized gains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxableAccount {
    pub balance: Money,
    pub cost_basis: Money,
}

impl TaxableAccount {
    pub fn unrealized_gains(&self) -> Money {
        self.balance - self.cost_basis
    }

    /// Fraction of the balance that is unrealized gain. Zero for an empty
    /// account, and clamped at zero for a loss position (basis above balance).
    pub fn gains_ratio(&self) -> Rate {
        if self.balance <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (self.unrealized_gains() / self.balance).max(Decimal::ZERO)
    }
}

/// Pre-tax account (traditional IRA/401k). Withdrawals are ordinary income.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraditionalAccount {
    pub balance: Money,
    /// Prior-year-end balance, the base for the RMD. Defaults to `balance`.
    pub prior_year_balance: Option<Money>,
}

impl TraditionalAccount {
    pub fn rmd_base(&self) -> Money {
        self.prior_year_balance.unwrap_or(self.balance)
    }
}

/// Roth account. Withdrawals are tax-free.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RothAccount {
    pub balance: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialSecurityIncome {
    pub annual_benefit: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PensionIncome {
    pub annual_benefit: Money,
    /// Compounding cost-of-living adjustment applied each projection year.
    pub cola_rate: Rate,
}

/// A household's accounts and forced income sources. Every slot is optional;
/// a missing slot is treated as a zero balance/benefit by every calculator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Portfolio {
    pub taxable: Option<TaxableAccount>,
    pub traditional: Option<TraditionalAccount>,
    pub roth: Option<RothAccount>,
    pub social_security: Option<SocialSecurityIncome>,
    pub pension: Option<PensionIncome>,
}

impl Portfolio {
    pub fn taxable_balance(&self) -> Money {
        self.taxable.as_ref().map_or(Decimal::ZERO, |a| a.balance)
    }

    pub fn traditional_balance(&self) -> Money {
        self.traditional.as_ref().map_or(Decimal::ZERO, |a| a.balance)
    }

    pub fn roth_balance(&self) -> Money {
        self.roth.as_ref().map_or(Decimal::ZERO, |a| a.balance)
    }

    pub fn total_balance(&self) -> Money {
        self.taxable_balance() + self.traditional_balance() + self.roth_balance()
    }

    pub fn social_security_benefit(&self) -> Money {
        self.social_security
            .as_ref()
            .map_or(Decimal::ZERO, |s| s.annual_benefit)
    }

    pub fn pension_benefit(&self) -> Money {
        self.pension
            .as_ref()
            .map_or(Decimal::ZERO, |p| p.annual_benefit)
    }
}

/// Whether the income goal is stated after tax or as gross withdrawals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetType {
    AfterTax,
    Gross,
}

/// How state tax is modelled. Bracket-accurate state tables are out of scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StateTaxMethod {
    None,
    FlatRate(Rate),
    FixedAmount(Money),
}

/// The household's income target and filing situation for one plan year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeGoal {
    pub target_amount: Money,
    pub target_type: TargetType,
    pub filing_status: FilingStatus,
    pub primary_age: u32,
    pub spouse_age: Option<u32>,
    pub use_itemized_deduction: bool,
    pub itemized_deduction: Money,
    pub state_tax: StateTaxMethod,
    /// Planning horizon: project through this age.
    pub plan_to_age: u32,
}

/// The decision output: how much to take from each account this year.
///
/// Construction does not enforce the balance limits; `validate_strategy`
/// reports violations as advisory strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalStrategy {
    pub traditional_withdrawal: Money,
    pub taxable_withdrawal: Money,
    pub roth_withdrawal: Money,
    pub social_security_income: Money,
    pub pension_income: Money,
    /// Required minimum distribution for the year. Always a subset of
    /// `traditional_withdrawal`.
    pub rmd_amount: Money,
    pub is_system_generated: bool,
}

impl WithdrawalStrategy {
    pub fn total_withdrawals(&self) -> Money {
        self.traditional_withdrawal + self.taxable_withdrawal + self.roth_withdrawal
    }

    pub fn gross_income(&self) -> Money {
        self.total_withdrawals() + self.social_security_income + self.pension_income
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

/// Round to whole dollars, half away from zero.
pub fn round_dollars(amount: Money) -> Money {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_gains_ratio_basic() {
        let account = TaxableAccount {
            balance: dec!(100_000),
            cost_basis: dec!(60_000),
        };
        assert_eq!(account.gains_ratio(), dec!(0.4));
    }

    #[test]
    fn test_gains_ratio_zero_balance() {
        let account = TaxableAccount {
            balance: Decimal::ZERO,
            cost_basis: Decimal::ZERO,
        };
        assert_eq!(account.gains_ratio(), Decimal::ZERO);
    }

    #[test]
    fn test_gains_ratio_loss_position_clamped() {
        // Basis above balance: a loss position never yields a negative ratio
        let account = TaxableAccount {
            balance: dec!(80_000),
            cost_basis: dec!(100_000),
        };
        assert_eq!(account.gains_ratio(), Decimal::ZERO);
    }

    #[test]
    fn test_rmd_base_defaults_to_balance() {
        let account = TraditionalAccount {
            balance: dec!(500_000),
            prior_year_balance: None,
        };
        assert_eq!(account.rmd_base(), dec!(500_000));

        let account = TraditionalAccount {
            balance: dec!(500_000),
            prior_year_balance: Some(dec!(480_000)),
        };
        assert_eq!(account.rmd_base(), dec!(480_000));
    }

    #[test]
    fn test_empty_portfolio_is_all_zeros() {
        let portfolio = Portfolio::default();
        assert_eq!(portfolio.total_balance(), Decimal::ZERO);
        assert_eq!(portfolio.social_security_benefit(), Decimal::ZERO);
        assert_eq!(portfolio.pension_benefit(), Decimal::ZERO);
    }

    #[test]
    fn test_round_dollars_half_away_from_zero() {
        assert_eq!(round_dollars(dec!(18867.92)), dec!(18868));
        assert_eq!(round_dollars(dec!(100.50)), dec!(101));
        assert_eq!(round_dollars(dec!(-100.50)), dec!(-101));
        assert_eq!(round_dollars(dec!(100.49)), dec!(100));
    }
}
