use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::RetireTaxError;
use crate::tables::TaxTables;
use crate::tax::brackets::{ordinary_income_tax, BracketFill, IncomeSource};
use crate::tax::capital_gains::{capital_gains_tax, CapitalGainsFill};
use crate::tax::deductions::{deduction_amount, DeductionKind};
use crate::tax::social_security::social_security_taxability;
use crate::types::{
    with_metadata, ComputationOutput, IncomeGoal, Money, Portfolio, Rate, StateTaxMethod,
    WithdrawalStrategy,
};
use crate::RetireTaxResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Gross income per source for one plan year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeBySource {
    pub traditional_withdrawal: Money,
    pub taxable_withdrawal: Money,
    pub roth_withdrawal: Money,
    pub social_security: Money,
    pub pension: Money,
}

/// The complete, traceable tax picture for one (strategy, portfolio, goal)
/// triple. Derived on every input change; carries no identity of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    pub income: IncomeBySource,
    /// Realized long-term gains embedded in the taxable withdrawal.
    pub capital_gains: Money,
    pub taxable_social_security: Money,
    pub gross_income: Money,
    pub agi: Money,
    pub deduction: Money,
    pub deduction_kind: DeductionKind,
    pub taxable_ordinary_income: Money,
    pub ordinary_tax: Money,
    pub capital_gains_tax: Money,
    pub state_tax: Money,
    pub total_tax: Money,
    pub after_tax_income: Money,
    pub effective_rate_on_gross: Rate,
    pub effective_rate_on_agi: Rate,
    pub effective_rate_on_taxable: Rate,
    pub marginal_ordinary_rate: Rate,
    pub marginal_capital_gains_rate: Rate,
    pub ordinary_fills: Vec<BracketFill>,
    pub capital_gains_fills: Vec<CapitalGainsFill>,
    pub rmd_is_satisfied: bool,
}

// ---------------------------------------------------------------------------
// Core function
// ---------------------------------------------------------------------------

/// Deterministic inner computation shared with the strategy solvers.
pub(crate) fn breakdown_impl(
    strategy: &WithdrawalStrategy,
    portfolio: &Portfolio,
    goal: &IncomeGoal,
    tables: &TaxTables,
) -> (TaxBreakdown, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();

    // 1. Realized gains: the taxable withdrawal splits into gain and basis
    //    return by the account's gains ratio.
    let raw_ratio = portfolio.taxable.as_ref().map_or(Decimal::ZERO, |a| {
        if a.balance > Decimal::ZERO {
            a.unrealized_gains() / a.balance
        } else {
            Decimal::ZERO
        }
    });
    if raw_ratio < Decimal::ZERO {
        warnings.push(
            "Taxable account cost basis exceeds its balance; unrealized gains \
             clamped to zero."
                .to_string(),
        );
    }
    let gains_ratio = raw_ratio.max(Decimal::ZERO);
    let capital_gains = strategy.taxable_withdrawal * gains_ratio;

    // 2–3. Social Security taxability sees all other taxable income. Roth is
    //      excluded by definition.
    let other_income = strategy.traditional_withdrawal + strategy.pension_income + capital_gains;
    let ss = social_security_taxability(
        strategy.social_security_income,
        other_income,
        Decimal::ZERO,
        goal.filing_status,
        tables,
    );

    // 4. Gross income counts every source at its pre-tax value.
    let gross_income = strategy.gross_income();

    // 5. AGI: Roth withdrawals and returned basis never enter.
    let agi = strategy.traditional_withdrawal
        + strategy.pension_income
        + capital_gains
        + ss.taxable_amount;

    // 6–7. Deduction, then taxable ordinary income.
    let deduction = deduction_amount(goal, tables);
    let taxable_ordinary_income = (strategy.traditional_withdrawal
        + strategy.pension_income
        + ss.taxable_amount
        - deduction.amount)
        .max(Decimal::ZERO);

    // 8. Attributed sources for the bracket trace.
    let mut sources = Vec::new();
    if strategy.traditional_withdrawal > Decimal::ZERO {
        sources.push(IncomeSource {
            label: "Traditional withdrawal".into(),
            amount: strategy.traditional_withdrawal,
        });
    }
    if strategy.pension_income > Decimal::ZERO {
        sources.push(IncomeSource {
            label: "Pension".into(),
            amount: strategy.pension_income,
        });
    }
    if ss.taxable_amount > Decimal::ZERO {
        sources.push(IncomeSource {
            label: "Taxable Social Security".into(),
            amount: ss.taxable_amount,
        });
    }

    // 9. Ordinary tax, then capital gains stacked on top of it.
    let ordinary = ordinary_income_tax(
        taxable_ordinary_income,
        goal.filing_status,
        &sources,
        tables,
    );
    let gains = capital_gains_tax(
        capital_gains,
        taxable_ordinary_income,
        goal.filing_status,
        tables,
    );

    // 10. State tax.
    let state_tax = match &goal.state_tax {
        StateTaxMethod::None => Decimal::ZERO,
        StateTaxMethod::FlatRate(rate) => *rate * (taxable_ordinary_income + capital_gains),
        StateTaxMethod::FixedAmount(amount) => *amount,
    };

    // 11. Totals.
    let total_tax = ordinary.total_tax + gains.total_tax + state_tax;
    let after_tax_income = gross_income - total_tax;

    // 12. Effective rates, each guarded against a zero denominator.
    let effective = |denominator: Money| -> Rate {
        if denominator > Decimal::ZERO {
            total_tax / denominator
        } else {
            Decimal::ZERO
        }
    };

    let breakdown = TaxBreakdown {
        income: IncomeBySource {
            traditional_withdrawal: strategy.traditional_withdrawal,
            taxable_withdrawal: strategy.taxable_withdrawal,
            roth_withdrawal: strategy.roth_withdrawal,
            social_security: strategy.social_security_income,
            pension: strategy.pension_income,
        },
        capital_gains,
        taxable_social_security: ss.taxable_amount,
        gross_income,
        agi,
        deduction: deduction.amount,
        deduction_kind: deduction.kind,
        taxable_ordinary_income,
        ordinary_tax: ordinary.total_tax,
        capital_gains_tax: gains.total_tax,
        state_tax,
        total_tax,
        after_tax_income,
        effective_rate_on_gross: effective(gross_income),
        effective_rate_on_agi: effective(agi),
        effective_rate_on_taxable: effective(taxable_ordinary_income + capital_gains),
        marginal_ordinary_rate: ordinary.marginal_rate,
        marginal_capital_gains_rate: gains.marginal_rate,
        ordinary_fills: ordinary.fills,
        capital_gains_fills: gains.fills,
        rmd_is_satisfied: strategy.traditional_withdrawal >= strategy.rmd_amount,
    };

    (breakdown, warnings)
}

/// Full tax breakdown for a withdrawal strategy against a portfolio and goal.
///
/// Pure function of its inputs: identical inputs always produce an identical
/// `TaxBreakdown`.
pub fn compute_tax_breakdown(
    strategy: &WithdrawalStrategy,
    portfolio: &Portfolio,
    goal: &IncomeGoal,
    tables: &TaxTables,
) -> RetireTaxResult<ComputationOutput<TaxBreakdown>> {
    let start = Instant::now();
    validate_goal(goal)?;

    let (breakdown, warnings) = breakdown_impl(strategy, portfolio, goal, tables);

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Tax breakdown: realized gains, Social Security taxability, ordinary \
         and stacked capital-gains brackets, state tax, effective rates",
        &serde_json::json!({
            "tax_year": tables.year,
            "filing_status": format!("{:?}", goal.filing_status),
            "state_tax": format!("{:?}", goal.state_tax),
            "use_itemized_deduction": goal.use_itemized_deduction,
        }),
        warnings,
        elapsed,
        breakdown,
    ))
}

pub(crate) fn validate_goal(goal: &IncomeGoal) -> RetireTaxResult<()> {
    if goal.target_amount < Decimal::ZERO {
        return Err(RetireTaxError::InvalidInput {
            field: "target_amount".into(),
            reason: "Income target cannot be negative".into(),
        });
    }
    if goal.itemized_deduction < Decimal::ZERO {
        return Err(RetireTaxError::InvalidInput {
            field: "itemized_deduction".into(),
            reason: "Itemized deduction cannot be negative".into(),
        });
    }
    Ok(())
}
