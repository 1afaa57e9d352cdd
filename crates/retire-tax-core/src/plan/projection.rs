use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::RetireTaxError;
use crate::plan::breakdown::{breakdown_impl, validate_goal, TaxBreakdown};
use crate::plan::strategy::generate_strategy;
use crate::tables::TaxTables;
use crate::types::{
    with_metadata, ComputationOutput, IncomeGoal, Money, PensionIncome, Portfolio, Rate,
    RothAccount, SocialSecurityIncome, TaxableAccount, TraditionalAccount, WithdrawalStrategy,
};
use crate::RetireTaxResult;

/// Milestone ages always kept by the summary filter.
const SUMMARY_MILESTONE_AGES: [u32; 6] = [73, 80, 85, 90, 95, 100];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionAssumptions {
    pub growth_rate: Rate,
    pub inflation_rate: Rate,
    pub social_security_cola: Rate,
}

/// First-year strategy and breakdown supplied by the caller, used verbatim so
/// a manual override survives into the projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirstYearOverride {
    pub strategy: WithdrawalStrategy,
    pub breakdown: TaxBreakdown,
}

/// One year of the projection, captured before withdrawals are applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionYear {
    pub age: u32,
    pub spouse_age: Option<u32>,
    pub traditional_balance: Money,
    pub taxable_balance: Money,
    pub roth_balance: Money,
    pub rmd: Money,
    pub traditional_withdrawal: Money,
    pub taxable_withdrawal: Money,
    pub roth_withdrawal: Money,
    pub social_security_income: Money,
    pub pension_income: Money,
    pub gross_income: Money,
    pub total_tax: Money,
    pub after_tax_income: Money,
    pub effective_tax_rate: Rate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionTotals {
    pub total_taxes: Money,
    pub total_withdrawals: Money,
    pub final_balance: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetirementProjection {
    pub years: Vec<ProjectionYear>,
    pub totals: ProjectionTotals,
    pub is_sustainable: bool,
    /// First age at which the combined balances reached zero.
    pub depletion_age: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionStats {
    /// Total tax over total gross income across the horizon.
    pub average_effective_rate: Rate,
    pub peak_tax_age: Option<u32>,
    pub peak_tax: Money,
    pub total_after_tax_income: Money,
}

// ---------------------------------------------------------------------------
// Core function
// ---------------------------------------------------------------------------

/// Project the plan year by year from the primary age through the planning
/// horizon, regenerating the withdrawal strategy against each year's balances
/// and inflated goal, then rolling balances forward with growth and COLAs.
pub fn project_retirement(
    portfolio: &Portfolio,
    goal: &IncomeGoal,
    assumptions: &ProjectionAssumptions,
    first_year: Option<FirstYearOverride>,
    tables: &TaxTables,
) -> RetireTaxResult<ComputationOutput<RetirementProjection>> {
    let start = Instant::now();
    validate_goal(goal)?;
    validate_assumptions(goal, assumptions)?;
    let mut warnings: Vec<String> = Vec::new();

    let start_age = goal.primary_age;
    let growth_factor = Decimal::ONE + assumptions.growth_rate;
    let inflation_factor = Decimal::ONE + assumptions.inflation_rate;
    let ss_cola_factor = Decimal::ONE + assumptions.social_security_cola;
    let pension_cola_factor = Decimal::ONE
        + portfolio
            .pension
            .as_ref()
            .map_or(Decimal::ZERO, |p| p.cola_rate);

    let mut traditional = portfolio.traditional_balance();
    let mut taxable = portfolio.taxable_balance();
    let mut cost_basis = portfolio
        .taxable
        .as_ref()
        .map_or(Decimal::ZERO, |a| a.cost_basis);
    let mut roth = portfolio.roth_balance();
    let mut ss_benefit = portfolio.social_security_benefit();
    let mut pension_benefit = portfolio.pension_benefit();

    let mut inflated_target = goal.target_amount;
    let mut years: Vec<ProjectionYear> = Vec::new();
    let mut depletion_age: Option<u32> = None;
    let mut total_taxes = Decimal::ZERO;
    let mut total_withdrawals = Decimal::ZERO;

    for age in start_age..=goal.plan_to_age {
        let offset = age - start_age;

        if traditional + taxable + roth <= Decimal::ZERO && depletion_age.is_none() {
            depletion_age = Some(age);
        }

        // Point-in-time snapshot; exhausted accounts are absent, not zero.
        let snapshot = Portfolio {
            taxable: (taxable > Decimal::ZERO).then(|| TaxableAccount {
                balance: taxable,
                cost_basis,
            }),
            traditional: (traditional > Decimal::ZERO).then(|| TraditionalAccount {
                balance: traditional,
                prior_year_balance: Some(if offset == 0 {
                    portfolio
                        .traditional
                        .as_ref()
                        .map_or(traditional, |a| a.rmd_base())
                } else {
                    traditional
                }),
            }),
            roth: (roth > Decimal::ZERO).then(|| RothAccount { balance: roth }),
            social_security: (ss_benefit > Decimal::ZERO).then(|| SocialSecurityIncome {
                annual_benefit: ss_benefit,
            }),
            pension: portfolio.pension.as_ref().map(|p| PensionIncome {
                annual_benefit: pension_benefit,
                cola_rate: p.cola_rate,
            }),
        };

        let year_goal = IncomeGoal {
            target_amount: inflated_target,
            primary_age: age,
            spouse_age: goal.spouse_age.map(|s| s + offset),
            ..goal.clone()
        };

        let (strategy, breakdown) = match (&first_year, offset) {
            (Some(over), 0) => (over.strategy.clone(), over.breakdown.clone()),
            _ => {
                if snapshot.total_balance() <= Decimal::ZERO {
                    // Nothing left to withdraw: residual Social Security and
                    // pension income only.
                    let strategy = WithdrawalStrategy {
                        traditional_withdrawal: Decimal::ZERO,
                        taxable_withdrawal: Decimal::ZERO,
                        roth_withdrawal: Decimal::ZERO,
                        social_security_income: ss_benefit,
                        pension_income: pension_benefit,
                        rmd_amount: Decimal::ZERO,
                        is_system_generated: true,
                    };
                    let breakdown = breakdown_impl(&strategy, &snapshot, &year_goal, tables).0;
                    (strategy, breakdown)
                } else {
                    let strategy =
                        generate_strategy(&snapshot, &year_goal, tables)?.result;
                    let breakdown = breakdown_impl(&strategy, &snapshot, &year_goal, tables).0;
                    (strategy, breakdown)
                }
            }
        };

        years.push(ProjectionYear {
            age,
            spouse_age: year_goal.spouse_age,
            traditional_balance: traditional,
            taxable_balance: taxable,
            roth_balance: roth,
            rmd: strategy.rmd_amount,
            traditional_withdrawal: strategy.traditional_withdrawal,
            taxable_withdrawal: strategy.taxable_withdrawal,
            roth_withdrawal: strategy.roth_withdrawal,
            social_security_income: strategy.social_security_income,
            pension_income: strategy.pension_income,
            gross_income: breakdown.gross_income,
            total_tax: breakdown.total_tax,
            after_tax_income: breakdown.after_tax_income,
            effective_tax_rate: breakdown.effective_rate_on_gross,
        });

        total_taxes += breakdown.total_tax;
        total_withdrawals += strategy.total_withdrawals();

        // Apply withdrawals. The cost basis shrinks in proportion to the
        // fraction of the taxable balance withdrawn, keeping the gains ratio
        // well-defined for later years.
        if taxable > Decimal::ZERO && strategy.taxable_withdrawal > Decimal::ZERO {
            let withdrawn_fraction = (strategy.taxable_withdrawal / taxable).min(Decimal::ONE);
            cost_basis -= cost_basis * withdrawn_fraction;
        }
        traditional = (traditional - strategy.traditional_withdrawal).max(Decimal::ZERO);
        taxable = (taxable - strategy.taxable_withdrawal).max(Decimal::ZERO);
        roth = (roth - strategy.roth_withdrawal).max(Decimal::ZERO);

        // Growth. The cost basis compounds at the growth rate scaled by its
        // share of the balance, so the gains ratio drifts upward instead of
        // staying fixed.
        if taxable > Decimal::ZERO {
            let basis_share = (cost_basis / taxable).min(Decimal::ONE);
            cost_basis *= Decimal::ONE + assumptions.growth_rate * basis_share;
        }
        traditional *= growth_factor;
        taxable *= growth_factor;
        roth *= growth_factor;
        cost_basis = cost_basis.min(taxable);

        // Next year's benefit bases.
        ss_benefit *= ss_cola_factor;
        pension_benefit *= pension_cola_factor;
        inflated_target *= inflation_factor;
    }

    if let Some(age) = depletion_age {
        warnings.push(format!("Portfolio balances reach zero at age {age}."));
    }

    let projection = RetirementProjection {
        totals: ProjectionTotals {
            total_taxes,
            total_withdrawals,
            final_balance: traditional + taxable + roth,
        },
        is_sustainable: depletion_age.is_none(),
        depletion_age,
        years,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Year-by-year projection: regenerated withdrawal strategy against \
         inflated goal and rolling balances, with growth and COLA compounding \
         and depletion detection",
        &serde_json::json!({
            "start_age": start_age,
            "plan_to_age": goal.plan_to_age,
            "growth_rate": assumptions.growth_rate.to_string(),
            "inflation_rate": assumptions.inflation_rate.to_string(),
            "social_security_cola": assumptions.social_security_cola.to_string(),
            "first_year_override": first_year.is_some(),
        }),
        warnings,
        elapsed,
        projection,
    ))
}

fn validate_assumptions(
    goal: &IncomeGoal,
    assumptions: &ProjectionAssumptions,
) -> RetireTaxResult<()> {
    if goal.plan_to_age < goal.primary_age {
        return Err(RetireTaxError::InvalidInput {
            field: "plan_to_age".into(),
            reason: "Planning horizon must not end before the primary age".into(),
        });
    }
    for (field, rate) in [
        ("growth_rate", assumptions.growth_rate),
        ("inflation_rate", assumptions.inflation_rate),
        ("social_security_cola", assumptions.social_security_cola),
    ] {
        if rate <= Decimal::NEGATIVE_ONE {
            return Err(RetireTaxError::InvalidInput {
                field: field.into(),
                reason: "Rate must be greater than -100%".into(),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Read-only views
// ---------------------------------------------------------------------------

/// Condensed year list for display: first and last year, every fifth year,
/// the milestone ages, and the depletion year.
pub fn summary_years(projection: &RetirementProjection) -> Vec<ProjectionYear> {
    let Some(first_age) = projection.years.first().map(|y| y.age) else {
        return Vec::new();
    };
    let last_age = projection.years.last().map(|y| y.age).unwrap_or(first_age);

    projection
        .years
        .iter()
        .filter(|y| {
            y.age == first_age
                || y.age == last_age
                || (y.age - first_age) % 5 == 0
                || SUMMARY_MILESTONE_AGES.contains(&y.age)
                || projection.depletion_age == Some(y.age)
        })
        .cloned()
        .collect()
}

/// Aggregate statistics over a completed projection. No recomputation.
pub fn projection_stats(projection: &RetirementProjection) -> ProjectionStats {
    let total_gross: Money = projection.years.iter().map(|y| y.gross_income).sum();
    let total_tax: Money = projection.years.iter().map(|y| y.total_tax).sum();

    let peak = projection
        .years
        .iter()
        .max_by_key(|y| y.total_tax)
        .filter(|y| y.total_tax > Decimal::ZERO);

    ProjectionStats {
        average_effective_rate: if total_gross > Decimal::ZERO {
            total_tax / total_gross
        } else {
            Decimal::ZERO
        },
        peak_tax_age: peak.map(|y| y.age),
        peak_tax: peak.map_or(Decimal::ZERO, |y| y.total_tax),
        total_after_tax_income: projection.years.iter().map(|y| y.after_tax_income).sum(),
    }
}
