use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Instant;

use crate::plan::breakdown::{breakdown_impl, validate_goal, TaxBreakdown};
use crate::tables::TaxTables;
use crate::tax::brackets::ordinary_income_tax;
use crate::tax::deductions::deduction_amount;
use crate::tax::rmd::required_minimum_distribution;
use crate::tax::social_security::social_security_taxability;
use crate::types::{
    round_dollars, with_metadata, ComputationOutput, IncomeGoal, Money, Portfolio, TargetType,
    WithdrawalStrategy,
};
use crate::RetireTaxResult;

// ---------------------------------------------------------------------------
// Tuning constants
// ---------------------------------------------------------------------------

const GROSS_ESTIMATE_MAX_ITERATIONS: u32 = 10;
const REFINEMENT_MAX_ITERATIONS: u32 = 15;
const CONVERGENCE_TOLERANCE: Decimal = dec!(500);

/// Highest bracket rate still treated as "low" in phase 1.
const LOW_BRACKET_CEILING: Decimal = dec!(0.12);

/// One added dollar of ordinary income can drag up to $0.85 of additional
/// Social Security into taxability. These divisors shrink the apparent
/// bracket room to compensate; they approximate, they do not invert.
const SS_DIVISOR_TAXED: Decimal = dec!(1.85);
const SS_DIVISOR_UNTAXED: Decimal = dec!(1.5);

/// Assumed gains ratio when the taxable account carries no usable data.
/// A tunable assumption, kept for behavioural parity.
const GAINS_RATIO_FALLBACK: Decimal = dec!(0.4);

/// Refinement nudge multipliers: scale-ups roughly pre-pay the tax an added
/// withdrawal will incur; scale-downs avoid overshooting on the way back.
const REFINE_TRADITIONAL_UP: Decimal = dec!(1.25);
const REFINE_TAXABLE_UP: Decimal = dec!(1.15);
const REFINE_TRADITIONAL_DOWN: Decimal = dec!(0.8);
const REFINE_TAXABLE_DOWN: Decimal = dec!(0.9);

// ---------------------------------------------------------------------------
// Strategy generation
// ---------------------------------------------------------------------------

/// Generate a withdrawal strategy that meets the income goal while keeping
/// tax low, via ordered greedy phases: forced income and the RMD floor first,
/// then traditional withdrawals through the low brackets, 0%-rate capital
/// gain harvesting, Roth, and finally higher-bracket traditional and taxable
/// money.
///
/// This is a heuristic, not a provably optimal solver: the phase ordering and
/// the fixed multipliers are empirically chosen approximations.
pub fn generate_strategy(
    portfolio: &Portfolio,
    goal: &IncomeGoal,
    tables: &TaxTables,
) -> RetireTaxResult<ComputationOutput<WithdrawalStrategy>> {
    let start = Instant::now();
    validate_goal(goal)?;
    let mut warnings: Vec<String> = Vec::new();

    let status = goal.filing_status;
    let traditional_balance = portfolio.traditional_balance();
    let taxable_balance = portfolio.taxable_balance();
    let roth_balance = portfolio.roth_balance();

    // Phase 0: forced income. Social Security and pension always flow in
    // full, and the RMD seeds the traditional withdrawal.
    let ss_income = portfolio.social_security_benefit();
    let pension_income = portfolio.pension_benefit();
    let rmd_base = portfolio
        .traditional
        .as_ref()
        .map_or(Decimal::ZERO, |a| a.rmd_base());
    let rmd = required_minimum_distribution(goal.primary_age, rmd_base, tables);

    let deduction = deduction_amount(goal, tables).amount;

    let target_gross = match goal.target_type {
        TargetType::Gross => goal.target_amount,
        TargetType::AfterTax => {
            estimate_gross_for_after_tax(goal.target_amount, deduction, goal, tables, &mut warnings)
        }
    };

    let mut traditional = rmd.amount;
    let mut taxable = Decimal::ZERO;
    let mut roth = Decimal::ZERO;
    let mut remaining =
        (target_gross - ss_income - pension_income - traditional).max(Decimal::ZERO);

    // Phase 1: fill the low ordinary brackets with traditional withdrawals.
    // Adding traditional income can pull more Social Security into
    // taxability, so the taxable amount is recomputed at every bracket.
    for bracket in tables
        .ordinary_brackets(status)
        .iter()
        .filter(|b| b.rate <= LOW_BRACKET_CEILING)
    {
        if remaining <= Decimal::ZERO || traditional >= traditional_balance {
            break;
        }
        let Some(top) = bracket.max else { break };

        let ss_tax = social_security_taxability(
            ss_income,
            traditional + pension_income,
            Decimal::ZERO,
            status,
            tables,
        );
        let ordinary_income = traditional + pension_income + ss_tax.taxable_amount;
        let room = (top + deduction - ordinary_income).max(Decimal::ZERO);
        if room.is_zero() {
            continue;
        }

        let divisor = if ss_tax.taxable_amount > Decimal::ZERO {
            SS_DIVISOR_TAXED
        } else {
            SS_DIVISOR_UNTAXED
        };
        let add = (room / divisor)
            .min(remaining)
            .min(traditional_balance - traditional);
        traditional += add;
        remaining -= add;
    }

    // Phase 2: harvest capital gains inside the 0%-rate bracket.
    if remaining > Decimal::ZERO && portfolio.taxable.is_some() {
        let ss_tax = social_security_taxability(
            ss_income,
            traditional + pension_income,
            Decimal::ZERO,
            status,
            tables,
        );
        let taxable_ordinary =
            (traditional + pension_income + ss_tax.taxable_amount - deduction).max(Decimal::ZERO);
        let zero_top = tables
            .capital_gains_brackets(status)
            .iter()
            .find(|b| b.rate.is_zero())
            .and_then(|b| b.max);

        if let Some(zero_top) = zero_top {
            let gains_room = (zero_top - taxable_ordinary).max(Decimal::ZERO);
            let ratio = portfolio
                .taxable
                .as_ref()
                .map(|a| {
                    if a.balance > Decimal::ZERO {
                        a.gains_ratio()
                    } else {
                        GAINS_RATIO_FALLBACK
                    }
                })
                .unwrap_or(GAINS_RATIO_FALLBACK);
            // Back-solve the withdrawal whose induced gains stay in the room.
            let max_withdrawal = if ratio > Decimal::ZERO {
                gains_room / ratio
            } else {
                remaining
            };
            let add = max_withdrawal.min(remaining).min(taxable_balance);
            taxable += add;
            remaining -= add;
        }
    }

    // Phase 3: Roth covers remaining need tax-free.
    if remaining > Decimal::ZERO {
        let add = remaining.min(roth_balance);
        roth += add;
        remaining -= add;
    }

    // Phase 4: more traditional, now at higher brackets.
    if remaining > Decimal::ZERO {
        let add = remaining.min((traditional_balance - traditional).max(Decimal::ZERO));
        traditional += add;
        remaining -= add;
    }

    // Phase 5: more taxable.
    if remaining > Decimal::ZERO {
        let add = remaining.min((taxable_balance - taxable).max(Decimal::ZERO));
        taxable += add;
    }

    let mut strategy = WithdrawalStrategy {
        traditional_withdrawal: round_dollars(traditional).max(rmd.amount),
        taxable_withdrawal: round_dollars(taxable),
        roth_withdrawal: round_dollars(roth),
        social_security_income: round_dollars(ss_income),
        pension_income: round_dollars(pension_income),
        rmd_amount: rmd.amount,
        is_system_generated: true,
    };

    if goal.target_type == TargetType::AfterTax {
        refine_for_after_tax(&mut strategy, portfolio, goal, tables, &mut warnings);
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Greedy withdrawal sourcing: forced income and RMD, low ordinary \
         brackets, 0%-rate gain harvesting, Roth, then higher brackets",
        &serde_json::json!({
            "target_amount": goal.target_amount.to_string(),
            "target_type": format!("{:?}", goal.target_type),
            "filing_status": format!("{:?}", goal.filing_status),
            "primary_age": goal.primary_age,
            "rmd_amount": rmd.amount.to_string(),
        }),
        warnings,
        elapsed,
        strategy,
    ))
}

/// Coarse gross-income estimate for an after-tax target. Considers ordinary
/// tax only; the refinement loop handles the rest.
fn estimate_gross_for_after_tax(
    target_after_tax: Money,
    deduction: Money,
    goal: &IncomeGoal,
    tables: &TaxTables,
    warnings: &mut Vec<String>,
) -> Money {
    let mut gross = target_after_tax;
    for _ in 0..GROSS_ESTIMATE_MAX_ITERATIONS {
        let taxable = (gross - deduction).max(Decimal::ZERO);
        let tax = ordinary_income_tax(taxable, goal.filing_status, &[], tables).total_tax;
        let residual = target_after_tax - (gross - tax);
        if residual.abs() <= CONVERGENCE_TOLERANCE {
            return gross;
        }
        gross += residual;
    }
    warnings.push(
        "Gross-income estimate hit its iteration cap before converging; \
         using the closest estimate."
            .to_string(),
    );
    gross
}

/// Nudge the generated strategy until its after-tax income lands within the
/// tolerance of the target, recomputing the full tax breakdown on every
/// iteration. Exhausting the iteration cap returns the best effort found.
fn refine_for_after_tax(
    strategy: &mut WithdrawalStrategy,
    portfolio: &Portfolio,
    goal: &IncomeGoal,
    tables: &TaxTables,
    warnings: &mut Vec<String>,
) {
    let traditional_balance = portfolio.traditional_balance();
    let taxable_balance = portfolio.taxable_balance();
    let roth_balance = portfolio.roth_balance();
    let mut converged = false;

    for _ in 0..REFINEMENT_MAX_ITERATIONS {
        let (breakdown, _) = breakdown_impl(strategy, portfolio, goal, tables);
        let delta = goal.target_amount - breakdown.after_tax_income;
        if delta.abs() <= CONVERGENCE_TOLERANCE {
            converged = true;
            break;
        }

        if delta > Decimal::ZERO {
            // Shortfall: Roth first (no tax drag), then traditional scaled up
            // for the tax it will incur, then taxable.
            let mut need = delta;
            let add = need.min((roth_balance - strategy.roth_withdrawal).max(Decimal::ZERO));
            strategy.roth_withdrawal += add;
            need -= add;

            if need > Decimal::ZERO {
                let room = (traditional_balance - strategy.traditional_withdrawal)
                    .max(Decimal::ZERO);
                let add = (need * REFINE_TRADITIONAL_UP).min(room);
                strategy.traditional_withdrawal += add;
                need -= add / REFINE_TRADITIONAL_UP;
            }
            if need > Decimal::ZERO {
                let room = (taxable_balance - strategy.taxable_withdrawal).max(Decimal::ZERO);
                let add = (need * REFINE_TAXABLE_UP).min(room);
                strategy.taxable_withdrawal += add;
            }
        } else {
            // Surplus: trim traditional down to the RMD floor, then taxable,
            // then Roth.
            let mut surplus = -delta;
            let cut = (surplus * REFINE_TRADITIONAL_DOWN)
                .min((strategy.traditional_withdrawal - strategy.rmd_amount).max(Decimal::ZERO));
            strategy.traditional_withdrawal -= cut;
            surplus -= cut / REFINE_TRADITIONAL_DOWN;

            if surplus > Decimal::ZERO {
                let cut = (surplus * REFINE_TAXABLE_DOWN).min(strategy.taxable_withdrawal);
                strategy.taxable_withdrawal -= cut;
                surplus -= cut / REFINE_TAXABLE_DOWN;
            }
            if surplus > Decimal::ZERO {
                let cut = surplus.min(strategy.roth_withdrawal);
                strategy.roth_withdrawal -= cut;
            }
        }

        strategy.traditional_withdrawal =
            round_dollars(strategy.traditional_withdrawal).max(strategy.rmd_amount);
        strategy.taxable_withdrawal = round_dollars(strategy.taxable_withdrawal);
        strategy.roth_withdrawal = round_dollars(strategy.roth_withdrawal);
    }

    if !converged {
        warnings.push(
            "After-tax refinement hit its iteration cap before converging; \
             returning the closest strategy found."
                .to_string(),
        );
    }
}

// ---------------------------------------------------------------------------
// Validation and explanation
// ---------------------------------------------------------------------------

/// Check a strategy against the portfolio it draws from. Returns
/// human-readable violations; the strategy is valid iff the list is empty.
pub fn validate_strategy(strategy: &WithdrawalStrategy, portfolio: &Portfolio) -> Vec<String> {
    let mut violations = Vec::new();

    if strategy.traditional_withdrawal > portfolio.traditional_balance() {
        violations.push(format!(
            "Traditional withdrawal of ${} exceeds the account balance of ${}",
            strategy.traditional_withdrawal,
            portfolio.traditional_balance()
        ));
    }
    if strategy.taxable_withdrawal > portfolio.taxable_balance() {
        violations.push(format!(
            "Taxable withdrawal of ${} exceeds the account balance of ${}",
            strategy.taxable_withdrawal,
            portfolio.taxable_balance()
        ));
    }
    if strategy.roth_withdrawal > portfolio.roth_balance() {
        violations.push(format!(
            "Roth withdrawal of ${} exceeds the account balance of ${}",
            strategy.roth_withdrawal,
            portfolio.roth_balance()
        ));
    }
    if strategy.social_security_income > portfolio.social_security_benefit() {
        violations.push(format!(
            "Social Security income of ${} exceeds the annual benefit of ${}",
            strategy.social_security_income,
            portfolio.social_security_benefit()
        ));
    }
    if strategy.pension_income > portfolio.pension_benefit() {
        violations.push(format!(
            "Pension income of ${} exceeds the annual benefit of ${}",
            strategy.pension_income,
            portfolio.pension_benefit()
        ));
    }
    if strategy.traditional_withdrawal < strategy.rmd_amount {
        violations.push(format!(
            "Traditional withdrawal of ${} is below the required minimum \
             distribution of ${}",
            strategy.traditional_withdrawal, strategy.rmd_amount
        ));
    }

    violations
}

/// Plain-language bullets describing why the strategy looks the way it does.
/// Purely descriptive; reads the breakdown, computes nothing new.
pub fn explain_strategy(strategy: &WithdrawalStrategy, breakdown: &TaxBreakdown) -> Vec<String> {
    let mut bullets = Vec::new();

    if strategy.rmd_amount > Decimal::ZERO {
        bullets.push(format!(
            "The traditional withdrawal includes the required minimum \
             distribution of ${}.",
            strategy.rmd_amount
        ));
    }
    if strategy.traditional_withdrawal > strategy.rmd_amount {
        bullets.push(format!(
            "Traditional withdrawals fill the lower ordinary brackets; the \
             top ordinary rate reached is {}%.",
            breakdown.marginal_ordinary_rate * dec!(100)
        ));
    }
    if strategy.taxable_withdrawal > Decimal::ZERO {
        if breakdown.capital_gains_tax.is_zero() {
            bullets.push(
                "Taxable-account withdrawals realize gains entirely within \
                 the 0% long-term capital-gains bracket."
                    .to_string(),
            );
        } else {
            bullets.push(
                "Taxable-account withdrawals realize gains taxed at \
                 preferential long-term rates."
                    .to_string(),
            );
        }
    }
    if strategy.roth_withdrawal > Decimal::ZERO {
        bullets.push(format!(
            "Roth withdrawals of ${} are tax-free and do not affect Social \
             Security taxability.",
            strategy.roth_withdrawal
        ));
    }
    if breakdown.gross_income > Decimal::ZERO && breakdown.effective_rate_on_gross < dec!(0.15) {
        bullets.push(format!(
            "The overall effective tax rate is {}% of gross income.",
            round_dollars(breakdown.effective_rate_on_gross * dec!(10_000)) / dec!(100)
        ));
    }

    bullets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        FilingStatus, RothAccount, SocialSecurityIncome, StateTaxMethod, TaxableAccount,
        TraditionalAccount,
    };
    use pretty_assertions::assert_eq;

    fn goal(amount: Money, target_type: TargetType, age: u32) -> IncomeGoal {
        IncomeGoal {
            target_amount: amount,
            target_type,
            filing_status: FilingStatus::Single,
            primary_age: age,
            spouse_age: None,
            use_itemized_deduction: false,
            itemized_deduction: Decimal::ZERO,
            state_tax: StateTaxMethod::None,
            plan_to_age: 95,
        }
    }

    fn traditional_only(balance: Money) -> Portfolio {
        Portfolio {
            traditional: Some(TraditionalAccount {
                balance,
                prior_year_balance: None,
            }),
            ..Portfolio::default()
        }
    }

    #[test]
    fn test_rmd_seeds_traditional_floor() {
        let tables = TaxTables::federal_2024();
        let portfolio = traditional_only(dec!(500_000));
        let result = generate_strategy(
            &portfolio,
            &goal(dec!(50_000), TargetType::Gross, 73),
            &tables,
        )
        .unwrap();
        let strategy = result.result;

        // RMD = round(500,000 / 26.5) = 18,868
        assert_eq!(strategy.rmd_amount, dec!(18_868));
        assert!(strategy.traditional_withdrawal >= dec!(18_868));
        // Remaining need is sourced from traditional; total meets the goal.
        assert_eq!(strategy.traditional_withdrawal, dec!(50_000));
    }

    #[test]
    fn test_zero_goal_still_takes_rmd() {
        let tables = TaxTables::federal_2024();
        let portfolio = traditional_only(dec!(500_000));
        let result = generate_strategy(
            &portfolio,
            &goal(Decimal::ZERO, TargetType::Gross, 73),
            &tables,
        )
        .unwrap();
        assert_eq!(result.result.traditional_withdrawal, dec!(18_868));
    }

    #[test]
    fn test_no_rmd_before_start_age() {
        let tables = TaxTables::federal_2024();
        let portfolio = traditional_only(dec!(500_000));
        let result = generate_strategy(
            &portfolio,
            &goal(dec!(40_000), TargetType::Gross, 65),
            &tables,
        )
        .unwrap();
        assert_eq!(result.result.rmd_amount, Decimal::ZERO);
        assert_eq!(result.result.traditional_withdrawal, dec!(40_000));
    }

    #[test]
    fn test_forced_income_reduces_withdrawals() {
        let tables = TaxTables::federal_2024();
        let portfolio = Portfolio {
            traditional: Some(TraditionalAccount {
                balance: dec!(400_000),
                prior_year_balance: None,
            }),
            social_security: Some(SocialSecurityIncome {
                annual_benefit: dec!(30_000),
            }),
            ..Portfolio::default()
        };
        let result = generate_strategy(
            &portfolio,
            &goal(dec!(50_000), TargetType::Gross, 67),
            &tables,
        )
        .unwrap();
        let strategy = result.result;
        assert_eq!(strategy.social_security_income, dec!(30_000));
        assert_eq!(strategy.traditional_withdrawal, dec!(20_000));
    }

    #[test]
    fn test_roth_used_after_low_brackets() {
        let tables = TaxTables::federal_2024();
        // Small traditional balance forces the later phases into Roth.
        let portfolio = Portfolio {
            traditional: Some(TraditionalAccount {
                balance: dec!(10_000),
                prior_year_balance: None,
            }),
            roth: Some(RothAccount {
                balance: dec!(200_000),
            }),
            ..Portfolio::default()
        };
        let result = generate_strategy(
            &portfolio,
            &goal(dec!(60_000), TargetType::Gross, 65),
            &tables,
        )
        .unwrap();
        let strategy = result.result;
        assert_eq!(strategy.traditional_withdrawal, dec!(10_000));
        assert_eq!(strategy.roth_withdrawal, dec!(50_000));
    }

    #[test]
    fn test_gross_sourcing_meets_goal_exactly() {
        let tables = TaxTables::federal_2024();
        let portfolio = Portfolio {
            taxable: Some(TaxableAccount {
                balance: dec!(300_000),
                cost_basis: dec!(200_000),
            }),
            traditional: Some(TraditionalAccount {
                balance: dec!(300_000),
                prior_year_balance: None,
            }),
            roth: Some(RothAccount {
                balance: dec!(100_000),
            }),
            ..Portfolio::default()
        };
        let result = generate_strategy(
            &portfolio,
            &goal(dec!(80_000), TargetType::Gross, 68),
            &tables,
        )
        .unwrap();
        let strategy = result.result;
        assert_eq!(strategy.gross_income(), dec!(80_000));
        assert!(validate_strategy(&strategy, &portfolio).is_empty());
    }

    #[test]
    fn test_after_tax_target_converges() {
        let tables = TaxTables::federal_2024();
        let portfolio = Portfolio {
            taxable: Some(TaxableAccount {
                balance: dec!(400_000),
                cost_basis: dec!(250_000),
            }),
            traditional: Some(TraditionalAccount {
                balance: dec!(800_000),
                prior_year_balance: None,
            }),
            roth: Some(RothAccount {
                balance: dec!(150_000),
            }),
            ..Portfolio::default()
        };
        let target = dec!(70_000);
        let result = generate_strategy(&portfolio, &goal(target, TargetType::AfterTax, 68), &tables)
            .unwrap();
        let strategy = result.result;

        let breakdown = breakdown_impl(
            &strategy,
            &portfolio,
            &goal(target, TargetType::AfterTax, 68),
            &tables,
        )
        .0;
        assert!(
            (breakdown.after_tax_income - target).abs() <= dec!(500),
            "after-tax {} not within tolerance of {}",
            breakdown.after_tax_income,
            target
        );
    }

    #[test]
    fn test_after_tax_respects_rmd_floor() {
        let tables = TaxTables::federal_2024();
        let portfolio = traditional_only(dec!(1_000_000));
        // Tiny after-tax target: the RMD still cannot be waived.
        let result = generate_strategy(
            &portfolio,
            &goal(dec!(10_000), TargetType::AfterTax, 75),
            &tables,
        )
        .unwrap();
        let strategy = result.result;
        assert!(strategy.traditional_withdrawal >= strategy.rmd_amount);
        assert!(strategy.rmd_amount > Decimal::ZERO);
    }

    #[test]
    fn test_insufficient_balances_best_effort() {
        let tables = TaxTables::federal_2024();
        let portfolio = traditional_only(dec!(20_000));
        let result = generate_strategy(
            &portfolio,
            &goal(dec!(100_000), TargetType::Gross, 65),
            &tables,
        )
        .unwrap();
        let strategy = result.result;
        // Everything available is withdrawn; the goal is simply not met.
        assert_eq!(strategy.traditional_withdrawal, dec!(20_000));
        assert!(validate_strategy(&strategy, &portfolio).is_empty());
    }

    #[test]
    fn test_validator_flags_over_withdrawal() {
        let portfolio = traditional_only(dec!(50_000));
        let strategy = WithdrawalStrategy {
            traditional_withdrawal: dec!(60_000),
            taxable_withdrawal: Decimal::ZERO,
            roth_withdrawal: dec!(1_000),
            social_security_income: Decimal::ZERO,
            pension_income: Decimal::ZERO,
            rmd_amount: Decimal::ZERO,
            is_system_generated: false,
        };
        let violations = validate_strategy(&strategy, &portfolio);
        assert_eq!(violations.len(), 2);
        assert!(violations[0].contains("Traditional withdrawal"));
        assert!(violations[1].contains("Roth withdrawal"));
    }

    #[test]
    fn test_validator_flags_rmd_shortfall() {
        let portfolio = traditional_only(dec!(500_000));
        let strategy = WithdrawalStrategy {
            traditional_withdrawal: dec!(10_000),
            taxable_withdrawal: Decimal::ZERO,
            roth_withdrawal: Decimal::ZERO,
            social_security_income: Decimal::ZERO,
            pension_income: Decimal::ZERO,
            rmd_amount: dec!(18_868),
            is_system_generated: false,
        };
        let violations = validate_strategy(&strategy, &portfolio);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("required minimum distribution"));
    }

    #[test]
    fn test_explainer_mentions_rmd_and_roth() {
        let tables = TaxTables::federal_2024();
        let portfolio = Portfolio {
            traditional: Some(TraditionalAccount {
                balance: dec!(500_000),
                prior_year_balance: None,
            }),
            roth: Some(RothAccount {
                balance: dec!(100_000),
            }),
            ..Portfolio::default()
        };
        let g = goal(dec!(60_000), TargetType::Gross, 74);
        let strategy = generate_strategy(&portfolio, &g, &tables).unwrap().result;
        let breakdown = breakdown_impl(&strategy, &portfolio, &g, &tables).0;
        let bullets = explain_strategy(&strategy, &breakdown);
        assert!(bullets.iter().any(|b| b.contains("required minimum")));
        assert!(!bullets.is_empty());
    }
}
