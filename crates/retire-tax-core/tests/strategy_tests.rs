use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use retire_tax_core::plan::breakdown::compute_tax_breakdown;
use retire_tax_core::plan::strategy::{generate_strategy, validate_strategy};
use retire_tax_core::tables::TaxTables;
use retire_tax_core::tax::brackets::ordinary_income_tax;
use retire_tax_core::tax::capital_gains::capital_gains_tax;
use retire_tax_core::tax::rmd::required_minimum_distribution;
use retire_tax_core::tax::social_security::social_security_taxability;
use retire_tax_core::types::{
    FilingStatus, IncomeGoal, Money, Portfolio, RothAccount, SocialSecurityIncome,
    StateTaxMethod, TargetType, TaxableAccount, TraditionalAccount,
};

// ===========================================================================
// Calculator invariants and end-to-end strategy behaviour
// ===========================================================================

fn single_goal(amount: Money, target_type: TargetType, age: u32) -> IncomeGoal {
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

// ---------------------------------------------------------------------------
// Bracket coverage invariant
// ---------------------------------------------------------------------------

#[test]
fn test_bracket_fills_cover_income_for_all_statuses() {
    let tables = TaxTables::federal_2024();
    let statuses = [
        FilingStatus::Single,
        FilingStatus::MarriedJoint,
        FilingStatus::MarriedSeparate,
        FilingStatus::HeadOfHousehold,
    ];
    for status in statuses {
        for income in [0u32, 1, 11_600, 50_000, 250_000, 1_000_000] {
            let income = Decimal::from(income);
            let result = ordinary_income_tax(income, status, &[], &tables);
            let fill_sum: Money = result.fills.iter().map(|f| f.income_in_bracket).sum();
            let tax_sum: Money = result.fills.iter().map(|f| f.tax_from_bracket).sum();
            assert_eq!(fill_sum, income, "{status:?} at income {income}");
            assert_eq!(tax_sum, result.total_tax, "{status:?} at income {income}");
        }
    }
}

// ---------------------------------------------------------------------------
// Capital-gains stacking invariant
// ---------------------------------------------------------------------------

#[test]
fn test_capital_gains_tax_non_decreasing_in_ordinary_income() {
    let tables = TaxTables::federal_2024();
    let gains = dec!(50_000);
    let mut previous = Decimal::ZERO;
    for ordinary in (0u32..=700_000).step_by(25_000) {
        let result = capital_gains_tax(
            gains,
            Decimal::from(ordinary),
            FilingStatus::Single,
            &tables,
        );
        assert!(
            result.total_tax >= previous,
            "stacking violated at ordinary income {ordinary}"
        );
        previous = result.total_tax;
    }
}

// ---------------------------------------------------------------------------
// Social Security taxability: monotonicity and boundary correctness
// ---------------------------------------------------------------------------

#[test]
fn test_ss_taxable_monotone_and_capped() {
    let tables = TaxTables::federal_2024();
    let benefit = dec!(28_000);
    let mut previous = Decimal::ZERO;
    for other in (0u32..=300_000).step_by(5_000) {
        let result = social_security_taxability(
            benefit,
            Decimal::from(other),
            Decimal::ZERO,
            FilingStatus::Single,
            &tables,
        );
        assert!(result.taxable_amount >= previous);
        assert!(result.taxable_amount <= benefit * dec!(0.85));
        previous = result.taxable_amount;
    }
}

#[test]
fn test_ss_zero_threshold_boundary() {
    let tables = TaxTables::federal_2024();
    // Provisional income exactly at the single-filer threshold: untaxed.
    let at = social_security_taxability(
        dec!(10_000),
        dec!(20_000),
        Decimal::ZERO,
        FilingStatus::Single,
        &tables,
    );
    assert_eq!(at.provisional_income, dec!(25_000));
    assert_eq!(at.taxable_amount, Decimal::ZERO);

    // One dollar over the threshold: taxable.
    let over = social_security_taxability(
        dec!(10_000),
        dec!(20_001),
        Decimal::ZERO,
        FilingStatus::Single,
        &tables,
    );
    assert_eq!(over.provisional_income, dec!(25_001));
    assert!(over.taxable_amount > Decimal::ZERO);
}

// ---------------------------------------------------------------------------
// RMD boundaries
// ---------------------------------------------------------------------------

#[test]
fn test_rmd_boundary_at_start_age() {
    let tables = TaxTables::federal_2024();

    let below = required_minimum_distribution(72, dec!(800_000), &tables);
    assert!(!below.is_required);
    assert_eq!(below.amount, Decimal::ZERO);

    let at = required_minimum_distribution(73, dec!(800_000), &tables);
    assert!(at.is_required);
    assert_eq!(at.amount, dec!(30_189)); // round(800,000 / 26.5)
}

// ---------------------------------------------------------------------------
// Strategy: RMD floor holds for any goal size
// ---------------------------------------------------------------------------

#[test]
fn test_strategy_rmd_floor_for_any_goal() {
    let tables = TaxTables::federal_2024();
    let portfolio = Portfolio {
        traditional: Some(TraditionalAccount {
            balance: dec!(750_000),
            prior_year_balance: None,
        }),
        ..Portfolio::default()
    };
    let expected_rmd = required_minimum_distribution(74, dec!(750_000), &tables).amount;

    for amount in [0u32, 5_000, 25_000, 60_000, 200_000] {
        let goal = single_goal(Decimal::from(amount), TargetType::Gross, 74);
        let strategy = generate_strategy(&portfolio, &goal, &tables)
            .unwrap()
            .result;
        assert!(
            strategy.traditional_withdrawal >= expected_rmd,
            "goal {amount}: traditional {} below RMD {expected_rmd}",
            strategy.traditional_withdrawal
        );
        assert_eq!(strategy.rmd_amount, expected_rmd);
    }
}

// ---------------------------------------------------------------------------
// Concrete scenario from the plan documentation
// ---------------------------------------------------------------------------

#[test]
fn test_single_73_traditional_only_scenario() {
    let tables = TaxTables::federal_2024();
    let portfolio = Portfolio {
        traditional: Some(TraditionalAccount {
            balance: dec!(500_000),
            prior_year_balance: Some(dec!(500_000)),
        }),
        ..Portfolio::default()
    };
    let goal = single_goal(dec!(50_000), TargetType::Gross, 73);

    let strategy = generate_strategy(&portfolio, &goal, &tables)
        .unwrap()
        .result;

    // RMD = round(500,000 / 26.5) = 18,868; the goal needs more than that.
    assert_eq!(strategy.rmd_amount, dec!(18_868));
    assert!(strategy.traditional_withdrawal >= dec!(18_868));
    assert_eq!(strategy.traditional_withdrawal, dec!(50_000));

    let breakdown = compute_tax_breakdown(&strategy, &portfolio, &goal, &tables)
        .unwrap()
        .result;
    assert!(breakdown.rmd_is_satisfied);
    assert!(validate_strategy(&strategy, &portfolio).is_empty());
}

// ---------------------------------------------------------------------------
// Breakdown determinism
// ---------------------------------------------------------------------------

#[test]
fn test_breakdown_idempotent() {
    let tables = TaxTables::federal_2024();
    let portfolio = Portfolio {
        taxable: Some(TaxableAccount {
            balance: dec!(250_000),
            cost_basis: dec!(175_000),
        }),
        traditional: Some(TraditionalAccount {
            balance: dec!(500_000),
            prior_year_balance: None,
        }),
        roth: Some(RothAccount {
            balance: dec!(120_000),
        }),
        social_security: Some(SocialSecurityIncome {
            annual_benefit: dec!(26_000),
        }),
        ..Portfolio::default()
    };
    let goal = single_goal(dec!(75_000), TargetType::Gross, 70);
    let strategy = generate_strategy(&portfolio, &goal, &tables)
        .unwrap()
        .result;

    let first = compute_tax_breakdown(&strategy, &portfolio, &goal, &tables)
        .unwrap()
        .result;
    let second = compute_tax_breakdown(&strategy, &portfolio, &goal, &tables)
        .unwrap()
        .result;
    assert_eq!(first, second);
}

// ---------------------------------------------------------------------------
// After-tax targets across account mixes
// ---------------------------------------------------------------------------

#[test]
fn test_after_tax_target_within_tolerance() {
    let tables = TaxTables::federal_2024();
    let portfolio = Portfolio {
        taxable: Some(TaxableAccount {
            balance: dec!(300_000),
            cost_basis: dec!(180_000),
        }),
        traditional: Some(TraditionalAccount {
            balance: dec!(900_000),
            prior_year_balance: None,
        }),
        roth: Some(RothAccount {
            balance: dec!(200_000),
        }),
        social_security: Some(SocialSecurityIncome {
            annual_benefit: dec!(30_000),
        }),
        ..Portfolio::default()
    };

    for target in [40_000u32, 65_000, 90_000] {
        let target = Decimal::from(target);
        let goal = single_goal(target, TargetType::AfterTax, 67);
        let strategy = generate_strategy(&portfolio, &goal, &tables)
            .unwrap()
            .result;
        let breakdown = compute_tax_breakdown(&strategy, &portfolio, &goal, &tables)
            .unwrap()
            .result;
        assert!(
            (breakdown.after_tax_income - target).abs() <= dec!(500),
            "target {target}: after-tax {}",
            breakdown.after_tax_income
        );
        assert!(validate_strategy(&strategy, &portfolio).is_empty());
    }
}

// ---------------------------------------------------------------------------
// Missing accounts behave as zero balances
// ---------------------------------------------------------------------------

#[test]
fn test_empty_portfolio_produces_zero_strategy() {
    let tables = TaxTables::federal_2024();
    let goal = single_goal(dec!(50_000), TargetType::Gross, 70);
    let strategy = generate_strategy(&Portfolio::default(), &goal, &tables)
        .unwrap()
        .result;

    assert_eq!(strategy.traditional_withdrawal, Decimal::ZERO);
    assert_eq!(strategy.taxable_withdrawal, Decimal::ZERO);
    assert_eq!(strategy.roth_withdrawal, Decimal::ZERO);
    assert_eq!(strategy.rmd_amount, Decimal::ZERO);

    let breakdown = compute_tax_breakdown(&strategy, &Portfolio::default(), &goal, &tables)
        .unwrap()
        .result;
    assert_eq!(breakdown.total_tax, Decimal::ZERO);
    assert_eq!(breakdown.effective_rate_on_gross, Decimal::ZERO);
}
