use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::tables::TaxTables;
use crate::types::{round_dollars, FilingStatus, Money, Rate};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SsTaxability {
    /// Taxable portion of the benefit, rounded to whole dollars.
    pub taxable_amount: Money,
    pub taxable_percent: Rate,
    pub provisional_income: Money,
    pub explanation: String,
}

/// Taxable portion of a Social Security benefit under the tiered
/// provisional-income formula.
///
/// Provisional income = other income + tax-exempt interest + 50% of the
/// benefit, compared against two filing-status thresholds. At most 85% of the
/// benefit is ever taxable. Married-separate and head-of-household use the
/// single-filer threshold row.
pub fn social_security_taxability(
    benefit: Money,
    other_income: Money,
    tax_exempt_interest: Money,
    status: FilingStatus,
    tables: &TaxTables,
) -> SsTaxability {
    if benefit <= Decimal::ZERO {
        return SsTaxability {
            taxable_amount: Decimal::ZERO,
            taxable_percent: Decimal::ZERO,
            provisional_income: other_income + tax_exempt_interest,
            explanation: "No Social Security benefit received.".to_string(),
        };
    }

    let thresholds = tables.ss_thresholds(status);
    let half_benefit = benefit * dec!(0.5);
    let provisional = other_income + tax_exempt_interest + half_benefit;

    let taxable = if provisional <= thresholds.zero_threshold {
        Decimal::ZERO
    } else if provisional <= thresholds.fifty_threshold {
        half_benefit.min(dec!(0.5) * (provisional - thresholds.zero_threshold))
    } else {
        let tier_one_cap =
            half_benefit.min(dec!(0.5) * (thresholds.fifty_threshold - thresholds.zero_threshold));
        let tier_two = dec!(0.85) * (provisional - thresholds.fifty_threshold);
        (dec!(0.85) * benefit).min(tier_one_cap + tier_two)
    };

    let taxable = round_dollars(taxable);
    let taxable_percent = taxable / benefit;

    let explanation = if taxable.is_zero() {
        format!(
            "Provisional income of ${provisional} is at or below the \
             ${} threshold, so none of the benefit is taxable.",
            thresholds.zero_threshold
        )
    } else if provisional <= thresholds.fifty_threshold {
        format!(
            "Provisional income of ${provisional} falls between the \
             ${} and ${} thresholds; up to 50% of the benefit is taxable.",
            thresholds.zero_threshold, thresholds.fifty_threshold
        )
    } else {
        format!(
            "Provisional income of ${provisional} exceeds the ${} threshold; \
             up to 85% of the benefit is taxable.",
            thresholds.fifty_threshold
        )
    };

    SsTaxability {
        taxable_amount: taxable,
        taxable_percent,
        provisional_income: provisional,
        explanation,
    }
}
