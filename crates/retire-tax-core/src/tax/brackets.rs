use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::tables::TaxTables;
use crate::types::{FilingStatus, Money, Rate};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// An income amount with its tax character, e.g. "Traditional withdrawal" or
/// "Taxable Social Security". Used only to annotate the bracket-fill trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeSource {
    pub label: String,
    pub amount: Money,
}

/// A source's proportional share of one bracket's fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcePortion {
    pub label: String,
    pub amount: Money,
}

/// How much income landed in one bracket and the tax it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketFill {
    pub rate: Rate,
    pub bracket_min: Money,
    pub bracket_max: Option<Money>,
    pub income_in_bracket: Money,
    pub tax_from_bracket: Money,
    /// Proportional attribution of the fill across the supplied sources.
    /// Presentation data only; it never changes the tax total.
    pub source_portions: Vec<SourcePortion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrdinaryTaxResult {
    pub total_tax: Money,
    pub fills: Vec<BracketFill>,
    /// Rate of the highest bracket actually touched.
    pub marginal_rate: Rate,
}

// ---------------------------------------------------------------------------
// Core function
// ---------------------------------------------------------------------------

/// Progressive tax on taxable ordinary income.
///
/// Walks the brackets ascending, consuming income until exhausted. When
/// `sources` is non-empty, each bracket's fill is split across the sources in
/// proportion to their share of the total source amount.
pub fn ordinary_income_tax(
    taxable_income: Money,
    status: FilingStatus,
    sources: &[IncomeSource],
    tables: &TaxTables,
) -> OrdinaryTaxResult {
    if taxable_income <= Decimal::ZERO {
        return OrdinaryTaxResult {
            total_tax: Decimal::ZERO,
            fills: Vec::new(),
            marginal_rate: Decimal::ZERO,
        };
    }

    let total_source_amount: Money = sources.iter().map(|s| s.amount).sum();

    let mut remaining = taxable_income;
    let mut total_tax = Decimal::ZERO;
    let mut marginal_rate = Decimal::ZERO;
    let mut fills = Vec::new();

    for bracket in tables.ordinary_brackets(status) {
        if remaining <= Decimal::ZERO {
            break;
        }

        let consumed = match bracket.max {
            Some(max) => remaining.min(max - bracket.min),
            None => remaining,
        };
        if consumed <= Decimal::ZERO {
            continue;
        }

        let tax_from_bracket = consumed * bracket.rate;
        total_tax += tax_from_bracket;
        marginal_rate = bracket.rate;

        let source_portions = if total_source_amount > Decimal::ZERO {
            sources
                .iter()
                .map(|s| SourcePortion {
                    label: s.label.clone(),
                    amount: consumed * s.amount / total_source_amount,
                })
                .collect()
        } else {
            Vec::new()
        };

        fills.push(BracketFill {
            rate: bracket.rate,
            bracket_min: bracket.min,
            bracket_max: bracket.max,
            income_in_bracket: consumed,
            tax_from_bracket,
            source_portions,
        });

        remaining -= consumed;
    }

    OrdinaryTaxResult {
        total_tax,
        fills,
        marginal_rate,
    }
}
