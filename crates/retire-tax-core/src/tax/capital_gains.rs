use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::tables::TaxTables;
use crate::types::{FilingStatus, Money, Rate};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalGainsFill {
    pub rate: Rate,
    pub bracket_min: Money,
    pub bracket_max: Option<Money>,
    pub gains_in_bracket: Money,
    pub tax_from_bracket: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapitalGainsResult {
    pub total_tax: Money,
    /// Tax divided by gains; zero when there are no gains.
    pub effective_rate: Rate,
    pub fills: Vec<CapitalGainsFill>,
    /// Rate that would apply to the next dollar of gains.
    pub marginal_rate: Rate,
}

// ---------------------------------------------------------------------------
// Core function
// ---------------------------------------------------------------------------

/// Long-term capital-gains tax with ordinary income stacked beneath.
///
/// Capital-gains brackets share the ordinary-income scale: taxable ordinary
/// income is deemed to occupy the bottom of the stack, and gains fill upward
/// from there. A bracket already filled past its top by ordinary income
/// contributes nothing; otherwise gains start at max(bracket start, ordinary
/// income) and consume the room that remains.
pub fn capital_gains_tax(
    gains: Money,
    taxable_ordinary_income: Money,
    status: FilingStatus,
    tables: &TaxTables,
) -> CapitalGainsResult {
    let ordinary = taxable_ordinary_income.max(Decimal::ZERO);
    let brackets = tables.capital_gains_brackets(status);

    let marginal_rate = brackets
        .iter()
        .find(|b| match b.max {
            Some(max) => ordinary + gains.max(Decimal::ZERO) < max,
            None => true,
        })
        .map_or(Decimal::ZERO, |b| b.rate);

    if gains <= Decimal::ZERO {
        return CapitalGainsResult {
            total_tax: Decimal::ZERO,
            effective_rate: Decimal::ZERO,
            fills: Vec::new(),
            marginal_rate,
        };
    }

    let mut remaining = gains;
    let mut total_tax = Decimal::ZERO;
    let mut fills = Vec::new();

    for bracket in brackets {
        if remaining <= Decimal::ZERO {
            break;
        }

        // Skip brackets the ordinary income has already filled past.
        if let Some(max) = bracket.max {
            if ordinary >= max {
                continue;
            }
        }

        let start = bracket.min.max(ordinary);
        let consumed = match bracket.max {
            Some(max) => remaining.min(max - start),
            None => remaining,
        };
        if consumed <= Decimal::ZERO {
            continue;
        }

        let tax_from_bracket = consumed * bracket.rate;
        total_tax += tax_from_bracket;

        fills.push(CapitalGainsFill {
            rate: bracket.rate,
            bracket_min: bracket.min,
            bracket_max: bracket.max,
            gains_in_bracket: consumed,
            tax_from_bracket,
        });

        remaining -= consumed;
    }

    CapitalGainsResult {
        total_tax,
        effective_rate: total_tax / gains,
        fills,
        marginal_rate,
    }
}
