use serde::{Deserialize, Serialize};

use crate::tables::TaxTables;
use crate::types::{IncomeGoal, Money};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeductionKind {
    Standard,
    Itemized,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeductionChoice {
    pub amount: Money,
    pub kind: DeductionKind,
}

/// Pick the larger of the standard deduction and the user-supplied itemized
/// amount. Itemizing is only considered when the goal requests it.
pub fn deduction_amount(goal: &IncomeGoal, tables: &TaxTables) -> DeductionChoice {
    let standard = tables.standard_deduction(goal.filing_status);
    if goal.use_itemized_deduction && goal.itemized_deduction > standard {
        DeductionChoice {
            amount: goal.itemized_deduction,
            kind: DeductionKind::Itemized,
        }
    } else {
        DeductionChoice {
            amount: standard,
            kind: DeductionKind::Standard,
        }
    }
}
