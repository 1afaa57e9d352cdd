use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::RetireTaxError;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::RetireTaxResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Guyton–Klinger dynamic-spending schedule. A secondary policy, invoked
/// independently of the goal-driven strategy path; it never touches the tax
/// engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailsInput {
    pub starting_balance: Money,
    /// Initial withdrawal rate, e.g. 0.05 for 5%.
    pub initial_withdrawal_rate: Rate,
    pub growth_rate: Rate,
    pub inflation_rate: Rate,
    pub years: u32,
    /// Band around the initial rate that triggers an adjustment, e.g. 0.20.
    pub guardrail_band: Rate,
    /// Spending raise/cut applied when a guardrail is crossed, e.g. 0.10.
    pub adjustment_pct: Rate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuardrailAction {
    Hold,
    Raise,
    Cut,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailsYear {
    pub year: u32,
    pub starting_balance: Money,
    pub withdrawal: Money,
    /// Withdrawal as a fraction of the starting balance.
    pub current_rate: Rate,
    pub action: GuardrailAction,
    pub ending_balance: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailsOutput {
    pub years: Vec<GuardrailsYear>,
    pub total_withdrawn: Money,
    pub final_balance: Money,
    pub raises: u32,
    pub cuts: u32,
}

// ---------------------------------------------------------------------------
// Core function
// ---------------------------------------------------------------------------

/// Project a Guyton–Klinger spending schedule: spending starts at the initial
/// rate, rises with inflation, and is cut or raised by the adjustment
/// percentage whenever the current withdrawal rate drifts outside the band
/// around the initial rate.
pub fn guardrails_schedule(
    input: &GuardrailsInput,
) -> RetireTaxResult<ComputationOutput<GuardrailsOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_input(input)?;

    let upper_rail = input.initial_withdrawal_rate * (Decimal::ONE + input.guardrail_band);
    let lower_rail = input.initial_withdrawal_rate * (Decimal::ONE - input.guardrail_band);
    let growth_factor = Decimal::ONE + input.growth_rate;
    let inflation_factor = Decimal::ONE + input.inflation_rate;

    let mut balance = input.starting_balance;
    let mut spending = input.starting_balance * input.initial_withdrawal_rate;
    let mut years = Vec::with_capacity(input.years as usize);
    let mut total_withdrawn = Decimal::ZERO;
    let mut raises = 0u32;
    let mut cuts = 0u32;

    for year in 1..=input.years {
        let starting_balance = balance;

        let (action, current_rate) = if starting_balance > Decimal::ZERO {
            let rate = spending / starting_balance;
            if rate > upper_rail {
                spending *= Decimal::ONE - input.adjustment_pct;
                cuts += 1;
                (GuardrailAction::Cut, spending / starting_balance)
            } else if rate < lower_rail {
                spending *= Decimal::ONE + input.adjustment_pct;
                raises += 1;
                (GuardrailAction::Raise, spending / starting_balance)
            } else {
                (GuardrailAction::Hold, rate)
            }
        } else {
            (GuardrailAction::Hold, Decimal::ZERO)
        };

        let withdrawal = spending.min(starting_balance).max(Decimal::ZERO);
        balance = (starting_balance - withdrawal) * growth_factor;
        total_withdrawn += withdrawal;

        years.push(GuardrailsYear {
            year,
            starting_balance,
            withdrawal,
            current_rate,
            action,
            ending_balance: balance,
        });

        spending *= inflation_factor;
    }

    if balance <= Decimal::ZERO {
        warnings.push("The schedule exhausts the portfolio before the final year.".to_string());
    }

    let output = GuardrailsOutput {
        years,
        total_withdrawn,
        final_balance: balance,
        raises,
        cuts,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Guyton–Klinger guardrails: inflation-adjusted spending with \
         rate-band raises and cuts",
        &serde_json::json!({
            "starting_balance": input.starting_balance.to_string(),
            "initial_withdrawal_rate": input.initial_withdrawal_rate.to_string(),
            "guardrail_band": input.guardrail_band.to_string(),
            "adjustment_pct": input.adjustment_pct.to_string(),
            "years": input.years,
        }),
        warnings,
        elapsed,
        output,
    ))
}

fn validate_input(input: &GuardrailsInput) -> RetireTaxResult<()> {
    if input.starting_balance <= Decimal::ZERO {
        return Err(RetireTaxError::InvalidInput {
            field: "starting_balance".into(),
            reason: "Starting balance must be positive".into(),
        });
    }
    if input.initial_withdrawal_rate <= Decimal::ZERO || input.initial_withdrawal_rate >= Decimal::ONE
    {
        return Err(RetireTaxError::InvalidInput {
            field: "initial_withdrawal_rate".into(),
            reason: "Initial withdrawal rate must be between 0 and 1".into(),
        });
    }
    if input.years == 0 {
        return Err(RetireTaxError::InvalidInput {
            field: "years".into(),
            reason: "Schedule must cover at least 1 year".into(),
        });
    }
    Ok(())
}
