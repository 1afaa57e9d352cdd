use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use serde_json::Value;

use retire_tax_core::plan::breakdown::compute_tax_breakdown;
use retire_tax_core::plan::guardrails::{guardrails_schedule, GuardrailsInput};
use retire_tax_core::plan::projection::{
    project_retirement, projection_stats, summary_years, FirstYearOverride,
    ProjectionAssumptions,
};
use retire_tax_core::plan::strategy::{explain_strategy, generate_strategy, validate_strategy};
use retire_tax_core::tables::TaxTables;
use retire_tax_core::types::{IncomeGoal, Portfolio, WithdrawalStrategy};

use crate::input;

// ---------------------------------------------------------------------------
// Composite request payloads (JSON/YAML file or piped stdin)
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct BreakdownRequest {
    strategy: WithdrawalStrategy,
    portfolio: Portfolio,
    goal: IncomeGoal,
}

#[derive(Deserialize)]
struct StrategyRequest {
    portfolio: Portfolio,
    goal: IncomeGoal,
}

#[derive(Deserialize)]
struct ProjectRequest {
    portfolio: Portfolio,
    goal: IncomeGoal,
    assumptions: ProjectionAssumptions,
    #[serde(default)]
    first_year: Option<FirstYearOverride>,
}

fn read_request<T: serde::de::DeserializeOwned>(
    path: &Option<String>,
    what: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return input::file::read_document(path);
    }
    if let Some(piped) = input::stdin::read_stdin()? {
        return Ok(serde_json::from_value(piped)?);
    }
    Err(format!("{what} requires --input or piped JSON on stdin").into())
}

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

/// Arguments for a full tax breakdown
#[derive(Args)]
pub struct BreakdownArgs {
    /// Path to a JSON/YAML file with strategy, portfolio, and goal
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for strategy generation
#[derive(Args)]
pub struct StrategyArgs {
    /// Path to a JSON/YAML file with portfolio and goal
    #[arg(long)]
    pub input: Option<String>,

    /// Also validate the strategy and include plain-language explanations
    #[arg(long)]
    pub explain: bool,
}

/// Arguments for a multi-year projection
#[derive(Args)]
pub struct ProjectArgs {
    /// Path to a JSON/YAML file with portfolio, goal, and assumptions
    #[arg(long)]
    pub input: Option<String>,

    /// Condense the output to summary years only
    #[arg(long)]
    pub summary: bool,
}

/// Arguments for the guardrails schedule
#[derive(Args)]
pub struct GuardrailsArgs {
    /// Starting portfolio balance
    #[arg(long)]
    pub balance: Decimal,

    /// Initial withdrawal rate (e.g. 0.05 for 5%)
    #[arg(long, default_value = "0.05")]
    pub rate: Decimal,

    /// Annual growth rate
    #[arg(long, default_value = "0.06")]
    pub growth_rate: Decimal,

    /// Annual inflation rate
    #[arg(long, default_value = "0.025")]
    pub inflation_rate: Decimal,

    /// Years to project
    #[arg(long, default_value = "30")]
    pub years: u32,

    /// Guardrail band around the initial rate
    #[arg(long, default_value = "0.20")]
    pub band: Decimal,

    /// Spending adjustment when a guardrail is crossed
    #[arg(long, default_value = "0.10")]
    pub adjustment: Decimal,
}

// ---------------------------------------------------------------------------
// Runners
// ---------------------------------------------------------------------------

pub fn run_breakdown(args: BreakdownArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: BreakdownRequest = read_request(&args.input, "breakdown")?;
    let tables = TaxTables::federal_2024();
    let output = compute_tax_breakdown(
        &request.strategy,
        &request.portfolio,
        &request.goal,
        &tables,
    )?;
    Ok(serde_json::to_value(output)?)
}

pub fn run_strategy(args: StrategyArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: StrategyRequest = read_request(&args.input, "strategy")?;
    let tables = TaxTables::federal_2024();
    let output = generate_strategy(&request.portfolio, &request.goal, &tables)?;

    let mut value = serde_json::to_value(&output)?;
    if args.explain {
        let violations = validate_strategy(&output.result, &request.portfolio);
        let breakdown =
            compute_tax_breakdown(&output.result, &request.portfolio, &request.goal, &tables)?;
        let bullets = explain_strategy(&output.result, &breakdown.result);
        if let Value::Object(map) = &mut value {
            map.insert("violations".into(), serde_json::to_value(violations)?);
            map.insert("explanations".into(), serde_json::to_value(bullets)?);
        }
    }
    Ok(value)
}

pub fn run_project(args: ProjectArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: ProjectRequest = read_request(&args.input, "project")?;
    let tables = TaxTables::federal_2024();
    let output = project_retirement(
        &request.portfolio,
        &request.goal,
        &request.assumptions,
        request.first_year,
        &tables,
    )?;

    let stats = projection_stats(&output.result);
    let mut value = serde_json::to_value(&output)?;
    if let Value::Object(map) = &mut value {
        map.insert("stats".into(), serde_json::to_value(stats)?);
        if args.summary {
            let condensed = summary_years(&output.result);
            if let Some(Value::Object(result)) = map.get_mut("result") {
                result.insert("years".into(), serde_json::to_value(condensed)?);
            }
        }
    }
    Ok(value)
}

pub fn run_guardrails(args: GuardrailsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    if args.band < Decimal::ZERO || args.band >= dec!(1) {
        return Err("--band must be between 0 and 1".into());
    }
    let input = GuardrailsInput {
        starting_balance: args.balance,
        initial_withdrawal_rate: args.rate,
        growth_rate: args.growth_rate,
        inflation_rate: args.inflation_rate,
        years: args.years,
        guardrail_band: args.band,
        adjustment_pct: args.adjustment,
    };
    let output = guardrails_schedule(&input)?;
    Ok(serde_json::to_value(output)?)
}
