use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Deserialize;

use retire_tax_core::plan::breakdown::compute_tax_breakdown;
use retire_tax_core::plan::guardrails::{guardrails_schedule, GuardrailsInput};
use retire_tax_core::plan::projection::{
    project_retirement, FirstYearOverride, ProjectionAssumptions,
};
use retire_tax_core::plan::strategy::{generate_strategy, validate_strategy};
use retire_tax_core::tables::TaxTables;
use retire_tax_core::types::{IncomeGoal, Portfolio, WithdrawalStrategy};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Leaf calculators
// ---------------------------------------------------------------------------

#[napi]
pub fn rmd(age: u32, prior_year_balance: String) -> NapiResult<String> {
    let balance = prior_year_balance.parse().map_err(to_napi_error)?;
    let tables = TaxTables::federal_2024();
    let info = retire_tax_core::tax::rmd::required_minimum_distribution(age, balance, &tables);
    serde_json::to_string(&info).map_err(to_napi_error)
}

#[napi]
pub fn social_security_taxability(input_json: String) -> NapiResult<String> {
    #[derive(Deserialize)]
    struct SsRequest {
        benefit: String,
        other_income: String,
        #[serde(default)]
        tax_exempt_interest: Option<String>,
        filing_status: retire_tax_core::types::FilingStatus,
    }

    let request: SsRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let tables = TaxTables::federal_2024();
    let result = retire_tax_core::tax::social_security::social_security_taxability(
        request.benefit.parse().map_err(to_napi_error)?,
        request.other_income.parse().map_err(to_napi_error)?,
        request
            .tax_exempt_interest
            .map(|s| s.parse())
            .transpose()
            .map_err(to_napi_error)?
            .unwrap_or_default(),
        request.filing_status,
        &tables,
    );
    serde_json::to_string(&result).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Planning operations
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct BreakdownRequest {
    strategy: WithdrawalStrategy,
    portfolio: Portfolio,
    goal: IncomeGoal,
}

#[napi]
pub fn tax_breakdown(input_json: String) -> NapiResult<String> {
    let request: BreakdownRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let tables = TaxTables::federal_2024();
    let output = compute_tax_breakdown(
        &request.strategy,
        &request.portfolio,
        &request.goal,
        &tables,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct StrategyRequest {
    portfolio: Portfolio,
    goal: IncomeGoal,
}

#[napi]
pub fn strategy(input_json: String) -> NapiResult<String> {
    let request: StrategyRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let tables = TaxTables::federal_2024();
    let output =
        generate_strategy(&request.portfolio, &request.goal, &tables).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct ValidateRequest {
    strategy: WithdrawalStrategy,
    portfolio: Portfolio,
}

#[napi]
pub fn validate(input_json: String) -> NapiResult<String> {
    let request: ValidateRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let violations = validate_strategy(&request.strategy, &request.portfolio);
    serde_json::to_string(&violations).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct ProjectRequest {
    portfolio: Portfolio,
    goal: IncomeGoal,
    assumptions: ProjectionAssumptions,
    #[serde(default)]
    first_year: Option<FirstYearOverride>,
}

#[napi]
pub fn project(input_json: String) -> NapiResult<String> {
    let request: ProjectRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let tables = TaxTables::federal_2024();
    let output = project_retirement(
        &request.portfolio,
        &request.goal,
        &request.assumptions,
        request.first_year,
        &tables,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn guardrails(input_json: String) -> NapiResult<String> {
    let input: GuardrailsInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = guardrails_schedule(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
