use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use retire_tax_core::tables::TaxTables;
use retire_tax_core::tax::brackets::ordinary_income_tax;
use retire_tax_core::tax::capital_gains::capital_gains_tax;
use retire_tax_core::tax::social_security::social_security_taxability;

use super::FilingStatusArg;

/// Arguments for ordinary-income bracket tax
#[derive(Args)]
pub struct BracketsArgs {
    /// Taxable ordinary income
    #[arg(long)]
    pub income: Decimal,

    /// Filing status
    #[arg(long, value_enum, default_value = "single")]
    pub filing_status: FilingStatusArg,
}

/// Arguments for capital-gains tax
#[derive(Args)]
pub struct CapitalGainsArgs {
    /// Long-term capital gains
    #[arg(long)]
    pub gains: Decimal,

    /// Taxable ordinary income stacked beneath the gains
    #[arg(long, default_value = "0")]
    pub ordinary_income: Decimal,

    /// Filing status
    #[arg(long, value_enum, default_value = "single")]
    pub filing_status: FilingStatusArg,
}

/// Arguments for Social Security taxability
#[derive(Args)]
pub struct SocialSecurityArgs {
    /// Annual Social Security benefit
    #[arg(long)]
    pub benefit: Decimal,

    /// AGI excluding Social Security
    #[arg(long, default_value = "0")]
    pub other_income: Decimal,

    /// Tax-exempt interest
    #[arg(long, default_value = "0")]
    pub exempt_interest: Decimal,

    /// Filing status
    #[arg(long, value_enum, default_value = "single")]
    pub filing_status: FilingStatusArg,
}

pub fn run_brackets(args: BracketsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let tables = TaxTables::federal_2024();
    let result = ordinary_income_tax(args.income, args.filing_status.into(), &[], &tables);
    Ok(serde_json::to_value(result)?)
}

pub fn run_capital_gains(args: CapitalGainsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let tables = TaxTables::federal_2024();
    let result = capital_gains_tax(
        args.gains,
        args.ordinary_income,
        args.filing_status.into(),
        &tables,
    );
    Ok(serde_json::to_value(result)?)
}

pub fn run_social_security(args: SocialSecurityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let tables = TaxTables::federal_2024();
    let result = social_security_taxability(
        args.benefit,
        args.other_income,
        args.exempt_interest,
        args.filing_status.into(),
        &tables,
    );
    Ok(serde_json::to_value(result)?)
}
