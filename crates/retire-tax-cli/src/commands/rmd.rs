use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use retire_tax_core::tables::TaxTables;
use retire_tax_core::tax::rmd::{required_minimum_distribution, rmd_schedule};

/// Arguments for a single-year RMD
#[derive(Args)]
pub struct RmdArgs {
    /// Account holder's age this year
    #[arg(long)]
    pub age: u32,

    /// Prior-year-end traditional account balance
    #[arg(long)]
    pub balance: Decimal,
}

/// Arguments for a multi-year RMD schedule
#[derive(Args)]
pub struct RmdScheduleArgs {
    /// Account holder's current age
    #[arg(long)]
    pub age: u32,

    /// Current traditional account balance
    #[arg(long)]
    pub balance: Decimal,

    /// Annual growth rate applied to the remaining balance
    #[arg(long, default_value = "0.05")]
    pub growth_rate: Decimal,

    /// Last age included in the schedule
    #[arg(long, default_value = "95")]
    pub end_age: u32,
}

pub fn run_rmd(args: RmdArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let tables = TaxTables::federal_2024();
    let info = required_minimum_distribution(args.age, args.balance, &tables);
    Ok(serde_json::to_value(info)?)
}

pub fn run_rmd_schedule(args: RmdScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    if args.growth_rate <= dec!(-1) {
        return Err("--growth-rate must be greater than -1".into());
    }
    if args.end_age < args.age {
        return Err("--end-age must not be below --age".into());
    }
    let tables = TaxTables::federal_2024();
    let schedule = rmd_schedule(args.age, args.balance, args.growth_rate, args.end_age, &tables);
    Ok(serde_json::to_value(schedule)?)
}
