mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::plan::{BreakdownArgs, GuardrailsArgs, ProjectArgs, StrategyArgs};
use commands::rmd::{RmdArgs, RmdScheduleArgs};
use commands::tax::{BracketsArgs, CapitalGainsArgs, SocialSecurityArgs};

/// Tax-efficient retirement withdrawal planning
#[derive(Parser)]
#[command(
    name = "rta",
    version,
    about = "Tax-efficient retirement withdrawal planning",
    long_about = "A CLI for computing tax-efficient retirement withdrawal plans \
                  with decimal precision. Supports ordinary and capital-gains \
                  bracket math, Social Security taxability, RMDs, withdrawal \
                  strategy generation, and multi-year projections."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Ordinary-income bracket tax with per-bracket fill trace
    Brackets(BracketsArgs),
    /// Long-term capital-gains tax stacked on ordinary income
    CapitalGains(CapitalGainsArgs),
    /// Taxable portion of a Social Security benefit
    SocialSecurity(SocialSecurityArgs),
    /// Required minimum distribution for one year
    Rmd(RmdArgs),
    /// Multi-year RMD schedule
    RmdSchedule(RmdScheduleArgs),
    /// Full tax breakdown for a withdrawal strategy
    Breakdown(BreakdownArgs),
    /// Generate a tax-efficient withdrawal strategy
    Strategy(StrategyArgs),
    /// Project a plan across the retirement horizon
    Project(ProjectArgs),
    /// Guyton-Klinger guardrails spending schedule
    Guardrails(GuardrailsArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Brackets(args) => commands::tax::run_brackets(args),
        Commands::CapitalGains(args) => commands::tax::run_capital_gains(args),
        Commands::SocialSecurity(args) => commands::tax::run_social_security(args),
        Commands::Rmd(args) => commands::rmd::run_rmd(args),
        Commands::RmdSchedule(args) => commands::rmd::run_rmd_schedule(args),
        Commands::Breakdown(args) => commands::plan::run_breakdown(args),
        Commands::Strategy(args) => commands::plan::run_strategy(args),
        Commands::Project(args) => commands::plan::run_project(args),
        Commands::Guardrails(args) => commands::plan::run_guardrails(args),
        Commands::Version => {
            println!("rta {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
