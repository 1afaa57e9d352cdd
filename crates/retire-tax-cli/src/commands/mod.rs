pub mod plan;
pub mod rmd;
pub mod tax;

use clap::ValueEnum;
use retire_tax_core::types::FilingStatus;

/// Filing status as a CLI flag value.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FilingStatusArg {
    Single,
    MarriedJoint,
    MarriedSeparate,
    HeadOfHousehold,
}

impl From<FilingStatusArg> for FilingStatus {
    fn from(arg: FilingStatusArg) -> Self {
        match arg {
            FilingStatusArg::Single => FilingStatus::Single,
            FilingStatusArg::MarriedJoint => FilingStatus::MarriedJoint,
            FilingStatusArg::MarriedSeparate => FilingStatus::MarriedSeparate,
            FilingStatusArg::HeadOfHousehold => FilingStatus::HeadOfHousehold,
        }
    }
}
