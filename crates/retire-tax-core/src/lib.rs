pub mod error;
pub mod plan;
pub mod tables;
pub mod tax;
pub mod types;

pub use error::RetireTaxError;
pub use tables::TaxTables;
pub use types::*;

/// Standard result type for all planning operations
pub type RetireTaxResult<T> = Result<T, RetireTaxError>;
