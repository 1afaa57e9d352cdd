pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Year-by-year rows, when the output carries them (projections, schedules).
pub(crate) fn year_rows(value: &Value) -> Option<&Vec<Value>> {
    if let Value::Array(rows) = value {
        return Some(rows);
    }
    let result = value.as_object()?.get("result")?;
    match result.get("years") {
        Some(Value::Array(rows)) => Some(rows),
        _ => match result {
            Value::Array(rows) => Some(rows),
            _ => None,
        },
    }
}
