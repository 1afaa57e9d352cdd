use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::year_rows;

/// Format output as tables using the tabled crate: a field/value table for
/// the scalar result, plus a row-per-year table when the result carries a
/// year sequence (projections, RMD and guardrails schedules).
pub fn print_table(value: &Value) {
    if let Some(rows) = year_rows(value) {
        print_rows_table(rows);
        if let Some(scalars) = scalar_fields(value) {
            println!();
            print_field_table(&scalars);
        }
    } else {
        match value.as_object().and_then(|m| m.get("result")) {
            Some(Value::Object(result)) => {
                print_field_table(&fields_of(result));
            }
            _ => {
                if let Value::Object(map) = value {
                    print_field_table(&fields_of(map));
                } else {
                    println!("{}", value);
                }
            }
        }
    }

    print_envelope_trailer(value);
}

/// Scalar fields of the result, with year sequences and bracket-fill traces
/// left to their own renderings.
fn scalar_fields(value: &Value) -> Option<Vec<(String, String)>> {
    let result = value.as_object()?.get("result")?.as_object()?;
    let scalars: Vec<(String, String)> = result
        .iter()
        .filter(|(key, val)| key.as_str() != "years" && !val.is_array())
        .map(|(key, val)| (key.clone(), format_value(val)))
        .collect();
    (!scalars.is_empty()).then_some(scalars)
}

fn fields_of(map: &serde_json::Map<String, Value>) -> Vec<(String, String)> {
    map.iter()
        .map(|(key, val)| (key.clone(), format_value(val)))
        .collect()
}

fn print_field_table(fields: &[(String, String)]) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in fields {
        builder.push_record([key.as_str(), val.as_str()]);
    }
    println!("{}", Table::from(builder));
}

fn print_rows_table(rows: &[Value]) {
    if rows.is_empty() {
        println!("(no years)");
        return;
    }

    let Some(Value::Object(first)) = rows.first() else {
        for row in rows {
            println!("{}", format_value(row));
        }
        return;
    };

    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(&headers);
    for row in rows {
        if let Value::Object(map) = row {
            let record: Vec<String> = headers
                .iter()
                .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                .collect();
            builder.push_record(record);
        }
    }
    println!("{}", Table::from(builder));
}

fn print_envelope_trailer(value: &Value) {
    let Some(envelope) = value.as_object() else {
        return;
    };

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(methodology)) = envelope.get("methodology") {
        println!("\nMethodology: {}", methodology);
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
