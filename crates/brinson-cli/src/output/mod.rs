pub mod chart;
pub mod csv_out;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(value) {
            Ok(s) => println!("{s}"),
            Err(e) => eprintln!("JSON serialization error: {e}"),
        },
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Rows of an attribution envelope (`result.rows`), or a chart's `bars`.
pub(crate) fn primary_rows(value: &Value) -> Option<&Vec<Value>> {
    let result = value.get("result").unwrap_or(value);
    result
        .get("rows")
        .or_else(|| result.get("bars"))
        .and_then(Value::as_array)
}
