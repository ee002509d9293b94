use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::primary_rows;

/// Columns shown for attribution rows, in order. Everything else is left to
/// the JSON and CSV formats.
const ROW_COLUMNS: [&str; 9] = [
    "segment_id",
    "fund_weight",
    "benchmark_weight",
    "fund_return",
    "benchmark_return",
    "allocation_effect",
    "selection_effect",
    "interaction_effect",
    "total_effect",
];

/// Format output as a table using the tabled crate.
pub fn print_table(value: &Value) {
    let Value::Object(envelope) = value else {
        println!("{}", value);
        return;
    };
    let result = envelope.get("result").unwrap_or(value);

    if let Some(rows) = primary_rows(value) {
        print_rows(rows);
        if let Some(totals) = result.get("totals") {
            println!();
            print_flat_object(totals);
        }
    } else {
        print_flat_object(result);
    }

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

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_rows(rows: &[Value]) {
    if rows.is_empty() {
        println!("(empty)");
        return;
    }

    let Some(Value::Object(first)) = rows.first() else {
        for item in rows {
            println!("{}", format_value(item));
        }
        return;
    };

    let headers: Vec<&str> = if first.contains_key("segment_id") {
        ROW_COLUMNS.to_vec()
    } else {
        first.keys().map(|k| k.as_str()).collect()
    };

    let mut builder = Builder::default();
    builder.push_record(headers.iter().copied());
    for item in rows {
        if let Value::Object(map) = item {
            builder.push_record(
                headers
                    .iter()
                    .map(|h| map.get(*h).map(format_value).unwrap_or_default()),
            );
        }
    }
    println!("{}", Table::from(builder));
}

fn print_flat_object(value: &Value) {
    if let Value::Object(map) = value {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in map {
            builder.push_record([key.clone(), format_value(val)]);
        }
        println!("{}", Table::from(builder));
    } else {
        println!("{}", format_value(value));
    }
}

/// Display formatting only; effects are rounded to 6 decimals here and
/// nowhere else.
fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) if n.is_f64() => n
            .as_f64()
            .map(|f| format!("{f:.6}"))
            .unwrap_or_else(|| n.to_string()),
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_float_display_rounding() {
        assert_eq!(format_value(&json!(0.020000000000000004)), "0.020000");
        assert_eq!(format_value(&json!(3)), "3");
        assert_eq!(format_value(&json!(["a", "b"])), "a, b");
    }
}
