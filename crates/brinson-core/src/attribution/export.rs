use std::io;

use crate::attribution::engine::AttributionTable;
use crate::error::AttributionError;
use crate::BrinsonResult;

/// Column order of an exported attribution report.
pub const EXPORT_HEADERS: [&str; 9] = [
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

/// Write the enriched table as delimited text, one line per segment.
///
/// Values use the shortest representation that round-trips to the same f64.
/// Totals are not written; they are recomputable from the rows.
pub fn write_table<W: io::Write>(
    writer: W,
    table: &AttributionTable,
    delimiter: u8,
) -> BrinsonResult<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);

    wtr.write_record(EXPORT_HEADERS)?;
    for r in &table.rows {
        wtr.write_record([
            r.segment_id.clone(),
            r.fund_weight.to_string(),
            r.benchmark_weight.to_string(),
            r.fund_return.to_string(),
            r.benchmark_return.to_string(),
            r.allocation_effect.to_string(),
            r.selection_effect.to_string(),
            r.interaction_effect.to_string(),
            r.total_effect.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Render the table to an in-memory CSV string.
pub fn table_to_csv_string(table: &AttributionTable, delimiter: u8) -> BrinsonResult<String> {
    let mut buf = Vec::new();
    write_table(&mut buf, table, delimiter)?;
    String::from_utf8(buf).map_err(|e| AttributionError::Serialization(e.to_string()))
}
