use std::fs::File;
use std::io;
use std::path::Path;

use tracing::debug;

use crate::attribution::engine::SegmentRecord;
use crate::error::AttributionError;
use crate::BrinsonResult;

/// Options for reading a delimited segment table.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub delimiter: u8,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    SegmentId = 0,
    FundWeight,
    BenchmarkWeight,
    FundReturn,
    BenchmarkReturn,
}

impl Column {
    const ALL: [Column; 5] = [
        Column::SegmentId,
        Column::FundWeight,
        Column::BenchmarkWeight,
        Column::FundReturn,
        Column::BenchmarkReturn,
    ];

    fn name(self) -> &'static str {
        match self {
            Column::SegmentId => "segment_id",
            Column::FundWeight => "fund_weight",
            Column::BenchmarkWeight => "benchmark_weight",
            Column::FundReturn => "fund_return",
            Column::BenchmarkReturn => "benchmark_return",
        }
    }

    /// Accepted header spellings, already normalised.
    fn aliases(self) -> &'static [&'static str] {
        match self {
            Column::SegmentId => &["segmentid", "segment", "sector"],
            Column::FundWeight => &["fundweight", "fundwt", "portfolioweight", "portwt"],
            Column::BenchmarkWeight => &["benchmarkweight", "bmwt", "bmweight", "benchwt"],
            Column::FundReturn => &["fundreturn", "fundret", "portfolioreturn", "portret"],
            Column::BenchmarkReturn => &["benchmarkreturn", "bmret", "bmreturn", "benchret"],
        }
    }
}

/// Lower-case and drop BOM, spaces, underscores and hyphens.
fn normalise_header(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '\u{feff}' | ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Position of each required column in the header row.
struct ColumnMap([usize; 5]);

impl ColumnMap {
    fn resolve(headers: &csv::StringRecord) -> BrinsonResult<Self> {
        let normalised: Vec<String> = headers.iter().map(normalise_header).collect();
        let mut positions = [0usize; 5];
        let mut missing = Vec::new();

        for column in Column::ALL {
            match normalised
                .iter()
                .position(|h| column.aliases().contains(&h.as_str()))
            {
                Some(idx) => positions[column as usize] = idx,
                None => missing.push(column.name()),
            }
        }

        if !missing.is_empty() {
            return Err(AttributionError::Parse(format!(
                "missing required column(s): {} (found: {})",
                missing.join(", "),
                headers.iter().collect::<Vec<_>>().join(", ")
            )));
        }
        Ok(Self(positions))
    }

    fn cell<'r>(&self, record: &'r csv::StringRecord, column: Column) -> &'r str {
        record.get(self.0[column as usize]).unwrap_or("")
    }

    fn number(&self, row: usize, record: &csv::StringRecord, column: Column) -> BrinsonResult<f64> {
        let raw = self.cell(record, column).trim();
        if raw.is_empty() {
            return Err(AttributionError::validation(
                Some(row),
                column.name(),
                "value is missing",
            ));
        }
        raw.parse::<f64>().map_err(|_| {
            AttributionError::Parse(format!(
                "row {row}, column '{}': cannot parse '{raw}' as a number",
                column.name()
            ))
        })
    }

    fn segment(&self, row: usize, record: &csv::StringRecord) -> BrinsonResult<SegmentRecord> {
        Ok(SegmentRecord {
            segment_id: self.cell(record, Column::SegmentId).trim().to_string(),
            fund_weight: self.number(row, record, Column::FundWeight)?,
            benchmark_weight: self.number(row, record, Column::BenchmarkWeight)?,
            fund_return: self.number(row, record, Column::FundReturn)?,
            benchmark_return: self.number(row, record, Column::BenchmarkReturn)?,
        })
    }
}

/// Re-number a reader error by data row. The csv crate reports 1-based
/// lines that include the header.
fn record_error(row: usize, e: csv::Error) -> AttributionError {
    let detail = match e.kind() {
        csv::ErrorKind::UnequalLengths {
            expected_len, len, ..
        } => Some(format!("found {len} fields, expected {expected_len}")),
        csv::ErrorKind::Utf8 { err, .. } => Some(format!("invalid UTF-8: {err}")),
        _ => None,
    };
    match detail {
        Some(detail) => AttributionError::Parse(format!("row {row}: {detail}")),
        None => e.into(),
    }
}

/// Parse a delimited segment table with a header row.
///
/// Headers are matched case-insensitively against known aliases
/// (e.g. `Sector`, `Fund_Wt`, `BM_Ret`); extra columns are ignored. Rows are
/// numbered from zero, excluding the header. The result is not validated.
pub fn read_segments<R: io::Read>(
    reader: R,
    options: &IngestOptions,
) -> BrinsonResult<Vec<SegmentRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let columns = ColumnMap::resolve(&headers)?;

    let mut segments = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| record_error(row, e))?;
        segments.push(columns.segment(row, &record)?);
    }

    debug!(rows = segments.len(), "parsed segment table");
    Ok(segments)
}

/// Open `path` and parse it with [`read_segments`].
pub fn read_segments_from_path(
    path: impl AsRef<Path>,
    options: &IngestOptions,
) -> BrinsonResult<Vec<SegmentRecord>> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| AttributionError::Io(format!("failed to open '{}': {e}", path.display())))?;
    read_segments(file, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> BrinsonResult<Vec<SegmentRecord>> {
        read_segments(text.as_bytes(), &IngestOptions::default())
    }

    #[test]
    fn test_factset_style_headers() {
        let rows = parse(
            "Sector,Fund_Wt,BM_Wt,Fund_Ret,BM_Ret\n\
             Tech,0.30,0.20,0.10,0.05\n\
             Energy,0.10,0.15,-0.02,0.01\n",
        )
        .unwrap();
        assert_eq!(
            rows,
            vec![
                SegmentRecord::new("Tech", 0.30, 0.20, 0.10, 0.05),
                SegmentRecord::new("Energy", 0.10, 0.15, -0.02, 0.01),
            ]
        );
    }

    #[test]
    fn test_canonical_headers_reordered_with_extra_column() {
        let rows = parse(
            "benchmark_return,Note,segment_id,fund_return,benchmark_weight,fund_weight\n\
             0.05,core,Tech,0.10,0.20,0.30\n",
        )
        .unwrap();
        assert_eq!(rows, vec![SegmentRecord::new("Tech", 0.30, 0.20, 0.10, 0.05)]);
    }

    #[test]
    fn test_semicolon_delimiter() {
        let rows = read_segments(
            "Sector;Fund Wt;BM Wt;Fund Ret;BM Ret\nTech;0.3;0.2;0.1;0.05\n".as_bytes(),
            &IngestOptions { delimiter: b';' },
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].fund_weight, 0.3);
    }

    #[test]
    fn test_missing_columns_listed() {
        let err = parse("Sector,Fund_Wt,BM_Wt\nTech,0.3,0.2\n").unwrap_err();
        match err {
            AttributionError::Parse(msg) => {
                assert!(msg.contains("fund_return"));
                assert!(msg.contains("benchmark_return"));
                assert!(!msg.contains("fund_weight,"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_empty_cell_is_validation_error() {
        let err = parse(
            "Sector,Fund_Wt,BM_Wt,Fund_Ret,BM_Ret\n\
             Tech,0.30,0.20,0.10,0.05\n\
             Energy,0.10,,-0.02,0.01\n",
        )
        .unwrap_err();
        match err {
            AttributionError::Validation { row, field, .. } => {
                assert_eq!(row, Some(1));
                assert_eq!(field, "benchmark_weight");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_garbage_cell_is_parse_error() {
        let err = parse("Sector,Fund_Wt,BM_Wt,Fund_Ret,BM_Ret\nTech,abc,0.2,0.1,0.05\n")
            .unwrap_err();
        assert!(matches!(err, AttributionError::Parse(ref m) if m.contains("fund_weight")));
    }

    #[test]
    fn test_nan_text_reaches_validation() {
        let rows = parse("Sector,Fund_Wt,BM_Wt,Fund_Ret,BM_Ret\nTech,NaN,0.2,0.1,0.05\n").unwrap();
        assert!(rows[0].fund_weight.is_nan());
        assert!(crate::validate(&rows).is_err());
    }

    #[test]
    fn test_ragged_row_rejected() {
        let err = parse("Sector,Fund_Wt,BM_Wt,Fund_Ret,BM_Ret\nTech,0.3,0.2\n").unwrap_err();
        assert!(matches!(err, AttributionError::Parse(_)));
    }

    #[test]
    fn test_ragged_row_uses_data_row_numbering() {
        let err = parse(
            "Sector,Fund_Wt,BM_Wt,Fund_Ret,BM_Ret\n\
             Tech,0.30,0.20,0.10,0.05\n\
             Energy,0.10\n",
        )
        .unwrap_err();
        match err {
            AttributionError::Parse(msg) => {
                assert!(msg.starts_with("row 1:"), "{msg}");
                assert!(msg.contains("found 2 fields, expected 5"), "{msg}");
                assert!(!msg.contains("line"), "{msg}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_bom_and_case_ignored() {
        let rows =
            parse("\u{feff}SECTOR,FUND_WT,BM_WT,FUND_RET,BM_RET\nTech,0.3,0.2,0.1,0.05\n").unwrap();
        assert_eq!(rows[0].segment_id, "Tech");
    }

    #[test]
    fn test_missing_file() {
        let err = read_segments_from_path("/nonexistent/table.csv", &IngestOptions::default())
            .unwrap_err();
        assert!(matches!(err, AttributionError::Io(_)));
    }
}
