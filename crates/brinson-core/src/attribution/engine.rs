use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use crate::error::AttributionError;
use crate::types::{with_metadata, ComputationOutput, Return, ReturnUnit, Weight};
use crate::BrinsonResult;

/// Allowed drift of a weight column's sum from 1.0 before a warning is raised.
const WEIGHT_SUM_TOLERANCE: f64 = 0.02;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One comparable unit (usually a sector) held by both fund and benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRecord {
    #[serde(alias = "sector")]
    pub segment_id: String,
    pub fund_weight: Weight,
    pub benchmark_weight: Weight,
    pub fund_return: Return,
    pub benchmark_return: Return,
}

impl SegmentRecord {
    pub fn new(
        segment_id: impl Into<String>,
        fund_weight: Weight,
        benchmark_weight: Weight,
        fund_return: Return,
        benchmark_return: Return,
    ) -> Self {
        Self {
            segment_id: segment_id.into(),
            fund_weight,
            benchmark_weight,
            fund_return,
            benchmark_return,
        }
    }

    /// Fund weight times fund return.
    pub fn fund_contribution(&self) -> f64 {
        self.fund_weight * self.fund_return
    }

    /// Benchmark weight times benchmark return.
    pub fn benchmark_contribution(&self) -> f64 {
        self.benchmark_weight * self.benchmark_return
    }

    fn numeric_fields(&self) -> [(&'static str, f64); 4] {
        [
            ("fund_weight", self.fund_weight),
            ("benchmark_weight", self.benchmark_weight),
            ("fund_return", self.fund_return),
            ("benchmark_return", self.benchmark_return),
        ]
    }
}

/// How the excess return of a segment is split into effects.
///
/// Both schemes satisfy `allocation + selection + interaction ==
/// fund_weight * fund_return - benchmark_weight * benchmark_return`.
/// Selection on fund weight combined with a separate interaction term counts
/// the cross term twice and breaks that identity, so it is not offered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributionScheme {
    /// Brinson-Hood-Beebower: allocation, selection on benchmark weight,
    /// and a separate interaction term.
    #[default]
    #[serde(alias = "three-factor", alias = "bhb")]
    ThreeFactor,
    /// Selection measured on fund weight, which absorbs the interaction
    /// term. Interaction is reported as zero.
    #[serde(alias = "two-factor")]
    TwoFactor,
}

impl fmt::Display for AttributionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributionScheme::ThreeFactor => write!(f, "three_factor"),
            AttributionScheme::TwoFactor => write!(f, "two_factor"),
        }
    }
}

impl FromStr for AttributionScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "three_factor" | "bhb" => Ok(AttributionScheme::ThreeFactor),
            "two_factor" => Ok(AttributionScheme::TwoFactor),
            other => Err(format!(
                "unknown attribution scheme '{other}' (expected 'three-factor' or 'two-factor')"
            )),
        }
    }
}

/// A full attribution request: the segment table plus labelling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributionInput {
    #[serde(default = "default_portfolio_name")]
    pub portfolio_name: String,
    #[serde(default = "default_benchmark_name")]
    pub benchmark_name: String,
    #[serde(default)]
    pub return_unit: ReturnUnit,
    #[serde(default)]
    pub scheme: AttributionScheme,
    #[serde(alias = "sectors")]
    pub segments: Vec<SegmentRecord>,
}

fn default_portfolio_name() -> String {
    "Fund".into()
}

fn default_benchmark_name() -> String {
    "Benchmark".into()
}

impl AttributionInput {
    pub fn new(segments: Vec<SegmentRecord>) -> Self {
        Self {
            portfolio_name: default_portfolio_name(),
            benchmark_name: default_benchmark_name(),
            return_unit: ReturnUnit::default(),
            scheme: AttributionScheme::default(),
            segments,
        }
    }
}

/// Input columns of one segment plus its computed effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionResult {
    pub segment_id: String,
    pub fund_weight: Weight,
    pub benchmark_weight: Weight,
    pub fund_return: Return,
    pub benchmark_return: Return,
    pub allocation_effect: f64,
    pub selection_effect: f64,
    pub interaction_effect: f64,
    pub total_effect: f64,
    pub fund_contribution: f64,
    pub benchmark_contribution: f64,
}

/// Column sums across every segment of a table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TotalsSummary {
    pub allocation_effect: f64,
    pub selection_effect: f64,
    pub interaction_effect: f64,
    pub total_effect: f64,
    /// Sum of fund contributions
    pub fund_return: f64,
    /// Sum of benchmark contributions
    pub benchmark_return: f64,
    /// fund_return - benchmark_return
    pub active_return: f64,
}

impl TotalsSummary {
    fn first_non_finite(&self) -> Option<&'static str> {
        [
            ("allocation_effect", self.allocation_effect),
            ("selection_effect", self.selection_effect),
            ("interaction_effect", self.interaction_effect),
            ("total_effect", self.total_effect),
            ("fund_return", self.fund_return),
            ("benchmark_return", self.benchmark_return),
            ("active_return", self.active_return),
        ]
        .into_iter()
        .find(|(_, v)| !v.is_finite())
        .map(|(name, _)| name)
    }
}

/// Enriched table: one result per input segment, in input order, plus totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionTable {
    pub scheme: AttributionScheme,
    pub rows: Vec<AttributionResult>,
    pub totals: TotalsSummary,
}

impl AttributionTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check a segment table before computation.
///
/// The table must be non-empty, every `segment_id` non-blank and unique
/// (compared after trimming), and every numeric field finite. The first
/// offending row and field is reported.
pub fn validate(records: &[SegmentRecord]) -> BrinsonResult<()> {
    if records.is_empty() {
        return Err(AttributionError::validation(
            None,
            "segments",
            "At least one segment is required",
        ));
    }

    let mut seen: HashMap<&str, usize> = HashMap::with_capacity(records.len());
    for (row, record) in records.iter().enumerate() {
        let id = record.segment_id.trim();
        if id.is_empty() {
            return Err(AttributionError::validation(
                Some(row),
                "segment_id",
                "must not be empty",
            ));
        }
        if let Some(first) = seen.insert(id, row) {
            return Err(AttributionError::validation(
                Some(row),
                "segment_id",
                format!("'{id}' duplicates row {first}"),
            ));
        }
        for (field, value) in record.numeric_fields() {
            if !value.is_finite() {
                return Err(AttributionError::validation(
                    Some(row),
                    field,
                    format!("must be a finite number, got {value}"),
                ));
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

fn attribute_segment(s: &SegmentRecord, scheme: AttributionScheme) -> AttributionResult {
    let weight_delta = s.fund_weight - s.benchmark_weight;
    let return_delta = s.fund_return - s.benchmark_return;

    let allocation_effect = weight_delta * s.benchmark_return;
    let (selection_effect, interaction_effect) = match scheme {
        AttributionScheme::ThreeFactor => (
            s.benchmark_weight * return_delta,
            weight_delta * return_delta,
        ),
        AttributionScheme::TwoFactor => (s.fund_weight * return_delta, 0.0),
    };

    AttributionResult {
        segment_id: s.segment_id.clone(),
        fund_weight: s.fund_weight,
        benchmark_weight: s.benchmark_weight,
        fund_return: s.fund_return,
        benchmark_return: s.benchmark_return,
        allocation_effect,
        selection_effect,
        interaction_effect,
        total_effect: allocation_effect + selection_effect + interaction_effect,
        fund_contribution: s.fund_contribution(),
        benchmark_contribution: s.benchmark_contribution(),
    }
}

fn first_non_finite(r: &AttributionResult) -> Option<&'static str> {
    [
        ("allocation_effect", r.allocation_effect),
        ("selection_effect", r.selection_effect),
        ("interaction_effect", r.interaction_effect),
        ("total_effect", r.total_effect),
        ("fund_contribution", r.fund_contribution),
        ("benchmark_contribution", r.benchmark_contribution),
    ]
    .into_iter()
    .find(|(_, v)| !v.is_finite())
    .map(|(name, _)| name)
}

/// Compute three-factor Brinson effects for a validated table.
pub fn compute(records: &[SegmentRecord]) -> BrinsonResult<AttributionTable> {
    compute_with(records, AttributionScheme::ThreeFactor)
}

/// Compute Brinson effects under the given scheme.
///
/// Pure and order preserving: `rows[i]` belongs to `records[i]`. No rounding
/// is applied. Records are expected to have passed [`validate`]; a non-finite
/// effect (overflow, or unvalidated NaN input) fails the whole table.
pub fn compute_with(
    records: &[SegmentRecord],
    scheme: AttributionScheme,
) -> BrinsonResult<AttributionTable> {
    let mut totals = TotalsSummary::default();
    let mut rows = Vec::with_capacity(records.len());

    for (row, s) in records.iter().enumerate() {
        let result = attribute_segment(s, scheme);
        if let Some(field) = first_non_finite(&result) {
            return Err(AttributionError::Computation(format!(
                "{field} is not finite for segment '{}' (row {row})",
                s.segment_id
            )));
        }

        totals.allocation_effect += result.allocation_effect;
        totals.selection_effect += result.selection_effect;
        totals.interaction_effect += result.interaction_effect;
        totals.total_effect += result.total_effect;
        totals.fund_return += result.fund_contribution;
        totals.benchmark_return += result.benchmark_contribution;

        rows.push(result);
    }
    totals.active_return = totals.fund_return - totals.benchmark_return;

    if let Some(column) = totals.first_non_finite() {
        return Err(AttributionError::Computation(format!(
            "total {column} is not finite"
        )));
    }

    Ok(AttributionTable {
        scheme,
        rows,
        totals,
    })
}

// ---------------------------------------------------------------------------
// Reasonableness warnings
// ---------------------------------------------------------------------------

fn check_weight_sums(records: &[SegmentRecord], warnings: &mut Vec<String>) {
    let columns = [
        ("fund", records.iter().map(|s| s.fund_weight).sum::<f64>()),
        (
            "benchmark",
            records.iter().map(|s| s.benchmark_weight).sum::<f64>(),
        ),
    ];
    for (which, sum) in columns {
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            warnings.push(format!(
                "{which} weights sum to {sum} (expected within {WEIGHT_SUM_TOLERANCE} of 1.0)"
            ));
        }
    }

    for s in records {
        if s.fund_weight < 0.0 {
            warnings.push(format!(
                "Negative fund weight in segment '{}': {} (short position)",
                s.segment_id, s.fund_weight
            ));
        }
        if s.benchmark_weight < 0.0 {
            warnings.push(format!(
                "Negative benchmark weight in segment '{}': {} (short position)",
                s.segment_id, s.benchmark_weight
            ));
        }
    }
}

fn check_return_scale(records: &[SegmentRecord], unit: ReturnUnit, warnings: &mut Vec<String>) {
    if unit != ReturnUnit::Fraction {
        return;
    }
    let suspicious: Vec<&str> = records
        .iter()
        .filter(|s| s.fund_return.abs() > 1.0 || s.benchmark_return.abs() > 1.0)
        .map(|s| s.segment_id.as_str())
        .collect();
    if !suspicious.is_empty() {
        warnings.push(format!(
            "Returns above 100% in segment(s) {}; if these are percentages, declare the table unit as percent",
            suspicious.join(", ")
        ));
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Validate then compute, wrapping the table in the standard envelope.
///
/// Weight sums and suspicious return scales produce warnings, never errors:
/// the formulas do not require weights to sum to one.
pub fn attribute(input: &AttributionInput) -> BrinsonResult<ComputationOutput<AttributionTable>> {
    let start = Instant::now();
    let mut warnings = Vec::new();

    validate(&input.segments)?;
    check_weight_sums(&input.segments, &mut warnings);
    check_return_scale(&input.segments, input.return_unit, &mut warnings);

    let table = compute_with(&input.segments, input.scheme)?;

    let methodology = match input.scheme {
        AttributionScheme::ThreeFactor => {
            "Brinson-Hood-Beebower single-period attribution (allocation, selection, interaction)"
        }
        AttributionScheme::TwoFactor => {
            "Brinson single-period attribution (allocation, selection incl. interaction)"
        }
    };
    let assumptions = json!({
        "portfolio": input.portfolio_name,
        "benchmark": input.benchmark_name,
        "return_unit": input.return_unit,
        "scheme": input.scheme,
        "segments": input.segments.len(),
        "weight_tolerance": WEIGHT_SUM_TOLERANCE,
    });

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        methodology,
        &assumptions,
        warnings,
        elapsed,
        table,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
