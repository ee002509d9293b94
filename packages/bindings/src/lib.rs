use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Deserialize;

use brinson_core::attribution::export::table_to_csv_string;
use brinson_core::attribution::waterfall::{WaterfallChart, WaterfallStyle};
use brinson_core::AttributionInput;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn parse_input(input_json: &str) -> NapiResult<AttributionInput> {
    serde_json::from_str(input_json).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Attribution
// ---------------------------------------------------------------------------

#[napi]
pub fn attribute(input_json: String) -> NapiResult<String> {
    let input = parse_input(&input_json)?;
    let output = brinson_core::attribute(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct WaterfallRequest {
    #[serde(flatten)]
    input: AttributionInput,
    #[serde(default)]
    style: WaterfallStyle,
}

/// Returns the Plotly figure for the attribution table.
#[napi]
pub fn waterfall_chart(input_json: String) -> NapiResult<String> {
    let request: WaterfallRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = brinson_core::attribute(&request.input).map_err(to_napi_error)?;
    let chart = WaterfallChart::from_table(&output.result, &request.style);
    serde_json::to_string(&chart.to_plotly()).map_err(to_napi_error)
}

#[napi]
pub fn export_csv(input_json: String) -> NapiResult<String> {
    let input = parse_input(&input_json)?;
    let output = brinson_core::attribute(&input).map_err(to_napi_error)?;
    table_to_csv_string(&output.result, b',').map_err(to_napi_error)
}
