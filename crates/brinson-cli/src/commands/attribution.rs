use clap::Args;
use serde_json::{json, Value};
use std::fs::{self, File};
use std::io::BufWriter;
use tracing::{info, warn};

use brinson_core::attribution::export;
use brinson_core::attribution::waterfall::WaterfallChart;
use brinson_core::{attribute, AttributionTable, ComputationOutput};

use super::{load_input, TableArgs};
use crate::config::{self, CliConfig};
use crate::output;

/// Arguments for Brinson attribution
#[derive(Args)]
pub struct AttributeArgs {
    #[command(flatten)]
    pub table: TableArgs,
}

/// Arguments for exporting the enriched table
#[derive(Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub table: TableArgs,

    /// Destination file for the report
    #[arg(long)]
    pub out: String,

    /// Field delimiter of the written report (defaults to the input delimiter)
    #[arg(long)]
    pub out_delimiter: Option<char>,
}

/// Arguments for the waterfall chart
#[derive(Args)]
pub struct WaterfallArgs {
    #[command(flatten)]
    pub table: TableArgs,

    /// Write a Plotly figure (JSON) to this path
    #[arg(long)]
    pub plotly: Option<String>,

    /// Draw the chart in the terminal instead of printing its data
    #[arg(long)]
    pub text: bool,

    /// Plot width in columns for --text
    #[arg(long, default_value_t = 60)]
    pub width: usize,
}

fn run_engine(
    table: &TableArgs,
    config: &CliConfig,
) -> Result<ComputationOutput<AttributionTable>, Box<dyn std::error::Error>> {
    let input = load_input(table, &config.input)?;
    let output = attribute(&input)?;
    info!(
        segments = output.result.len(),
        active_return = output.result.totals.active_return,
        "attribution computed"
    );
    for w in &output.warnings {
        warn!("{}", w);
    }
    Ok(output)
}

pub fn run_attribute(
    args: AttributeArgs,
    config: &CliConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let output = run_engine(&args.table, config)?;
    Ok(serde_json::to_value(output)?)
}

pub fn run_export(args: ExportArgs, config: &CliConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let output = run_engine(&args.table, config)?;
    let delimiter = config::delimiter_byte(
        args.out_delimiter
            .or(args.table.delimiter)
            .unwrap_or(config.input.delimiter),
    )?;

    let file = File::create(&args.out)
        .map_err(|e| format!("Failed to create '{}': {}", args.out, e))?;
    export::write_table(BufWriter::new(file), &output.result, delimiter)?;

    Ok(json!({
        "path": args.out,
        "rows": output.result.len(),
        "totals": output.result.totals,
        "warnings": output.warnings,
    }))
}

pub fn run_waterfall(
    args: WaterfallArgs,
    config: &CliConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let output = run_engine(&args.table, config)?;
    let chart = WaterfallChart::from_table(&output.result, &config.chart);

    if let Some(ref path) = args.plotly {
        fs::write(path, serde_json::to_string_pretty(&chart.to_plotly())?)
            .map_err(|e| format!("Failed to write '{}': {}", path, e))?;
        info!(path = %path, "wrote Plotly figure");
    }

    if args.text {
        output::chart::print_waterfall(&chart, args.width);
        return Ok(Value::Null);
    }

    if let Some(path) = args.plotly {
        return Ok(json!({
            "path": path,
            "bars": chart.bars.len(),
            "net": chart.net,
        }));
    }

    Ok(serde_json::to_value(&chart)?)
}
