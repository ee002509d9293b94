pub mod attribution;
pub mod narrative;

use clap::Args;

use brinson_core::attribution::ingest::IngestOptions;
use brinson_core::{AttributionInput, AttributionScheme, ReturnUnit};

use crate::config::{self, InputConfig};
use crate::input::{self, file::TableFormat};

/// Table source shared by every attribution command.
#[derive(Args)]
pub struct TableArgs {
    /// Path to a delimited table (CSV, TSV, ...) or a JSON attribution input
    #[arg(long)]
    pub input: Option<String>,

    /// Field delimiter for delimited input
    #[arg(long)]
    pub delimiter: Option<char>,

    /// Unit of the return columns (fraction or percent)
    #[arg(long)]
    pub unit: Option<ReturnUnit>,

    /// Attribution scheme (three-factor or two-factor)
    #[arg(long)]
    pub scheme: Option<AttributionScheme>,

    /// Portfolio label
    #[arg(long)]
    pub portfolio_name: Option<String>,

    /// Benchmark label
    #[arg(long)]
    pub benchmark_name: Option<String>,
}

/// Build the attribution input from `--input`, or from JSON piped on stdin.
///
/// Delimited tables take their labels, unit and scheme from the config file;
/// JSON documents carry their own. Flags override both.
pub fn load_input(
    args: &TableArgs,
    defaults: &InputConfig,
) -> Result<AttributionInput, Box<dyn std::error::Error>> {
    let mut attribution_input: AttributionInput = match args.input.as_deref() {
        Some(path) if TableFormat::detect(path) == TableFormat::Json => {
            input::file::read_json(path)?
        }
        Some(path) => {
            let delimiter = config::delimiter_byte(args.delimiter.unwrap_or(defaults.delimiter))?;
            let segments = input::file::read_delimited(path, &IngestOptions { delimiter })?;
            AttributionInput {
                portfolio_name: defaults.portfolio_name.clone(),
                benchmark_name: defaults.benchmark_name.clone(),
                return_unit: defaults.unit,
                scheme: defaults.scheme,
                segments,
            }
        }
        None => match input::stdin::read_stdin_input()? {
            Some(piped) => piped,
            None => return Err("--input <table.csv|input.json> or stdin JSON required".into()),
        },
    };

    if let Some(unit) = args.unit {
        attribution_input.return_unit = unit;
    }
    if let Some(scheme) = args.scheme {
        attribution_input.scheme = scheme;
    }
    if let Some(ref name) = args.portfolio_name {
        attribution_input.portfolio_name = name.clone();
    }
    if let Some(ref name) = args.benchmark_name {
        attribution_input.benchmark_name = name.clone();
    }
    Ok(attribution_input)
}
