mod commands;
mod config;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::attribution::{AttributeArgs, ExportArgs, WaterfallArgs};
use commands::narrative::SummarizeArgs;

/// Brinson-Hood-Beebower performance attribution
#[derive(Parser)]
#[command(
    name = "brinson",
    version,
    about = "Brinson-Hood-Beebower performance attribution",
    long_about = "Decompose a portfolio's active return against its benchmark into \
                  allocation, selection and interaction effects per segment. Reads \
                  delimited tables or JSON, exports enriched reports, draws waterfall \
                  charts and requests narrative summaries."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Path to a TOML config file (defaults to ./brinson.toml when present)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log progress to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute per-segment allocation, selection and interaction effects
    Attribute(AttributeArgs),
    /// Build a waterfall chart of per-segment total effects
    Waterfall(WaterfallArgs),
    /// Write the enriched attribution table to a delimited file
    Export(ExportArgs),
    /// Request a narrative summary of the attribution table
    Summarize(SummarizeArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "info" } else { "warn" }));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Commands::Version = cli.command {
        println!("brinson {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let config = match config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Attribute(args) => commands::attribution::run_attribute(args, &config),
        Commands::Waterfall(args) => commands::attribution::run_waterfall(args, &config),
        Commands::Export(args) => commands::attribution::run_export(args, &config),
        Commands::Summarize(args) => commands::narrative::run_summarize(args, &config),
        Commands::Version => unreachable!("handled above"),
    };

    match result {
        // Already rendered by the command itself
        Ok(serde_json::Value::Null) => process::exit(0),
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
