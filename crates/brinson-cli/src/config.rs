use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

use brinson_core::attribution::waterfall::WaterfallStyle;
use brinson_core::narrative::NarrativeConfig;
use brinson_core::{AttributionScheme, ReturnUnit};

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "brinson.toml";

/// Settings loaded from TOML. Command-line flags override every field.
///
/// The API key is deliberately not a config field; it comes from
/// `--api-key` or `ANTHROPIC_API_KEY`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    pub input: InputConfig,
    pub chart: WaterfallStyle,
    pub narrative: NarrativeConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputConfig {
    pub delimiter: char,
    pub unit: ReturnUnit,
    pub scheme: AttributionScheme,
    pub portfolio_name: String,
    pub benchmark_name: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            unit: ReturnUnit::default(),
            scheme: AttributionScheme::default(),
            portfolio_name: "Fund".into(),
            benchmark_name: "Benchmark".into(),
        }
    }
}

/// Load configuration.
///
/// An explicit path must exist. Without one, `brinson.toml` in the working
/// directory is used when present, otherwise defaults apply.
pub fn load(path: Option<&str>) -> Result<CliConfig, Box<dyn std::error::Error>> {
    let path = match path {
        Some(p) => Path::new(p).to_path_buf(),
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => DEFAULT_CONFIG_FILE.into(),
        None => return Ok(CliConfig::default()),
    };

    let contents = fs::read_to_string(&path)
        .map_err(|e| format!("Failed to read config '{}': {}", path.display(), e))?;
    let config = parse(&contents)
        .map_err(|e| format!("Invalid config '{}': {}", path.display(), e))?;
    debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}

pub fn parse(contents: &str) -> Result<CliConfig, toml::de::Error> {
    toml::from_str(contents)
}

/// Convert a delimiter character into the single byte the CSV reader needs.
pub fn delimiter_byte(delimiter: char) -> Result<u8, Box<dyn std::error::Error>> {
    if delimiter.is_ascii() {
        Ok(delimiter as u8)
    } else {
        Err(format!("Delimiter must be a single ASCII character, got '{delimiter}'").into())
    }
}
