use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fraction of total portfolio value (0.25 = 25%).
pub type Weight = f64;

/// Period return, in the unit declared by [`ReturnUnit`].
pub type Return = f64;

/// Unit in which a table's returns are expressed. Weights are always fractions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnUnit {
    /// 0.05 = 5%
    #[default]
    #[serde(alias = "decimal")]
    Fraction,
    /// 5.0 = 5%
    #[serde(alias = "pct", alias = "%")]
    Percent,
}

impl fmt::Display for ReturnUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnUnit::Fraction => write!(f, "fraction"),
            ReturnUnit::Percent => write!(f, "percent"),
        }
    }
}

impl FromStr for ReturnUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fraction" | "decimal" => Ok(ReturnUnit::Fraction),
            "percent" | "pct" | "%" => Ok(ReturnUnit::Percent),
            other => Err(format!(
                "unknown return unit '{other}' (expected 'fraction' or 'percent')"
            )),
        }
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "ieee754_binary64".to_string(),
        },
    }
}
