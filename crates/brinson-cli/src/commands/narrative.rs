use clap::Args;
use serde_json::{json, Value};

use brinson_core::attribute;
use brinson_core::narrative::{AnthropicClient, ApiCredential, NarrativeCache, TableFingerprint};

use super::{load_input, TableArgs};
use crate::config::CliConfig;

/// Arguments for the narrative summary
#[derive(Args)]
pub struct SummarizeArgs {
    #[command(flatten)]
    pub table: TableArgs,

    /// API key for the summarization service
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model override
    #[arg(long)]
    pub model: Option<String>,

    /// Maximum tokens in the reply
    #[arg(long)]
    pub max_tokens: Option<u32>,
}

pub fn run_summarize(
    args: SummarizeArgs,
    config: &CliConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let key = args
        .api_key
        .as_deref()
        .ok_or("--api-key or ANTHROPIC_API_KEY required for summarize")?;
    let credential = ApiCredential::new(key)?;

    let input = load_input(&args.table, &config.input)?;
    let output = attribute(&input)?;

    let mut narrative_config = config.narrative.clone();
    if let Some(model) = args.model {
        narrative_config.model = model;
    }
    if let Some(max_tokens) = args.max_tokens {
        narrative_config.max_tokens = max_tokens;
    }
    let client = AnthropicClient::new(narrative_config)?;
    let cache = NarrativeCache::new();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let narrative =
        runtime.block_on(cache.get_or_summarize(&output.result, &credential, &client))?;

    Ok(json!({
        "fingerprint": TableFingerprint::of_table(&output.result).to_string(),
        "insights": narrative.insights,
        "risks": narrative.risks,
        "totals": output.result.totals,
        "warnings": output.warnings,
    }))
}
