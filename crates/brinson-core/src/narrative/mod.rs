//! Narrative summaries of an attribution table from a large language model.
//!
//! The summarizer receives its credential and the serialised table as plain
//! parameters. Results are memoised by [`NarrativeCache`], keyed on a
//! content fingerprint of the table.

pub mod cache;
pub mod client;
pub mod fingerprint;
pub mod prompt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::AttributionError;
use crate::BrinsonResult;

pub use cache::NarrativeCache;
pub use client::AnthropicClient;
pub use fingerprint::TableFingerprint;

/// Secret key for the summarization service. Never printed.
#[derive(Clone)]
pub struct ApiCredential(String);

impl ApiCredential {
    pub fn new(key: impl Into<String>) -> BrinsonResult<Self> {
        let key = key.into().trim().to_string();
        if key.is_empty() {
            return Err(AttributionError::validation(
                None,
                "api_key",
                "API key must not be empty",
            ));
        }
        Ok(Self(key))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiCredential(****)")
    }
}

/// Connection settings for the summarization service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrativeConfig {
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    pub api_version: String,
    pub timeout_secs: u64,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.anthropic.com/v1/messages".into(),
            model: "claude-sonnet-4-5".into(),
            max_tokens: 1500,
            api_version: "2023-06-01".into(),
            timeout_secs: 60,
        }
    }
}

/// Free-text insights and headline risks for one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Narrative {
    pub insights: String,
    pub risks: Vec<String>,
    /// Unmodified model reply
    pub raw: String,
}

impl Narrative {
    /// Interpret a model reply.
    ///
    /// The first `{ ... }` span is read as `{"insights": .., "risks": ..}`;
    /// either field may be a string or a list of strings. Replies without a
    /// usable JSON object become plain insights with no risks.
    pub fn parse(reply: &str) -> Self {
        let structured = match (reply.find('{'), reply.rfind('}')) {
            (Some(start), Some(end)) if start < end => {
                serde_json::from_str::<Value>(&reply[start..=end]).ok()
            }
            _ => None,
        };

        if let Some(Value::Object(map)) = structured {
            let insights = map.get("insights").map(join_text).unwrap_or_default();
            let risks = map.get("risks").map(list_text).unwrap_or_default();
            if !insights.is_empty() || !risks.is_empty() {
                return Self {
                    insights,
                    risks,
                    raw: reply.to_string(),
                };
            }
        }

        Self {
            insights: reply.trim().to_string(),
            risks: Vec::new(),
            raw: reply.to_string(),
        }
    }
}

fn join_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .map(join_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn list_text(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(join_text)
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => s
            .lines()
            .map(|l| l.trim().trim_start_matches(['-', '*', '•']).trim().to_string())
            .filter(|l| !l.is_empty())
            .collect(),
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}

/// A service able to turn a serialised attribution table into a narrative.
#[async_trait]
pub trait NarrativeProvider: Send + Sync {
    async fn summarize(
        &self,
        credential: &ApiCredential,
        table_csv: &str,
    ) -> BrinsonResult<Narrative>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_credential_debug_is_redacted() {
        let key = ApiCredential::new("sk-secret-123").unwrap();
        assert_eq!(format!("{key:?}"), "ApiCredential(****)");
        assert_eq!(key.expose(), "sk-secret-123");
    }

    #[test]
    fn test_blank_credential_rejected() {
        assert!(ApiCredential::new("   ").is_err());
    }

    #[test]
    fn test_parse_fenced_json_reply() {
        let reply = "Here you go:\n```json\n{\"insights\": \"Tech overweight drove returns.\", \
                     \"risks\": [\"Concentration\", \"Rate sensitivity\", \"Energy drag\"]}\n```";
        let n = Narrative::parse(reply);
        assert_eq!(n.insights, "Tech overweight drove returns.");
        assert_eq!(n.risks.len(), 3);
        assert_eq!(n.raw, reply);
    }

    #[test]
    fn test_parse_bullet_strings() {
        let n = Narrative::parse(
            r#"{"insights": ["- Allocation added 20bp", "- Selection was flat"], "risks": "- Concentration\n- Liquidity"}"#,
        );
        assert_eq!(n.insights, "- Allocation added 20bp\n- Selection was flat");
        assert_eq!(n.risks, vec!["Concentration", "Liquidity"]);
    }

    #[test]
    fn test_parse_plain_text_fallback() {
        let n = Narrative::parse("  Allocation drove most of the excess return.  ");
        assert_eq!(n.insights, "Allocation drove most of the excess return.");
        assert!(n.risks.is_empty());
    }

    #[test]
    fn test_config_defaults_fill_missing_fields() {
        let cfg: NarrativeConfig = serde_json::from_str(r#"{"max_tokens": 800}"#).unwrap();
        assert_eq!(cfg.max_tokens, 800);
        assert_eq!(cfg.model, NarrativeConfig::default().model);
    }
}
