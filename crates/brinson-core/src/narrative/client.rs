use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::AttributionError;
use crate::narrative::prompt::build_prompt;
use crate::narrative::{ApiCredential, Narrative, NarrativeConfig, NarrativeProvider};
use crate::BrinsonResult;

/// Anthropic Messages API client.
pub struct AnthropicClient {
    config: NarrativeConfig,
    http: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicClient {
    pub fn new(config: NarrativeConfig) -> BrinsonResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &NarrativeConfig {
        &self.config
    }
}

/// Concatenate the text blocks of a Messages API reply.
fn reply_text(response: MessagesResponse) -> BrinsonResult<String> {
    let text: Vec<String> = response
        .content
        .into_iter()
        .filter(|b| b.kind == "text")
        .filter_map(|b| b.text)
        .collect();
    if text.is_empty() {
        return Err(AttributionError::Narrative(
            "response contained no text content".into(),
        ));
    }
    Ok(text.join("\n"))
}

#[async_trait]
impl NarrativeProvider for AnthropicClient {
    async fn summarize(
        &self,
        credential: &ApiCredential,
        table_csv: &str,
    ) -> BrinsonResult<Narrative> {
        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            messages: vec![Message {
                role: "user",
                content: build_prompt(table_csv),
            }],
        };

        debug!(model = %self.config.model, endpoint = %self.config.endpoint, "requesting narrative");
        let response = self
            .http
            .post(&self.config.endpoint)
            .header("x-api-key", credential.expose())
            .header("anthropic-version", &self.config.api_version)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(%status, "narrative request rejected");
            return Err(AttributionError::Narrative(format!(
                "API error {status}: {detail}"
            )));
        }

        let parsed: MessagesResponse = response.json().await?;
        Ok(Narrative::parse(&reply_text(parsed)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let body = MessagesRequest {
            model: "m",
            max_tokens: 10,
            messages: vec![Message {
                role: "user",
                content: "hi".into(),
            }],
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["messages"][0]["role"], "user");
        assert_eq!(v["max_tokens"], 10);
    }

    #[test]
    fn test_reply_text_skips_non_text_blocks() {
        let resp: MessagesResponse = serde_json::from_str(
            r#"{"content": [{"type": "thinking", "thinking": "..."}, {"type": "text", "text": "{\"insights\": \"ok\"}"}]}"#,
        )
        .unwrap();
        assert_eq!(reply_text(resp).unwrap(), r#"{"insights": "ok"}"#);
    }

    #[test]
    fn test_reply_without_text_is_error() {
        let resp: MessagesResponse = serde_json::from_str(r#"{"content": []}"#).unwrap();
        assert!(matches!(
            reply_text(resp),
            Err(AttributionError::Narrative(_))
        ));
    }

    #[test]
    fn test_client_builds_from_default_config() {
        let client = AnthropicClient::new(NarrativeConfig::default()).unwrap();
        assert_eq!(client.config().max_tokens, 1500);
    }
}
