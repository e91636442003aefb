use std::time::Duration;

use anyhow::Result;
use serde_json::{json, Value};
use tracing::debug;

use super::{SuggestionClient, SuggestionContext, SuggestionResponse};
use crate::config::AiConfig;

/// Ollama `/api/generate`, non-streaming
pub struct OllamaClient {
    http: reqwest::blocking::Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(config: &AiConfig) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    fn api_url(&self) -> String {
        // accept both the server root and the full generate URL
        if self.base_url.ends_with("/api/generate") {
            self.base_url.clone()
        } else {
            format!("{}/api/generate", self.base_url)
        }
    }

    fn build_prompt(code: &str, context: &SuggestionContext) -> String {
        format!(
            "Analyze the following HECS (Hierarchical Entity Component System) code and suggest improvements.\n\n\
             Code:\n{code}\n\n\
             Analysis summary:\n{}\n\
             Please provide:\n\
             1. Specific improvement suggestions\n\
             2. Code quality recommendations\n\
             3. Performance optimizations\n\
             4. Best practices violations\n\n\
             Respond in a clear, structured format.\n",
            context.summary()
        )
    }
}

impl SuggestionClient for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    fn suggest(&self, source: &str, context: &SuggestionContext) -> SuggestionResponse {
        let payload = json!({
            "model": self.model,
            "prompt": Self::build_prompt(source, context),
            "stream": false,
        });

        let url = self.api_url();
        debug!(%url, model = %self.model, "requesting ollama suggestion");

        let response = match self.http.post(&url).json(&payload).send() {
            Ok(r) => r,
            Err(e) if e.is_connect() => {
                return SuggestionResponse::error(format!(
                    "Cannot connect to Ollama at {}, make sure it is running",
                    self.base_url
                ))
            }
            Err(e) if e.is_timeout() => {
                return SuggestionResponse::error("Request timed out, the model might be loading")
            }
            Err(e) => return SuggestionResponse::error(format!("Ollama request failed: {e}")),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return SuggestionResponse::error(format!("API Error: {status} - {body}"));
        }

        match response.json::<Value>() {
            Ok(body) => match body.get("response").and_then(Value::as_str) {
                Some(text) => SuggestionResponse::success(text),
                None => SuggestionResponse::error("No response received"),
            },
            Err(e) => SuggestionResponse::error(format!("Invalid Ollama response: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suggest::SuggestionStatus;

    #[test]
    fn test_api_url() {
        let mut config = AiConfig::default();
        let client = OllamaClient::new(&config).unwrap();
        assert_eq!(client.api_url(), "http://localhost:11434/api/generate");

        config.endpoint = "http://gpu-box:11434/api/generate/".to_string();
        let client = OllamaClient::new(&config).unwrap();
        assert_eq!(client.api_url(), "http://gpu-box:11434/api/generate");
    }

    #[test]
    fn test_prompt_includes_code_and_summary() {
        let ctx = SuggestionContext {
            bottlenecks: vec!["Line 3: O(n²) complexity from nested loops".to_string()],
            ..Default::default()
        };
        let prompt = OllamaClient::build_prompt("for e in world: pass", &ctx);
        assert!(prompt.contains("for e in world: pass"));
        assert!(prompt.contains("Bottlenecks: 1"));
        assert!(prompt.contains("- Line 3: O(n²) complexity from nested loops"));
    }

    #[test]
    fn test_unreachable_server_degrades_to_error() {
        let config = AiConfig {
            endpoint: "http://127.0.0.1:1".to_string(),
            timeout_secs: 2,
            ..AiConfig::default()
        };
        let client = OllamaClient::new(&config).unwrap();
        let response = client.suggest("x = 1", &SuggestionContext::default());
        assert_eq!(response.status, SuggestionStatus::Error);
        assert!(!response.suggestion_text.is_empty());
    }
}
