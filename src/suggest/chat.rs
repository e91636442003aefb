use std::time::Duration;

use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use tracing::debug;

use super::{RefactoringSuggestion, SuggestionClient, SuggestionContext, SuggestionResponse};
use crate::config::AiConfig;

const SYSTEM_PROMPT: &str = "You are an expert HECS architecture optimizer.";
const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// OpenAI-style chat completions endpoint asked for a JSON rewrite
pub struct ChatCompletionClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl ChatCompletionClient {
    pub fn new(config: &AiConfig) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn api_url(&self) -> String {
        // a server root gets the standard path, anything longer is used as-is
        match reqwest::Url::parse(&self.endpoint) {
            Ok(url) if url.path() == "/" => {
                format!("{}{CHAT_COMPLETIONS_PATH}", self.endpoint.trim_end_matches('/'))
            }
            _ => self.endpoint.clone(),
        }
    }

    fn build_prompt(code: &str, context: &SuggestionContext) -> String {
        format!(
            "Analyze the following code snippet and provide refactoring suggestions.\n\n\
             Code:\n```\n{code}\n```\n\n\
             Context:\n{}\n\
             Please provide:\n\
             1. Optimized version of the code\n\
             2. Detailed explanation of improvements\n\
             3. Expected performance impact\n\
             4. Confidence score (0-1)\n\n\
             Focus on entity-component relationships, system performance, memory usage and maintainability.\n\n\
             Respond in JSON format with keys: optimized_code, explanation, performance_impact, confidence_score\n",
            context.summary()
        )
    }

    fn request(&self, prompt: &str) -> Result<Value> {
        let payload = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
            "temperature": 0.3,
            "max_tokens": 2000,
        });

        let mut request = self.http.post(self.api_url()).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send()?.error_for_status()?;
        Ok(response.json()?)
    }
}

impl SuggestionClient for ChatCompletionClient {
    fn name(&self) -> &str {
        "chat-completions"
    }

    fn suggest(&self, source: &str, context: &SuggestionContext) -> SuggestionResponse {
        debug!(url = %self.api_url(), model = %self.model, "requesting chat suggestion");

        let body = match self.request(&Self::build_prompt(source, context)) {
            Ok(body) => body,
            Err(e) => return SuggestionResponse::error(format!("Chat API call failed: {e}")),
        };

        match parse_chat_response(&body, source) {
            Ok(suggestion) => SuggestionResponse::structured(suggestion),
            Err(e) => SuggestionResponse::error(format!("Failed to parse chat response: {e}")),
        }
    }
}

/// Pull the JSON object out of `choices[0].message.content`
pub fn parse_chat_response(body: &Value, original_code: &str) -> Result<RefactoringSuggestion> {
    let content = body
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("missing choices[0].message.content"))?;

    let start = content.find('{').ok_or_else(|| anyhow!("no JSON object in content"))?;
    let end = content.rfind('}').ok_or_else(|| anyhow!("no JSON object in content"))?;
    if end < start {
        return Err(anyhow!("no JSON object in content"));
    }
    let parsed: Value = serde_json::from_str(&content[start..=end])?;

    let text = |key: &str| {
        parsed
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    // models send the score as a number or as a string
    let confidence = match parsed.get("confidence_score") {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.5),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.5),
        _ => 0.5,
    };

    Ok(RefactoringSuggestion {
        original_code: original_code.to_string(),
        suggested_code: text("optimized_code"),
        explanation: text("explanation"),
        confidence_score: confidence.clamp(0.0, 1.0),
        performance_impact: text("performance_impact"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(content: &str) -> Value {
        json!({ "choices": [ { "message": { "role": "assistant", "content": content } } ] })
    }

    #[test]
    fn test_api_url() {
        let mut config = AiConfig {
            backend: crate::config::AiBackend::Chat,
            ..AiConfig::default()
        };
        let client = ChatCompletionClient::new(&config).unwrap();
        assert_eq!(client.api_url(), "http://localhost:11434/v1/chat/completions");

        config.endpoint = "https://llm.internal:8000/".to_string();
        let client = ChatCompletionClient::new(&config).unwrap();
        assert_eq!(client.api_url(), "https://llm.internal:8000/v1/chat/completions");

        config.endpoint = "https://gateway.local/openai/v1/chat/completions".to_string();
        let client = ChatCompletionClient::new(&config).unwrap();
        assert_eq!(client.api_url(), "https://gateway.local/openai/v1/chat/completions");
    }

    #[test]
    fn test_parse_json_wrapped_in_prose() {
        let content = r#"Sure! Here it is:
{"optimized_code": "for i, _ in enumerate(xs): pass", "explanation": "avoid indexing", "performance_impact": "minor", "confidence_score": 0.8}
Hope this helps."#;
        let suggestion = parse_chat_response(&body(content), "for i in range(len(xs)): pass").unwrap();
        assert_eq!(suggestion.suggested_code, "for i, _ in enumerate(xs): pass");
        assert_eq!(suggestion.explanation, "avoid indexing");
        assert_eq!(suggestion.performance_impact, "minor");
        assert_eq!(suggestion.confidence_score, 0.8);
        assert_eq!(suggestion.original_code, "for i in range(len(xs)): pass");
    }

    #[test]
    fn test_confidence_defaults_and_clamps() {
        let s = parse_chat_response(&body(r#"{"explanation": "x"}"#), "").unwrap();
        assert_eq!(s.confidence_score, 0.5);

        let s = parse_chat_response(&body(r#"{"confidence_score": "7"}"#), "").unwrap();
        assert_eq!(s.confidence_score, 1.0);

        let s = parse_chat_response(&body(r#"{"confidence_score": -2}"#), "").unwrap();
        assert_eq!(s.confidence_score, 0.0);
    }

    #[test]
    fn test_parse_failures() {
        assert!(parse_chat_response(&json!({}), "").is_err());
        assert!(parse_chat_response(&body("no json here"), "").is_err());
        assert!(parse_chat_response(&body("} backwards {"), "").is_err());
        assert!(parse_chat_response(&body("{not json}"), "").is_err());
    }

    #[test]
    fn test_unreachable_endpoint_degrades_to_error() {
        let config = AiConfig {
            endpoint: "http://127.0.0.1:1/v1/chat/completions".to_string(),
            timeout_secs: 2,
            ..AiConfig::default()
        };
        let client = ChatCompletionClient::new(&config).unwrap();
        let response = client.suggest("x = 1", &SuggestionContext::default());
        assert!(!response.is_success());
        assert!(response.suggestion_text.starts_with("Chat API call failed"));
    }
}
