//! AI suggestion clients
//!
//! The transformer only sees the [`SuggestionClient`] trait. Implementations
//! never return `Err`: connection failures, timeouts and bad payloads all come
//! back as `SuggestionStatus::Error` with a readable message, so the
//! refactoring run keeps going without AI input.

pub mod chat;
pub mod ollama;

use serde::{Deserialize, Serialize};

use crate::config::{AiBackend, AiConfig};
use crate::diagnostics::DiagnosticModel;

pub use chat::ChatCompletionClient;
pub use ollama::OllamaClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionStatus {
    Success,
    Error,
}

/// One rewrite proposed by a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefactoringSuggestion {
    pub original_code: String,
    pub suggested_code: String,
    pub explanation: String,
    /// Clamped to [0, 1]
    pub confidence_score: f64,
    pub performance_impact: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestionResponse {
    pub status: SuggestionStatus,
    pub suggestion_text: String,
    /// Present when the backend returned a structured rewrite
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<RefactoringSuggestion>,
}

impl SuggestionResponse {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            status: SuggestionStatus::Success,
            suggestion_text: text.into(),
            suggestion: None,
        }
    }

    pub fn structured(suggestion: RefactoringSuggestion) -> Self {
        let mut text = suggestion.explanation.clone();
        if !suggestion.performance_impact.is_empty() {
            text.push_str(&format!("\n\nExpected impact: {}", suggestion.performance_impact));
        }
        if !suggestion.suggested_code.is_empty() {
            text.push_str(&format!("\n\n```\n{}\n```", suggestion.suggested_code.trim_end()));
        }
        Self {
            status: SuggestionStatus::Success,
            suggestion_text: text,
            suggestion: Some(suggestion),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            status: SuggestionStatus::Error,
            suggestion_text: text.into(),
            suggestion: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == SuggestionStatus::Success
    }
}

/// What the model is told about the analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SuggestionContext {
    pub inefficiencies: Vec<String>,
    pub bottlenecks: Vec<String>,
    pub hotspots: Vec<String>,
}

impl SuggestionContext {
    pub fn from_model(model: &DiagnosticModel) -> Self {
        Self {
            inefficiencies: model.inefficiencies().to_vec(),
            bottlenecks: model.bottlenecks().to_vec(),
            hotspots: model.performance_hotspots().to_vec(),
        }
    }

    /// Counts first, then the findings themselves
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Inefficiencies: {}\nBottlenecks: {}\nHotspots: {}\n",
            self.inefficiencies.len(),
            self.bottlenecks.len(),
            self.hotspots.len()
        );
        for (title, items) in [
            ("Inefficiencies", &self.inefficiencies),
            ("Bottlenecks", &self.bottlenecks),
            ("Hotspots", &self.hotspots),
        ] {
            if items.is_empty() {
                continue;
            }
            out.push_str(&format!("\n{title}:\n"));
            for item in items {
                out.push_str(&format!("- {item}\n"));
            }
        }
        out
    }
}

pub trait SuggestionClient: Send + Sync {
    fn name(&self) -> &str;

    fn suggest(&self, source: &str, context: &SuggestionContext) -> SuggestionResponse;
}

/// Build the configured client, `None` when AI suggestions are off
pub fn client_from_config(config: &AiConfig) -> anyhow::Result<Option<Box<dyn SuggestionClient>>> {
    let client: Box<dyn SuggestionClient> = match config.backend {
        AiBackend::None => return Ok(None),
        AiBackend::Ollama => Box::new(OllamaClient::new(config)?),
        AiBackend::Chat => Box::new(ChatCompletionClient::new(config)?),
    };
    Ok(Some(client))
}
