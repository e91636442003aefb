//! Process-wide configuration and capability set
//!
//! Built once in `main` (or by the caller of the library) and passed by
//! reference into every component. All fields default, so a YAML file only
//! needs to name what it overrides:
//!
//! ```yaml
//! analysis:
//!   long_function_threshold: 30
//! benchmark:
//!   interpreter: python3
//!   timeout_secs: 60
//! ai:
//!   backend: ollama
//!   model: codellama
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub analysis: AnalysisConfig,
    pub benchmark: BenchmarkConfig,
    pub ai: AiConfig,
}

impl Config {
    /// Load a YAML config file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Functions with more direct statements than this are flagged
    pub long_function_threshold: usize,
    /// Look-ahead window of the line scanner's nested-loop heuristic
    pub lookahead_window: usize,
    /// Inputs at least this long are always treated as inline source
    pub path_length_bound: usize,
    /// Set to false to force the line scanner even for Python
    pub syntax_tree: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            long_function_threshold: 20,
            lookahead_window: 10,
            path_length_bound: 500,
            syntax_tree: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Program used to execute a source variant: `<interpreter> <path> <test_case>`
    pub interpreter: String,
    pub timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub weights: ScoreWeights,
}

impl BenchmarkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            interpreter: "python".to_string(),
            timeout_secs: 30,
            poll_interval_ms: 10,
            weights: ScoreWeights::default(),
        }
    }
}

/// Weights of the overall benchmark score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub time: f64,
    pub memory: f64,
    pub cpu: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            time: 0.4,
            memory: 0.3,
            cpu: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AiBackend {
    #[default]
    None,
    /// Ollama `/api/generate`
    Ollama,
    /// OpenAI-style chat completions endpoint
    Chat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub backend: AiBackend,
    /// Server root or full request URL; a bare root gets the backend's
    /// default path (`/api/generate` or `/v1/chat/completions`)
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            backend: AiBackend::None,
            endpoint: "http://localhost:11434".to_string(),
            model: "codellama".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

// ============================================================================
// Capability set
// ============================================================================

/// Optional features, resolved once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    /// tree-sitter Python parsing
    pub syntax_tree: bool,
    /// An AI suggestion backend is configured
    pub ai_suggestions: bool,
    /// No dependency-graph algorithm exists yet; always false
    pub dependency_graph: bool,
}

impl Capabilities {
    pub fn resolve(config: &Config) -> Self {
        let syntax_tree = config.analysis.syntax_tree && python_grammar_loads();
        if config.analysis.syntax_tree && !syntax_tree {
            warn!("tree-sitter Python grammar failed to load, falling back to line scanner");
        }
        let caps = Self {
            syntax_tree,
            ai_suggestions: config.ai.backend != AiBackend::None,
            dependency_graph: false,
        };
        debug!(?caps, "capabilities resolved");
        caps
    }

    /// Everything off; used by callers that want the line scanner only
    pub fn minimal() -> Self {
        Self {
            syntax_tree: false,
            ai_suggestions: false,
            dependency_graph: false,
        }
    }
}

fn python_grammar_loads() -> bool {
    let mut parser = tree_sitter::Parser::new();
    parser.set_language(&tree_sitter_python::language()).is_ok()
}
