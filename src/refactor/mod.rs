//! Rule-based transformer
//!
//! Output = header block + original lines, where a line matching a rewrite
//! rule gets an advisory comment directly above it (and a literal rewrite if
//! it is a loop header). A line continued from the one above with `\` gets
//! its advisory above the first line of the statement. Nothing else moves.
//! The optional AI pass runs after the rule pass and can only add
//! suggestions, never fail the run.

pub mod rules;

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::ast_engine::{AnalyzeError, PatternDetector};
use crate::diagnostics::DiagnosticModel;
use crate::scanner::Language;
use crate::suggest::{RefactoringSuggestion, SuggestionClient, SuggestionContext};
use rules::{default_rules, RewriteRule};

pub const HEADER_TITLE: &str = "HECS Refactored Code";

/// Placeholder until a predictive model exists; reports what the rule pass did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PerformancePrediction {
    pub status: String,
    pub advisories: usize,
    pub rewritten_lines: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefactorOutcome {
    pub original_code: String,
    pub refactored_code: String,
    pub applied_rules: Vec<String>,
    pub ai_suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub structured_suggestions: Vec<RefactoringSuggestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_error: Option<String>,
    pub performance_predictions: PerformancePrediction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct Refactorer<'a> {
    detector: &'a PatternDetector<'a>,
    rules: Vec<Box<dyn RewriteRule>>,
    client: Option<Box<dyn SuggestionClient>>,
}

impl<'a> Refactorer<'a> {
    pub fn new(detector: &'a PatternDetector<'a>) -> Self {
        Self {
            detector,
            rules: default_rules(),
            client: None,
        }
    }

    pub fn with_client(mut self, client: Option<Box<dyn SuggestionClient>>) -> Self {
        self.client = client;
        self
    }

    /// Refactor a file on disk
    pub fn refactor_file(
        &self,
        path: &Path,
        analysis: &DiagnosticModel,
        language: &Language,
    ) -> Result<RefactorOutcome, AnalyzeError> {
        let code = std::fs::read_to_string(path).map_err(|source| AnalyzeError::Input {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.refactor_code(&code, analysis, language))
    }

    pub fn refactor_code(
        &self,
        code: &str,
        analysis: &DiagnosticModel,
        language: &Language,
    ) -> RefactorOutcome {
        if let Some(err) = self.detector.syntax_error(code, language) {
            warn!("source does not parse, leaving it unchanged: {err}");
            return unchanged(code, err);
        }

        let pass = self.apply_rules(code, analysis, language);
        if let Some(err) = self.detector.syntax_error(&pass.code, language) {
            warn!("rule pass output does not parse, leaving the source unchanged: {err}");
            return unchanged(code, format!("rule pass output does not parse: {err}"));
        }
        info!(
            advisories = pass.advisories,
            rewritten = pass.rewritten_lines,
            "rule pass complete"
        );

        let mut outcome = RefactorOutcome {
            original_code: code.to_string(),
            refactored_code: pass.code,
            applied_rules: pass.applied_rules,
            ai_suggestions: Vec::new(),
            structured_suggestions: Vec::new(),
            ai_error: None,
            performance_predictions: PerformancePrediction {
                status: if pass.rewritten_lines + pass.advisories > 0 {
                    "Rewrites applied, benchmark to confirm".to_string()
                } else {
                    "Analysis completed".to_string()
                },
                advisories: pass.advisories,
                rewritten_lines: pass.rewritten_lines,
            },
            error: None,
        };

        if let Some(client) = &self.client {
            let context = SuggestionContext::from_model(analysis);
            debug!(client = client.name(), "requesting AI suggestions");
            let response = client.suggest(code, &context);
            if response.is_success() {
                outcome.ai_suggestions.push(response.suggestion_text);
                outcome.structured_suggestions.extend(response.suggestion);
            } else {
                warn!("AI suggestions unavailable: {}", response.suggestion_text);
                outcome.ai_error = Some(response.suggestion_text);
            }
        }

        outcome
    }

    /// Deterministic pass: header block plus per-line rules
    pub fn apply_rules(
        &self,
        code: &str,
        analysis: &DiagnosticModel,
        language: &Language,
    ) -> RulePass {
        let prefix = language.comment_prefix();
        let rules: Vec<&dyn RewriteRule> = self
            .rules
            .iter()
            .filter(|r| r.applies_to(language))
            .map(|r| r.as_ref())
            .collect();

        let mut out = header_block(analysis, prefix);
        let mut applied_rules: Vec<String> = Vec::new();
        let mut advisories = 0;
        let mut rewritten_lines = 0;
        let mut previous: Option<&str> = None;

        // Advisories go above the first physical line of a statement
        let mut insert_at = out.len();
        let mut statement_indent = "";
        let mut above_statement: Option<&str> = None;
        let mut advised: Vec<&'static str> = Vec::new();

        for (idx, line) in code.split('\n').enumerate() {
            let trimmed = line.trim_start();
            let is_comment = trimmed.starts_with(prefix);
            let mut emitted = line.to_string();

            let continued = previous
                .map(|p| p.trim_end().ends_with('\\'))
                .unwrap_or(false);
            if !continued {
                insert_at = out.len();
                statement_indent = &line[..line.len() - trimmed.len()];
                above_statement = previous;
                advised.clear();
            }

            if !is_comment {
                if let Some(rule) = rules.iter().find(|r| r.matches(line, language)) {
                    let marker = advisory_marker(prefix, rule.id());
                    let already_advised = advised.contains(&rule.id())
                        || above_statement
                            .map(|p| p.trim_start().starts_with(&marker))
                            .unwrap_or(false);

                    if !already_advised {
                        out.insert(
                            insert_at,
                            format!("{statement_indent}{marker} {}", rule.advisory(idx + 1, language)),
                        );
                        insert_at += 1;
                        advised.push(rule.id());
                        advisories += 1;
                    }

                    if let Some(rewritten) = rule.rewrite(line, language) {
                        emitted = rewritten;
                        rewritten_lines += 1;
                    }

                    if !applied_rules.iter().any(|id| id == rule.id()) {
                        applied_rules.push(rule.id().to_string());
                    }
                }
            }

            out.push(emitted);
            previous = Some(line);
        }

        RulePass {
            code: out.join("\n"),
            applied_rules,
            advisories,
            rewritten_lines,
        }
    }
}

/// Output of the deterministic rule pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulePass {
    pub code: String,
    pub applied_rules: Vec<String>,
    pub advisories: usize,
    pub rewritten_lines: usize,
}

/// Source returned as-is, with the reason
fn unchanged(code: &str, error: String) -> RefactorOutcome {
    RefactorOutcome {
        original_code: code.to_string(),
        refactored_code: code.to_string(),
        applied_rules: Vec::new(),
        ai_suggestions: Vec::new(),
        structured_suggestions: Vec::new(),
        ai_error: None,
        performance_predictions: PerformancePrediction {
            status: "Refactoring skipped".to_string(),
            advisories: 0,
            rewritten_lines: 0,
        },
        error: Some(error),
    }
}

fn advisory_marker(prefix: &str, rule_id: &str) -> String {
    format!("{prefix} hecs-perf[{rule_id}]:")
}

/// Fixed-format summary of the non-empty categories, ends with a blank line
pub fn header_block(analysis: &DiagnosticModel, prefix: &str) -> Vec<String> {
    let mut lines = vec![
        format!("{prefix} {HEADER_TITLE}"),
        format!("{prefix} Flagged categories:"),
    ];

    let flagged = analysis.flagged_categories();
    if flagged.is_empty() {
        lines.push(format!("{prefix} - none"));
    }
    for (category, count) in flagged {
        lines.push(format!("{prefix} - {}: {count}", category.title()));
    }

    lines.push(String::new());
    lines
}
