//! Analysis → refactoring → benchmarking, one request at a time
//!
//! The pipeline owns no mutable state: configuration and the detector are
//! borrowed, and every call produces a fresh [`PipelineReport`].

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::ast_engine::{AnalyzeError, PatternDetector};
use crate::benchmark::{BenchmarkError, BenchmarkResult, Benchmarker, ComparisonResult};
use crate::config::Config;
use crate::diagnostics::{AnalysisMetrics, DiagnosticModel};
use crate::refactor::{RefactorOutcome, Refactorer};
use crate::report;
use crate::scanner::Language;
use crate::suggest::SuggestionClient;

pub const SUMMARY_FILE: &str = "refactoring_summary.json";
pub const REPORT_FILE: &str = "refactoring_report.md";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Analyze(#[from] AnalyzeError),

    #[error(transparent)]
    Benchmark(#[from] BenchmarkError),

    #[error("failed to write {}: {source}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Baseline and refactored measurements with their comparison
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkSummary {
    pub test_cases: Vec<String>,
    pub baseline: BenchmarkResult,
    pub refactored: BenchmarkResult,
    pub comparison: ComparisonResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub input: String,
    pub language: Language,
    pub diagnostics: DiagnosticModel,
    pub metrics: AnalysisMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refactoring: Option<RefactorOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benchmark: Option<BenchmarkSummary>,
    /// Files written by `run`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<String>,
    pub timestamp: String,
}

pub struct Pipeline<'a> {
    config: &'a Config,
    detector: &'a PatternDetector<'a>,
    refactorer: Refactorer<'a>,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config, detector: &'a PatternDetector<'a>) -> Self {
        Self {
            config,
            detector,
            refactorer: Refactorer::new(detector),
        }
    }

    pub fn with_client(mut self, client: Option<Box<dyn SuggestionClient>>) -> Self {
        self.refactorer = self.refactorer.with_client(client);
        self
    }

    /// Diagnostics and metrics only
    pub fn analyze(&self, input: &str, language: &Language) -> Result<PipelineReport, PipelineError> {
        let code = self.detector.resolve_source(input)?;
        let diagnostics = self.detector.analyze_source(&code, language);
        Ok(new_report(input, language, &code, diagnostics))
    }

    /// Diagnostics plus the transformer's output
    pub fn refactor(&self, input: &str, language: &Language) -> Result<PipelineReport, PipelineError> {
        let code = self.detector.resolve_source(input)?;
        Ok(self.refactor_source(input, &code, language))
    }

    fn refactor_source(&self, input: &str, code: &str, language: &Language) -> PipelineReport {
        let diagnostics = self.detector.analyze_source(code, language);
        let outcome = self.refactorer.refactor_code(code, &diagnostics, language);

        let mut report = new_report(input, language, code, diagnostics);
        report.refactoring = Some(outcome);
        report
    }

    /// Full run over a file: analyze, refactor, write `refactored_<name>` and
    /// the report files into `output_dir`, then benchmark both variants when
    /// test cases are given.
    pub fn run(
        &self,
        path: &Path,
        language: &Language,
        test_cases: &[String],
        output_dir: &Path,
    ) -> Result<PipelineReport, PipelineError> {
        // always a file here, never sniffed as inline source
        let code = fs::read_to_string(path).map_err(|source| AnalyzeError::Input {
            path: path.to_path_buf(),
            source,
        })?;
        let mut report = self.refactor_source(&path.to_string_lossy(), &code, language);

        fs::create_dir_all(output_dir).map_err(|source| PipelineError::Output {
            path: output_dir.to_path_buf(),
            source,
        })?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("source.{}", language.file_extension()));
        let refactored_path = output_dir.join(format!("refactored_{file_name}"));

        let (refactored_code, refactor_failed) = match &report.refactoring {
            Some(outcome) => (outcome.refactored_code.as_str(), outcome.error.is_some()),
            None => (code.as_str(), false),
        };
        write_file(&refactored_path, refactored_code)?;
        report.artifacts.push(refactored_path.to_string_lossy().to_string());

        if test_cases.is_empty() {
            info!("no test cases given, skipping benchmark");
        } else if refactor_failed {
            warn!("refactoring failed, skipping benchmark");
        } else {
            let bench = Benchmarker::new(&self.config.benchmark);
            let baseline = bench.benchmark_code(path, test_cases)?;
            let refactored = bench.benchmark_code(&refactored_path, test_cases)?;
            let comparison = bench.compare_performance(&baseline, &refactored);
            report.benchmark = Some(BenchmarkSummary {
                test_cases: test_cases.to_vec(),
                baseline,
                refactored,
                comparison,
            });
        }

        let summary_path = output_dir.join(SUMMARY_FILE);
        let report_path = output_dir.join(REPORT_FILE);
        report.artifacts.push(summary_path.to_string_lossy().to_string());
        report.artifacts.push(report_path.to_string_lossy().to_string());

        write_file(&summary_path, &serde_json::to_string_pretty(&report)?)?;
        write_file(&report_path, &report::render_markdown(&report))?;

        info!(output = %output_dir.display(), "run artifacts written");
        Ok(report)
    }
}

fn new_report(input: &str, language: &Language, code: &str, diagnostics: DiagnosticModel) -> PipelineReport {
    PipelineReport {
        input: input.to_string(),
        language: language.clone(),
        metrics: AnalysisMetrics::compute(&diagnostics, code),
        diagnostics,
        refactoring: None,
        benchmark: None,
        artifacts: Vec::new(),
        timestamp: chrono::Local::now().to_rfc3339(),
    }
}

fn write_file(path: &Path, content: &str) -> Result<(), PipelineError> {
    fs::write(path, content).map_err(|source| PipelineError::Output {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Capabilities;
    use tempfile::TempDir;

    #[test]
    fn test_analyze_inline() {
        let config = Config::default();
        let caps = Capabilities::resolve(&config);
        let detector = PatternDetector::new(&config.analysis, &caps);
        let pipeline = Pipeline::new(&config, &detector);

        let report = pipeline.analyze("x = 1\n", &Language::Python).unwrap();
        assert!(report.diagnostics.is_clean());
        assert_eq!(report.metrics.total_issues, 0);
        assert!(report.refactoring.is_none());
    }

    #[test]
    fn test_run_writes_artifacts_without_benchmark() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("systems.py");
        fs::write(&source, "for i in range(len(xs)):\n    print(xs[i])\n").unwrap();
        let out = dir.path().join("output");

        let config = Config::default();
        let caps = Capabilities::resolve(&config);
        let detector = PatternDetector::new(&config.analysis, &caps);
        let report = Pipeline::new(&config, &detector)
            .run(&source, &Language::Python, &[], &out)
            .unwrap();

        let refactored = fs::read_to_string(out.join("refactored_systems.py")).unwrap();
        assert!(refactored.contains("for i, _ in enumerate(xs):"));
        assert!(out.join(SUMMARY_FILE).exists());
        assert!(fs::read_to_string(out.join(REPORT_FILE)).unwrap().contains("systems.py"));
        assert!(report.benchmark.is_none());
        assert_eq!(report.artifacts.len(), 3);

        let summary: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.join(SUMMARY_FILE)).unwrap()).unwrap();
        assert_eq!(summary["language"], "python");
        assert!(summary["refactoring"]["refactored_code"].is_string());
    }

    #[test]
    fn test_missing_file_is_input_error() {
        let dir = TempDir::new().unwrap();
        let config = Config::default();
        let caps = Capabilities::minimal();
        let detector = PatternDetector::new(&config.analysis, &caps);

        let err = Pipeline::new(&config, &detector)
            .run(&dir.path().join("nope.py"), &Language::Python, &[], dir.path())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Analyze(AnalyzeError::Input { .. })));
        assert!(!dir.path().join("refactored_nope.py").exists());
    }
}
