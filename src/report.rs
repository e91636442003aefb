//! Markdown rendering of pipeline results (default CLI output)

use crate::ast_engine::FileDiagnostics;
use crate::benchmark::{BenchmarkResult, ComparisonResult};
use crate::diagnostics::{Category, DiagnosticModel};
use crate::pipeline::PipelineReport;

/// Full report: diagnostics, metrics, refactoring and benchmark sections
pub fn render_markdown(report: &PipelineReport) -> String {
    let m = &report.metrics;
    let mut out = format!(
        "## 🛰️ HECS Analysis: {}\n\n\
        **Language**: {} | **Lines**: {} | **Issues**: {} | **Quality**: {}/100\n\n",
        display_input(&report.input),
        report.language,
        m.lines_of_code,
        m.total_issues,
        m.quality_score
    );

    out.push_str(&render_diagnostics(&report.diagnostics));

    out.push_str("\n### 🎯 Priority Areas\n\n");
    for area in &m.priority_areas {
        out.push_str(&format!("- {area}\n"));
    }
    if m.refactoring_needed {
        out.push_str(&format!(
            "\n*Refactoring recommended, estimated improvement up to {}%*\n",
            m.estimated_improvement
        ));
    }

    if let Some(outcome) = &report.refactoring {
        out.push_str("\n### 🔧 Refactoring\n\n");
        if let Some(err) = &outcome.error {
            out.push_str(&format!("❌ Skipped: {err}\n"));
        } else {
            let rules = if outcome.applied_rules.is_empty() {
                "none".to_string()
            } else {
                outcome.applied_rules.join(", ")
            };
            out.push_str(&format!(
                "**Rules applied**: {rules} | **Advisories**: {} | **Rewritten lines**: {}\n\n",
                outcome.performance_predictions.advisories,
                outcome.performance_predictions.rewritten_lines
            ));
            out.push_str(&format!("```\n{}\n```\n", outcome.refactored_code.trim_end()));
        }

        for suggestion in &outcome.ai_suggestions {
            out.push_str(&format!("\n#### 🤖 AI Suggestion\n\n{suggestion}\n"));
        }
        if let Some(err) = &outcome.ai_error {
            out.push_str(&format!("\n⚠️ AI suggestions unavailable: {err}\n"));
        }
    }

    if let Some(bench) = &report.benchmark {
        out.push_str(&format!(
            "\n### ⏱️ Benchmark ({} test cases)\n\n",
            bench.test_cases.len()
        ));
        out.push_str(&render_benchmark(&bench.baseline, &bench.refactored, &bench.comparison));
    }

    if !report.artifacts.is_empty() {
        out.push_str("\n### 📁 Output\n\n");
        for artifact in &report.artifacts {
            out.push_str(&format!("- `{artifact}`\n"));
        }
    }

    out
}

/// Non-empty categories, derived views included
pub fn render_diagnostics(model: &DiagnosticModel) -> String {
    if model.is_clean() {
        return "✅ No issues found\n".to_string();
    }

    let mut out = String::new();
    for category in Category::ALL {
        let items = model.category(category);
        if items.is_empty() {
            continue;
        }
        let emoji = match category {
            Category::PerformanceBottlenecks | Category::Bottlenecks | Category::PerformanceHotspots => "🔴",
            Category::SecurityIssues => "🔒",
            Category::HecsPatterns => "🧩",
            _ => "🟡",
        };
        out.push_str(&format!("### {emoji} {} ({})\n\n", category.title(), items.len()));
        for item in items {
            out.push_str(&format!("- {item}\n"));
        }
        out.push('\n');
    }
    out
}

pub fn render_benchmark(
    baseline: &BenchmarkResult,
    refactored: &BenchmarkResult,
    comparison: &ComparisonResult,
) -> String {
    format!(
        "| Metric | Baseline | Refactored | Improvement |\n\
        |---|---|---|---|\n\
        | Time (s) | {:.4} | {:.4} | {} |\n\
        | Memory (bytes) | {:.0} | {:.0} | {} |\n\
        | CPU (%) | {:.2} | {:.2} | {} |\n\n\
        **Overall score**: {}\n",
        baseline.execution_time,
        refactored.execution_time,
        percent(comparison.execution_time_improvement),
        baseline.memory_usage,
        refactored.memory_usage,
        percent(comparison.memory_usage_improvement),
        baseline.cpu_usage,
        refactored.cpu_usage,
        percent(comparison.cpu_usage_improvement),
        percent(comparison.overall_score),
    )
}

/// Directory scan summary, one line per flagged file
pub fn render_scan(root: &str, files: &[FileDiagnostics]) -> String {
    let flagged: Vec<&FileDiagnostics> = files.iter().filter(|f| !f.diagnostics.is_clean()).collect();
    let mut out = format!(
        "## 🛰️ HECS Scan: {root}\n\n**Files**: {} | **Flagged**: {}\n\n",
        files.len(),
        flagged.len()
    );

    if flagged.is_empty() {
        out.push_str("✅ No issues found\n");
        return out;
    }

    for file in flagged {
        let counts: Vec<String> = file
            .diagnostics
            .flagged_categories()
            .into_iter()
            .map(|(c, n)| format!("{}: {n}", c.title()))
            .collect();
        out.push_str(&format!("- `{}` ({}) {}\n", file.path, file.language, counts.join(", ")));
    }
    out
}

fn percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:+.1}%"),
        None => "n/a".to_string(),
    }
}

fn display_input(input: &str) -> String {
    match input.lines().next() {
        Some(first) if input.contains('\n') => format!("`{first}` …"),
        _ => input.to_string(),
    }
}
