//! CLI command handlers
//!
//! Human-readable Markdown by default, `--json` for structured output.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::Subcommand;
use serde_json::{json, Value};
use tracing::debug;

use crate::ast_engine::{scan_directory, PatternDetector};
use crate::benchmark::Benchmarker;
use crate::config::{Capabilities, Config};
use crate::pipeline::Pipeline;
use crate::report;
use crate::scanner::Language;
use crate::suggest::client_from_config;

/// CLI Commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// 🔍 Analyze a file or an inline snippet
    Analyze {
        /// File path or source text
        #[arg(short, long)]
        input: String,

        /// Language tag (python, cpp, rust, ...)
        #[arg(short, long, default_value = "python")]
        language: String,
    },

    /// 🔧 Analyze, then apply the rewrite rules (and the AI pass when configured)
    Refactor {
        /// File path or source text
        #[arg(short, long)]
        input: String,

        #[arg(short, long, default_value = "python")]
        language: String,

        /// Print only the refactored source
        #[arg(long)]
        code_only: bool,
    },

    /// ⏱️ Benchmark a program, optionally against a refactored variant
    Benchmark {
        /// Baseline source file
        #[arg(short, long)]
        baseline: PathBuf,

        /// Refactored source file to compare with
        #[arg(short, long)]
        refactored: Option<PathBuf>,

        /// Test cases passed as the program's first argument (comma separated)
        #[arg(short, long, value_delimiter = ',', required = true)]
        test_cases: Vec<String>,
    },

    /// 🚀 Full pipeline over one file, writing results to an output directory
    Run {
        /// Source file
        #[arg(short, long)]
        file: PathBuf,

        /// Language tag, guessed from the extension when omitted
        #[arg(short, long)]
        language: Option<String>,

        /// Test cases to benchmark with (comma separated); none skips benchmarking
        #[arg(short, long, value_delimiter = ',')]
        test_cases: Vec<String>,

        #[arg(short, long, default_value = "output")]
        output: PathBuf,
    },

    /// 🛰️ Analyze every supported file under a directory
    Scan {
        #[arg(short, long, default_value = ".")]
        path: String,
    },

    /// ℹ️ Engine status
    Status,
}

/// Handle a CLI command and print its result
///
/// json_output: wrap the result as `{"success": ..., "data"|"error": ...}`
pub fn handle_command(cmd: Command, config: &Config, json_output: bool) -> Result<()> {
    let result = execute(cmd, config, json_output);

    match result {
        Ok(value) => {
            if json_output {
                let output = json!({
                    "success": true,
                    "data": value
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                print_value(&value);
            }
        }
        Err(e) => {
            if json_output {
                let output = json!({
                    "success": false,
                    "error": format!("{e:#}")
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                eprintln!("❌ {e:#}");
            }
            std::process::exit(1);
        }
    }

    Ok(())
}

fn execute(cmd: Command, config: &Config, json_output: bool) -> Result<Value> {
    let caps = Capabilities::resolve(config);
    let detector = PatternDetector::new(&config.analysis, &caps);

    match cmd {
        Command::Analyze { input, language } => {
            let pipeline = Pipeline::new(config, &detector);
            let report = pipeline.analyze(&input, &parse_language(&language))?;
            if json_output {
                Ok(serde_json::to_value(&report)?)
            } else {
                Ok(json!(report::render_markdown(&report)))
            }
        }

        Command::Refactor {
            input,
            language,
            code_only,
        } => {
            let pipeline = Pipeline::new(config, &detector).with_client(client_from_config(&config.ai)?);
            let report = pipeline.refactor(&input, &parse_language(&language))?;
            match (&report.refactoring, code_only) {
                (Some(outcome), true) => Ok(json!(outcome.refactored_code)),
                _ if json_output => Ok(serde_json::to_value(&report)?),
                _ => Ok(json!(report::render_markdown(&report))),
            }
        }

        Command::Benchmark {
            baseline,
            refactored,
            test_cases,
        } => {
            let bench = Benchmarker::new(&config.benchmark);
            let base = bench.benchmark_code(&baseline, &test_cases)?;

            let Some(refactored) = refactored else {
                return if json_output {
                    Ok(serde_json::to_value(&base)?)
                } else {
                    Ok(json!(format!(
                        "## ⏱️ Benchmark: {}\n\n\
                        **Time**: {:.4}s | **Memory**: {:.0} bytes | **CPU**: {:.2}%\n",
                        baseline.display(),
                        base.execution_time,
                        base.memory_usage,
                        base.cpu_usage
                    )))
                };
            };

            let other = bench.benchmark_code(&refactored, &test_cases)?;
            let comparison = bench.compare_performance(&base, &other);
            if json_output {
                Ok(json!({
                    "baseline": base,
                    "refactored": other,
                    "comparison": comparison,
                }))
            } else {
                Ok(json!(format!(
                    "## ⏱️ Benchmark: {} vs {}\n\n{}",
                    baseline.display(),
                    refactored.display(),
                    report::render_benchmark(&base, &other, &comparison)
                )))
            }
        }

        Command::Run {
            file,
            language,
            test_cases,
            output,
        } => {
            if !file.is_file() {
                bail!("Source file not found: {}", file.display());
            }
            let language = language
                .map(|l| parse_language(&l))
                .or_else(|| Language::from_path(&file))
                .unwrap_or(Language::Python);
            debug!(%language, file = %file.display(), "full pipeline run");

            let pipeline = Pipeline::new(config, &detector).with_client(client_from_config(&config.ai)?);
            let report = pipeline.run(&file, &language, &test_cases, &output)?;
            if json_output {
                Ok(serde_json::to_value(&report)?)
            } else {
                Ok(json!(report::render_markdown(&report)))
            }
        }

        Command::Scan { path } => {
            let root = Path::new(&path);
            if !root.exists() {
                bail!("Path not found: {path}");
            }
            let files = scan_directory(&detector, root);
            if json_output {
                Ok(json!({ "path": path, "files": files }))
            } else {
                Ok(json!(report::render_scan(&path, &files)))
            }
        }

        Command::Status => {
            let version = env!("CARGO_PKG_VERSION");
            let status = json!({
                "version": version,
                "capabilities": caps,
                "ai_backend": config.ai.backend,
                "interpreter": config.benchmark.interpreter,
                "python_rules": ["NESTED_LOOP", "LONG_FUNCTION", "INDEX_ITERATION", "APPEND_IN_LOOP"],
                "fallback_rules": ["NESTED_LOOP", "BLOCKING_CALL"],
                "rewrite_rules": ["index-iteration"],
            });

            if json_output {
                Ok(status)
            } else {
                Ok(json!(format!(
                    "HECS Perf v{}\n\
                    Engine: tree-sitter (Python) + line scanner fallback\n\
                    Capabilities: syntax_tree={}, ai_suggestions={}, dependency_graph={}\n\
                    Benchmark interpreter: {} (timeout {}s)",
                    version,
                    caps.syntax_tree,
                    caps.ai_suggestions,
                    caps.dependency_graph,
                    config.benchmark.interpreter,
                    config.benchmark.timeout_secs
                )))
            }
        }
    }
}

fn parse_language(tag: &str) -> Language {
    // unknown tags become Language::Other, never an error
    tag.parse().unwrap_or(Language::Python)
}

/// Print a Value, strings as-is
fn print_value(value: &Value) {
    match value {
        Value::String(s) => println!("{s}"),
        _ => println!("{}", serde_json::to_string_pretty(value).unwrap_or_default()),
    }
}
