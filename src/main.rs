use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use hecs_perf::cli::{self, Command};
use hecs_perf::config::{AiBackend, Config};

/// HECS Performance Diagnostics Tool
///
/// Pattern detection, rule-based refactoring and benchmarking for
/// entity-component-system code. Markdown output by default.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log filter (error, warn, info, debug, trace or an EnvFilter directive)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Output JSON instead of Markdown
    #[arg(long, global = true)]
    json: bool,

    /// YAML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// AI suggestion backend, overrides the config file
    #[arg(long, value_enum, global = true)]
    ai_backend: Option<AiBackend>,

    /// AI endpoint URL, overrides the config file
    #[arg(long, global = true)]
    ai_endpoint: Option<String>,

    /// AI model name, overrides the config file
    #[arg(long, global = true)]
    ai_model: Option<String>,

    #[command(subcommand)]
    command: Command,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // logs go to stderr, stdout carries the report
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    let mut config = match &args.config {
        Some(path) => Config::from_yaml_file(path)?,
        None => Config::default(),
    };
    if let Some(backend) = args.ai_backend {
        config.ai.backend = backend;
    }
    if let Some(endpoint) = args.ai_endpoint {
        config.ai.endpoint = endpoint;
    }
    if let Some(model) = args.ai_model {
        config.ai.model = model;
    }
    if config.ai.api_key.is_none() {
        config.ai.api_key = std::env::var("HECS_PERF_API_KEY").ok();
    }
    debug!(ai_backend = ?config.ai.backend, interpreter = %config.benchmark.interpreter, "configuration loaded");

    cli::handle_command(args.command, &config, args.json)
}
