//! Benchmark comparator
//!
//! Runs a source variant once per test case as `<interpreter> <path> <case>`,
//! trials strictly one after another, and averages the per-trial numbers.
//! A trial that outlives the timeout is killed and reaped, and the whole
//! call fails: a partial aggregate would compare unlike things.

pub mod sampler;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{BenchmarkConfig, ScoreWeights};
use sampler::{ResourceSampler, SysinfoSampler};

pub const CHILD_PEAK_RSS: &str = "child_peak_rss_bytes";
pub const FAILED_TRIALS: &str = "failed_trials";
pub const TRIALS: &str = "trials";

#[derive(Debug, Error)]
pub enum BenchmarkError {
    #[error("test case '{test_case}' exceeded the {}s timeout", .timeout.as_secs_f64())]
    Timeout { test_case: String, timeout: Duration },

    #[error("failed to launch {interpreter} {}: {source}", .path.display())]
    Spawn {
        interpreter: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to wait for benchmark process: {0}")]
    Wait(#[source] std::io::Error),

    #[error("no test cases given, nothing to benchmark")]
    NoTestCases,
}

/// Mean resource usage of one source variant
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BenchmarkResult {
    /// Wall-clock seconds
    pub execution_time: f64,
    /// Bytes: harness RSS growth plus child peak RSS
    pub memory_usage: f64,
    /// Percentage points: harness CPU change plus child mean CPU
    pub cpu_usage: f64,
    pub custom_metrics: BTreeMap<String, f64>,
}

/// Percentage improvements of a refactored variant over its baseline.
/// `None` marks a component whose baseline is zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub execution_time_improvement: Option<f64>,
    pub memory_usage_improvement: Option<f64>,
    pub cpu_usage_improvement: Option<f64>,
    pub overall_score: Option<f64>,
}

struct Trial {
    execution_time: f64,
    memory_usage: f64,
    cpu_usage: f64,
    child_peak_rss: u64,
    success: bool,
}

pub struct Benchmarker<'a> {
    config: &'a BenchmarkConfig,
}

impl<'a> Benchmarker<'a> {
    pub fn new(config: &'a BenchmarkConfig) -> Self {
        Self { config }
    }

    /// Benchmark `path` once per test case with a fresh `sysinfo` sampler
    pub fn benchmark_code(
        &self,
        path: &Path,
        test_cases: &[String],
    ) -> Result<BenchmarkResult, BenchmarkError> {
        let mut sampler = SysinfoSampler::new();
        self.benchmark_with(&mut sampler, path, test_cases)
    }

    pub fn benchmark_with(
        &self,
        sampler: &mut dyn ResourceSampler,
        path: &Path,
        test_cases: &[String],
    ) -> Result<BenchmarkResult, BenchmarkError> {
        if test_cases.is_empty() {
            return Err(BenchmarkError::NoTestCases);
        }

        let mut trials = Vec::with_capacity(test_cases.len());
        for test_case in test_cases {
            let trial = self.run_trial(sampler, path, test_case)?;
            debug!(
                test_case = %test_case,
                secs = trial.execution_time,
                success = trial.success,
                "trial finished"
            );
            trials.push(trial);
        }

        let result = aggregate(&trials);
        info!(
            path = %path.display(),
            trials = trials.len(),
            execution_time = result.execution_time,
            "benchmark complete"
        );
        Ok(result)
    }

    fn run_trial(
        &self,
        sampler: &mut dyn ResourceSampler,
        path: &Path,
        test_case: &str,
    ) -> Result<Trial, BenchmarkError> {
        let before = sampler.sample_self();
        let start = Instant::now();

        let mut child = Command::new(&self.config.interpreter)
            .arg(path)
            .arg(test_case)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| BenchmarkError::Spawn {
                interpreter: self.config.interpreter.clone(),
                path: path.to_path_buf(),
                source,
            })?;

        let timeout = self.config.timeout();
        let mut peak_rss = 0u64;
        let mut cpu_total = 0.0;
        let mut cpu_samples = 0usize;

        let status = loop {
            if let Some(status) = child.try_wait().map_err(BenchmarkError::Wait)? {
                break status;
            }

            if start.elapsed() >= timeout {
                warn!(test_case, "benchmark trial timed out, killing child");
                // kill can race with a natural exit; the wait below reaps either way
                let _ = child.kill();
                child.wait().map_err(BenchmarkError::Wait)?;
                return Err(BenchmarkError::Timeout {
                    test_case: test_case.to_string(),
                    timeout,
                });
            }

            if let Some(sample) = sampler.sample_pid(child.id()) {
                peak_rss = peak_rss.max(sample.rss_bytes);
                cpu_total += sample.cpu_percent;
                cpu_samples += 1;
            }

            std::thread::sleep(self.config.poll_interval());
        };

        let execution_time = start.elapsed().as_secs_f64();
        let after = sampler.sample_self();

        let child_cpu = if cpu_samples > 0 {
            cpu_total / cpu_samples as f64
        } else {
            0.0
        };

        Ok(Trial {
            execution_time,
            memory_usage: (after.rss_bytes as f64 - before.rss_bytes as f64) + peak_rss as f64,
            cpu_usage: (after.cpu_percent - before.cpu_percent) + child_cpu,
            child_peak_rss: peak_rss,
            success: status.success(),
        })
    }

    /// Compare with the configured score weights
    pub fn compare_performance(
        &self,
        baseline: &BenchmarkResult,
        refactored: &BenchmarkResult,
    ) -> ComparisonResult {
        compare_performance(baseline, refactored, &self.config.weights)
    }
}

fn aggregate(trials: &[Trial]) -> BenchmarkResult {
    let n = trials.len() as f64;
    let mean = |f: fn(&Trial) -> f64| trials.iter().map(f).sum::<f64>() / n;

    let mut custom_metrics = BTreeMap::new();
    custom_metrics.insert(CHILD_PEAK_RSS.to_string(), mean(|t| t.child_peak_rss as f64));
    custom_metrics.insert(
        FAILED_TRIALS.to_string(),
        trials.iter().filter(|t| !t.success).count() as f64,
    );
    custom_metrics.insert(TRIALS.to_string(), n);

    BenchmarkResult {
        execution_time: mean(|t| t.execution_time),
        memory_usage: mean(|t| t.memory_usage),
        cpu_usage: mean(|t| t.cpu_usage),
        custom_metrics,
    }
}

/// Fractional improvement `(b - r) / b`, `None` for a zero baseline
fn improvement(baseline: f64, refactored: f64) -> Option<f64> {
    if baseline == 0.0 {
        None
    } else {
        Some((baseline - refactored) / baseline)
    }
}

/// Percentage improvements plus the weighted overall score.
///
/// A component with a zero baseline is `None` and adds 0 to the score; the
/// score itself is `None` only when no component could be computed.
pub fn compare_performance(
    baseline: &BenchmarkResult,
    refactored: &BenchmarkResult,
    weights: &ScoreWeights,
) -> ComparisonResult {
    let time = improvement(baseline.execution_time, refactored.execution_time);
    let memory = improvement(baseline.memory_usage, refactored.memory_usage);
    let cpu = improvement(baseline.cpu_usage, refactored.cpu_usage);

    let overall_score = if time.is_none() && memory.is_none() && cpu.is_none() {
        None
    } else {
        let weighted = weights.time * time.unwrap_or(0.0)
            + weights.memory * memory.unwrap_or(0.0)
            + weights.cpu * cpu.unwrap_or(0.0);
        Some(weighted * 100.0)
    };

    ComparisonResult {
        execution_time_improvement: time.map(|v| v * 100.0),
        memory_usage_improvement: memory.map(|v| v * 100.0),
        cpu_usage_improvement: cpu.map(|v| v * 100.0),
        overall_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sampler::ResourceSample;

    fn result(time: f64, memory: f64, cpu: f64) -> BenchmarkResult {
        BenchmarkResult {
            execution_time: time,
            memory_usage: memory,
            cpu_usage: cpu,
            custom_metrics: BTreeMap::new(),
        }
    }

    fn approx(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("component should be computable");
        assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
    }

    #[test]
    fn test_compare_weighted_score() {
        let cmp = compare_performance(
            &result(2.0, 100.0, 50.0),
            &result(1.0, 80.0, 40.0),
            &ScoreWeights::default(),
        );
        approx(cmp.execution_time_improvement, 50.0);
        approx(cmp.memory_usage_improvement, 20.0);
        approx(cmp.cpu_usage_improvement, 20.0);
        approx(cmp.overall_score, 32.0);
    }

    #[test]
    fn test_compare_regression_is_negative() {
        let cmp = compare_performance(
            &result(1.0, 100.0, 10.0),
            &result(2.0, 100.0, 10.0),
            &ScoreWeights::default(),
        );
        approx(cmp.execution_time_improvement, -100.0);
        approx(cmp.overall_score, -40.0);
    }

    #[test]
    fn test_zero_baseline_not_computable() {
        let cmp = compare_performance(
            &result(2.0, 0.0, 0.0),
            &result(1.0, 10.0, 5.0),
            &ScoreWeights::default(),
        );
        approx(cmp.execution_time_improvement, 50.0);
        assert_eq!(cmp.memory_usage_improvement, None);
        assert_eq!(cmp.cpu_usage_improvement, None);
        approx(cmp.overall_score, 20.0);

        let none = compare_performance(
            &BenchmarkResult::default(),
            &result(1.0, 1.0, 1.0),
            &ScoreWeights::default(),
        );
        assert_eq!(none.overall_score, None);
    }

    #[test]
    fn test_empty_test_cases_is_error() {
        let config = BenchmarkConfig::default();
        let err = Benchmarker::new(&config)
            .benchmark_code(Path::new("missing.py"), &[])
            .unwrap_err();
        assert!(matches!(err, BenchmarkError::NoTestCases));
    }

    #[test]
    fn test_missing_interpreter_is_spawn_error() {
        let config = BenchmarkConfig {
            interpreter: "hecs-perf-no-such-interpreter".to_string(),
            ..BenchmarkConfig::default()
        };
        let err = Benchmarker::new(&config)
            .benchmark_code(Path::new("x.py"), &["a".to_string()])
            .unwrap_err();
        assert!(matches!(err, BenchmarkError::Spawn { .. }));
    }

    /// Harness grows by 1000 bytes per reading, child always reads 4096
    struct FakeSampler {
        own_rss: u64,
    }

    impl ResourceSampler for FakeSampler {
        fn sample_self(&mut self) -> ResourceSample {
            self.own_rss += 1000;
            ResourceSample {
                rss_bytes: self.own_rss,
                cpu_percent: 1.0,
            }
        }

        fn sample_pid(&mut self, _pid: u32) -> Option<ResourceSample> {
            Some(ResourceSample {
                rss_bytes: 4096,
                cpu_percent: 50.0,
            })
        }
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::fs;
        use tempfile::TempDir;

        fn script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
            let path = dir.path().join(name);
            fs::write(&path, body).unwrap();
            path
        }

        fn sh_config(timeout_secs: u64) -> BenchmarkConfig {
            BenchmarkConfig {
                interpreter: "sh".to_string(),
                timeout_secs,
                ..BenchmarkConfig::default()
            }
        }

        #[test]
        fn test_trials_are_averaged() {
            let dir = TempDir::new().unwrap();
            let path = script(&dir, "work.sh", "sleep 0.2\n");
            let config = sh_config(10);
            let cases = vec!["small".to_string(), "large".to_string()];

            let mut sampler = FakeSampler { own_rss: 0 };
            let result = Benchmarker::new(&config)
                .benchmark_with(&mut sampler, &path, &cases)
                .unwrap();

            assert!(result.execution_time >= 0.2);
            assert_eq!(result.memory_usage, 1000.0 + 4096.0);
            assert_eq!(result.cpu_usage, 50.0);
            assert_eq!(result.custom_metrics[TRIALS], 2.0);
            assert_eq!(result.custom_metrics[FAILED_TRIALS], 0.0);
            assert_eq!(result.custom_metrics[CHILD_PEAK_RSS], 4096.0);
        }

        #[test]
        fn test_failing_trial_is_counted() {
            let dir = TempDir::new().unwrap();
            let path = script(&dir, "fail.sh", "exit 3\n");
            let config = sh_config(10);

            let result = Benchmarker::new(&config)
                .benchmark_code(&path, &["only".to_string()])
                .unwrap();
            assert_eq!(result.custom_metrics[FAILED_TRIALS], 1.0);
        }

        #[test]
        fn test_test_case_passed_as_argument() {
            let dir = TempDir::new().unwrap();
            let path = script(&dir, "check.sh", "[ \"$1\" = expected ] || exit 1\n");
            let config = sh_config(10);

            let result = Benchmarker::new(&config)
                .benchmark_code(&path, &["expected".to_string(), "other".to_string()])
                .unwrap();
            assert_eq!(result.custom_metrics[FAILED_TRIALS], 1.0);
        }

        #[test]
        fn test_timeout_kills_and_fails() {
            let dir = TempDir::new().unwrap();
            let fast = script(&dir, "fast.sh", "exit 0\n");
            let slow = script(&dir, "slow.sh", "sleep 5\n");
            let config = sh_config(1);
            let bench = Benchmarker::new(&config);

            assert!(bench.benchmark_code(&fast, &["warmup".to_string()]).is_ok());

            let start = Instant::now();
            let err = bench
                .benchmark_code(&slow, &["first".to_string(), "second".to_string()])
                .unwrap_err();
            assert!(start.elapsed() < Duration::from_secs(4));
            match err {
                BenchmarkError::Timeout { test_case, timeout } => {
                    assert_eq!(test_case, "first");
                    assert_eq!(timeout, Duration::from_secs(1));
                }
                other => panic!("expected timeout, got {other:?}"),
            }
        }
    }
}
