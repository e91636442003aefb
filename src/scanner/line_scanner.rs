use super::{CodeAnalyzer, Language};
use crate::config::AnalysisConfig;
use crate::diagnostics::{DiagnosticBuilder, DiagnosticModel};
use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;

/// Loop keywords shared by every supported language
static LOOP_KEYWORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(for|while)\b").unwrap());

/// Rust also has a bare `loop`
static RUST_LOOP_KEYWORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(for|while|loop)\b").unwrap());

static BLOCKING_CALL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(sleep|wait|delay)").unwrap());

/// Line-oriented scanner
///
/// Used for every language without a syntax-tree analyzer, and for Python when
/// tree-sitter is disabled. No parsing, so it never rejects its input:
/// - nested loop: a loop keyword with another one in the next `lookahead_window` lines
/// - blocking call: sleep / wait / delay on the line
pub struct LineScanner {
    language: Language,
    lookahead_window: usize,
}

impl LineScanner {
    pub fn new(language: Language, config: &AnalysisConfig) -> Self {
        Self {
            language,
            lookahead_window: config.lookahead_window,
        }
    }

    fn loop_keyword(&self) -> &'static Regex {
        match self.language {
            Language::Rust => &RUST_LOOP_KEYWORD,
            _ => &LOOP_KEYWORD,
        }
    }
}

impl CodeAnalyzer for LineScanner {
    fn name(&self) -> &'static str {
        "line-scanner"
    }

    fn analyze(&self, code: &str) -> Result<DiagnosticModel> {
        let lines: Vec<String> = code.lines().map(|l| l.to_lowercase()).collect();
        let loop_keyword = self.loop_keyword();
        let mut diagnostics = DiagnosticBuilder::new();

        for (idx, line) in lines.iter().enumerate() {
            let line_no = idx + 1;

            if loop_keyword.is_match(line) {
                let window_end = (idx + 1 + self.lookahead_window).min(lines.len());
                let nested = lines[idx + 1..window_end]
                    .iter()
                    .any(|next| loop_keyword.is_match(next));
                if nested {
                    diagnostics.complexity(format!("Line {line_no}: Potential nested loop detected"));
                    diagnostics.performance(format!(
                        "Line {line_no}: Nested loop may cause performance issues"
                    ));
                }
            }

            if BLOCKING_CALL.is_match(line) {
                diagnostics.performance(format!("Line {line_no}: Blocking operation detected"));
            }
        }

        Ok(diagnostics.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(language: Language, code: &str) -> DiagnosticModel {
        LineScanner::new(language, &AnalysisConfig::default())
            .analyze(code)
            .unwrap()
    }

    #[test]
    fn test_nested_loop_in_cpp() {
        let code = r#"
for (auto& e : entities) {
    for (auto& c : e.components) {
        c.update();
    }
}
"#;
        let model = scan(Language::Cpp, code);
        assert_eq!(model.complexity_issues(), ["Line 2: Potential nested loop detected"]);
        assert_eq!(
            model.performance_bottlenecks(),
            ["Line 2: Nested loop may cause performance issues"]
        );
        assert_eq!(model.inefficiencies().len(), 2);
    }

    #[test]
    fn test_lookahead_window_is_ten_lines() {
        let mut code = String::from("for x in xs:\n");
        for _ in 0..9 {
            code.push_str("    pass\n");
        }
        // line 11 is the 10th line after the header
        code.push_str("for y in ys:\n");
        let model = scan(Language::Other("pseudo".to_string()), &code);
        assert_eq!(model.complexity_issues(), ["Line 1: Potential nested loop detected"]);

        let mut far = String::from("for x in xs:\n");
        for _ in 0..10 {
            far.push_str("    pass\n");
        }
        far.push_str("for y in ys:\n");
        let model = scan(Language::Other("pseudo".to_string()), &far);
        assert!(model.complexity_issues().is_empty());
    }

    #[test]
    fn test_blocking_calls_case_insensitive() {
        let code = "std::this_thread::sleep_for(ms);\nThread.Sleep(10);\nlet x = await fetch();\nDelay(5)";
        let model = scan(Language::Cpp, code);
        assert_eq!(
            model.performance_bottlenecks(),
            [
                "Line 1: Blocking operation detected",
                "Line 2: Blocking operation detected",
                "Line 3: Blocking operation detected",
                "Line 4: Blocking operation detected",
            ]
        );
        assert!(model.complexity_issues().is_empty());
    }

    #[test]
    fn test_blocking_call_inside_identifier() {
        let code = "usleep(100);\nnanosleep(&ts, NULL);\nThread::msleep(5);\nx += 1;";
        let model = scan(Language::Cpp, code);
        assert_eq!(
            model.performance_bottlenecks(),
            [
                "Line 1: Blocking operation detected",
                "Line 2: Blocking operation detected",
                "Line 3: Blocking operation detected",
            ]
        );
    }

    #[test]
    fn test_rust_bare_loop() {
        let code = "loop {\n    for s in systems.iter() {\n        s.run();\n    }\n}";
        let model = scan(Language::Rust, code);
        assert_eq!(model.complexity_issues(), ["Line 1: Potential nested loop detected"]);

        // `loop` is not a keyword outside Rust
        let model = scan(Language::Cpp, code);
        assert!(model.complexity_issues().is_empty());
    }

    #[test]
    fn test_keyword_must_be_a_word() {
        let model = scan(Language::Cpp, "format(x);\nbefore(y);\nformat(z);");
        assert!(model.is_clean());
    }
}
