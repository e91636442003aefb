// ============================================================================
// RewriteRule - line rewrite rules
// ============================================================================
//
// Each rule recognizes one idiom on a single line and knows:
// 1. the advisory comment to put above the line
// 2. an optional literal rewrite, only for loop headers
//
// Rewrites are textual substitutions, not semantic transformations.
//
// ============================================================================

use once_cell::sync::Lazy;
use regex::Regex;

use crate::scanner::tree_sitter_python::INDEX_ITERATION;
use crate::scanner::Language;

pub trait RewriteRule: Send + Sync {
    /// Stable id, also used as the advisory marker
    fn id(&self) -> &'static str;

    fn applies_to(&self, language: &Language) -> bool;

    fn matches(&self, line: &str, language: &Language) -> bool;

    /// Advisory text (without comment prefix) for original line `line_no`
    fn advisory(&self, line_no: usize, language: &Language) -> String;

    /// Literal rewrite when `line` is a loop header using the idiom
    fn rewrite(&self, line: &str, language: &Language) -> Option<String>;
}

/// `for i in range(len(xs)):` with the loop variable and container captured
static PY_INDEX_LOOP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\s*)for\s+(\w+)\s+in\s+range\(\s*len\((.+?)\)\s*\)").unwrap()
});

/// `0..xs.len()` anywhere on a line
static RUST_INDEX_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b0\s*\.\.\s*[\w\.]+?\.len\(\)").unwrap());

static RUST_INDEX_LOOP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\s*)for\s+(\w+)\s+in\s+0\s*\.\.\s*([\w\.]+?)\.len\(\)").unwrap()
});

/// Iteration by integer index into a container's length
pub struct IndexIterationRule;

impl RewriteRule for IndexIterationRule {
    fn id(&self) -> &'static str {
        "index-iteration"
    }

    fn applies_to(&self, language: &Language) -> bool {
        matches!(language, Language::Python | Language::Rust)
    }

    fn matches(&self, line: &str, language: &Language) -> bool {
        match language {
            Language::Python => INDEX_ITERATION.is_match(line),
            Language::Rust => RUST_INDEX_RANGE.is_match(line),
            _ => false,
        }
    }

    fn advisory(&self, line_no: usize, language: &Language) -> String {
        let alternative = match language {
            Language::Rust => ".iter().enumerate()",
            _ => "enumerate()",
        };
        format!("consider {alternative} instead of indexing by position (line {line_no})")
    }

    fn rewrite(&self, line: &str, language: &Language) -> Option<String> {
        let (re, replacement) = match language {
            Language::Python => (&*PY_INDEX_LOOP, "${1}for ${2}, _ in enumerate(${3})"),
            Language::Rust => (&*RUST_INDEX_LOOP, "${1}for (${2}, _) in ${3}.iter().enumerate()"),
            _ => return None,
        };
        if !re.is_match(line) {
            return None;
        }
        Some(re.replacen(line, 1, replacement).into_owned())
    }
}

/// Rules applied by the transformer, in order
pub fn default_rules() -> Vec<Box<dyn RewriteRule>> {
    vec![Box::new(IndexIterationRule)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_python_loop_header_rewrite() {
        let rule = IndexIterationRule;
        let py = Language::Python;

        assert_eq!(
            rule.rewrite("for i in range(len(items)): total.append(items[i]*2)", &py).as_deref(),
            Some("for i, _ in enumerate(items): total.append(items[i]*2)")
        );
        assert_eq!(
            rule.rewrite("    for k in range(len(self.entities[j])):", &py).as_deref(),
            Some("    for k, _ in enumerate(self.entities[j]):")
        );
        // nested call keeps its own closing paren
        assert_eq!(
            rule.rewrite("for i in range(len(query(world))):", &py).as_deref(),
            Some("for i, _ in enumerate(query(world)):")
        );
    }

    #[test]
    fn test_python_non_loop_gets_advisory_only() {
        let rule = IndexIterationRule;
        let py = Language::Python;
        let line = "idx = list(range(len(xs)))";

        assert!(rule.matches(line, &py));
        assert_eq!(rule.rewrite(line, &py), None);
        assert!(!rule.advisory(4, &py).contains("range(len("));
    }

    #[test]
    fn test_rust_loop_header_rewrite() {
        let rule = IndexIterationRule;
        let rs = Language::Rust;

        assert!(rule.matches("    for i in 0..self.entities.len() {", &rs));
        assert_eq!(
            rule.rewrite("    for i in 0..self.entities.len() {", &rs).as_deref(),
            Some("    for (i, _) in self.entities.iter().enumerate() {")
        );
        assert!(!rule.matches("for i in 1..xs.len() {", &rs));
    }

    #[test]
    fn test_other_languages_untouched() {
        let rule = IndexIterationRule;
        assert!(!rule.applies_to(&Language::Cpp));
        assert!(!rule.matches("for i in range(len(xs)):", &Language::Cpp));
    }
}
