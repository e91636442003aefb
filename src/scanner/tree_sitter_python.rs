//! Python rules over a tree-sitter syntax tree
//!
//! Syntax errors are whatever tree-sitter reports as ERROR or MISSING nodes.
//! Its error recovery accepts some sources CPython rejects (a comment line
//! between a `\` continuation and the rest of the statement, for one), so
//! `syntax_error` returning `None` does not guarantee the source compiles.

use super::CodeAnalyzer;
use crate::config::AnalysisConfig;
use crate::diagnostics::{DiagnosticBuilder, DiagnosticModel};
use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cell::RefCell;
use std::fmt;
use tree_sitter::{Node, Parser, Query, QueryCursor, Tree};

// ============================================================================
// thread_local Parser
// ============================================================================
//
// Parser::new() + set_language() allocate on the native side. Directory scans
// run on rayon workers, so each worker keeps one parser for its lifetime.
//
// ============================================================================

thread_local! {
    static PYTHON_PARSER: RefCell<Option<Parser>> = const { RefCell::new(None) };
}

fn with_parser<F, R>(language: &tree_sitter::Language, f: F) -> Result<R>
where
    F: FnOnce(&mut Parser) -> Result<R>,
{
    PYTHON_PARSER.with(|cell| {
        let mut parser_opt = cell.borrow_mut();

        if parser_opt.is_none() {
            let mut parser = Parser::new();
            parser
                .set_language(language)
                .map_err(|e| anyhow!("Failed to set language: {e}"))?;
            *parser_opt = Some(parser);
        }

        let parser = parser_opt
            .as_mut()
            .ok_or_else(|| anyhow!("Python parser unavailable"))?;
        f(parser)
    })
}

/// `range(len(...))` on a single line, for the line-based rewrite rules
pub(crate) static INDEX_ITERATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"range\(\s*len\(").unwrap());

static FOR_KEYWORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bfor\b").unwrap());
static APPEND_CALL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bappend\(").unwrap());

const LOOP_KINDS: [&str; 2] = ["for_statement", "while_statement"];

fn is_loop(node: &Node) -> bool {
    LOOP_KINDS.contains(&node.kind())
}

/// Location of the first error the parser recovered from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub line: usize,
    pub column: usize,
    pub detail: String,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Syntax error: {} (line {}, column {})",
            self.detail, self.line, self.column
        )
    }
}

pub struct PythonTreeSitterAnalyzer {
    language: tree_sitter::Language,
    /// Every loop statement, document order
    loop_query: Query,
    /// Every function definition with its name and body
    function_query: Query,
    /// `range(len(...))` as a call, so comments and strings never match
    index_iteration_query: Query,
    long_function_threshold: usize,
}

impl PythonTreeSitterAnalyzer {
    pub fn new(config: &AnalysisConfig) -> Result<Self> {
        let language = tree_sitter_python::language();

        let loop_query = Query::new(
            &language,
            r#"
                [
                    (for_statement)
                    (while_statement)
                ] @loop
            "#,
        )
        .map_err(|e| anyhow!("Failed to compile loop query: {e}"))?;

        let function_query = Query::new(
            &language,
            r#"
                (function_definition
                    name: (identifier) @name
                    body: (block) @body
                ) @function
            "#,
        )
        .map_err(|e| anyhow!("Failed to compile function query: {e}"))?;

        let index_iteration_query = Query::new(
            &language,
            r#"
                ((call
                    function: (identifier) @range
                    arguments: (argument_list
                        .
                        (call function: (identifier) @len)))
                 (#eq? @range "range")
                 (#eq? @len "len"))
            "#,
        )
        .map_err(|e| anyhow!("Failed to compile index iteration query: {e}"))?;

        Ok(Self {
            language,
            loop_query,
            function_query,
            index_iteration_query,
            long_function_threshold: config.long_function_threshold,
        })
    }

    fn parse(&self, code: &str) -> Result<Tree> {
        with_parser(&self.language, |parser| {
            parser
                .parse(code, None)
                .ok_or_else(|| anyhow!("Failed to parse code"))
        })
    }

    /// First syntax error in `code`, if any
    pub fn syntax_error(&self, code: &str) -> Result<Option<SyntaxError>> {
        let tree = self.parse(code)?;
        Ok(find_syntax_error(&tree, code))
    }

    fn analyze_tree(&self, tree: &Tree, code: &str) -> DiagnosticModel {
        let mut diagnostics = DiagnosticBuilder::new();
        let root = tree.root_node();
        let source = code.as_bytes();

        // Nested loops: one flag per loop that contains another loop
        let mut cursor = QueryCursor::new();
        for m in cursor.matches(&self.loop_query, root, source) {
            for capture in m.captures {
                let node = capture.node;
                if has_loop_descendant(node) {
                    let line = node.start_position().row + 1;
                    diagnostics.complexity(format!(
                        "Line {line}: Nested loops detected - consider optimization"
                    ));
                    diagnostics.performance(format!(
                        "Line {line}: O(n²) complexity from nested loops"
                    ));
                }
            }
        }

        // Function rules: long bodies and index-based iteration
        let name_idx = self.function_query.capture_index_for_name("name");
        let body_idx = self.function_query.capture_index_for_name("body");
        let function_idx = self.function_query.capture_index_for_name("function");

        let mut cursor = QueryCursor::new();
        for m in cursor.matches(&self.function_query, root, source) {
            let mut name = "";
            let mut body: Option<Node> = None;
            let mut function: Option<Node> = None;

            for capture in m.captures {
                if Some(capture.index) == name_idx {
                    name = capture.node.utf8_text(source).unwrap_or("");
                } else if Some(capture.index) == body_idx {
                    body = Some(capture.node);
                } else if Some(capture.index) == function_idx {
                    function = Some(capture.node);
                }
            }

            if let Some(body) = body {
                let statements = count_statements(body);
                if statements > self.long_function_threshold {
                    diagnostics.smell(format!(
                        "Function '{name}' is too long ({statements} statements)"
                    ));
                }
            }

            if let Some(function) = function {
                let mut cursor = QueryCursor::new();
                let found = cursor
                    .matches(&self.index_iteration_query, function, source)
                    .next()
                    .is_some();
                if found {
                    diagnostics.smell(format!(
                        "Function '{name}' uses range(len()) - consider enumerate()"
                    ));
                }
            }
        }

        // Accumulation in a loop, line by line (independent of the tree)
        for (idx, line) in code.lines().enumerate() {
            if line.trim_start().starts_with('#') {
                continue;
            }
            if FOR_KEYWORD.is_match(line) && APPEND_CALL.is_match(line) {
                diagnostics.smell(format!(
                    "Line {}: Consider using list comprehension instead of append in loop",
                    idx + 1
                ));
            }
        }

        diagnostics.finish()
    }
}

impl CodeAnalyzer for PythonTreeSitterAnalyzer {
    fn name(&self) -> &'static str {
        "tree-sitter-python"
    }

    fn analyze(&self, code: &str) -> Result<DiagnosticModel> {
        let tree = self.parse(code)?;

        // Syntax errors short-circuit every other rule
        if let Some(err) = find_syntax_error(&tree, code) {
            return Ok(DiagnosticModel::syntax_error(err.to_string()));
        }

        Ok(self.analyze_tree(&tree, code))
    }
}

/// Direct statements in a block; comments are extras, not statements
fn count_statements(block: Node) -> usize {
    let mut cursor = block.walk();
    let count = block
        .named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .count();
    count
}

fn has_loop_descendant(node: Node) -> bool {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .any(|child| is_loop(&child) || has_loop_descendant(child));
    found
}

fn find_syntax_error(tree: &Tree, code: &str) -> Option<SyntaxError> {
    let root = tree.root_node();
    if !root.has_error() {
        return None;
    }

    let node = first_error_node(root).unwrap_or(root);
    let pos = node.start_position();
    let detail = if node.is_missing() {
        format!("missing '{}'", node.kind())
    } else {
        let text = node.utf8_text(code.as_bytes()).unwrap_or("");
        match text.lines().next().map(str::trim) {
            Some(snippet) if !snippet.is_empty() => format!("invalid syntax near '{snippet}'"),
            _ => "invalid syntax".to_string(),
        }
    };

    Some(SyntaxError {
        line: pos.row + 1,
        column: pos.column + 1,
        detail,
    })
}

fn first_error_node(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error_node)
}
