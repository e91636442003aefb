//! Pattern detector - entry point of the analysis stage
//!
//! Picks a scanner per language tag and capability set:
//! - Python + syntax-tree capability: tree-sitter rules (`scanner::tree_sitter_python`)
//! - everything else: line heuristics (`scanner::line_scanner`)
//!
//! `scan_directory` runs the detector over a whole tree with rayon. Each file
//! is an independent request; nothing is shared between them except the
//! read-only config and compiled queries.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::{AnalysisConfig, Capabilities};
use crate::diagnostics::DiagnosticModel;
use crate::scanner::line_scanner::LineScanner;
use crate::scanner::tree_sitter_python::PythonTreeSitterAnalyzer;
use crate::scanner::{CodeAnalyzer, Language};

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("failed to read source {}: {source}", .path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// How a string handed to the detector is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceInput<'a> {
    Path(&'a Path),
    Inline(&'a str),
}

/// Decide whether `input` names a file or is the source itself.
///
/// A path must be shorter than `length_bound`, contain `/` or `\`, contain no
/// newline, and exist on disk. The existence check is the only side effect.
/// A one-line snippet that happens to name an existing file is read as a
/// path; callers with such input should read the file themselves.
pub fn classify_input(input: &str, length_bound: usize) -> SourceInput<'_> {
    let looks_like_path = input.len() < length_bound
        && (input.contains('/') || input.contains('\\'))
        && !input.contains('\n');

    if looks_like_path && Path::new(input).exists() {
        SourceInput::Path(Path::new(input))
    } else {
        SourceInput::Inline(input)
    }
}

pub struct PatternDetector<'a> {
    config: &'a AnalysisConfig,
    python: Option<PythonTreeSitterAnalyzer>,
}

impl<'a> PatternDetector<'a> {
    pub fn new(config: &'a AnalysisConfig, caps: &Capabilities) -> Self {
        let python = if caps.syntax_tree {
            match PythonTreeSitterAnalyzer::new(config) {
                Ok(analyzer) => Some(analyzer),
                Err(e) => {
                    warn!("tree-sitter analyzer unavailable, using line scanner: {e}");
                    None
                }
            }
        } else {
            None
        };

        Self { config, python }
    }

    /// Read the source behind `input` (file contents or the string itself)
    pub fn resolve_source<'i>(&self, input: &'i str) -> Result<Cow<'i, str>, AnalyzeError> {
        match classify_input(input, self.config.path_length_bound) {
            SourceInput::Path(path) => {
                debug!(path = %path.display(), "reading source from file");
                std::fs::read_to_string(path)
                    .map(Cow::Owned)
                    .map_err(|source| AnalyzeError::Input {
                        path: path.to_path_buf(),
                        source,
                    })
            }
            SourceInput::Inline(code) => Ok(Cow::Borrowed(code)),
        }
    }

    /// Analyze a path or inline source
    pub fn analyze_code(
        &self,
        code_or_path: &str,
        language: &Language,
    ) -> Result<DiagnosticModel, AnalyzeError> {
        let code = self.resolve_source(code_or_path)?;
        Ok(self.analyze_source(&code, language))
    }

    /// Analyze source text. Never fails: parser trouble degrades to the line scanner.
    pub fn analyze_source(&self, code: &str, language: &Language) -> DiagnosticModel {
        if *language == Language::Python {
            if let Some(analyzer) = &self.python {
                match analyzer.analyze(code) {
                    Ok(model) => return model,
                    Err(e) => warn!("{} failed, falling back to line scanner: {e}", analyzer.name()),
                }
            } else {
                debug!("syntax-tree capability off, scanning python line by line");
            }
        }

        let scanner = LineScanner::new(language.clone(), self.config);
        match scanner.analyze(code) {
            Ok(model) => model,
            Err(e) => {
                warn!("{} failed: {e}", scanner.name());
                DiagnosticModel::default()
            }
        }
    }

    /// Python syntax check used by the transformer; `None` when the source
    /// parses or when no parser is available.
    pub fn syntax_error(&self, code: &str, language: &Language) -> Option<String> {
        if *language != Language::Python {
            return None;
        }
        let analyzer = self.python.as_ref()?;
        match analyzer.syntax_error(code) {
            Ok(err) => err.map(|e| e.to_string()),
            Err(e) => {
                warn!("syntax check failed: {e}");
                None
            }
        }
    }
}

/// Findings for one file of a directory scan
#[derive(Debug, Clone, Serialize)]
pub struct FileDiagnostics {
    pub path: String,
    pub language: Language,
    pub diagnostics: DiagnosticModel,
}

/// Analyze every supported file under `root` in parallel, sorted by path
pub fn scan_directory(detector: &PatternDetector<'_>, root: &Path) -> Vec<FileDiagnostics> {
    let entries: Vec<_> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let language = Language::from_path(e.path())?;
            Some((e.into_path(), language))
        })
        .collect();

    debug!(files = entries.len(), root = %root.display(), "directory scan");

    let mut results: Vec<FileDiagnostics> = entries
        .par_iter()
        .filter_map(|(path, language)| match std::fs::read_to_string(path) {
            Ok(code) => Some(FileDiagnostics {
                path: path.to_string_lossy().to_string(),
                language: language.clone(),
                diagnostics: detector.analyze_source(&code, language),
            }),
            Err(e) => {
                warn!("skipping {}: {e}", path.display());
                None
            }
        })
        .collect();

    results.sort_by(|a, b| a.path.cmp(&b.path));
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use proptest::prelude::*;
    use std::fs;

    #[test]
    fn test_classify_inline_source() {
        assert_eq!(classify_input("x = 1", 500), SourceInput::Inline("x = 1"));
        // separator but multi-line
        let code = "import a/b\nx = 1";
        assert_eq!(classify_input(code, 500), SourceInput::Inline(code));
        // separator but missing on disk
        let missing = "/definitely/not/here.py";
        assert_eq!(classify_input(missing, 500), SourceInput::Inline(missing));
    }

    #[test]
    fn test_classify_existing_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("world.py");
        fs::write(&file, "x = 1\n").unwrap();
        let path_str = file.to_str().unwrap();

        assert_eq!(classify_input(path_str, 500), SourceInput::Path(file.as_path()));
        // longer than the bound: always inline
        assert_eq!(classify_input(path_str, 3), SourceInput::Inline(path_str));
    }

    #[test]
    fn test_analyze_code_reads_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("slow.cpp");
        fs::write(&file, "for (;;) {\n  for (;;) {}\n}\n").unwrap();

        let config = Config::default();
        let caps = Capabilities::resolve(&config);
        let detector = PatternDetector::new(&config.analysis, &caps);

        let model = detector
            .analyze_code(file.to_str().unwrap(), &Language::Cpp)
            .unwrap();
        assert_eq!(model.complexity_issues(), ["Line 1: Potential nested loop detected"]);
    }

    #[test]
    fn test_unreadable_path_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        // a directory exists but cannot be read as a file
        let input = dir.path().to_str().unwrap().to_string();

        let config = Config::default();
        let caps = Capabilities::resolve(&config);
        let detector = PatternDetector::new(&config.analysis, &caps);

        let err = detector.analyze_code(&input, &Language::Python).unwrap_err();
        assert!(matches!(err, AnalyzeError::Input { .. }));
    }

    #[test]
    fn test_python_without_syntax_tree_uses_line_scanner() {
        let config = Config::default();
        let detector = PatternDetector::new(&config.analysis, &Capabilities::minimal());

        let code = "for a in xs:\n    for b in ys:\n        time.sleep(1)\n";
        let model = detector.analyze_source(code, &Language::Python);
        assert_eq!(model.complexity_issues(), ["Line 1: Potential nested loop detected"]);
        assert_eq!(
            model.performance_bottlenecks(),
            [
                "Line 1: Nested loop may cause performance issues",
                "Line 3: Blocking operation detected",
            ]
        );
        assert_eq!(detector.syntax_error("def (:", &Language::Python), None);
    }

    #[test]
    fn test_scan_directory_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("systems")).unwrap();
        fs::write(dir.path().join("systems/physics.py"), "for a in x:\n    for b in y:\n        pass\n").unwrap();
        fs::write(dir.path().join("components.py"), "class Velocity:\n    pass\n").unwrap();
        fs::write(dir.path().join("notes.md"), "for for for").unwrap();

        let config = Config::default();
        let caps = Capabilities::resolve(&config);
        let detector = PatternDetector::new(&config.analysis, &caps);

        let results = scan_directory(&detector, dir.path());
        assert_eq!(results.len(), 2);
        assert!(results[0].path.ends_with("components.py"));
        assert!(results[0].diagnostics.is_clean());
        assert!(results[1].path.ends_with("physics.py"));
        assert_eq!(results[1].diagnostics.complexity_issues().len(), 1);
    }

    const SOURCE_LINES: [&str; 12] = [
        "def update(xs):",
        "for a in b:",
        "    for c in d:",
        "while running:",
        "        time.sleep(1)",
        "    out.append(v)",
        "    for i in range(len(xs)): ys.append(i)",
        "    usleep(100);",
        "    pass",
        "# wait here",
        "",
        "broken(:",
    ];

    proptest! {
        #[test]
        fn prop_detector_views_are_unions(
            lines in proptest::collection::vec(proptest::sample::select(SOURCE_LINES.to_vec()), 0..30),
        ) {
            let code = lines.join("\n");
            let config = Config::default();
            let caps = Capabilities::resolve(&config);
            let detector = PatternDetector::new(&config.analysis, &caps);

            for language in [Language::Python, Language::Cpp, Language::Rust] {
                let model = detector.analyze_source(&code, &language);
                let union: Vec<String> = model
                    .complexity_issues()
                    .iter()
                    .chain(model.performance_bottlenecks())
                    .cloned()
                    .collect();
                prop_assert_eq!(model.inefficiencies(), union.as_slice());
                prop_assert_eq!(model.bottlenecks(), model.performance_bottlenecks());
                prop_assert_eq!(model.performance_hotspots(), model.performance_bottlenecks());
            }
        }
    }
}
