//! Source scanners
//!
//! - `tree_sitter_python`: syntax-tree rules for the reference language
//! - `line_scanner`: line-oriented heuristics for everything else

pub mod line_scanner;
pub mod tree_sitter_python;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::Result;
use serde::{Serialize, Serializer};

use crate::diagnostics::DiagnosticModel;

/// Language tag of the analyzed source
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Language {
    /// Reference language, parsed into a syntax tree
    Python,
    Cpp,
    Rust,
    Other(String),
}

impl Language {
    pub fn as_str(&self) -> &str {
        match self {
            Language::Python => "python",
            Language::Cpp => "cpp",
            Language::Rust => "rust",
            Language::Other(tag) => tag,
        }
    }

    /// Line comment prefix used when annotating source
    pub fn comment_prefix(&self) -> &'static str {
        match self {
            Language::Python => "#",
            _ => "//",
        }
    }

    /// Guess from a file extension, `None` for files the scanner skips
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension().and_then(|e| e.to_str())?;
        match ext {
            "py" => Some(Language::Python),
            "rs" => Some(Language::Rust),
            "cpp" | "cc" | "cxx" | "hpp" | "h" => Some(Language::Cpp),
            _ => None,
        }
    }

    pub fn file_extension(&self) -> &str {
        match self {
            Language::Python => "py",
            Language::Cpp => "cpp",
            Language::Rust => "rs",
            Language::Other(_) => "txt",
        }
    }
}

impl FromStr for Language {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        Ok(match tag.as_str() {
            "python" | "py" => Language::Python,
            "cpp" | "c++" => Language::Cpp,
            "rust" | "rs" => Language::Rust,
            _ => Language::Other(tag),
        })
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Language {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A pass that turns source text into a diagnostic model
pub trait CodeAnalyzer {
    fn name(&self) -> &'static str;

    fn analyze(&self, code: &str) -> Result<DiagnosticModel>;
}
