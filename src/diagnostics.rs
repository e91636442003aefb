//! Diagnostic model - the findings of one analysis pass
//!
//! Every stage reads this record, none of them mutate it. The detector fills
//! a [`DiagnosticBuilder`] (append-only) and `finish()` derives the flattened
//! views, so `inefficiencies` and `bottlenecks` can never drift from the
//! categories they are built from.

use serde::Serialize;

/// Finding categories, in report order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    ComplexityIssues,
    PerformanceBottlenecks,
    HecsPatterns,
    CodeSmells,
    SecurityIssues,
    Inefficiencies,
    RedundantEntities,
    Bottlenecks,
    DependencyIssues,
    PerformanceHotspots,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::ComplexityIssues,
        Category::PerformanceBottlenecks,
        Category::HecsPatterns,
        Category::CodeSmells,
        Category::SecurityIssues,
        Category::Inefficiencies,
        Category::RedundantEntities,
        Category::Bottlenecks,
        Category::DependencyIssues,
        Category::PerformanceHotspots,
    ];

    /// Serialized key
    pub fn key(&self) -> &'static str {
        match self {
            Category::ComplexityIssues => "complexity_issues",
            Category::PerformanceBottlenecks => "performance_bottlenecks",
            Category::HecsPatterns => "hecs_patterns",
            Category::CodeSmells => "code_smells",
            Category::SecurityIssues => "security_issues",
            Category::Inefficiencies => "inefficiencies",
            Category::RedundantEntities => "redundant_entities",
            Category::Bottlenecks => "bottlenecks",
            Category::DependencyIssues => "dependency_issues",
            Category::PerformanceHotspots => "performance_hotspots",
        }
    }

    /// Human-readable title
    pub fn title(&self) -> &'static str {
        match self {
            Category::ComplexityIssues => "Complexity issues",
            Category::PerformanceBottlenecks => "Performance bottlenecks",
            Category::HecsPatterns => "HECS patterns",
            Category::CodeSmells => "Code smells",
            Category::SecurityIssues => "Security issues",
            Category::Inefficiencies => "Inefficiencies",
            Category::RedundantEntities => "Redundant entities",
            Category::Bottlenecks => "Bottlenecks",
            Category::DependencyIssues => "Dependency issues",
            Category::PerformanceHotspots => "Performance hotspots",
        }
    }

    /// Flattened views are derived from other categories
    pub fn is_derived(&self) -> bool {
        matches!(
            self,
            Category::Inefficiencies | Category::Bottlenecks | Category::PerformanceHotspots
        )
    }
}

/// Result of one analysis pass. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiagnosticModel {
    complexity_issues: Vec<String>,
    performance_bottlenecks: Vec<String>,
    hecs_patterns: Vec<String>,
    code_smells: Vec<String>,
    security_issues: Vec<String>,
    inefficiencies: Vec<String>,
    redundant_entities: Vec<String>,
    bottlenecks: Vec<String>,
    dependency_issues: Vec<String>,
    performance_hotspots: Vec<String>,
}

impl DiagnosticModel {
    /// Model for source the reference parser rejected
    pub fn syntax_error(message: impl Into<String>) -> Self {
        let mut builder = DiagnosticBuilder::new();
        builder.complexity(message);
        builder.finish()
    }

    pub fn category(&self, category: Category) -> &[String] {
        match category {
            Category::ComplexityIssues => &self.complexity_issues,
            Category::PerformanceBottlenecks => &self.performance_bottlenecks,
            Category::HecsPatterns => &self.hecs_patterns,
            Category::CodeSmells => &self.code_smells,
            Category::SecurityIssues => &self.security_issues,
            Category::Inefficiencies => &self.inefficiencies,
            Category::RedundantEntities => &self.redundant_entities,
            Category::Bottlenecks => &self.bottlenecks,
            Category::DependencyIssues => &self.dependency_issues,
            Category::PerformanceHotspots => &self.performance_hotspots,
        }
    }

    pub fn complexity_issues(&self) -> &[String] {
        &self.complexity_issues
    }

    pub fn performance_bottlenecks(&self) -> &[String] {
        &self.performance_bottlenecks
    }

    pub fn hecs_patterns(&self) -> &[String] {
        &self.hecs_patterns
    }

    pub fn code_smells(&self) -> &[String] {
        &self.code_smells
    }

    pub fn security_issues(&self) -> &[String] {
        &self.security_issues
    }

    pub fn inefficiencies(&self) -> &[String] {
        &self.inefficiencies
    }

    pub fn redundant_entities(&self) -> &[String] {
        &self.redundant_entities
    }

    pub fn bottlenecks(&self) -> &[String] {
        &self.bottlenecks
    }

    pub fn dependency_issues(&self) -> &[String] {
        &self.dependency_issues
    }

    pub fn performance_hotspots(&self) -> &[String] {
        &self.performance_hotspots
    }

    /// True when every category is empty
    pub fn is_clean(&self) -> bool {
        Category::ALL.iter().all(|c| self.category(*c).is_empty())
    }

    /// Primary (non-derived) categories that have at least one finding
    pub fn flagged_categories(&self) -> Vec<(Category, usize)> {
        Category::ALL
            .iter()
            .filter(|c| !c.is_derived())
            .map(|c| (*c, self.category(*c).len()))
            .filter(|(_, n)| *n > 0)
            .collect()
    }

    /// Copy the primary categories into a fresh builder (copy-on-derive)
    pub fn to_builder(&self) -> DiagnosticBuilder {
        DiagnosticBuilder {
            complexity_issues: self.complexity_issues.clone(),
            performance_bottlenecks: self.performance_bottlenecks.clone(),
            hecs_patterns: self.hecs_patterns.clone(),
            code_smells: self.code_smells.clone(),
            security_issues: self.security_issues.clone(),
            redundant_entities: self.redundant_entities.clone(),
            dependency_issues: self.dependency_issues.clone(),
        }
    }
}

/// Append-only collector used during a single analysis pass
#[derive(Debug, Default)]
pub struct DiagnosticBuilder {
    complexity_issues: Vec<String>,
    performance_bottlenecks: Vec<String>,
    hecs_patterns: Vec<String>,
    code_smells: Vec<String>,
    security_issues: Vec<String>,
    redundant_entities: Vec<String>,
    dependency_issues: Vec<String>,
}

impl DiagnosticBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn complexity(&mut self, message: impl Into<String>) -> &mut Self {
        self.complexity_issues.push(message.into());
        self
    }

    pub fn performance(&mut self, message: impl Into<String>) -> &mut Self {
        self.performance_bottlenecks.push(message.into());
        self
    }

    pub fn pattern(&mut self, message: impl Into<String>) -> &mut Self {
        self.hecs_patterns.push(message.into());
        self
    }

    pub fn smell(&mut self, message: impl Into<String>) -> &mut Self {
        self.code_smells.push(message.into());
        self
    }

    pub fn security(&mut self, message: impl Into<String>) -> &mut Self {
        self.security_issues.push(message.into());
        self
    }

    pub fn finish(self) -> DiagnosticModel {
        let inefficiencies = self
            .complexity_issues
            .iter()
            .chain(self.performance_bottlenecks.iter())
            .cloned()
            .collect();
        let bottlenecks = self.performance_bottlenecks.clone();
        let performance_hotspots = self.performance_bottlenecks.clone();

        DiagnosticModel {
            complexity_issues: self.complexity_issues,
            performance_bottlenecks: self.performance_bottlenecks,
            hecs_patterns: self.hecs_patterns,
            code_smells: self.code_smells,
            security_issues: self.security_issues,
            inefficiencies,
            redundant_entities: self.redundant_entities,
            bottlenecks,
            dependency_issues: self.dependency_issues,
            performance_hotspots,
        }
    }
}

// ============================================================================
// Derived metrics (dashboard numbers)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisMetrics {
    pub total_issues: usize,
    pub complexity_score: usize,
    pub performance_score: usize,
    pub quality_score: usize,
    pub lines_of_code: usize,
    pub refactoring_needed: bool,
    pub priority_areas: Vec<String>,
    pub estimated_improvement: usize,
}

impl AnalysisMetrics {
    pub fn compute(model: &DiagnosticModel, source: &str) -> Self {
        let total_issues = model.complexity_issues.len()
            + model.performance_bottlenecks.len()
            + model.code_smells.len()
            + model.security_issues.len();

        let mut priority_areas = Vec::new();
        if !model.performance_bottlenecks.is_empty() {
            priority_areas.push("Performance Optimization".to_string());
        }
        if !model.complexity_issues.is_empty() {
            priority_areas.push("Code Complexity Reduction".to_string());
        }
        if !model.code_smells.is_empty() {
            priority_areas.push("Code Quality Improvement".to_string());
        }
        if !model.security_issues.is_empty() {
            priority_areas.push("Security Fixes".to_string());
        }
        if priority_areas.is_empty() {
            priority_areas.push("Code is well-structured".to_string());
        }

        Self {
            total_issues,
            complexity_score: model.complexity_issues.len(),
            performance_score: 100usize.saturating_sub(model.performance_bottlenecks.len() * 10),
            quality_score: 100usize.saturating_sub(total_issues * 5),
            lines_of_code: source.split('\n').count(),
            refactoring_needed: total_issues > 3,
            priority_areas,
            estimated_improvement: (total_issues * 10).min(50),
        }
    }
}
