//! Core types for inspection results.

use serde::{Deserialize, Serialize};

use super::UsageClassification;

/// How prominently a problem is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightLevel {
    WeakWarning,
    GenericErrorOrWarning,
    GenericError,
}

impl HighlightLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            HighlightLevel::WeakWarning => "weak_warning",
            HighlightLevel::GenericErrorOrWarning => "warning",
            HighlightLevel::GenericError => "error",
        }
    }
}

impl std::fmt::Display for HighlightLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which inspection produced a problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProblemRule {
    #[serde(rename = "expensive_api_usage")]
    ExpensiveApiUsage,
    #[serde(rename = "expensive_type_in_signature")]
    ExpensiveTypeInSignature,
}

impl ProblemRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemRule::ExpensiveApiUsage => "expensive_api_usage",
            ProblemRule::ExpensiveTypeInSignature => "expensive_type_in_signature",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "expensive_api_usage" => Some(ProblemRule::ExpensiveApiUsage),
            "expensive_type_in_signature" => Some(ProblemRule::ExpensiveTypeInSignature),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProblemRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single reported problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub rule: ProblemRule,
    pub message: String,
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub level: HighlightLevel,
    /// Usage context for `expensive_api_usage` problems.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<UsageClassification>,
}

/// Receives problems as the inspections find them.
pub trait ProblemSink {
    fn register_problem(&mut self, problem: Problem);
}

/// Collects problems in the order they are registered.
#[derive(Debug, Default)]
pub struct ProblemsHolder {
    problems: Vec<Problem>,
}

impl ProblemsHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    pub fn into_problems(self) -> Vec<Problem> {
        self.problems
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }
}

impl ProblemSink for ProblemsHolder {
    fn register_problem(&mut self, problem: Problem) {
        self.problems.push(problem);
    }
}

/// Results of running the inspections over a model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InspectionResult {
    pub problems: Vec<Problem>,
    /// Number of files traversed
    pub analyzed: usize,
    /// Files skipped because no marker annotation can apply to them
    #[serde(default)]
    pub skipped: usize,
}

impl InspectionResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if there are any error-level problems.
    pub fn has_errors(&self) -> bool {
        self.problems
            .iter()
            .any(|p| p.level == HighlightLevel::GenericError)
    }

    /// Number of problems at the given level.
    pub fn count_at(&self, level: HighlightLevel) -> usize {
        self.problems.iter().filter(|p| p.level == level).count()
    }

    /// Problems produced by one rule.
    pub fn problems_for(&self, rule: ProblemRule) -> impl Iterator<Item = &Problem> {
        self.problems.iter().filter(move |p| p.rule == rule)
    }
}
