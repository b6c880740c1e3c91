//! Inspection configuration.
//!
//! The configuration lists the marker annotations that flag an API as
//! expensive, the two ignore switches, and which paths count as library
//! code.

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::inspect::ClassificationScope;

/// Marker annotations enabled out of the box.
pub const DEFAULT_EXPENSIVE_API_ANNOTATIONS: &[&str] = &["asteroids.Expensive"];

/// Errors raised while loading or validating a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid {field} pattern {pattern:?}: {source}")]
    InvalidGlob {
        field: &'static str,
        pattern: String,
        source: globset::Error,
    },
    #[error("invalid annotation name {0:?}: expected a fully-qualified name")]
    InvalidAnnotation(String),
}

/// Ordered set of fully-qualified marker annotation names.
///
/// Insertion order is kept for display; duplicates are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct MarkerAnnotationSet(Vec<String>);

impl MarkerAnnotationSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Add a name; returns false if it was already present.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.0.contains(&name) {
            return false;
        }
        self.0.push(name);
        true
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|n| n != name);
        self.0.len() != before
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|n| n == name)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for MarkerAnnotationSet {
    fn default() -> Self {
        DEFAULT_EXPENSIVE_API_ANNOTATIONS
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .into()
    }
}

impl From<Vec<String>> for MarkerAnnotationSet {
    fn from(names: Vec<String>) -> Self {
        let mut set = MarkerAnnotationSet::new();
        for name in names {
            set.insert(name);
        }
        set
    }
}

impl From<MarkerAnnotationSet> for Vec<String> {
    fn from(set: MarkerAnnotationSet) -> Self {
        set.0
    }
}

/// Top-level inspection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InspectionConfig {
    /// Annotations that mark an API as expensive.
    #[serde(default)]
    pub expensive_api_annotations: MarkerAnnotationSet,
    /// Skip references that appear in import statements.
    #[serde(default)]
    pub ignore_inside_imports: bool,
    /// Skip APIs declared in project sources (only report library APIs).
    #[serde(default)]
    pub ignore_api_declared_in_this_project: bool,
    /// Also run the declaration-side "expensive type used in signature" check.
    #[serde(default = "default_true")]
    pub signature_inspection: bool,
    /// How far the loop/lambda context walk goes.
    #[serde(default)]
    pub classification_scope: ClassificationScope,
    /// Glob patterns for source paths that belong to library dependencies.
    #[serde(default)]
    pub library_paths: Vec<String>,
    /// Glob patterns for paths to leave out of the analysis entirely.
    #[serde(default)]
    pub excluded_paths: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl Default for InspectionConfig {
    fn default() -> Self {
        Self {
            expensive_api_annotations: MarkerAnnotationSet::default(),
            ignore_inside_imports: false,
            ignore_api_declared_in_this_project: false,
            signature_inspection: true,
            classification_scope: ClassificationScope::default(),
            library_paths: Vec::new(),
            excluded_paths: Vec::new(),
        }
    }
}

impl InspectionConfig {
    /// Parse a configuration from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::parse_str(&content)
    }

    pub fn parse_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Configured marker names as a slice.
    pub fn markers(&self) -> &[String] {
        self.expensive_api_annotations.as_slice()
    }

    /// Matcher for `library_paths`. Invalid patterns are skipped; run
    /// [`validate`] first to reject them.
    pub fn library_matcher(&self) -> GlobSet {
        build_glob_set(&self.library_paths)
    }

    /// Matcher for `excluded_paths`; empty when nothing is excluded.
    pub fn exclusion_matcher(&self) -> GlobSet {
        build_glob_set(&self.excluded_paths)
    }
}

fn build_glob_set(patterns: &[String]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        if let Ok(glob) = Glob::new(pattern) {
            builder.add(glob);
        }
    }
    builder.build().unwrap_or_else(|_| GlobSet::empty())
}

/// Validate a configuration for correctness.
pub fn validate(config: &InspectionConfig) -> Result<(), ConfigError> {
    for name in config.expensive_api_annotations.iter() {
        let valid = !name.is_empty()
            && name
                .split('.')
                .all(|part| !part.is_empty() && part.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$'));
        if !valid {
            return Err(ConfigError::InvalidAnnotation(name.clone()));
        }
    }

    for (field, patterns) in [
        ("library_paths", &config.library_paths),
        ("excluded_paths", &config.excluded_paths),
    ] {
        for pattern in patterns {
            Glob::new(pattern).map_err(|source| ConfigError::InvalidGlob {
                field,
                pattern: pattern.clone(),
                source,
            })?;
        }
    }

    Ok(())
}
