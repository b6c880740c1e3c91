//! Costcheck - static inspection for expensive API usage.
//!
//! APIs are marked expensive with an annotation (for example
//! `@asteroids.Expensive`) on a method, field, class or package. Costcheck
//! reports the places that use such APIs, grading each usage by whether it
//! sits in a loop, in a lambda or on its own.
//!
//! # Architecture
//!
//! - `model`: language-agnostic code model (files, nodes, declarations,
//!   usages) behind the [`CodeModel`] trait
//! - `frontend`: builds a [`ProjectModel`] from Java sources with
//!   tree-sitter, or loads a serialized one
//! - `inspect`: the two inspections and the runner
//! - `config`: YAML inspection configuration
//! - `report`: output formatting (pretty, JSON, SARIF)
//!
//! # Example
//!
//! ```no_run
//! use costcheck::{InspectionConfig, Runner};
//! use std::path::Path;
//!
//! let config = InspectionConfig::default();
//! let model = costcheck::frontend::load_project(Path::new("src/main/java"), &config)?;
//! let result = Runner::new(config).run(&model);
//! for problem in &result.problems {
//!     println!("{}:{} {}", problem.file, problem.line, problem.message);
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod cli;
pub mod config;
pub mod frontend;
pub mod inspect;
pub mod model;
pub mod report;

pub use config::{ConfigError, InspectionConfig};
pub use inspect::{
    ExpensiveApiUsage, ExpensiveTypeUsedInSignature, HighlightLevel, InspectionResult, Problem,
    ProblemRule, ProblemSink, ProblemsHolder, Runner, UsageClassification,
};
pub use model::{CodeModel, ModelError, ProjectModel};
