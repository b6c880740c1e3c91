//! Output formatting for costcheck results.
//!
//! Supports three output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption
//! - SARIF: Static Analysis Results Interchange Format for IDE/CI integration

use colored::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use crate::inspect::{HighlightLevel, InspectionResult, Problem, ProblemRule};

// =============================================================================
// JSON Format
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonReport {
    pub version: String,
    pub path: String,
    pub config: String,
    pub passed: bool,
    pub files_analyzed: usize,
    pub files_skipped: usize,
    pub problems: Vec<JsonProblem>,
    pub summary: JsonSummary,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonProblem {
    pub rule: String,
    pub level: String,
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,
}

/// Problem counts per highlight level.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonSummary {
    pub errors: usize,
    pub warnings: usize,
    pub weak_warnings: usize,
}

/// Build the JSON report for a run.
pub fn build_json_report(path: &str, config_path: &str, result: &InspectionResult) -> JsonReport {
    JsonReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        path: path.to_string(),
        config: config_path.to_string(),
        passed: !result.has_errors(),
        files_analyzed: result.analyzed,
        files_skipped: result.skipped,
        problems: result.problems.iter().map(problem_to_json).collect(),
        summary: JsonSummary {
            errors: result.count_at(HighlightLevel::GenericError),
            warnings: result.count_at(HighlightLevel::GenericErrorOrWarning),
            weak_warnings: result.count_at(HighlightLevel::WeakWarning),
        },
    }
}

/// Write results in JSON format.
pub fn write_json(path: &str, config_path: &str, result: &InspectionResult) -> anyhow::Result<()> {
    let report = build_json_report(path, config_path, result);
    let json = serde_json::to_string_pretty(&report)?;
    println!("{}", json);
    Ok(())
}

fn problem_to_json(p: &Problem) -> JsonProblem {
    JsonProblem {
        rule: p.rule.as_str().to_string(),
        level: p.level.as_str().to_string(),
        file: p.file.clone(),
        line: p.line,
        column: p.column,
        message: p.message.clone(),
        classification: p.classification.map(|c| c.as_str().to_string()),
    }
}

// =============================================================================
// SARIF Format
// =============================================================================

const SARIF_VERSION: &str = "2.1.0";
const SARIF_SCHEMA: &str = "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json";
const TOOL_NAME: &str = "costcheck";

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifReport {
    pub version: String,
    #[serde(rename = "$schema")]
    pub schema: String,
    pub runs: Vec<SarifRun>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifRun {
    pub tool: SarifTool,
    pub results: Vec<SarifResult>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifTool {
    pub driver: SarifDriver,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifDriver {
    pub name: String,
    pub version: String,
    pub rules: Vec<SarifRule>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifRule {
    pub id: String,
    pub name: String,
    #[serde(rename = "shortDescription")]
    pub short_description: SarifMessage,
    #[serde(rename = "fullDescription", skip_serializing_if = "Option::is_none")]
    pub full_description: Option<SarifMessage>,
    #[serde(rename = "defaultConfiguration")]
    pub default_config: SarifRuleConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifRuleConfig {
    pub level: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifResult {
    #[serde(rename = "ruleId")]
    pub rule_id: String,
    pub level: String,
    pub message: SarifMessage,
    pub locations: Vec<SarifLocation>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifMessage {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifLocation {
    #[serde(rename = "physicalLocation")]
    pub physical_location: SarifPhysicalLocation,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifPhysicalLocation {
    #[serde(rename = "artifactLocation")]
    pub artifact_location: SarifArtifact,
    pub region: SarifRegion,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifArtifact {
    pub uri: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifRegion {
    #[serde(rename = "startLine")]
    pub start_line: usize,
    #[serde(rename = "startColumn")]
    pub start_column: usize,
}

/// Rule metadata for SARIF output.
struct RuleInfo {
    name: &'static str,
    short_description: &'static str,
    full_description: &'static str,
    default_level: &'static str,
}

fn get_rule_info(rule: ProblemRule) -> RuleInfo {
    match rule {
        ProblemRule::ExpensiveApiUsage => RuleInfo {
            name: "ExpensiveApiUsage",
            short_description: "Reports usages of APIs marked as expensive",
            full_description: "Reports method calls, constructor invocations, references, imports and overrides of declarations marked with an expensive-API annotation, directly or through their containing class or package. Severity depends on whether the usage sits inside a loop or a lambda.",
            default_level: "warning",
        },
        ProblemRule::ExpensiveTypeInSignature => RuleInfo {
            name: "ExpensiveTypeUsedInSignature",
            short_description: "Reports accessible declarations exposing an expensive type in their signature",
            full_description: "Reports public classes, methods and fields whose supertypes, return type, parameter types or field type reference a type marked as expensive, while the declaration itself is not marked.",
            default_level: "warning",
        },
    }
}

fn map_level(level: HighlightLevel) -> &'static str {
    match level {
        HighlightLevel::GenericError => "error",
        HighlightLevel::GenericErrorOrWarning => "warning",
        HighlightLevel::WeakWarning => "note",
    }
}

fn make_relative_path(file_path: &str, base_path: &Path) -> String {
    if base_path.to_string_lossy().is_empty() {
        return file_path.to_string();
    }

    let file = Path::new(file_path);
    if file == base_path {
        return file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| file_path.to_string());
    }

    file.strip_prefix(base_path)
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_else(|_| file_path.to_string())
}

/// Build the SARIF report for a run. Rules are listed in a stable order.
pub fn build_sarif_report(base_path: &Path, result: &InspectionResult) -> SarifReport {
    let rule_set: BTreeSet<&'static str> = result.problems.iter().map(|p| p.rule.as_str()).collect();

    let rules: Vec<SarifRule> = rule_set
        .into_iter()
        .filter_map(ProblemRule::parse)
        .map(|rule| {
            let info = get_rule_info(rule);
            SarifRule {
                id: rule.as_str().to_string(),
                name: info.name.to_string(),
                short_description: SarifMessage {
                    text: info.short_description.to_string(),
                },
                full_description: Some(SarifMessage {
                    text: info.full_description.to_string(),
                }),
                default_config: SarifRuleConfig {
                    level: info.default_level.to_string(),
                },
            }
        })
        .collect();

    let results: Vec<SarifResult> = result
        .problems
        .iter()
        .map(|p| SarifResult {
            rule_id: p.rule.as_str().to_string(),
            level: map_level(p.level).to_string(),
            message: SarifMessage {
                text: p.message.clone(),
            },
            locations: vec![SarifLocation {
                physical_location: SarifPhysicalLocation {
                    artifact_location: SarifArtifact {
                        uri: make_relative_path(&p.file, base_path),
                    },
                    region: SarifRegion {
                        start_line: p.line.max(1),
                        start_column: p.column.max(1),
                    },
                },
            }],
        })
        .collect();

    SarifReport {
        version: SARIF_VERSION.to_string(),
        schema: SARIF_SCHEMA.to_string(),
        runs: vec![SarifRun {
            tool: SarifTool {
                driver: SarifDriver {
                    name: TOOL_NAME.to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    rules,
                },
            },
            results,
        }],
    }
}

/// Write results in SARIF format.
pub fn write_sarif(base_path: &Path, result: &InspectionResult) -> anyhow::Result<()> {
    let report = build_sarif_report(base_path, result);
    let json = serde_json::to_string_pretty(&report)?;
    println!("{}", json);
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write results in pretty (human-readable) format.
pub fn write_pretty(path: &str, config_path: &str, result: &InspectionResult) {
    // Header
    println!();
    print!("  ");
    print!("{}", "costcheck".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    print!("  {}", "Scanning: ".dimmed());
    println!("{}", path);
    print!("  {}", "Config:   ".dimmed());
    println!("{}", config_path);
    println!();

    write_result_summary(result);
    println!();

    if !result.problems.is_empty() {
        write_problems(&result.problems);
        println!();
    }

    write_final_status(result);
    println!();
}

fn write_result_summary(result: &InspectionResult) {
    if result.has_errors() {
        print!("  {}", "✗ FAIL".red());
    } else {
        print!("  {}", "✓ PASS".green());
    }

    print!(
        "  Files: {} analyzed",
        result.analyzed.to_string().bold()
    );
    if result.skipped > 0 {
        print!("{}", format!(" ({} skipped)", result.skipped).dimmed());
    }
    println!();
}

fn write_problems(problems: &[Problem]) {
    println!("  {} ({}):", "Problems".bold(), problems.len());
    println!();

    for p in problems {
        write_level_tag(p.level);
        print!("   ");
        print!("{:<28}", p.rule.as_str().dimmed());
        print!("{}", p.file.blue());
        if p.line > 0 {
            print!("{}", format!(":{}:{}", p.line, p.column).dimmed());
        }
        if let Some(c) = p.classification {
            print!("  {}", format!("[{}]", c).dimmed());
        }
        println!();

        // Message on next line, indented
        println!("            {}", p.message);
        println!();
    }
}

fn write_level_tag(level: HighlightLevel) {
    match level {
        HighlightLevel::GenericError => print!("    {} ", "ERROR".red()),
        HighlightLevel::GenericErrorOrWarning => print!("    {} ", "WARN ".yellow()),
        HighlightLevel::WeakWarning => print!("    {} ", "WEAK ".blue()),
    }
}

fn write_final_status(result: &InspectionResult) {
    let errors = result.count_at(HighlightLevel::GenericError);
    let warnings = result.count_at(HighlightLevel::GenericErrorOrWarning);
    let weak = result.count_at(HighlightLevel::WeakWarning);

    print!(
        "  {}",
        format!("{} errors, {} warnings, {} weak warnings", errors, warnings, weak).dimmed()
    );
    print!("  ");
    if result.has_errors() {
        print!("{}", "FAILED".red());
    } else {
        print!("{}", "PASSED".green());
    }
    println!();
}
