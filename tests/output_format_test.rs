//! Tests for the JSON and SARIF output formats.

use std::path::PathBuf;

use costcheck::inspect::{InspectionResult, Runner};
use costcheck::report::{self, JsonReport, SarifReport};
use costcheck::{InspectionConfig, ProjectModel};

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn run_model() -> InspectionResult {
    let model = ProjectModel::load(testdata_path().join("model.json")).expect("should load model");
    Runner::new(InspectionConfig::default()).run(&model)
}

fn run_and_get_json() -> JsonReport {
    report::build_json_report("testdata/model.json", "(defaults)", &run_model())
}

#[test]
fn test_json_report_structure() {
    let report = run_and_get_json();

    assert!(!report.version.is_empty(), "version should not be empty");
    assert_eq!(report.path, "testdata/model.json");
    assert_eq!(report.config, "(defaults)");
    assert!(report.passed, "no error-level problems expected");
    assert_eq!(report.files_analyzed, 1);
    assert_eq!(report.summary.errors, 0);
    assert_eq!(report.summary.warnings, 1);
    assert_eq!(report.summary.weak_warnings, 2);
}

#[test]
fn test_json_problems_format() {
    let report = run_and_get_json();
    assert_eq!(report.problems.len(), 3);

    for p in &report.problems {
        assert_eq!(p.rule, "expensive_api_usage");
        assert_eq!(p.file, "app/App.java");
        assert!(
            p.level == "error" || p.level == "warning" || p.level == "weak_warning",
            "unexpected level {}",
            p.level
        );
        assert!(p.line > 0 && p.column > 0);
    }
    assert_eq!(report.problems[0].classification.as_deref(), Some("loop"));
    assert_eq!(report.problems[1].classification.as_deref(), Some("single_call"));
}

#[test]
fn test_json_serialization() {
    let report = run_and_get_json();

    let json = serde_json::to_string_pretty(&report).expect("should serialize to JSON");
    let parsed: JsonReport = serde_json::from_str(&json).expect("should deserialize from JSON");

    assert_eq!(parsed.passed, report.passed);
    assert_eq!(parsed.problems.len(), report.problems.len());
    assert_eq!(parsed.problems[0].message, report.problems[0].message);
}

#[test]
fn test_sarif_format() {
    let report = report::build_sarif_report(&testdata_path(), &run_model());
    let json = serde_json::to_value(&report).expect("should serialize to JSON");

    assert_eq!(json["version"], "2.1.0");
    assert!(json["$schema"].as_str().unwrap().contains("sarif-schema-2.1.0"));

    let run = &json["runs"][0];
    assert_eq!(run["tool"]["driver"]["name"], "costcheck");
    assert_eq!(run["tool"]["driver"]["rules"][0]["id"], "expensive_api_usage");

    let results = run["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["level"], "warning");
    assert_eq!(results[1]["level"], "note");
    assert_eq!(
        results[0]["locations"][0]["physicalLocation"]["artifactLocation"]["uri"],
        "app/App.java"
    );
    assert_eq!(results[0]["locations"][0]["physicalLocation"]["region"]["startLine"], 8);

    let parsed: SarifReport = serde_json::from_value(json).expect("should deserialize SARIF");
    assert_eq!(parsed.runs[0].results.len(), 3);
}
