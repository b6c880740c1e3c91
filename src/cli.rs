//! Command-line interface for costcheck.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::config::{self, InspectionConfig};
use crate::frontend;
use crate::inspect::{InspectionResult, Runner};
use crate::report;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Default config file names to search for.
const DEFAULT_CONFIG_NAMES: &[&str] = &["costcheck.yaml", ".costcheck.yaml"];

/// Flag usages of APIs annotated as expensive.
///
/// Costcheck reports calls, constructor invocations, references, imports
/// and overrides of declarations marked with an expensive-API annotation,
/// either directly or through their class or package. Usages inside loops
/// and lambdas are reported more prominently than plain calls.
#[derive(Parser)]
#[command(name = "costcheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect sources for expensive API usage
    #[command(visible_alias = "check")]
    Lint(LintArgs),
    /// Create a costcheck config file from a template
    Init(InitArgs),
}

/// Arguments for the lint command.
#[derive(Parser)]
pub struct LintArgs {
    /// Path to inspect: a source directory, a .java file or a model .json
    pub path: PathBuf,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format: pretty, json, or sarif
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Do not report references inside import statements
    #[arg(long)]
    pub ignore_imports: bool,

    /// Only report APIs declared in library code
    #[arg(long)]
    pub ignore_project_api: bool,

    /// Skip the expensive-type-in-signature inspection
    #[arg(long)]
    pub no_signature_inspection: bool,

    /// Fail on any problem, not only errors
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "costcheck.yaml")]
    pub output: PathBuf,

    /// Template to use
    #[arg(short, long, default_value = "default")]
    pub template: String,

    /// List available templates
    #[arg(short, long)]
    pub list: bool,
}

/// Available config templates.
struct Template {
    name: &'static str,
    description: &'static str,
    content: &'static str,
}

static TEMPLATES: &[Template] = &[
    Template {
        name: "default",
        description: "Report every expensive API usage, with the signature inspection",
        content: include_str!("templates/default.yaml"),
    },
    Template {
        name: "library",
        description: "Only report expensive APIs from vendored library sources",
        content: include_str!("templates/library.yaml"),
    },
];

/// Discover a config file in the current directory.
fn discover_config() -> Option<PathBuf> {
    DEFAULT_CONFIG_NAMES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

/// Load the config named on the command line, a discovered one, or the
/// defaults. Command-line switches override file settings.
fn load_config(args: &LintArgs) -> anyhow::Result<(InspectionConfig, String)> {
    let path = args.config.clone().or_else(discover_config);
    let (mut config, label) = match path {
        Some(p) => (
            InspectionConfig::parse_file(&p)?,
            p.to_string_lossy().to_string(),
        ),
        None => {
            warn!(
                "no config file found (looked for {}), using defaults",
                DEFAULT_CONFIG_NAMES.join(", ")
            );
            (InspectionConfig::default(), "(defaults)".to_string())
        }
    };

    if args.ignore_imports {
        config.ignore_inside_imports = true;
    }
    if args.ignore_project_api {
        config.ignore_api_declared_in_this_project = true;
    }
    if args.no_signature_inspection {
        config.signature_inspection = false;
    }
    Ok((config, label))
}

/// Exit code for a finished run.
pub fn exit_code(result: &InspectionResult, strict: bool) -> i32 {
    if result.has_errors() || (strict && !result.problems.is_empty()) {
        EXIT_FAILED
    } else {
        EXIT_SUCCESS
    }
}

/// Run the lint command.
pub fn run_lint(args: &LintArgs) -> anyhow::Result<i32> {
    if args.format != "pretty" && args.format != "json" && args.format != "sarif" {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty', 'json', or 'sarif'",
            args.format
        );
        return Ok(EXIT_ERROR);
    }

    let (config, config_label) = match load_config(args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error parsing config: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    if let Err(e) = config::validate(&config) {
        eprintln!("Error: invalid config: {}", e);
        return Ok(EXIT_ERROR);
    }

    let abs_path = match args.path.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: cannot access path {:?}: {}", args.path, e);
            return Ok(EXIT_ERROR);
        }
    };

    let model = frontend::load_project(&abs_path, &config)?;
    if model.file_count() == 0 {
        eprintln!("Warning: no files to inspect");
        return Ok(EXIT_SUCCESS);
    }

    let result = Runner::new(config).run(&model);

    let path_str = args.path.to_string_lossy().to_string();
    match args.format.as_str() {
        "json" => report::write_json(&path_str, &config_label, &result)?,
        "sarif" => report::write_sarif(&abs_path, &result)?,
        _ => report::write_pretty(&path_str, &config_label, &result),
    }

    Ok(exit_code(&result, args.strict))
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    if args.list {
        return list_templates();
    }

    let template = match TEMPLATES.iter().find(|t| t.name == args.template) {
        Some(t) => t,
        None => {
            eprintln!("Error: unknown template {:?}", args.template);
            eprintln!("Run 'costcheck init --list' to see available templates");
            return Ok(EXIT_ERROR);
        }
    };

    if args.output.exists() {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Remove it or use --output to specify a different path");
        return Ok(EXIT_ERROR);
    }

    // Create output directory if needed
    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Error: failed to create directory: {}", e);
                return Ok(EXIT_ERROR);
            }
        }
    }

    if let Err(e) = std::fs::write(&args.output, template.content) {
        eprintln!("Error: failed to write config: {}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {} from template '{}'", args.output.display(), template.name);
    println!();
    println!("Next steps:");
    println!("  1. List your marker annotations in {}", args.output.display());
    println!("  2. Run: costcheck lint . --config {}", args.output.display());

    Ok(EXIT_SUCCESS)
}

fn list_templates() -> anyhow::Result<i32> {
    println!("Available templates:");
    println!();

    for template in TEMPLATES {
        let name = if template.name == "default" {
            format!("{} (default)", template.name)
        } else {
            template.name.to_string()
        };
        println!("  {:<20} {}", name, template.description);
    }

    println!();
    println!("Usage:");
    println!("  costcheck init --template <name>");

    Ok(EXIT_SUCCESS)
}
