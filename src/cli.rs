use crate::assembler::{DocumentAssembler, Overwrite};
use crate::config::GeneratorConfig;
use crate::extractor::model::ModelExtractor;
use crate::extractor::operation::OperationExtractor;
use crate::extractor::{ModelSchema, Operation, SourceExtractor};
use crate::openapi_builder::build_document;
use crate::parser::{SourceParser, SourceUnit};
use crate::scanner::{FileScanner, ScanResult};
use crate::serializer::{read_document, serialize_json, serialize_yaml, write_to_file};
use crate::validator::{self, RepairOptions, ValidationReport};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// OpenAPI from SDK - Generate an OpenAPI document from a generated TypeScript SDK
#[derive(Parser, Debug)]
#[command(name = "openapi-from-sdk")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract, assemble, repair and validate a document from SDK sources
    Generate(GenerateArgs),
    /// Validate an existing JSON or YAML document
    Validate(ValidateArgs),
    /// Repair an existing JSON or YAML document
    Repair(RepairArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Path to the SDK root (the directory holding `api/` and `model/`)
    #[arg(value_name = "SDK_PATH")]
    pub sdk_path: PathBuf,

    /// API directory, relative to the SDK root
    #[arg(long = "api-dir", default_value = "api")]
    pub api_dir: String,

    /// Model directory, relative to the SDK root
    #[arg(long = "model-dir", default_value = "model")]
    pub model_dir: String,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Write the validation report as JSON
    #[arg(long = "report", value_name = "FILE")]
    pub report_path: Option<PathBuf>,

    /// YAML configuration file
    #[arg(long = "config", value_name = "FILE")]
    pub config_path: Option<PathBuf>,

    /// Replace dangling schema references with inline placeholders
    #[arg(long = "inline-dangling")]
    pub inline_dangling: bool,
}

impl GenerateArgs {
    pub fn new(sdk_path: impl Into<PathBuf>) -> Self {
        Self {
            sdk_path: sdk_path.into(),
            api_dir: "api".to_string(),
            model_dir: "model".to_string(),
            output_format: OutputFormat::Yaml,
            output_path: None,
            report_path: None,
            config_path: None,
            inline_dangling: false,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Document to validate (.json, .yaml or .yml)
    #[arg(value_name = "DOCUMENT")]
    pub document: PathBuf,

    /// Write the validation report as JSON
    #[arg(long = "report", value_name = "FILE")]
    pub report_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct RepairArgs {
    /// Document to repair (.json, .yaml or .yml)
    #[arg(value_name = "DOCUMENT")]
    pub document: PathBuf,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Replace dangling schema references with inline placeholders
    #[arg(long = "inline-dangling")]
    pub inline_dangling: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

/// Result of a `generate` run.
#[derive(Debug)]
pub struct Generated {
    /// The repaired document
    pub document: Value,
    /// Validation report of the repaired document
    pub report: ValidationReport,
    pub audit: Vec<Overwrite>,
    /// Number of changes made by repair
    pub repairs: usize,
    pub scan: ScanResult,
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    match &args.command {
        Command::Generate(generate) => {
            if !generate.sdk_path.is_dir() {
                anyhow::bail!("SDK path is not a directory: {}", generate.sdk_path.display());
            }
            info!("SDK path: {}", generate.sdk_path.display());
            info!("Output format: {:?}", generate.output_format);
        }
        Command::Validate(ValidateArgs { document, .. })
        | Command::Repair(RepairArgs { document, .. }) => {
            if !document.is_file() {
                anyhow::bail!("Document does not exist: {}", document.display());
            }
            info!("Document: {}", document.display());
        }
    }

    Ok(args)
}

/// Run the selected command
pub fn run(args: CliArgs) -> Result<()> {
    match args.command {
        Command::Generate(generate) => run_generate(&generate),
        Command::Validate(validate) => run_validate(&validate),
        Command::Repair(repair) => run_repair(&repair),
    }
}

fn run_generate(args: &GenerateArgs) -> Result<()> {
    let config = match &args.config_path {
        Some(path) => GeneratorConfig::load(path)
            .with_context(|| format!("Failed to load configuration: {}", path.display()))?,
        None => GeneratorConfig::default(),
    };

    let generated = generate(args, &config)?;
    log_report(&generated.report);
    if let Some(report_path) = &args.report_path {
        write_to_file(&serialize_json(&generated.report)?, report_path)?;
    }

    emit(&generated.document, args.output_format, args.output_path.as_deref())?;

    info!("Generation complete!");
    info!("Summary:");
    info!("  - Model units: {}", generated.scan.model_files.len());
    info!("  - API units: {}", generated.scan.api_files.len());
    info!("  - Schemas: {}", generated.report.stats.schemas);
    info!("  - Operations: {}", generated.report.stats.operations);
    info!("  - Overwrites: {}", generated.audit.len());
    info!("  - Repairs: {}", generated.repairs);
    info!("  - Remaining issues: {}", generated.report.issues.len());

    Ok(())
}

fn run_validate(args: &ValidateArgs) -> Result<()> {
    let document = read_document(&args.document)?;
    let report = validator::validate(&document);
    log_report(&report);
    if let Some(report_path) = &args.report_path {
        write_to_file(&serialize_json(&report)?, report_path)?;
    }

    for issue in &report.issues {
        println!("{}", issue);
    }
    if !report.is_valid() {
        anyhow::bail!(
            "{} issues remain in {}",
            report.issues.len(),
            args.document.display()
        );
    }
    info!("{} is valid", args.document.display());
    Ok(())
}

fn run_repair(args: &RepairArgs) -> Result<()> {
    let mut document = read_document(&args.document)?;
    let options = RepairOptions {
        inline_dangling: args.inline_dangling,
    };
    let changes = validator::repair_in_place(&mut document, &options);
    info!("Applied {} repairs to {}", changes, args.document.display());

    log_report(&validator::validate(&document));
    emit(&document, args.output_format, args.output_path.as_deref())
}

/// Runs the whole pipeline over an SDK tree.
///
/// Scan → parse → extract models and operations → assemble → render → repair → validate.
/// Only a missing source root aborts the run; unreadable or unrecognized units are skipped.
pub fn generate(args: &GenerateArgs, config: &GeneratorConfig) -> Result<Generated> {
    info!("Scanning SDK directory...");
    let scan = FileScanner::new(args.sdk_path.clone())
        .with_dirs(args.api_dir.as_str(), args.model_dir.as_str())
        .scan()?;
    info!(
        "Found {} model units and {} API units",
        scan.model_files.len(),
        scan.api_files.len()
    );
    if scan.total() == 0 {
        warn!("No source units found under {}", args.sdk_path.display());
    }

    info!("Parsing source units...");
    let model_units = parse_units(&scan.model_files);
    let api_units = parse_units(&scan.api_files);

    info!("Extracting models and operations...");
    let (models, operations) = extract_units(&model_units, &api_units, config);
    info!(
        "Extracted {} models and {} operations",
        models.len(),
        operations.iter().map(Vec::len).sum::<usize>()
    );

    info!("Assembling document...");
    let assembly = DocumentAssembler::new(&config.conventions).assemble(models, operations);
    let rendered = build_document(&assembly.document, config);
    let mut document =
        serde_json::to_value(&rendered).context("Failed to convert OpenAPI document")?;

    info!("Repairing and validating document...");
    let options = RepairOptions {
        inline_dangling: args.inline_dangling,
    };
    let repairs = validator::repair_in_place(&mut document, &options);
    let report = validator::validate(&document);

    Ok(Generated {
        document,
        report,
        audit: assembly.audit,
        repairs,
        scan,
    })
}

fn parse_units(paths: &[PathBuf]) -> Vec<SourceUnit> {
    SourceParser::parse_files(paths)
        .into_iter()
        .filter_map(|r| match r {
            Ok(unit) => Some(unit),
            Err(e) => {
                debug!("Skipping unit due to read error: {}", e);
                None
            }
        })
        .collect()
}

/// Extracts models and per-unit operation lists, preserving unit order.
pub fn extract_units(
    model_units: &[SourceUnit],
    api_units: &[SourceUnit],
    config: &GeneratorConfig,
) -> (Vec<ModelSchema>, Vec<Vec<Operation>>) {
    let model_extractor = ModelExtractor::new(&config.conventions);
    let models = model_units
        .iter()
        .filter_map(|unit| {
            let model = model_extractor.extract(unit);
            if model.is_none() {
                warn!("No model found in {}, skipping", unit.path.display());
            }
            model
        })
        .collect();

    let operation_extractor = OperationExtractor::new(&config.conventions);
    let operations = api_units
        .iter()
        .map(|unit| {
            let operations = operation_extractor.extract(unit);
            if operations.is_empty() {
                warn!("No operations found in {}", unit.path.display());
            }
            operations
        })
        .collect();

    (models, operations)
}

fn log_report(report: &ValidationReport) {
    for issue in &report.issues {
        warn!("{}", issue);
    }
    let stats = &report.stats;
    info!(
        "Document: {} schemas, {} paths, {} operations, {} references, {} request bodies, {} parameters",
        stats.schemas,
        stats.paths,
        stats.operations,
        stats.references,
        stats.request_bodies,
        stats.parameters
    );
}

fn emit<T: Serialize>(document: &T, format: OutputFormat, output_path: Option<&Path>) -> Result<()> {
    info!("Serializing to {:?} format...", format);
    let content = match format {
        OutputFormat::Yaml => serialize_yaml(document)?,
        OutputFormat::Json => serialize_json(document)?,
    };

    match output_path {
        Some(path) => {
            write_to_file(&content, path)?;
            info!("Successfully wrote OpenAPI document to {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_generate_args() {
        let args = CliArgs::try_parse_from([
            "openapi-from-sdk",
            "-v",
            "generate",
            "./sdk",
            "-f",
            "json",
            "-o",
            "out.json",
            "--inline-dangling",
        ])
        .unwrap();

        assert!(args.verbose);
        match args.command {
            Command::Generate(generate) => {
                assert_eq!(generate.sdk_path, PathBuf::from("./sdk"));
                assert_eq!(generate.api_dir, "api");
                assert_eq!(generate.model_dir, "model");
                assert_eq!(generate.output_format, OutputFormat::Json);
                assert_eq!(generate.output_path, Some(PathBuf::from("out.json")));
                assert!(generate.inline_dangling);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_verbose_flag_is_global() {
        let args = CliArgs::try_parse_from(["openapi-from-sdk", "validate", "doc.yaml", "--verbose"]).unwrap();
        assert!(args.verbose);
    }

    #[test]
    fn test_missing_sdk_path_is_rejected() {
        let args = CliArgs::try_parse_from(["openapi-from-sdk", "generate", "/definitely/not/here"]).unwrap();
        assert!(parse_args_from_parsed(args).is_err());
    }

    #[test]
    fn test_validate_fails_when_issues_remain() {
        let temp_dir = TempDir::new().unwrap();
        let doc = temp_dir.path().join("doc.json");
        fs::write(&doc, r#"{"openapi": "3.0.3", "paths": {}}"#).unwrap();

        let result = run_validate(&ValidateArgs {
            document: doc,
            report_path: Some(temp_dir.path().join("report.json")),
        });
        assert!(result.is_err());

        let report: Value =
            serde_json::from_str(&fs::read_to_string(temp_dir.path().join("report.json")).unwrap()).unwrap();
        assert_eq!(report["issues"][0]["kind"], "MissingRequiredField");
    }

    #[test]
    fn test_repair_writes_output() {
        let temp_dir = TempDir::new().unwrap();
        let doc = temp_dir.path().join("doc.yaml");
        fs::write(
            &doc,
            "openapi: 3.0.3\ninfo:\n  title: T\n  version: '1'\npaths: {}\ncomponents:\n  schemas:\n    A:\n      type: object\n      properties:\n        x:\n          $ref: '#/components/schemas/object'\n",
        )
        .unwrap();
        let output = temp_dir.path().join("fixed.json");

        run_repair(&RepairArgs {
            document: doc,
            output_path: Some(output.clone()),
            output_format: OutputFormat::Json,
            inline_dangling: false,
        })
        .unwrap();

        let fixed = read_document(&output).unwrap();
        assert_eq!(
            fixed["components"]["schemas"]["A"]["properties"]["x"],
            serde_json::json!({"type": "object"})
        );
    }
}
