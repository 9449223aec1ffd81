//! OpenAPI from SDK - Command-line tool for generating OpenAPI documents from a TypeScript SDK.
//!
//! The binary reads the model and API classes of a generated `typescript-node` SDK,
//! reconstructs the operations and schemas they describe, and writes an OpenAPI 3.0.3
//! document. Existing documents can also be validated or repaired.
//!
//! # Usage
//!
//! ```bash
//! openapi-from-sdk [OPTIONS] <COMMAND>
//! ```
//!
//! # Examples
//!
//! Generate YAML documentation:
//! ```bash
//! openapi-from-sdk generate ./sdk -o openapi.yaml
//! ```
//!
//! Generate JSON with a validation report:
//! ```bash
//! openapi-from-sdk generate ./sdk -f json -o openapi.json --report report.json
//! ```
//!
//! Check an existing document:
//! ```bash
//! openapi-from-sdk validate openapi.yaml
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use openapi_from_sdk::cli;

fn main() -> Result<()> {
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("OpenAPI from SDK starting...");

    let args = cli::parse_args_from_parsed(args)?;
    cli::run(args)?;

    info!("Done");

    Ok(())
}
