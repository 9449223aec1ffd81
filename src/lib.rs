//! OpenAPI from SDK - Rebuild an OpenAPI document from a generated TypeScript client SDK.
//!
//! Client SDKs emitted by OpenAPI generators keep everything needed to reconstruct the
//! API description: model classes carry a static `attributeTypeMap`, API classes carry one
//! async method per operation with the path template and HTTP method as literals. This
//! library parses that source with tree-sitter, extracts intermediate records, and assembles a validated
//! OpenAPI 3.0.3 document.
//!
//! # Architecture
//!
//! 1. [`scanner`] - Walks the SDK's `model/` and `api/` directories in a fixed order
//! 2. [`parser`] - Parses TypeScript with tree-sitter and visits classes, members and types
//! 3. [`type_mapper`] - Maps type annotations to schema descriptors
//! 4. [`extractor`] - Extracts models and operations from parsed units
//! 5. [`reconciler`] - Merges injected cross-cutting parameters into operations
//! 6. [`assembler`] - Folds everything into one document, with an audit log of overwrites
//! 7. [`schema_generator`] / [`openapi_builder`] - Render the OpenAPI object model
//! 8. [`validator`] - Reports and repairs structural defects
//! 9. [`serializer`] - Writes YAML or JSON and loads documents back
//!
//! Conventions (header names, injected parameter tables, document metadata) live in
//! [`config`].
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_from_sdk::{
//!     assembler::DocumentAssembler,
//!     cli::extract_units,
//!     config::GeneratorConfig,
//!     openapi_builder::build_document,
//!     parser::SourceParser,
//!     scanner::FileScanner,
//!     serializer::serialize_yaml,
//! };
//! use std::path::PathBuf;
//!
//! let config = GeneratorConfig::default();
//! let scan = FileScanner::new(PathBuf::from("./sdk")).scan().unwrap();
//!
//! let parse = |paths: &[PathBuf]| -> Vec<_> {
//!     SourceParser::parse_files(paths).into_iter().filter_map(Result::ok).collect()
//! };
//! let (models, operations) = extract_units(&parse(&scan.model_files), &parse(&scan.api_files), &config);
//!
//! let assembly = DocumentAssembler::new(&config.conventions).assemble(models, operations);
//! let document = build_document(&assembly.document, &config);
//! println!("{}", serialize_yaml(&document).unwrap());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod cli;
pub mod config;
pub mod error;
pub mod parser;
pub mod type_mapper;
pub mod extractor;
pub mod reconciler;
pub mod assembler;
pub mod schema_generator;
pub mod openapi_builder;
pub mod validator;
pub mod serializer;
pub mod scanner;
