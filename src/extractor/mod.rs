//! Extraction of intermediate records from parsed SDK source units.
//!
//! Two extractors walk the syntax tree produced by [`crate::parser`]:
//!
//! - **Models**: See [`model::ModelExtractor`], one [`ModelSchema`] per model unit
//! - **Operations**: See [`operation::OperationExtractor`], zero or more [`Operation`]s per API unit
//!
//! Both degrade gracefully: a unit or member that lacks an expected pattern is skipped with
//! a diagnostic and never aborts extraction.
//!
//! # Example
//!
//! ```no_run
//! use openapi_from_sdk::config::Conventions;
//! use openapi_from_sdk::extractor::{SourceExtractor, operation::OperationExtractor};
//! use openapi_from_sdk::parser::SourceParser;
//! use std::path::Path;
//!
//! let unit = SourceParser::parse_file(Path::new("sdk/api/productV202309Api.ts")).unwrap();
//! let conventions = Conventions::default();
//! let extractor = OperationExtractor::new(&conventions);
//! let operations = extractor.extract(&unit);
//! println!("Found {} operations", operations.len());
//! ```

pub mod model;
pub mod operation;

use crate::parser::SourceUnit;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trait for extracting intermediate records from one parsed source unit.
///
/// Implementations never fail: anything they cannot make sense of yields an empty output.
pub trait SourceExtractor {
    type Output;

    /// Extracts records from a single unit.
    fn extract(&self, unit: &SourceUnit) -> Self::Output;
}

/// Primitive schema kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    String,
    Number,
    Integer,
    Boolean,
}

impl PrimitiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveKind::String => "string",
            PrimitiveKind::Number => "number",
            PrimitiveKind::Integer => "integer",
            PrimitiveKind::Boolean => "boolean",
        }
    }
}

/// Schema type descriptor produced by the type mapper.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaType {
    Primitive(PrimitiveKind),
    /// A string with `date-time` format
    DateTime,
    Array(Box<SchemaType>),
    /// Named pointer into the document's schema table
    Reference(String),
    /// Inline object with ordered properties
    Object {
        properties: IndexMap<String, SchemaType>,
        required: Vec<String>,
    },
    /// Unknown or untyped; renders as an open object
    Any,
}

impl SchemaType {
    pub fn string() -> Self {
        SchemaType::Primitive(PrimitiveKind::String)
    }

    pub fn number() -> Self {
        SchemaType::Primitive(PrimitiveKind::Number)
    }

    pub fn integer() -> Self {
        SchemaType::Primitive(PrimitiveKind::Integer)
    }

    pub fn boolean() -> Self {
        SchemaType::Primitive(PrimitiveKind::Boolean)
    }

    pub fn array(item: SchemaType) -> Self {
        SchemaType::Array(Box::new(item))
    }

    pub fn reference(name: impl Into<String>) -> Self {
        SchemaType::Reference(name.into())
    }

    /// Names of every schema referenced from this descriptor, depth-first.
    pub fn references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            SchemaType::Reference(name) => out.push(name),
            SchemaType::Array(item) => item.collect_references(out),
            SchemaType::Object { properties, .. } => {
                for prop in properties.values() {
                    prop.collect_references(out);
                }
            }
            _ => {}
        }
    }
}

/// One property of a model schema.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySchema {
    pub schema: SchemaType,
    pub description: Option<String>,
}

/// A named object schema extracted from one model unit.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSchema {
    pub name: String,
    /// Properties keyed by wire name, in declaration order
    pub properties: IndexMap<String, PropertySchema>,
    /// Required property names, a subset of `properties`
    pub required: Vec<String>,
    pub description: Option<String>,
}

/// HTTP methods an operation can be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Delete => "delete",
            HttpMethod::Patch => "patch",
        }
    }

    /// Parses a verb case-insensitively.
    pub fn parse(verb: &str) -> Option<Self> {
        match verb.trim().to_ascii_lowercase().as_str() {
            "get" => Some(HttpMethod::Get),
            "post" => Some(HttpMethod::Post),
            "put" => Some(HttpMethod::Put),
            "delete" => Some(HttpMethod::Delete),
            "patch" => Some(HttpMethod::Patch),
            _ => None,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

/// The location where a parameter is carried in an HTTP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Query,
    Path,
    Header,
}

impl ParameterLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterLocation::Query => "query",
            ParameterLocation::Path => "path",
            ParameterLocation::Header => "header",
        }
    }
}

/// Identity of a parameter for deduplication: normalized name and location.
pub type ParameterKey = (String, ParameterLocation);

/// A single operation parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub schema: SchemaType,
    pub description: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, location: ParameterLocation, schema: SchemaType, required: bool) -> Self {
        Self {
            name: name.into(),
            location,
            required,
            schema,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Deduplication key. Header names compare case-insensitively.
    pub fn key(&self) -> ParameterKey {
        let name = normalize_name(&self.name);
        let name = match self.location {
            ParameterLocation::Header => name.to_ascii_lowercase(),
            _ => name,
        };
        (name, self.location)
    }
}

/// Trims surrounding whitespace and a trailing optional marker.
pub fn normalize_name(name: &str) -> String {
    let name = name.trim();
    name.strip_suffix('?').unwrap_or(name).trim_end().to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestBody {
    pub required: bool,
    pub schema: SchemaType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSpec {
    pub description: String,
    pub schema: Option<SchemaType>,
}

impl ResponseSpec {
    pub fn new(description: impl Into<String>, schema: Option<SchemaType>) -> Self {
        Self {
            description: description.into(),
            schema,
        }
    }
}

/// Complete information about a single API operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// Path template with `{name}` placeholders
    pub path: String,
    pub method: HttpMethod,
    pub operation_id: String,
    pub summary: String,
    pub description: String,
    pub tags: Vec<String>,
    /// Ordered, unique by [`Parameter::key`]
    pub parameters: Vec<Parameter>,
    pub request_body: Option<RequestBody>,
    /// Keyed by status code, ascending
    pub responses: IndexMap<String, ResponseSpec>,
}

impl Operation {
    /// Create an operation with minimal required fields
    pub fn new(path: impl Into<String>, method: HttpMethod, operation_id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            operation_id: operation_id.into(),
            summary: String::new(),
            description: String::new(),
            tags: Vec::new(),
            parameters: Vec::new(),
            request_body: None,
            responses: IndexMap::new(),
        }
    }

    /// `{placeholder}` names of the path template, in order of appearance.
    pub fn path_placeholders(&self) -> Vec<String> {
        path_placeholders(&self.path)
    }
}

/// Extracts `{placeholder}` names from a path template.
pub fn path_placeholders(path: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = path;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            break;
        };
        let name = after[..close].trim();
        if !name.is_empty() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
        rest = &after[close + 1..];
    }
    names
}
