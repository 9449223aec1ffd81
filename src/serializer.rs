//! Serialization of OpenAPI documents to YAML or JSON, and loading them back.
//!
//! Writers accept any [`Serialize`] value so the same functions handle the typed
//! [`OpenApiDocument`](crate::openapi_builder::OpenApiDocument) and a repaired
//! [`serde_json::Value`].

use crate::error::{Error, Result as CrateResult};
use anyhow::{Context, Result};
use log::debug;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Serializes a document to YAML.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_yaml<T: Serialize>(doc: &T) -> Result<String> {
    debug!("Serializing OpenAPI document to YAML");
    serde_yaml::to_string(doc).context("Failed to serialize OpenAPI document to YAML")
}

/// Serializes a document to pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_json<T: Serialize>(doc: &T) -> Result<String> {
    debug!("Serializing OpenAPI document to JSON");
    serde_json::to_string_pretty(doc).context("Failed to serialize OpenAPI document to JSON")
}

/// Writes string content to a file, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written to.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content).with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

/// Loads a JSON or YAML document as a generic value, choosing the format by extension.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] for an unknown extension, [`Error::IoError`] if the
/// file cannot be read and [`Error::ParseError`] if its content is not valid.
pub fn read_document(path: &Path) -> CrateResult<Value> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let is_json = match extension.as_deref() {
        Some("json") => true,
        Some("yaml") | Some("yml") => false,
        _ => {
            return Err(Error::InvalidArgument(format!(
                "unsupported document extension: {}",
                path.display()
            )))
        }
    };

    debug!("Reading document: {}", path.display());
    let text = fs::read_to_string(path)?;
    let parsed = if is_json {
        serde_json::from_str(&text).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(&text).map_err(|e| e.to_string())
    };
    parsed.map_err(|message| Error::ParseError {
        file: path.to_path_buf(),
        message,
    })
}
