//! Assembly of extracted models and operations into one [`Document`].
//!
//! Both tables are explicit folds over a fixed input order: models in the order given,
//! then operations unit by unit. A key seen twice keeps the later value and the collision
//! is recorded in the [`Overwrite`] audit log.

use crate::config::Conventions;
use crate::extractor::{HttpMethod, ModelSchema, Operation, ParameterLocation};
use crate::reconciler;
use indexmap::IndexMap;
use log::{debug, info, warn};
use std::fmt;

/// Root aggregate: operations keyed by path template and method, schemas keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub paths: IndexMap<String, IndexMap<HttpMethod, Operation>>,
    pub schemas: IndexMap<String, ModelSchema>,
}

impl Document {
    pub fn operation_count(&self) -> usize {
        self.paths.values().map(IndexMap::len).sum()
    }

    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.paths.values().flat_map(IndexMap::values)
    }
}

/// One key collision or method correction made while assembling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overwrite {
    /// A later model replaced an earlier one with the same name
    Schema { name: String },
    /// A later operation replaced an earlier one at the same path and method
    Operation {
        path: String,
        method: HttpMethod,
        replaced: String,
        by: String,
    },
    /// A GET operation with a request body was moved to POST
    Reclassified {
        path: String,
        operation_id: String,
        /// Operation id of the POST it displaced, if any
        displaced: Option<String>,
    },
}

impl fmt::Display for Overwrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Overwrite::Schema { name } => write!(f, "schema '{}' declared more than once", name),
            Overwrite::Operation {
                path,
                method,
                replaced,
                by,
            } => write!(f, "{} {}: {} replaced by {}", method, path, replaced, by),
            Overwrite::Reclassified {
                path,
                operation_id,
                displaced: None,
            } => write!(f, "GET {} ({}) has a request body, moved to POST", path, operation_id),
            Overwrite::Reclassified {
                path,
                operation_id,
                displaced: Some(previous),
            } => write!(
                f,
                "GET {} ({}) has a request body, moved to POST replacing {}",
                path, operation_id, previous
            ),
        }
    }
}

/// Result of an assembly run.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub document: Document,
    pub audit: Vec<Overwrite>,
}

pub struct DocumentAssembler<'a> {
    conventions: &'a Conventions,
}

impl<'a> DocumentAssembler<'a> {
    pub fn new(conventions: &'a Conventions) -> Self {
        Self { conventions }
    }

    /// Folds models and operations into a document and applies the global fix-ups.
    pub fn assemble(&self, models: Vec<ModelSchema>, operations_by_source: Vec<Vec<Operation>>) -> Assembly {
        let mut document = Document::default();
        let mut audit = Vec::new();

        for mut model in models {
            normalize_required(&mut model);
            if let Some(previous) = document.schemas.insert(model.name.clone(), model) {
                let entry = Overwrite::Schema {
                    name: previous.name,
                };
                warn!("{}", entry);
                audit.push(entry);
            }
        }

        for mut operation in operations_by_source.into_iter().flatten() {
            let applied = reconciler::apply_rules(&mut operation, &self.conventions.injection_rules);
            if !applied.is_empty() {
                debug!("{}: applied rules {:?}", operation.operation_id, applied);
            }
            for param in &mut operation.parameters {
                if param.location == ParameterLocation::Path {
                    param.required = true;
                }
            }

            let methods = document.paths.entry(operation.path.clone()).or_default();
            if let Some(previous) = methods.insert(operation.method, operation) {
                let current = &methods[&previous.method];
                let entry = Overwrite::Operation {
                    path: previous.path.clone(),
                    method: previous.method,
                    replaced: previous.operation_id.clone(),
                    by: current.operation_id.clone(),
                };
                warn!("{}", entry);
                audit.push(entry);
            }
        }

        self.reclassify_get_with_body(&mut document, &mut audit);

        info!(
            "Assembled {} schemas and {} operations across {} paths ({} audit entries)",
            document.schemas.len(),
            document.operation_count(),
            document.paths.len(),
            audit.len()
        );
        Assembly { document, audit }
    }

    /// Moves every GET that declares a request body, or whose operation id names a POST, to POST.
    fn reclassify_get_with_body(&self, document: &mut Document, audit: &mut Vec<Overwrite>) {
        for (path, methods) in document.paths.iter_mut() {
            let misplaced = methods.get(&HttpMethod::Get).is_some_and(|op| {
                op.request_body.is_some() || self.conventions.names_post_operation(&op.operation_id)
            });
            if !misplaced {
                continue;
            }
            let Some(mut operation) = methods.shift_remove(&HttpMethod::Get) else {
                continue;
            };

            operation.method = HttpMethod::Post;
            if self.conventions.has_leaked_source(&operation.description) {
                operation.description = self.clean_description(&operation);
            }

            let operation_id = operation.operation_id.clone();
            let displaced = methods
                .insert(HttpMethod::Post, operation)
                .map(|previous| previous.operation_id);
            let entry = Overwrite::Reclassified {
                path: path.clone(),
                operation_id,
                displaced,
            };
            warn!("{}", entry);
            audit.push(entry);
        }
    }

    /// First description line free of leaked source syntax, else `"<summary> operation"`.
    fn clean_description(&self, operation: &Operation) -> String {
        operation
            .description
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && !self.conventions.has_leaked_source(line))
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} operation", operation.summary))
    }
}

/// Drops `required` names that are not properties, keeping first occurrences only.
fn normalize_required(model: &mut ModelSchema) {
    let mut seen = Vec::with_capacity(model.required.len());
    model.required.retain(|name| {
        if !model.properties.contains_key(name) {
            debug!("Model {}: dropping unknown required field '{}'", model.name, name);
            return false;
        }
        if seen.contains(name) {
            return false;
        }
        seen.push(name.clone());
        true
    });
}
