//! Structural validation and repair of OpenAPI documents.
//!
//! Both passes work on a generic [`serde_json::Value`], so they apply equally to freshly
//! generated documents and to documents loaded from disk.
//!
//! [`validate`] walks the whole document depth-first and reports every defect it finds
//! with the JSON pointer of the offending node. [`repair`] rewrites the defects that have
//! a safe equivalent and leaves the rest for the report. Repair is idempotent: a second
//! run changes nothing.

use crate::extractor::path_placeholders;
use crate::schema_generator::SCHEMA_REF_PREFIX;
use log::{debug, info};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::fmt;

/// Schema names that are really primitive type keywords when used as a `$ref` target.
const MALFORMED_REFERENCE_NAMES: &[&str] =
    &["object", "string", "number", "integer", "boolean", "array", "any"];

const HTTP_METHODS: &[&str] = &["get", "put", "post", "delete", "options", "head", "patch", "trace"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IssueKind {
    /// Local `$ref` whose target does not exist
    DanglingReference,
    /// `$ref` to a primitive type keyword such as `#/components/schemas/string`
    MalformedReference,
    MissingRequiredField,
    /// `required` names a property the schema does not declare
    UnknownRequiredProperty,
    PathParameterNotRequired,
    /// Path template placeholders and `in: path` parameters differ
    PathParameterMismatch,
    DuplicateParameter,
    GetWithBody,
    MissingResponseDescription,
}

impl IssueKind {
    /// Whether [`repair`] can fix issues of this kind.
    ///
    /// Dangling references are only fixed with [`RepairOptions::inline_dangling`].
    pub fn repairable(&self, options: &RepairOptions) -> bool {
        match self {
            IssueKind::MalformedReference
            | IssueKind::UnknownRequiredProperty
            | IssueKind::PathParameterNotRequired
            | IssueKind::MissingResponseDescription => true,
            IssueKind::DanglingReference => options.inline_dangling,
            IssueKind::MissingRequiredField
            | IssueKind::PathParameterMismatch
            | IssueKind::DuplicateParameter
            | IssueKind::GetWithBody => false,
        }
    }
}

/// One defect found in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub kind: IssueKind,
    /// JSON pointer of the offending node
    pub pointer: String,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pointer = if self.pointer.is_empty() { "/" } else { self.pointer.as_str() };
        write!(f, "[{:?}] {}: {}", self.kind, pointer, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentStats {
    pub schemas: usize,
    pub paths: usize,
    pub operations: usize,
    pub references: usize,
    pub request_bodies: usize,
    pub parameters: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<Issue>,
    pub stats: DocumentStats,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|i| i.kind == kind).count()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairOptions {
    /// Replace dangling schema references with an inline placeholder object
    pub inline_dangling: bool,
}

/// What a schema `$ref` points at.
enum RefTarget {
    Resolves,
    Malformed(String),
    Dangling(String),
    External,
}

/// Read-only facts about the document shared by both passes.
struct Context<'a> {
    root: &'a Value,
    schema_names: HashSet<String>,
}

impl<'a> Context<'a> {
    fn new(root: &'a Value) -> Self {
        let schema_names = root
            .pointer("/components/schemas")
            .and_then(Value::as_object)
            .map(|schemas| schemas.keys().cloned().collect())
            .unwrap_or_default();
        Self { root, schema_names }
    }

    fn classify(&self, reference: &str) -> RefTarget {
        let Some(pointer) = reference.strip_prefix('#') else {
            return RefTarget::External;
        };
        if let Some(encoded) = reference.strip_prefix(SCHEMA_REF_PREFIX) {
            let name = decode_pointer_segment(encoded);
            if is_malformed_name(&name) && !self.schema_names.contains(&name) {
                return RefTarget::Malformed(name);
            }
            if !self.schema_names.contains(&name) {
                return RefTarget::Dangling(name);
            }
            return RefTarget::Resolves;
        }
        if self.root.pointer(pointer).is_some() {
            RefTarget::Resolves
        } else {
            RefTarget::Dangling(pointer.rsplit('/').next().map(decode_pointer_segment).unwrap_or_default())
        }
    }
}

fn is_malformed_name(name: &str) -> bool {
    MALFORMED_REFERENCE_NAMES
        .iter()
        .any(|m| m.eq_ignore_ascii_case(name))
}

/// Decodes a JSON Pointer segment (handles `~1` and `~0`).
fn decode_pointer_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

fn encode_pointer_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn child(pointer: &str, segment: &str) -> String {
    format!("{}/{}", pointer, encode_pointer_segment(segment))
}

/// Inline equivalent of a reference to a primitive type keyword.
fn malformed_replacement(name: &str) -> Value {
    match name.to_ascii_lowercase().as_str() {
        "string" | "number" | "integer" | "boolean" => json!({ "type": name.to_ascii_lowercase() }),
        "array" => json!({ "type": "array", "items": { "type": "object" } }),
        "any" => json!({ "type": "object", "additionalProperties": true }),
        _ => json!({ "type": "object" }),
    }
}

fn dangling_replacement(name: &str) -> Value {
    json!({ "type": "object", "description": format!("Unresolved reference to {}", name) })
}

/// Validates a document and collects every issue plus summary statistics.
pub fn validate(doc: &Value) -> ValidationReport {
    let ctx = Context::new(doc);
    let mut issues = Vec::new();
    let mut stats = DocumentStats {
        schemas: ctx.schema_names.len(),
        ..DocumentStats::default()
    };

    check_root(doc, &mut issues);
    walk(doc, String::new(), &ctx, &mut issues, &mut stats);
    check_paths(doc, &mut issues, &mut stats);

    info!(
        "Validation found {} issues ({} schemas, {} operations, {} references)",
        issues.len(),
        stats.schemas,
        stats.operations,
        stats.references
    );
    ValidationReport { issues, stats }
}

fn missing(pointer: &str, message: impl Into<String>) -> Issue {
    Issue {
        kind: IssueKind::MissingRequiredField,
        pointer: pointer.to_string(),
        message: message.into(),
    }
}

fn check_root(doc: &Value, issues: &mut Vec<Issue>) {
    if doc.get("openapi").and_then(Value::as_str).is_none() {
        issues.push(missing("", "missing 'openapi' version"));
    }
    for field in ["title", "version"] {
        if doc.pointer(&format!("/info/{}", field)).and_then(Value::as_str).is_none() {
            issues.push(missing("/info", format!("missing 'info.{}'", field)));
        }
    }
    if !doc.get("paths").is_some_and(Value::is_object) {
        issues.push(missing("", "missing 'paths' object"));
    }
}

/// Depth-first walk over every node: references and `required` lists.
fn walk(value: &Value, pointer: String, ctx: &Context, issues: &mut Vec<Issue>, stats: &mut DocumentStats) {
    match value {
        Value::Object(map) => {
            if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
                stats.references += 1;
                match ctx.classify(reference) {
                    RefTarget::Malformed(name) => issues.push(Issue {
                        kind: IssueKind::MalformedReference,
                        pointer: pointer.clone(),
                        message: format!("reference to primitive type '{}'", name),
                    }),
                    RefTarget::Dangling(_) => issues.push(Issue {
                        kind: IssueKind::DanglingReference,
                        pointer: pointer.clone(),
                        message: format!("unresolved reference {}", reference),
                    }),
                    RefTarget::Resolves | RefTarget::External => {}
                }
            }

            if let (Some(Value::Array(required)), Some(Value::Object(properties))) =
                (map.get("required"), map.get("properties"))
            {
                for name in required.iter().filter_map(Value::as_str) {
                    if !properties.contains_key(name) {
                        issues.push(Issue {
                            kind: IssueKind::UnknownRequiredProperty,
                            pointer: child(&pointer, "required"),
                            message: format!("required property '{}' is not declared", name),
                        });
                    }
                }
            }

            for (key, nested) in map {
                walk(nested, child(&pointer, key), ctx, issues, stats);
            }
        }
        Value::Array(items) => {
            for (idx, nested) in items.iter().enumerate() {
                walk(nested, child(&pointer, &idx.to_string()), ctx, issues, stats);
            }
        }
        _ => {}
    }
}

/// Per-operation checks: responses, parameters, path placeholders and GET bodies.
fn check_paths(doc: &Value, issues: &mut Vec<Issue>, stats: &mut DocumentStats) {
    let Some(paths) = doc.get("paths").and_then(Value::as_object) else {
        return;
    };
    stats.paths = paths.len();

    for (path, item) in paths {
        let Some(item) = item.as_object() else {
            continue;
        };
        let item_pointer = child("/paths", path);
        let shared_params = item.get("parameters").and_then(Value::as_array);

        for method in HTTP_METHODS {
            let Some(operation) = item.get(*method).and_then(Value::as_object) else {
                continue;
            };
            stats.operations += 1;
            let op_pointer = child(&item_pointer, method);

            if operation.contains_key("requestBody") {
                stats.request_bodies += 1;
                if *method == "get" {
                    issues.push(Issue {
                        kind: IssueKind::GetWithBody,
                        pointer: op_pointer.clone(),
                        message: "GET operation declares a request body".to_string(),
                    });
                }
            }

            check_responses(operation, &op_pointer, issues);

            let params = operation.get("parameters").and_then(Value::as_array);
            stats.parameters += params.map_or(0, Vec::len);
            let path_params = check_parameters(params, &op_pointer, issues);

            let mut declared: Vec<String> = path_params;
            for shared in shared_params.into_iter().flatten() {
                if shared.get("in").and_then(Value::as_str) == Some("path") {
                    if let Some(name) = shared.get("name").and_then(Value::as_str) {
                        declared.push(name.to_string());
                    }
                }
            }
            let placeholders: HashSet<String> = path_placeholders(path).into_iter().collect();
            let declared: HashSet<String> = declared.into_iter().collect();
            if placeholders != declared {
                let mut undeclared: Vec<&String> = placeholders.difference(&declared).collect();
                let mut extra: Vec<&String> = declared.difference(&placeholders).collect();
                undeclared.sort();
                extra.sort();
                issues.push(Issue {
                    kind: IssueKind::PathParameterMismatch,
                    pointer: op_pointer.clone(),
                    message: format!(
                        "placeholders without parameter: {:?}; path parameters without placeholder: {:?}",
                        undeclared, extra
                    ),
                });
            }
        }
    }
}

fn check_responses(operation: &Map<String, Value>, op_pointer: &str, issues: &mut Vec<Issue>) {
    match operation.get("responses").and_then(Value::as_object) {
        Some(responses) if !responses.is_empty() => {
            for (code, response) in responses {
                let described = response.get("description").and_then(Value::as_str).is_some();
                if !described && response.get("$ref").is_none() {
                    issues.push(Issue {
                        kind: IssueKind::MissingResponseDescription,
                        pointer: child(&child(op_pointer, "responses"), code),
                        message: format!("response {} has no description", code),
                    });
                }
            }
        }
        _ => issues.push(missing(op_pointer, "operation has no responses")),
    }
}

/// Checks one operation's parameter list and returns its `in: path` names.
fn check_parameters(params: Option<&Vec<Value>>, op_pointer: &str, issues: &mut Vec<Issue>) -> Vec<String> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut path_names = Vec::new();

    for (idx, param) in params.into_iter().flatten().enumerate() {
        let pointer = child(&child(op_pointer, "parameters"), &idx.to_string());
        if param.get("$ref").is_some() {
            continue;
        }
        let name = param.get("name").and_then(Value::as_str);
        let location = param.get("in").and_then(Value::as_str);
        let (Some(name), Some(location)) = (name, location) else {
            issues.push(missing(&pointer, "parameter needs 'name' and 'in'"));
            continue;
        };

        let normalized = name.trim().trim_end_matches('?').trim_end();
        let normalized = if location == "header" {
            normalized.to_ascii_lowercase()
        } else {
            normalized.to_string()
        };
        if !seen.insert((normalized, location.to_string())) {
            issues.push(Issue {
                kind: IssueKind::DuplicateParameter,
                pointer: pointer.clone(),
                message: format!("parameter '{}' in {} declared more than once", name, location),
            });
        }

        if location == "path" {
            path_names.push(name.to_string());
            if param.get("required").and_then(Value::as_bool) != Some(true) {
                issues.push(Issue {
                    kind: IssueKind::PathParameterNotRequired,
                    pointer,
                    message: format!("path parameter '{}' must be required", name),
                });
            }
        }
    }
    path_names
}

/// Returns a repaired copy of `doc`.
pub fn repair(doc: &Value, options: &RepairOptions) -> Value {
    let mut repaired = doc.clone();
    repair_in_place(&mut repaired, options);
    repaired
}

/// Repairs `doc` in place and returns the number of changes made.
pub fn repair_in_place(doc: &mut Value, options: &RepairOptions) -> usize {
    let snapshot = doc.clone();
    let ctx = Context::new(&snapshot);
    let mut changes = 0;

    repair_node(doc, &ctx, options, &mut changes);
    changes += repair_operations(doc);

    if changes > 0 {
        info!("Repair made {} changes", changes);
    } else {
        debug!("Repair made no changes");
    }
    changes
}

fn repair_node(value: &mut Value, ctx: &Context, options: &RepairOptions, changes: &mut usize) {
    match value {
        Value::Object(map) => {
            if let Some(reference) = map.get("$ref").and_then(Value::as_str).map(str::to_string) {
                let replacement = match ctx.classify(&reference) {
                    RefTarget::Malformed(name) => Some(malformed_replacement(&name)),
                    RefTarget::Dangling(name)
                        if options.inline_dangling && reference.starts_with(SCHEMA_REF_PREFIX) =>
                    {
                        Some(dangling_replacement(&name))
                    }
                    _ => None,
                };
                if let Some(Value::Object(replacement)) = replacement {
                    debug!("Rewriting reference {}", reference);
                    map.remove("$ref");
                    for (key, val) in replacement {
                        map.insert(key, val);
                    }
                    *changes += 1;
                }
            }

            let declared: Option<HashSet<String>> = map
                .get("properties")
                .and_then(Value::as_object)
                .map(|props| props.keys().cloned().collect());
            if let Some(declared) = declared {
                if let Some(Value::Array(required)) = map.get_mut("required") {
                    let before = required.len();
                    required.retain(|name| name.as_str().is_some_and(|n| declared.contains(n)));
                    if required.len() != before {
                        *changes += 1;
                    }
                    if required.is_empty() {
                        map.remove("required");
                    }
                }
            }

            for nested in map.values_mut() {
                repair_node(nested, ctx, options, changes);
            }
        }
        Value::Array(items) => {
            for nested in items.iter_mut() {
                repair_node(nested, ctx, options, changes);
            }
        }
        _ => {}
    }
}

/// Forces path parameters to be required and fills missing response descriptions.
fn repair_operations(doc: &mut Value) -> usize {
    let mut changes = 0;
    let Some(paths) = doc.get_mut("paths").and_then(Value::as_object_mut) else {
        return 0;
    };

    for item in paths.values_mut() {
        let Some(item) = item.as_object_mut() else {
            continue;
        };
        if let Some(Value::Array(shared)) = item.get_mut("parameters") {
            changes += require_path_parameters(shared);
        }
        for method in HTTP_METHODS {
            let Some(operation) = item.get_mut(*method).and_then(Value::as_object_mut) else {
                continue;
            };
            if let Some(Value::Array(params)) = operation.get_mut("parameters") {
                changes += require_path_parameters(params);
            }
            if let Some(Value::Object(responses)) = operation.get_mut("responses") {
                for (code, response) in responses.iter_mut() {
                    let Some(response) = response.as_object_mut() else {
                        continue;
                    };
                    if response.contains_key("$ref")
                        || response.get("description").and_then(Value::as_str).is_some()
                    {
                        continue;
                    }
                    let description = if code.starts_with('2') {
                        "Successful response".to_string()
                    } else {
                        format!("Response {}", code)
                    };
                    response.insert("description".to_string(), Value::String(description));
                    changes += 1;
                }
            }
        }
    }
    changes
}

fn require_path_parameters(params: &mut [Value]) -> usize {
    let mut changes = 0;
    for param in params.iter_mut().filter_map(Value::as_object_mut) {
        let is_path = param.get("in").and_then(Value::as_str) == Some("path");
        if is_path && param.get("required").and_then(Value::as_bool) != Some(true) {
            param.insert("required".to_string(), Value::Bool(true));
            changes += 1;
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn minimal(paths: Value, schemas: Value) -> Value {
        json!({
            "openapi": "3.0.3",
            "info": {"title": "T", "version": "1"},
            "paths": paths,
            "components": {"schemas": schemas}
        })
    }

    fn kinds(report: &ValidationReport) -> Vec<IssueKind> {
        report.issues.iter().map(|i| i.kind).collect()
    }

    #[test]
    fn test_valid_document_has_no_issues() {
        let doc = minimal(
            json!({"/items/{id}": {"get": {
                "parameters": [{"name": "id", "in": "path", "required": true, "schema": {"type": "string"}}],
                "responses": {"200": {"description": "ok", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Item"}}}}}
            }}}),
            json!({"Item": {"type": "object", "properties": {"id": {"type": "string"}}, "required": ["id"]}}),
        );

        let report = validate(&doc);
        assert_eq!(report.issues, vec![]);
        assert_eq!(
            report.stats,
            DocumentStats {
                schemas: 1,
                paths: 1,
                operations: 1,
                references: 1,
                request_bodies: 0,
                parameters: 1,
            }
        );
    }

    #[test]
    fn test_dangling_and_malformed_references() {
        let doc = minimal(
            json!({}),
            json!({"A": {"type": "object", "properties": {
                "b": {"$ref": "#/components/schemas/Missing"},
                "c": {"$ref": "#/components/schemas/String", "description": "kept"},
                "d": {"$ref": "#/components/parameters/Nope"},
                "e": {"$ref": "other.yaml#/Thing"}
            }}}),
        );

        let report = validate(&doc);
        assert_eq!(
            kinds(&report),
            vec![IssueKind::DanglingReference, IssueKind::MalformedReference, IssueKind::DanglingReference]
        );
        assert_eq!(report.issues[0].pointer, "/components/schemas/A/properties/b");
        assert_eq!(report.stats.references, 4);
    }

    #[test]
    fn test_schema_named_like_primitive_is_not_malformed() {
        let doc = minimal(
            json!({}),
            json!({
                "object": {"type": "object"},
                "A": {"type": "object", "properties": {"x": {"$ref": "#/components/schemas/object"}}}
            }),
        );
        assert!(validate(&doc).is_valid());
    }

    #[test]
    fn test_repair_rewrites_malformed_references_keeping_siblings() {
        let doc = minimal(
            json!({}),
            json!({"A": {"type": "object", "properties": {
                "s": {"$ref": "#/components/schemas/string", "description": "kept"},
                "o": {"$ref": "#/components/schemas/object"},
                "l": {"$ref": "#/components/schemas/array"},
                "n": {"$ref": "#/components/schemas/Number"},
                "x": {"$ref": "#/components/schemas/any"}
            }}}),
        );

        let repaired = repair(&doc, &RepairOptions::default());
        let props = &repaired["components"]["schemas"]["A"]["properties"];
        assert_eq!(props["s"], json!({"description": "kept", "type": "string"}));
        assert_eq!(props["o"], json!({"type": "object"}));
        assert_eq!(props["l"], json!({"type": "array", "items": {"type": "object"}}));
        assert_eq!(props["n"], json!({"type": "number"}));
        assert_eq!(props["x"], json!({"type": "object", "additionalProperties": true}));
        assert!(validate(&repaired).is_valid());
    }

    #[test]
    fn test_repair_is_idempotent() {
        let doc = minimal(
            json!({"/o/{id}": {"get": {
                "parameters": [{"name": "id", "in": "path", "required": false, "schema": {"type": "string"}}],
                "responses": {"200": {}, "404": {}}
            }}}),
            json!({"A": {"type": "object", "properties": {
                "s": {"$ref": "#/components/schemas/string"}
            }, "required": ["s", "ghost"]}}),
        );

        let once = repair(&doc, &RepairOptions::default());
        let mut twice = once.clone();
        let changes = repair_in_place(&mut twice, &RepairOptions::default());

        assert_eq!(changes, 0);
        assert_eq!(twice, once);
        assert!(validate(&once).is_valid());

        let op = &once["paths"]["/o/{id}"]["get"];
        assert_eq!(op["parameters"][0]["required"], json!(true));
        assert_eq!(op["responses"]["200"]["description"], json!("Successful response"));
        assert_eq!(op["responses"]["404"]["description"], json!("Response 404"));
        assert_eq!(once["components"]["schemas"]["A"]["required"], json!(["s"]));
    }

    #[test]
    fn test_empty_required_list_is_removed() {
        let doc = minimal(
            json!({}),
            json!({"A": {"type": "object", "properties": {}, "required": ["ghost"]}}),
        );
        let repaired = repair(&doc, &RepairOptions::default());
        assert!(repaired["components"]["schemas"]["A"].get("required").is_none());
    }

    #[test]
    fn test_dangling_references_only_inlined_on_request() {
        let doc = minimal(
            json!({}),
            json!({"A": {"type": "object", "properties": {"b": {"$ref": "#/components/schemas/Gone"}}}}),
        );

        let kept = repair(&doc, &RepairOptions::default());
        assert_eq!(validate(&kept).count(IssueKind::DanglingReference), 1);

        let inlined = repair(&doc, &RepairOptions { inline_dangling: true });
        assert_eq!(
            inlined["components"]["schemas"]["A"]["properties"]["b"],
            json!({"type": "object", "description": "Unresolved reference to Gone"})
        );
        assert!(validate(&inlined).is_valid());
    }

    #[test]
    fn test_operation_level_checks() {
        let doc = minimal(
            json!({"/a/{id}": {"get": {
                "parameters": [
                    {"name": "q", "in": "query"},
                    {"name": "q", "in": "query"},
                    {"name": "X-Token", "in": "header"},
                    {"name": "x-token", "in": "header"},
                    {"in": "query"},
                    {"name": "other", "in": "path", "required": true}
                ],
                "requestBody": {"content": {}},
                "responses": {}
            }}}),
            json!({}),
        );

        let report = validate(&doc);
        assert_eq!(report.count(IssueKind::GetWithBody), 1);
        assert_eq!(report.count(IssueKind::DuplicateParameter), 2);
        assert_eq!(report.count(IssueKind::MissingRequiredField), 2);
        assert_eq!(report.count(IssueKind::PathParameterMismatch), 1);
        assert_eq!(report.stats.request_bodies, 1);
        assert!(!IssueKind::GetWithBody.repairable(&RepairOptions::default()));
    }

    #[test]
    fn test_missing_root_fields() {
        let report = validate(&json!({"info": {}}));
        assert_eq!(report.count(IssueKind::MissingRequiredField), 4);
    }

    #[test]
    fn test_pointer_segments_are_escaped() {
        let doc = minimal(
            json!({"/a/b": {"get": {"responses": {"200": {}}}}}),
            json!({}),
        );
        let report = validate(&doc);
        assert_eq!(report.issues[0].pointer, "/paths/~1a~1b/get/responses/200");
    }
}
