//! Merging of source-declared parameters with cross-cutting injected ones.
//!
//! Parameters are identified by [`Parameter::key`]: normalized name plus location. Intrinsic
//! (source-derived) entries always keep their schema and description; injection can only
//! make an entry required or fill a missing description.

use crate::config::{InjectionMode, InjectionRule};
use crate::extractor::{normalize_name, Operation, Parameter, ParameterKey};
use indexmap::IndexMap;
use log::debug;

/// Merges mandatory `injected` parameters into `intrinsic` ones.
///
/// Intrinsic entries are inserted first; duplicate keys collapse onto the first entry.
/// An injected parameter whose key exists upgrades `required` and fills a missing
/// description; otherwise it is appended as-is.
pub fn reconcile(intrinsic: Vec<Parameter>, injected: Vec<Parameter>) -> Vec<Parameter> {
    let mut table = collapse(intrinsic);
    for param in injected {
        merge_into(&mut table, param, true);
    }
    table.into_values().collect()
}

/// Merges optional `injected` parameters into `current` ones.
///
/// Existing keys only gain a missing description; new keys are appended with
/// `required: false`.
pub fn reconcile_optional(current: Vec<Parameter>, injected: Vec<Parameter>) -> Vec<Parameter> {
    let mut table = collapse(current);
    for mut param in injected {
        match table.get_mut(&param.key()) {
            Some(existing) => fill_description(existing, param.description),
            None => {
                param.required = false;
                table.insert(param.key(), param);
            }
        }
    }
    table.into_values().collect()
}

fn collapse(params: Vec<Parameter>) -> IndexMap<ParameterKey, Parameter> {
    let mut table = IndexMap::new();
    for param in params {
        merge_into(&mut table, param, false);
    }
    table
}

fn merge_into(table: &mut IndexMap<ParameterKey, Parameter>, param: Parameter, upgrade: bool) {
    let key = param.key();
    match table.get_mut(&key) {
        Some(existing) => {
            existing.required |= upgrade || param.required;
            fill_description(existing, param.description);
        }
        None => {
            table.insert(key, param);
        }
    }
}

fn fill_description(existing: &mut Parameter, description: Option<String>) {
    let missing = existing
        .description
        .as_deref()
        .map_or(true, |d| d.trim().is_empty());
    if missing {
        if let Some(description) = description.filter(|d| !d.trim().is_empty()) {
            existing.description = Some(description);
        }
    }
}

/// Whether `rule` applies to an operation at `path` declaring `parameters`.
///
/// An exclusion match always wins; otherwise `always`, any `path_contains` match, or any
/// already-declared `has_parameter` name triggers the rule.
pub fn rule_applies(rule: &InjectionRule, path: &str, parameters: &[Parameter]) -> bool {
    let when = &rule.when;
    if when.path_excludes.iter().any(|p| path.contains(p.as_str())) {
        return false;
    }
    if when.always || when.path_contains.iter().any(|p| path.contains(p.as_str())) {
        return true;
    }
    when.has_parameter.iter().any(|wanted| {
        let wanted = normalize_name(wanted);
        parameters.iter().any(|p| normalize_name(&p.name) == wanted)
    })
}

/// Applies every matching rule to `operation` in table order and returns the names of the
/// rules that fired.
pub fn apply_rules(operation: &mut Operation, rules: &[InjectionRule]) -> Vec<String> {
    let mut applied = Vec::new();
    let mut parameters = reconcile(std::mem::take(&mut operation.parameters), Vec::new());

    for rule in rules {
        if !rule_applies(rule, &operation.path, &parameters) {
            continue;
        }
        let injected: Vec<Parameter> = rule
            .parameters
            .iter()
            .map(|p| p.to_parameter(rule.mode))
            .collect();
        debug!(
            "Injecting {} '{}' parameters into {}",
            injected.len(),
            rule.name,
            operation.operation_id
        );
        parameters = match rule.mode {
            InjectionMode::Mandatory => reconcile(parameters, injected),
            InjectionMode::Optional => reconcile_optional(parameters, injected),
        };
        applied.push(rule.name.clone());
    }

    operation.parameters = parameters;
    applied
}
