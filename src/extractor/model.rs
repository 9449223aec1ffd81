use super::{ModelSchema, PropertySchema, SourceExtractor};
use crate::config::Conventions;
use crate::parser::{ClassDecl, DocComment, Expr, SourceParser, SourceUnit};
use crate::type_mapper;
use indexmap::IndexMap;
use log::{debug, warn};
use std::path::Path;

/// Extractor for SDK model units.
///
/// A model unit declares one class whose `static attributeTypeMap` initializer lists the
/// wire fields as `{ "name", "baseName", "type" }` entries. The class's instance property
/// declarations supply optionality and field docs.
pub struct ModelExtractor<'a> {
    conventions: &'a Conventions,
}

/// One entry of an `attributeTypeMap` initializer.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AttributeEntry {
    name: String,
    base_name: String,
    type_token: String,
}

impl<'a> ModelExtractor<'a> {
    pub fn new(conventions: &'a Conventions) -> Self {
        Self { conventions }
    }

    /// Parses and extracts a model from source text held in memory.
    pub fn extract_source(&self, text: &str) -> Option<ModelSchema> {
        self.extract(&SourceParser::parse_str(Path::new("<memory>"), text))
    }

    fn extract_class(&self, class: &ClassDecl) -> Option<ModelSchema> {
        let type_map = class.property("attributeTypeMap", true)?;
        let entries = parse_attribute_type_map(type_map.initializer.as_ref());

        let mut properties = IndexMap::new();
        let mut required = Vec::new();

        for entry in entries {
            let declaration = class.property(&entry.name, false);
            let optional = declaration.map_or(true, |decl| decl.optional);
            let description = declaration
                .and_then(|decl| decl.doc.as_ref())
                .and_then(|doc| self.field_description(doc, &entry.name));

            if properties.contains_key(&entry.base_name) {
                warn!(
                    "Model {} declares field '{}' twice, keeping the last",
                    class.name, entry.base_name
                );
                required.retain(|r| r != &entry.base_name);
            }
            if !optional {
                required.push(entry.base_name.clone());
            }
            properties.insert(
                entry.base_name,
                PropertySchema {
                    schema: type_mapper::map(&entry.type_token),
                    description,
                },
            );
        }

        Some(ModelSchema {
            name: class.name.clone(),
            properties,
            required,
            description: class.doc.as_ref().and_then(|doc| self.model_description(doc)),
        })
    }

    /// Field docs are kept when they say more than the field name.
    fn field_description(&self, doc: &DocComment, field: &str) -> Option<String> {
        let text = doc.text();
        let text = text.trim();
        if text.chars().count() <= 3 || text == field || self.conventions.is_boilerplate(text) {
            return None;
        }
        Some(text.to_string())
    }

    fn model_description(&self, doc: &DocComment) -> Option<String> {
        let text = doc
            .lines()
            .into_iter()
            .filter(|line| !line.starts_with('@') && !self.conventions.is_boilerplate(line))
            .collect::<Vec<_>>()
            .join(" ");
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

impl SourceExtractor for ModelExtractor<'_> {
    type Output = Option<ModelSchema>;

    /// Returns `None` when the unit has no class carrying an `attributeTypeMap`.
    fn extract(&self, unit: &SourceUnit) -> Option<ModelSchema> {
        let classes = unit.primary_classes();
        if classes.is_empty() {
            debug!("No class declaration in {}, skipping", unit.path.display());
            return None;
        }

        let model = classes.iter().find_map(|class| self.extract_class(class));
        match &model {
            Some(model) => debug!(
                "Extracted model {} with {} properties from {}",
                model.name,
                model.properties.len(),
                unit.path.display()
            ),
            None => debug!("No attributeTypeMap in {}, skipping", unit.path.display()),
        }
        model
    }
}

/// Reads `[{ "name": ..., "baseName": ..., "type": ... }, ...]`.
///
/// Entries without a `name` or `type` are dropped; a missing `baseName` falls back to `name`.
fn parse_attribute_type_map(initializer: Option<&Expr>) -> Vec<AttributeEntry> {
    let Some(Expr::Array(entries)) = initializer else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let Expr::Object(fields) = entry else {
                return None;
            };

            let mut name = None;
            let mut base_name = None;
            let mut type_token = None;
            for (key, value) in fields {
                let Some(value) = value.as_str() else {
                    continue;
                };
                match key.as_str() {
                    "name" => name = Some(value.to_string()),
                    "baseName" => base_name = Some(value.to_string()),
                    "type" => type_token = Some(value.to_string()),
                    _ => {}
                }
            }

            let name = name?;
            Some(AttributeEntry {
                base_name: base_name.unwrap_or_else(|| name.clone()),
                type_token: type_token?,
                name,
            })
        })
        .collect()
}
