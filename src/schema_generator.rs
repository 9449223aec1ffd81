use crate::extractor::{ModelSchema, Parameter, SchemaType};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

/// Prefix of every local schema reference
pub const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

/// Schema generator - converts extracted schema descriptors to OpenAPI schemas
pub struct SchemaGenerator {
    /// Component schemas generated from models, in insertion order
    schemas: IndexMap<String, Schema>,
}

/// OpenAPI Schema definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Reference to another schema
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// The type of the schema (string, integer, object, array, etc.)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    /// Format for primitive types (e.g., "date-time")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Properties for object types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, Schema>>,
    /// Required field names for object types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    /// Items schema for array types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(rename = "additionalProperties", skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<bool>,
}

impl Schema {
    /// A schema with only `type` set
    pub fn of_type(schema_type: &str) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            ..Self::default()
        }
    }

    /// A `$ref` to a component schema
    pub fn reference(name: &str) -> Self {
        Self {
            reference: Some(format!("{}{}", SCHEMA_REF_PREFIX, name)),
            ..Self::default()
        }
    }
}

/// Parameter schema for OpenAPI parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,
    /// Parameter location (path, query, header)
    #[serde(rename = "in")]
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the parameter is required
    pub required: bool,
    /// Schema for the parameter
    pub schema: Schema,
}

impl SchemaGenerator {
    pub fn new() -> Self {
        debug!("Initializing SchemaGenerator");
        Self {
            schemas: IndexMap::new(),
        }
    }

    /// Generate a schema for a schema descriptor
    pub fn generate_schema(&self, schema_type: &SchemaType) -> Schema {
        match schema_type {
            SchemaType::Primitive(kind) => Schema::of_type(kind.as_str()),
            SchemaType::DateTime => Schema {
                format: Some("date-time".to_string()),
                ..Schema::of_type("string")
            },
            SchemaType::Array(item) => Schema {
                items: Some(Box::new(self.generate_schema(item))),
                ..Schema::of_type("array")
            },
            SchemaType::Reference(name) => Schema::reference(name),
            SchemaType::Object {
                properties,
                required,
            } => Schema {
                properties: Some(
                    properties
                        .iter()
                        .map(|(name, prop)| (name.clone(), self.generate_schema(prop)))
                        .collect(),
                ),
                required: (!required.is_empty()).then(|| required.clone()),
                ..Schema::of_type("object")
            },
            SchemaType::Any => Schema::of_type("object"),
        }
    }

    /// Generate the component schema for a model and add it to the schemas collection
    pub fn add_model(&mut self, model: &ModelSchema) {
        debug!("Generating component schema for: {}", model.name);

        let properties = model
            .properties
            .iter()
            .map(|(name, prop)| {
                let mut schema = self.generate_schema(&prop.schema);
                schema.description = prop.description.clone();
                (name.clone(), schema)
            })
            .collect();

        let schema = Schema {
            description: model.description.clone(),
            properties: Some(properties),
            required: if model.required.is_empty() {
                None
            } else {
                Some(model.required.clone())
            },
            ..Schema::of_type("object")
        };

        self.schemas.insert(model.name.clone(), schema);
    }

    /// Generate a parameter schema from a Parameter
    pub fn generate_parameter_schema(&self, param: &Parameter) -> ParameterSchema {
        debug!("Generating parameter schema for: {}", param.name);

        ParameterSchema {
            name: param.name.clone(),
            location: param.location.as_str().to_string(),
            description: param.description.clone(),
            required: param.required,
            schema: self.generate_schema(&param.schema),
        }
    }

    /// Get all generated schemas
    pub fn get_schemas(&self) -> &IndexMap<String, Schema> {
        &self.schemas
    }

    pub fn into_schemas(self) -> IndexMap<String, Schema> {
        self.schemas
    }
}

impl Default for SchemaGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{ParameterLocation, PropertySchema};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn to_json(schema: &Schema) -> serde_json::Value {
        serde_json::to_value(schema).unwrap()
    }

    #[test]
    fn test_primitive_type_string() {
        let generator = SchemaGenerator::new();
        let schema = generator.generate_schema(&SchemaType::string());
        assert_eq!(to_json(&schema), json!({"type": "string"}));
    }

    #[test]
    fn test_primitive_type_integer() {
        let generator = SchemaGenerator::new();
        let schema = generator.generate_schema(&SchemaType::integer());
        assert_eq!(schema.schema_type, Some("integer".to_string()));
        assert_eq!(schema.format, None);
    }

    #[test]
    fn test_date_time_type() {
        let generator = SchemaGenerator::new();
        let schema = generator.generate_schema(&SchemaType::DateTime);
        assert_eq!(to_json(&schema), json!({"type": "string", "format": "date-time"}));
    }

    #[test]
    fn test_array_of_references() {
        let generator = SchemaGenerator::new();
        let schema = generator.generate_schema(&SchemaType::array(SchemaType::reference("Item")));
        assert_eq!(
            to_json(&schema),
            json!({"type": "array", "items": {"$ref": "#/components/schemas/Item"}})
        );
    }

    #[test]
    fn test_inline_object_omits_empty_required() {
        let generator = SchemaGenerator::new();
        let mut properties = IndexMap::new();
        properties.insert("code".to_string(), SchemaType::number());
        properties.insert("message".to_string(), SchemaType::string());

        let schema = generator.generate_schema(&SchemaType::Object {
            properties,
            required: vec![],
        });
        assert_eq!(
            to_json(&schema),
            json!({
                "type": "object",
                "properties": {"code": {"type": "number"}, "message": {"type": "string"}}
            })
        );
    }

    #[test]
    fn test_unknown_type_fallback() {
        let generator = SchemaGenerator::new();
        assert_eq!(to_json(&generator.generate_schema(&SchemaType::Any)), json!({"type": "object"}));
    }

    #[test]
    fn test_model_schema_generation() {
        let mut generator = SchemaGenerator::new();
        let mut properties = IndexMap::new();
        properties.insert(
            "id".to_string(),
            PropertySchema {
                schema: SchemaType::string(),
                description: Some("The identifier.".to_string()),
            },
        );
        properties.insert(
            "tags".to_string(),
            PropertySchema {
                schema: SchemaType::array(SchemaType::string()),
                description: None,
            },
        );
        generator.add_model(&ModelSchema {
            name: "Item".to_string(),
            properties,
            required: vec!["id".to_string()],
            description: Some("An item.".to_string()),
        });

        let schemas = generator.get_schemas();
        assert_eq!(
            to_json(&schemas["Item"]),
            json!({
                "type": "object",
                "description": "An item.",
                "properties": {
                    "id": {"type": "string", "description": "The identifier."},
                    "tags": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["id"]
            })
        );
    }

    #[test]
    fn test_parameter_schema_header() {
        let generator = SchemaGenerator::new();
        let param = Parameter::new(
            "x-tts-access-token",
            ParameterLocation::Header,
            SchemaType::string(),
            true,
        )
        .with_description("Access token for authentication");

        let schema = generator.generate_parameter_schema(&param);
        assert_eq!(
            serde_json::to_value(&schema).unwrap(),
            json!({
                "name": "x-tts-access-token",
                "in": "header",
                "description": "Access token for authentication",
                "required": true,
                "schema": {"type": "string"}
            })
        );
    }

    #[test]
    fn test_schema_ordering_is_insertion_order() {
        let mut generator = SchemaGenerator::new();
        for name in ["Zeta", "Alpha", "Mid"] {
            generator.add_model(&ModelSchema {
                name: name.to_string(),
                properties: IndexMap::new(),
                required: vec![],
                description: None,
            });
        }
        let names: Vec<&str> = generator.get_schemas().keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Mid"]);
    }
}
