use crate::assembler::Document;
use crate::config::GeneratorConfig;
use crate::extractor::{self, HttpMethod};
use crate::schema_generator::{Schema, SchemaGenerator};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

/// OpenAPI version written into every document
pub const OPENAPI_VERSION: &str = "3.0.3";

/// OpenAPI document builder
pub struct OpenApiBuilder {
    /// OpenAPI info section
    info: Info,
    servers: Vec<Server>,
    /// Tags in first-seen order
    tags: Vec<Tag>,
    /// Paths collection (URL path -> PathItem)
    paths: IndexMap<String, PathItem>,
    /// Name and definition of the access-token scheme
    security_scheme: (String, SecurityScheme),
}

/// OpenAPI Info object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    /// API title
    pub title: String,
    /// API description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// API version
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
}

/// Security requirement: scheme name -> scopes
pub type SecurityRequirement = IndexMap<String, Vec<String>>;

/// OpenAPI PathItem object - represents all operations for a single path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    /// GET operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    /// POST operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    /// PUT operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    /// DELETE operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    /// PATCH operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
}

impl PathItem {
    fn slot(&mut self, method: HttpMethod) -> &mut Option<Operation> {
        match method {
            HttpMethod::Get => &mut self.get,
            HttpMethod::Post => &mut self.post,
            HttpMethod::Put => &mut self.put,
            HttpMethod::Delete => &mut self.delete,
            HttpMethod::Patch => &mut self.patch,
        }
    }
}

/// OpenAPI Operation object - represents a single API operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<String>,
    /// Operation summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Operation description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Operation ID
    #[serde(rename = "operationId", skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub security: Vec<SecurityRequirement>,
    /// Parameters (path, query, header)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<Parameter>>,
    /// Request body
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    /// Responses
    pub responses: IndexMap<String, Response>,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Parameter location (path, query, header)
    #[serde(rename = "in")]
    pub location: String,
    /// Parameter description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the parameter is required
    pub required: bool,
    /// Parameter schema
    pub schema: Schema,
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    /// Request body description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the request body is required
    pub required: bool,
    /// Content types and their schemas
    pub content: IndexMap<String, MediaType>,
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    /// Schema for this media type
    pub schema: Schema,
}

/// OpenAPI Response object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Response description
    pub description: String,
    /// Response content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<IndexMap<String, MediaType>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityScheme {
    #[serde(rename = "type")]
    pub scheme_type: String,
    #[serde(rename = "in")]
    pub location: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI Components object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Components {
    #[serde(rename = "securitySchemes")]
    pub security_schemes: IndexMap<String, SecurityScheme>,
    /// Schema definitions
    pub schemas: IndexMap<String, Schema>,
}

/// Complete OpenAPI document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApiDocument {
    /// OpenAPI version
    pub openapi: String,
    /// API info
    pub info: Info,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub servers: Vec<Server>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub security: Vec<SecurityRequirement>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<Tag>,
    /// API paths
    pub paths: IndexMap<String, PathItem>,
    pub components: Components,
}

fn json_content(schema: Schema) -> IndexMap<String, MediaType> {
    let mut content = IndexMap::new();
    content.insert("application/json".to_string(), MediaType { schema });
    content
}

impl OpenApiBuilder {
    /// Create a new OpenApiBuilder with the default configuration
    pub fn new() -> Self {
        Self::from_config(&GeneratorConfig::default())
    }

    /// Create a builder whose info, servers and security scheme come from `config`
    pub fn from_config(config: &GeneratorConfig) -> Self {
        debug!("Initializing OpenApiBuilder");
        let info = Info {
            title: config.info.title.clone(),
            description: config.info.description.clone(),
            version: config.info.version.clone(),
            contact: config.info.contact.as_ref().map(|c| Contact {
                name: c.name.clone(),
                url: c.url.clone(),
                email: c.email.clone(),
            }),
        };
        let servers = config
            .servers
            .iter()
            .map(|s| Server {
                url: s.url.clone(),
                description: s.description.clone(),
            })
            .collect();
        let scheme = &config.security_scheme;

        Self {
            info,
            servers,
            tags: Vec::new(),
            paths: IndexMap::new(),
            security_scheme: (
                scheme.name.clone(),
                SecurityScheme {
                    scheme_type: "apiKey".to_string(),
                    location: "header".to_string(),
                    name: scheme.header.clone(),
                    description: scheme.description.clone(),
                },
            ),
        }
    }

    fn security_requirement(&self) -> SecurityRequirement {
        let mut requirement = IndexMap::new();
        requirement.insert(self.security_scheme.0.clone(), Vec::new());
        requirement
    }

    /// Add an operation to the OpenAPI document
    pub fn add_operation(&mut self, operation: &extractor::Operation, schema_gen: &SchemaGenerator) {
        debug!("Adding operation: {} {}", operation.method, operation.path);

        for tag in &operation.tags {
            if !self.tags.iter().any(|t| &t.name == tag) {
                self.tags.push(Tag { name: tag.clone() });
            }
        }

        let parameters = if operation.parameters.is_empty() {
            None
        } else {
            let params: Vec<Parameter> = operation
                .parameters
                .iter()
                .map(|p| {
                    let param_schema = schema_gen.generate_parameter_schema(p);
                    Parameter {
                        name: param_schema.name,
                        location: param_schema.location,
                        description: param_schema.description,
                        required: param_schema.required,
                        schema: param_schema.schema,
                    }
                })
                .collect();
            Some(params)
        };

        let request_body = operation.request_body.as_ref().map(|body| RequestBody {
            description: Some("Request body".to_string()),
            required: body.required,
            content: json_content(schema_gen.generate_schema(&body.schema)),
        });

        let responses = operation
            .responses
            .iter()
            .map(|(code, response)| {
                (
                    code.clone(),
                    Response {
                        description: response.description.clone(),
                        content: response
                            .schema
                            .as_ref()
                            .map(|schema| json_content(schema_gen.generate_schema(schema))),
                    },
                )
            })
            .collect();

        let rendered = Operation {
            tags: operation.tags.clone(),
            summary: Some(operation.summary.clone()).filter(|s| !s.is_empty()),
            description: Some(operation.description.clone()).filter(|s| !s.is_empty()),
            operation_id: Some(operation.operation_id.clone()),
            security: vec![self.security_requirement()],
            parameters,
            request_body,
            responses,
        };

        let path_item = self.paths.entry(operation.path.clone()).or_default();
        *path_item.slot(operation.method) = Some(rendered);
    }

    /// Build the final OpenAPI document
    pub fn build(self, schema_gen: SchemaGenerator) -> OpenApiDocument {
        debug!("Building final OpenAPI document");

        let security = vec![self.security_requirement()];
        let mut security_schemes = IndexMap::new();
        security_schemes.insert(self.security_scheme.0, self.security_scheme.1);

        OpenApiDocument {
            openapi: OPENAPI_VERSION.to_string(),
            info: self.info,
            servers: self.servers,
            security,
            tags: self.tags,
            paths: self.paths,
            components: Components {
                security_schemes,
                schemas: schema_gen.into_schemas(),
            },
        }
    }
}

impl Default for OpenApiBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders an assembled document: schemas first, then every operation in path order.
pub fn build_document(document: &Document, config: &GeneratorConfig) -> OpenApiDocument {
    let mut schema_gen = SchemaGenerator::new();
    for model in document.schemas.values() {
        schema_gen.add_model(model);
    }

    let mut builder = OpenApiBuilder::from_config(config);
    for operation in document.operations() {
        builder.add_operation(operation, &schema_gen);
    }
    builder.build(schema_gen)
}
