//! Generator configuration.
//!
//! Everything here has a default matching the TikTok Shop SDK conventions, so a config
//! file is optional and a partial file overrides only the fields it names.
//!
//! ```yaml
//! info:
//!   title: My Shop API
//! conventions:
//!   injection_rules:
//!     - name: auth
//!       mode: mandatory
//!       when: { always: true }
//!       parameters:
//!         - { name: app_key, type: string }
//! ```

use crate::error::{Error, Result};
use crate::extractor::{Parameter, ParameterLocation, PrimitiveKind, SchemaType};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level configuration for a generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub info: InfoConfig,
    pub servers: Vec<ServerConfig>,
    pub security_scheme: SecuritySchemeConfig,
    pub conventions: Conventions,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            info: InfoConfig::default(),
            servers: default_servers(),
            security_scheme: SecuritySchemeConfig::default(),
            conventions: Conventions::default(),
        }
    }
}

impl GeneratorConfig {
    /// Loads a YAML configuration file.
    ///
    /// # Errors
    ///
    /// Returns `Error::IoError` if the file cannot be read and `Error::ParseError` if it is
    /// not valid YAML for this structure.
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|message| Error::ParseError {
            file: path.to_path_buf(),
            message,
        })
    }

    fn from_yaml(content: &str) -> std::result::Result<Self, String> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| e.to_string())
    }
}

/// The document's `info` object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfoConfig {
    pub title: String,
    pub description: Option<String>,
    pub version: String,
    pub contact: Option<ContactConfig>,
}

impl Default for InfoConfig {
    fn default() -> Self {
        Self {
            title: "TikTok Shop API".to_string(),
            description: Some(
                "Comprehensive API specification for TikTok Shop Partner Center".to_string(),
            ),
            version: "1.0.0".to_string(),
            contact: Some(ContactConfig {
                name: Some("TikTok Shop Partner Center".to_string()),
                url: Some("https://partner.tiktokshop.com".to_string()),
                email: None,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ContactConfig {
    pub name: Option<String>,
    pub url: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Header-based API key scheme every operation is marked with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySchemeConfig {
    /// Key under `components.securitySchemes`
    pub name: String,
    /// Header carrying the key
    pub header: String,
    pub description: Option<String>,
}

impl Default for SecuritySchemeConfig {
    fn default() -> Self {
        Self {
            name: "AccessToken".to_string(),
            header: "x-tts-access-token".to_string(),
            description: Some("Access token for TikTok Shop API authentication".to_string()),
        }
    }
}

fn default_servers() -> Vec<ServerConfig> {
    vec![ServerConfig {
        url: "https://open-api.tiktokglobalshop.com".to_string(),
        description: Some("TikTok Shop Global API Server".to_string()),
    }]
}

/// Naming and injection conventions of the SDK being read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Conventions {
    /// Trailing request-options parameter that is never an API parameter
    pub options_parameter: String,
    /// A parameter whose name contains one of these is the request body
    pub body_markers: Vec<String>,
    /// Exact parameter names carrying the bearer token
    pub bearer_token_parameters: Vec<String>,
    /// Any parameter name ending with this also carries the bearer token
    pub bearer_token_suffix: String,
    pub bearer_token_header: String,
    pub content_type_parameters: Vec<String>,
    pub content_type_header: String,
    /// Fixed parameter descriptions keyed by wire name
    pub parameter_descriptions: IndexMap<String, String>,
    /// Doc-comment lines containing any of these are generator noise
    pub boilerplate_markers: Vec<String>,
    /// Description text containing any of these leaked from source code
    pub leak_markers: Vec<String>,
    /// A GET whose operation id ends with this is moved to POST; empty disables
    pub post_operation_suffix: String,
    /// Suffix stripped (with an optional `V<digits>` before it) from class names to form tags
    pub tag_suffix: String,
    pub injection_rules: Vec<InjectionRule>,
}

impl Default for Conventions {
    fn default() -> Self {
        let parameter_descriptions = [
            ("page_size", "Number of items per page"),
            ("page_token", "Token for pagination"),
            ("x-tts-access-token", "Access token for authentication"),
            ("Content-Type", "Content type of the request"),
            ("shop_cipher", "Shop cipher for API authentication"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            options_parameter: "options".to_string(),
            body_markers: strings(&["RequestBody", "Body"]),
            bearer_token_parameters: strings(&["xTtsAccessToken"]),
            bearer_token_suffix: "AccessToken".to_string(),
            bearer_token_header: "x-tts-access-token".to_string(),
            content_type_parameters: strings(&["contentType"]),
            content_type_header: "Content-Type".to_string(),
            parameter_descriptions,
            boilerplate_markers: strings(&[
                "NOTE:",
                "auto generated",
                "openapi-generator.tech",
                "Do not edit the class manually",
                "The version of the OpenAPI document",
            ]),
            leak_markers: strings(&[
                "import ",
                "export ",
                "class ",
                "constructor",
                "require(",
                "openapi-generator.tech",
                "tiktok shop openapi",
            ]),
            post_operation_suffix: "Post".to_string(),
            tag_suffix: "Api".to_string(),
            injection_rules: default_injection_rules(),
        }
    }
}

impl Conventions {
    pub fn is_bearer_token(&self, name: &str) -> bool {
        self.bearer_token_parameters.iter().any(|p| p == name)
            || (!self.bearer_token_suffix.is_empty()
                && name.ends_with(&self.bearer_token_suffix)
                && name.len() > self.bearer_token_suffix.len())
    }

    pub fn is_content_type(&self, name: &str) -> bool {
        self.content_type_parameters.iter().any(|p| p == name)
    }

    pub fn is_body(&self, name: &str) -> bool {
        self.body_markers.iter().any(|m| name.contains(m.as_str()))
    }

    pub fn is_boilerplate(&self, text: &str) -> bool {
        self.boilerplate_markers.iter().any(|m| text.contains(m.as_str()))
    }

    pub fn has_leaked_source(&self, text: &str) -> bool {
        self.leak_markers.iter().any(|m| text.contains(m.as_str()))
    }

    pub fn names_post_operation(&self, operation_id: &str) -> bool {
        !self.post_operation_suffix.is_empty() && operation_id.ends_with(&self.post_operation_suffix)
    }
}

/// Whether injected parameters are forced on or merely offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InjectionMode {
    /// Parameters are required; existing entries are upgraded to required
    Mandatory,
    /// Parameters are optional; existing entries keep their flags
    Optional,
}

/// A convention mapping a path/parameter trigger to cross-cutting parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectionRule {
    pub name: String,
    pub mode: InjectionMode,
    #[serde(default)]
    pub when: Trigger,
    #[serde(default)]
    pub parameters: Vec<InjectedParameter>,
}

/// When an injection rule applies. Exclusions win over every inclusion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Trigger {
    pub always: bool,
    pub path_contains: Vec<String>,
    pub path_excludes: Vec<String>,
    /// Applies when the operation already declares one of these parameter names
    pub has_parameter: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectedParameter {
    pub name: String,
    #[serde(rename = "in", default = "default_location")]
    pub location: ParameterLocation,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: PrimitiveKind,
    #[serde(default)]
    pub description: Option<String>,
}

impl InjectedParameter {
    fn new(name: &str, kind: PrimitiveKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            location: ParameterLocation::Query,
            kind,
            description: Some(description.to_string()),
        }
    }

    /// The parameter as injected under `mode`.
    pub fn to_parameter(&self, mode: InjectionMode) -> Parameter {
        Parameter {
            name: self.name.clone(),
            location: self.location,
            required: mode == InjectionMode::Mandatory,
            schema: SchemaType::Primitive(self.kind),
            description: self.description.clone(),
        }
    }
}

fn default_location() -> ParameterLocation {
    ParameterLocation::Query
}

fn default_kind() -> PrimitiveKind {
    PrimitiveKind::String
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// The `auth` and `pagination` rules of the TikTok Shop API.
pub fn default_injection_rules() -> Vec<InjectionRule> {
    vec![
        InjectionRule {
            name: "auth".to_string(),
            mode: InjectionMode::Mandatory,
            when: Trigger {
                always: true,
                path_excludes: strings(&["/authorization/"]),
                ..Trigger::default()
            },
            parameters: vec![
                InjectedParameter::new(
                    "shop_cipher",
                    PrimitiveKind::String,
                    "Encrypted shop identifier required for TikTok Shop API authentication. This parameter is mandatory for all API calls to identify and authenticate the shop making the request.",
                ),
                InjectedParameter::new(
                    "app_key",
                    PrimitiveKind::String,
                    "Application key provided by TikTok Shop for API authentication",
                ),
                InjectedParameter::new(
                    "sign",
                    PrimitiveKind::String,
                    "Request signature for API authentication and integrity verification",
                ),
                InjectedParameter::new(
                    "timestamp",
                    PrimitiveKind::Integer,
                    "Unix timestamp when the request was made, used for API authentication",
                ),
            ],
        },
        InjectionRule {
            name: "pagination".to_string(),
            mode: InjectionMode::Optional,
            when: Trigger {
                path_contains: strings(&[
                    "/orders",
                    "/products",
                    "/sample_applications",
                    "/marketplace_creators",
                    "/search",
                ]),
                has_parameter: strings(&["page_size"]),
                ..Trigger::default()
            },
            parameters: vec![
                InjectedParameter::new("page_token", PrimitiveKind::String, "Token for pagination"),
                InjectedParameter::new("page_size", PrimitiveKind::Number, "Number of items per page"),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_round_trips_through_yaml() {
        let config = GeneratorConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let back: GeneratorConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_partial_file_overrides_only_named_fields() {
        let config = GeneratorConfig::from_yaml(
            "info:\n  title: Custom\nconventions:\n  options_parameter: opts\n",
        )
        .unwrap();

        assert_eq!(config.info.title, "Custom");
        assert_eq!(config.info.version, "1.0.0");
        assert_eq!(config.conventions.options_parameter, "opts");
        assert_eq!(config.conventions.body_markers, vec!["RequestBody", "Body"]);
        assert_eq!(config.conventions.injection_rules.len(), 2);
        assert_eq!(config.servers.len(), 1);
    }

    #[test]
    fn test_injection_rule_from_yaml() {
        let config = GeneratorConfig::from_yaml(
            r#"
conventions:
  injection_rules:
    - name: tenant
      mode: optional
      when:
        path_contains: [/tenants]
      parameters:
        - name: X-Tenant
          in: header
        - name: limit
          type: integer
"#,
        )
        .unwrap();

        let rules = &config.conventions.injection_rules;
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].mode, InjectionMode::Optional);
        assert!(!rules[0].when.always);
        assert_eq!(rules[0].parameters[0].location, ParameterLocation::Header);
        assert_eq!(rules[0].parameters[0].kind, PrimitiveKind::String);
        assert_eq!(rules[0].parameters[1].location, ParameterLocation::Query);
        assert_eq!(rules[0].parameters[1].kind, PrimitiveKind::Integer);
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(GeneratorConfig::from_yaml("  \n").unwrap(), GeneratorConfig::default());
    }

    #[test]
    fn test_load_invalid_yaml_is_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"info: [unclosed").unwrap();

        let err = GeneratorConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, Error::ParseError { .. }));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = GeneratorConfig::load(Path::new("/no/such/config.yaml")).unwrap_err();
        assert!(matches!(err, Error::IoError(_)));
    }

    #[test]
    fn test_bearer_token_convention() {
        let conventions = Conventions::default();
        assert!(conventions.is_bearer_token("xTtsAccessToken"));
        assert!(conventions.is_bearer_token("shopAccessToken"));
        assert!(!conventions.is_bearer_token("AccessToken"));
        assert!(!conventions.is_bearer_token("pageToken"));
        assert!(conventions.is_content_type("contentType"));
        assert!(conventions.is_body("GetOrderListRequestBody"));
        assert!(!conventions.is_body("shopCipher"));
    }

    #[test]
    fn test_injected_parameter_follows_mode() {
        let param = InjectedParameter::new("sign", PrimitiveKind::String, "Signature");
        assert!(param.to_parameter(InjectionMode::Mandatory).required);
        assert!(!param.to_parameter(InjectionMode::Optional).required);
    }
}
