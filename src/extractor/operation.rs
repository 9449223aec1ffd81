use super::{
    HttpMethod, Operation, Parameter, ParameterLocation, RequestBody, ResponseSpec, SchemaType,
    SourceExtractor,
};
use crate::config::Conventions;
use crate::parser::{
    ClassDecl, MethodBody, MethodDecl, ParamDecl, SourceParser, SourceUnit, TypeNode, TypeShape, Visibility,
};
use crate::type_mapper;
use heck::ToSnakeCase;
use indexmap::IndexMap;
use log::{debug, warn};
use std::path::Path;

/// Extractor for SDK API units.
///
/// Every public, non-static method of an exported class that returns `Promise<...>` is an
/// operation candidate. Its body must assign `localVarPath` from a string literal; the verb
/// comes from the request options' `method:` literal.
pub struct OperationExtractor<'a> {
    conventions: &'a Conventions,
}

impl<'a> OperationExtractor<'a> {
    pub fn new(conventions: &'a Conventions) -> Self {
        Self { conventions }
    }

    /// Parses and extracts operations from source text held in memory.
    pub fn extract_source(&self, text: &str) -> Vec<Operation> {
        self.extract(&SourceParser::parse_str(Path::new("<memory>"), text))
    }

    fn extract_method(&self, unit: &SourceUnit, class: &ClassDecl, method: &MethodDecl) -> Option<Operation> {
        if method.is_static
            || method.is_accessor
            || method.visibility != Visibility::Public
            || method.name == "constructor"
        {
            return None;
        }
        let Some(success) = promise_result(method.return_type.as_ref()) else {
            debug!("{}::{} does not return a Promise, skipping", class.name, method.name);
            return None;
        };

        let Some(path) = find_path_assignment(&method.body) else {
            warn!(
                "Skipping {}::{} in {}: no localVarPath assignment",
                class.name,
                method.name,
                unit.path.display()
            );
            return None;
        };

        let http_method = match find_method_literal(&method.body) {
            Some(verb) => HttpMethod::parse(&verb).unwrap_or_else(|| {
                warn!(
                    "Unrecognised HTTP method '{}' in {}::{}, using GET",
                    verb, class.name, method.name
                );
                HttpMethod::Get
            }),
            None => {
                debug!("No method literal in {}::{}, using GET", class.name, method.name);
                HttpMethod::Get
            }
        };

        let mut operation = Operation::new(path, http_method, format!("{}_{}", class.name, method.name));
        operation.tags = vec![self.tag_for(&class.name)];

        let placeholders = operation.path_placeholders();
        for param in &method.params {
            if param.name == self.conventions.options_parameter {
                continue;
            }
            if self.conventions.is_body(&param.name) {
                operation.request_body = Some(RequestBody {
                    required: !is_optional(param),
                    schema: type_mapper::map(&param.type_text),
                });
                continue;
            }
            operation.parameters.push(self.classify(param, &placeholders));
        }

        for placeholder in &placeholders {
            let covered = operation
                .parameters
                .iter()
                .any(|p| p.location == ParameterLocation::Path && &p.name == placeholder);
            if !covered {
                debug!(
                    "Adding undeclared path parameter '{}' to {}",
                    placeholder, operation.operation_id
                );
                operation.parameters.push(Parameter::new(
                    placeholder.clone(),
                    ParameterLocation::Path,
                    SchemaType::string(),
                    true,
                ));
            }
        }

        operation.responses = standard_responses(type_mapper::map(&success));
        self.apply_docs(&mut operation, method);

        debug!(
            "Extracted {} {} as {}",
            operation.method, operation.path, operation.operation_id
        );
        Some(operation)
    }

    /// Decides the location and wire name of a declared parameter.
    fn classify(&self, param: &ParamDecl, placeholders: &[String]) -> Parameter {
        let conventions = self.conventions;
        let snake = param.name.to_snake_case();
        let optional = is_optional(param);

        let (name, location, required) = if conventions.is_bearer_token(&param.name) {
            (conventions.bearer_token_header.clone(), ParameterLocation::Header, true)
        } else if conventions.is_content_type(&param.name) {
            (conventions.content_type_header.clone(), ParameterLocation::Header, !optional)
        } else if let Some(placeholder) = placeholders
            .iter()
            .find(|p| **p == snake || **p == param.name)
        {
            (placeholder.clone(), ParameterLocation::Path, true)
        } else {
            (snake, ParameterLocation::Query, !optional)
        };

        let description = conventions
            .parameter_descriptions
            .get(&name)
            .cloned()
            .or_else(|| param.name.contains("Id").then(|| format!("{} identifier", param.name)));

        Parameter {
            name,
            location,
            required,
            schema: type_mapper::map(&param.type_text),
            description,
        }
    }

    fn apply_docs(&self, operation: &mut Operation, method: &MethodDecl) {
        let Some(doc) = &method.doc else {
            operation.description = format!("{} operation", method.name);
            operation.summary = method.name.clone();
            return;
        };

        operation.description = doc
            .lines()
            .into_iter()
            .find(|line| !line.starts_with('@'))
            .unwrap_or_else(|| format!("{} operation", method.name));
        operation.summary = doc
            .tag("summary")
            .unwrap_or_else(|| operation.description.clone());
    }

    /// Class name without its `V<digits>Api` / `Api` suffix.
    fn tag_for(&self, class_name: &str) -> String {
        let suffix = self.conventions.tag_suffix.as_str();
        let Some(stem) = class_name.strip_suffix(suffix).filter(|s| !suffix.is_empty() && !s.is_empty()) else {
            return class_name.to_string();
        };
        let digits = stem.len() - stem.trim_end_matches(|c: char| c.is_ascii_digit()).len();
        if digits > 0 {
            if let Some(base) = stem[..stem.len() - digits].strip_suffix('V') {
                if !base.is_empty() {
                    return base.to_string();
                }
            }
        }
        stem.to_string()
    }
}

impl SourceExtractor for OperationExtractor<'_> {
    type Output = Vec<Operation>;

    fn extract(&self, unit: &SourceUnit) -> Vec<Operation> {
        let mut operations = Vec::new();
        for class in unit.classes.iter().filter(|c| c.exported) {
            for method in class.methods() {
                if let Some(operation) = self.extract_method(unit, class, method) {
                    operations.push(operation);
                }
            }
        }
        debug!(
            "Extracted {} operations from {}",
            operations.len(),
            unit.path.display()
        );
        operations
    }
}

fn is_optional(param: &ParamDecl) -> bool {
    param.optional || param.has_default
}

/// The success type carried by a `Promise<...>` return type.
///
/// `Promise<{ response: ...; body: T; }>` yields `T`; `Promise<T>` yields `T`.
fn promise_result(return_type: Option<&TypeNode>) -> Option<String> {
    let TypeShape::Generic { name, args } = &return_type?.shape else {
        return None;
    };
    let [inner] = args.as_slice() else {
        return None;
    };
    if name != "Promise" {
        return None;
    }

    match &inner.shape {
        TypeShape::Object(members) => Some(
            members
                .iter()
                .find(|(key, _)| key == "body")
                .map(|(_, ty)| ty.text.clone())
                .unwrap_or_default(),
        ),
        _ => Some(inner.text.clone()),
    }
}

/// First string literal assigned to `localVarPath`.
fn find_path_assignment(body: &MethodBody) -> Option<String> {
    body.binding("localVarPath")?.first_string().map(str::to_string)
}

/// Verb of the first `method: '<VERB>'` pair.
fn find_method_literal(body: &MethodBody) -> Option<String> {
    body.pairs
        .iter()
        .filter(|(key, _)| key == "method")
        .find_map(|(_, value)| value.as_str().map(str::to_string))
}

/// 200 with the success schema plus the fixed failure responses.
fn standard_responses(success: SchemaType) -> IndexMap<String, ResponseSpec> {
    let mut error_properties = IndexMap::new();
    error_properties.insert("code".to_string(), SchemaType::number());
    error_properties.insert("message".to_string(), SchemaType::string());
    error_properties.insert("request_id".to_string(), SchemaType::string());

    let mut responses = IndexMap::new();
    responses.insert(
        "200".to_string(),
        ResponseSpec::new("Successful response", Some(success)),
    );
    responses.insert(
        "400".to_string(),
        ResponseSpec::new(
            "Bad Request",
            Some(SchemaType::Object {
                properties: error_properties,
                required: Vec::new(),
            }),
        ),
    );
    responses.insert(
        "401".to_string(),
        ResponseSpec::new("Unauthorized - Invalid or missing access token", None),
    );
    responses.insert("500".to_string(), ResponseSpec::new("Internal Server Error", None));
    responses
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PRODUCT_API: &str = r#"
/**
 * tiktok shop openapi
 * sdk for apis
 *
 * NOTE: This class is auto generated by OpenAPI Generator (https://openapi-generator.tech).
 */

import localVarRequest from 'request';
import http from 'http';

let defaultBasePath = 'https://open-api.tiktokglobalshop.com';

export class ProductV202309Api {
    protected _basePath = defaultBasePath;
    protected _defaultHeaders : any = {};

    constructor(basePath?: string){
        if (basePath) {
            this.basePath = basePath;
        }
    }

    set basePath(basePath: string) {
        this._basePath = basePath;
    }

    public setDefaultAuthentication(auth: Authentication) {
        this.authentications.default = auth;
    }

    /**
     * Retrieve all properties of a product.
     * @summary GetProduct
     * @param productId The product ID.
     * @param xTtsAccessToken
     * @param contentType Allowed type: application/json
     * @param shopCipher
     */
    public async ProductsProductIdGet (productId: string, xTtsAccessToken: string, contentType: string, returnUnderReviewVersion?: boolean, shopCipher?: string, options: {headers: {[name: string]: string}} = {headers: {}}) : Promise<{ response: http.IncomingMessage; body: Product202309GetProductResponse;  }> {
        const localVarPath = this.basePath + '/product/202309/products/{product_id}'
            .replace('{' + 'product_id' + '}', encodeURIComponent(String(productId)));
        let localVarQueryParameters: any = {};
        let localVarHeaderParams: any = (<any>Object).assign({}, this._defaultHeaders);

        if (productId === null || productId === undefined) {
            throw new Error('Required parameter productId was null or undefined when calling ProductsProductIdGet.');
        }

        let localVarRequestOptions: localVarRequest.Options = {
            method: 'GET',
            qs: localVarQueryParameters,
            headers: localVarHeaderParams,
            uri: localVarPath,
            json: true,
        };
        return new Promise<{ response: http.IncomingMessage; body: Product202309GetProductResponse;  }>((resolve, reject) => {
            resolve({ response: null, body: null });
        });
    }

    /**
     * Search products.
     * @summary SearchProducts
     */
    public async ProductsSearchPost (pageSize: number, xTtsAccessToken: string, contentType: string, pageToken?: string, SearchProductsRequestBody?: Product202309SearchProductsRequestBody, options: {headers: {[name: string]: string}} = {headers: {}}) : Promise<{ response: http.IncomingMessage; body: Product202309SearchProductsResponse;  }> {
        const localVarPath = this.basePath + '/product/202309/products/search';
        let localVarRequestOptions: localVarRequest.Options = {
            method: 'POST',
            uri: localVarPath,
            body: ObjectSerializer.serialize(SearchProductsRequestBody, "Product202309SearchProductsRequestBody")
        };
        return this.send(localVarRequestOptions);
    }

    public async Broken (xTtsAccessToken: string) : Promise<{ response: http.IncomingMessage; body: any;  }> {
        return this.send({ method: 'GET' });
    }

    private async helper () : Promise<void> {
        const localVarPath = this.basePath + '/internal';
    }
}
"#;

    fn extract(text: &str) -> Vec<Operation> {
        let conventions = Conventions::default();
        OperationExtractor::new(&conventions).extract_source(text)
    }

    #[test]
    fn test_only_public_promise_methods_with_paths_become_operations() {
        let ops = extract(PRODUCT_API);
        let ids: Vec<&str> = ops.iter().map(|o| o.operation_id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "ProductV202309Api_ProductsProductIdGet",
                "ProductV202309Api_ProductsSearchPost"
            ]
        );
    }

    #[test]
    fn test_path_method_and_tag() {
        let ops = extract(PRODUCT_API);

        assert_eq!(ops[0].path, "/product/202309/products/{product_id}");
        assert_eq!(ops[0].method, HttpMethod::Get);
        assert_eq!(ops[0].tags, vec!["Product"]);
        assert_eq!(ops[1].path, "/product/202309/products/search");
        assert_eq!(ops[1].method, HttpMethod::Post);
    }

    #[test]
    fn test_parameter_classification() {
        let ops = extract(PRODUCT_API);
        let params: Vec<(&str, ParameterLocation, bool)> = ops[0]
            .parameters
            .iter()
            .map(|p| (p.name.as_str(), p.location, p.required))
            .collect();

        assert_eq!(
            params,
            vec![
                ("product_id", ParameterLocation::Path, true),
                ("x-tts-access-token", ParameterLocation::Header, true),
                ("Content-Type", ParameterLocation::Header, true),
                ("return_under_review_version", ParameterLocation::Query, false),
                ("shop_cipher", ParameterLocation::Query, false),
            ]
        );
        assert_eq!(ops[0].parameters[0].description.as_deref(), Some("productId identifier"));
        assert_eq!(
            ops[0].parameters[4].description.as_deref(),
            Some("Shop cipher for API authentication")
        );
        assert_eq!(ops[0].parameters[3].schema, SchemaType::boolean());
    }

    #[test]
    fn test_page_token_is_a_query_parameter() {
        let ops = extract(PRODUCT_API);
        let page_token = ops[1]
            .parameters
            .iter()
            .find(|p| p.name == "page_token")
            .unwrap();
        assert_eq!(page_token.location, ParameterLocation::Query);
        assert!(!page_token.required);
        assert_eq!(page_token.description.as_deref(), Some("Token for pagination"));
    }

    #[test]
    fn test_request_body() {
        let ops = extract(PRODUCT_API);
        assert!(ops[0].request_body.is_none());

        let body = ops[1].request_body.as_ref().unwrap();
        assert!(!body.required);
        assert_eq!(
            body.schema,
            SchemaType::reference("Product202309SearchProductsRequestBody")
        );
        assert!(ops[1].parameters.iter().all(|p| !p.name.contains("Body")));
    }

    #[test]
    fn test_responses() {
        let ops = extract(PRODUCT_API);
        let codes: Vec<&str> = ops[0].responses.keys().map(String::as_str).collect();
        assert_eq!(codes, vec!["200", "400", "401", "500"]);
        assert_eq!(
            ops[0].responses["200"].schema,
            Some(SchemaType::reference("Product202309GetProductResponse"))
        );
        assert!(ops[0].responses["401"].schema.is_none());
    }

    #[test]
    fn test_docs_summary_and_description() {
        let ops = extract(PRODUCT_API);
        assert_eq!(ops[0].description, "Retrieve all properties of a product.");
        assert_eq!(ops[0].summary, "GetProduct");
    }

    #[test]
    fn test_missing_doc_and_method_literal_defaults() {
        let ops = extract(
            r#"
            export class ItemsApi {
                public async getItem (id: string) : Promise<Item> {
                    const localVarPath = this.basePath + '/items/{id}';
                }
            }
            "#,
        );

        assert_eq!(ops.len(), 1);
        let op = &ops[0];
        assert_eq!(op.method, HttpMethod::Get);
        assert_eq!(op.summary, "getItem");
        assert_eq!(op.description, "getItem operation");
        assert_eq!(op.tags, vec!["Items"]);
        assert_eq!(op.responses["200"].schema, Some(SchemaType::reference("Item")));

        assert_eq!(op.parameters.len(), 1);
        assert_eq!(op.parameters[0].name, "id");
        assert_eq!(op.parameters[0].location, ParameterLocation::Path);
        assert!(op.parameters[0].required);
    }

    #[test]
    fn test_undeclared_placeholder_becomes_path_parameter() {
        let ops = extract(
            r#"
            export class OrderApi {
                public async cancel () : Promise<any> {
                    const localVarPath = this.basePath + '/orders/{order_id}/cancel';
                    const opts = { method: 'post' };
                }
            }
            "#,
        );

        assert_eq!(ops[0].method, HttpMethod::Post);
        assert_eq!(
            ops[0].parameters,
            vec![Parameter::new("order_id", ParameterLocation::Path, SchemaType::string(), true)]
        );
    }

    #[test]
    fn test_unknown_verb_falls_back_to_get() {
        let ops = extract(
            r#"
            export class PingApi {
                public async ping () : Promise<any> {
                    const localVarPath = this.basePath + '/ping';
                    const opts = { method: 'OPTIONS' };
                }
            }
            "#,
        );
        assert_eq!(ops[0].method, HttpMethod::Get);
    }

    #[test]
    fn test_bearer_token_is_required_even_if_optional() {
        let ops = extract(
            r#"
            export class ShopApi {
                public async shops (shopAccessToken?: string, limit: number = 10) : Promise<any> {
                    const localVarPath = this.basePath + '/shops';
                }
            }
            "#,
        );
        let params = &ops[0].parameters;
        assert_eq!(params[0].name, "x-tts-access-token");
        assert!(params[0].required);
        assert_eq!(params[1].name, "limit");
        assert!(!params[1].required);
    }

    #[test]
    fn test_tag_suffix_stripping() {
        let conventions = Conventions::default();
        let extractor = OperationExtractor::new(&conventions);
        assert_eq!(extractor.tag_for("OrderV202309Api"), "Order");
        assert_eq!(extractor.tag_for("AuthorizationApi"), "Authorization");
        assert_eq!(extractor.tag_for("Api"), "Api");
        assert_eq!(extractor.tag_for("V2Api"), "V2");
        assert_eq!(extractor.tag_for("Helper"), "Helper");
    }

    fn return_type(annotation: &str) -> Option<TypeNode> {
        let source = format!("export class A {{ public async m () : {} {{}} }}", annotation);
        let unit = SourceParser::parse_str(Path::new("a.ts"), &source);
        let ret = unit.classes[0].methods().next()?.return_type.clone();
        ret
    }

    #[test]
    fn test_promise_result_forms() {
        let body = return_type("Promise<{ response: http.IncomingMessage; body: Array<Item>;  }>");
        assert_eq!(promise_result(body.as_ref()).as_deref(), Some("Array<Item>"));

        let plain = return_type("Promise<Item202401Item>");
        assert_eq!(promise_result(plain.as_ref()).as_deref(), Some("Item202401Item"));

        let nested = return_type("Promise<Array<Item>>");
        assert_eq!(promise_result(nested.as_ref()).as_deref(), Some("Array<Item>"));

        let bodiless = return_type("Promise<{ response: http.IncomingMessage; }>");
        assert_eq!(promise_result(bodiless.as_ref()).as_deref(), Some(""));

        assert_eq!(promise_result(return_type("void").as_ref()), None);
        assert_eq!(promise_result(return_type("Array<Item>").as_ref()), None);
        assert_eq!(promise_result(None), None);
    }

    #[test]
    fn test_path_taken_from_first_literal_of_the_assignment() {
        let ops = extract(
            r#"
            export class ItemsApi {
                public async move () : Promise<any> {
                    let prefix = '/ignored';
                    let localVarPath = this.basePath + '/items/{id}/move'
                        .replace('{' + 'id' + '}', encodeURIComponent(String(id)));
                    return this.send({ uri: localVarPath, headers: { method: 42 }, method: 'PUT' });
                }
            }
            "#,
        );
        assert_eq!(ops[0].path, "/items/{id}/move");
        assert_eq!(ops[0].method, HttpMethod::Put);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        assert_eq!(extract(PRODUCT_API), extract(PRODUCT_API));
    }
}
