use anyhow::{Context, Result};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use tree_sitter::{Language, Node, Parser, Tree};

/// Structural parser for TypeScript SDK source units.
///
/// The `SourceParser` parses a unit with tree-sitter-typescript and visits the resulting
/// syntax tree into light records: class declarations, their properties and methods,
/// method parameter lists, type annotations and doc comments. Anything the visitor does
/// not recognise (including tree-sitter `ERROR` nodes) is skipped, so parsing never fails
/// on syntax; the only error is an unreadable file.
///
/// # Example
///
/// ```no_run
/// use openapi_from_sdk::parser::SourceParser;
/// use std::path::Path;
///
/// let unit = SourceParser::parse_file(Path::new("sdk/api/productV202309Api.ts")).unwrap();
/// println!("Parsed {} classes", unit.classes.len());
/// ```
pub struct SourceParser;

/// A parsed source unit (one file).
#[derive(Debug, Clone)]
pub struct SourceUnit {
    /// Path to the source file
    pub path: PathBuf,
    /// Class declarations in declaration order
    pub classes: Vec<ClassDecl>,
}

/// A `class` declaration.
#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: String,
    pub exported: bool,
    /// Nearest doc comment preceding the declaration
    pub doc: Option<DocComment>,
    pub members: Vec<ClassMember>,
}

#[derive(Debug, Clone)]
pub enum ClassMember {
    Property(PropertyDecl),
    Method(MethodDecl),
}

/// A class property, e.g. `'code'?: number;` or `static attributeTypeMap: ... = [...]`.
#[derive(Debug, Clone)]
pub struct PropertyDecl {
    pub name: String,
    pub optional: bool,
    pub is_static: bool,
    pub doc: Option<DocComment>,
    pub type_annotation: Option<TypeNode>,
    pub initializer: Option<Expr>,
}

/// A class method with its signature and a summary of its body.
#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub name: String,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_async: bool,
    pub is_accessor: bool,
    pub doc: Option<DocComment>,
    pub params: Vec<ParamDecl>,
    pub return_type: Option<TypeNode>,
    pub body: MethodBody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

/// One declared parameter of a method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDecl {
    pub name: String,
    /// Declared with a `?` suffix
    pub optional: bool,
    /// Declared with a default value (`= ...`)
    pub has_default: bool,
    /// Type annotation text, empty when absent
    pub type_text: String,
}

/// A type annotation as written, with the structure the extractors look into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeNode {
    /// Source text with whitespace runs collapsed to one space
    pub text: String,
    pub shape: TypeShape,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeShape {
    /// `Name<Arg, ...>`
    Generic { name: String, args: Vec<TypeNode> },
    /// `{ key: Type; ... }`
    Object(Vec<(String, TypeNode)>),
    Other,
}

/// The literal parts of an expression.
///
/// String, array and object literals are kept structurally; anything else keeps its text
/// and the string literals found inside it, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Str(String),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Other { text: String, strings: Vec<String> },
}

impl Expr {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Expr::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// First string literal in source order.
    pub fn first_string(&self) -> Option<&str> {
        match self {
            Expr::Str(s) => Some(s.as_str()),
            Expr::Array(items) => items.iter().find_map(Expr::first_string),
            Expr::Object(pairs) => pairs.iter().find_map(|(_, value)| value.first_string()),
            Expr::Other { strings, .. } => strings.first().map(String::as_str),
        }
    }
}

/// What a method body binds and which object literal pairs it spells out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodBody {
    /// `name = value` from declarations and assignments, in source order
    pub bindings: Vec<(String, Expr)>,
    /// `key: value` pairs of every object literal, nested ones included, in source order
    pub pairs: Vec<(String, Expr)>,
}

impl MethodBody {
    pub fn binding(&self, name: &str) -> Option<&Expr> {
        self.bindings.iter().find(|(target, _)| target == name).map(|(_, value)| value)
    }
}

/// The body of a `/** ... */` comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocComment {
    raw: String,
}

impl DocComment {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// Comment lines with the leading `*` decoration removed, trimmed, empty lines dropped.
    pub fn lines(&self) -> Vec<String> {
        self.raw
            .lines()
            .map(|line| {
                let line = line.trim();
                line.strip_prefix('*').unwrap_or(line).trim().to_string()
            })
            .filter(|line| !line.is_empty())
            .collect()
    }

    /// All non-tag lines joined by newlines.
    pub fn text(&self) -> String {
        self.lines()
            .into_iter()
            .filter(|line| !line.starts_with('@'))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Value of the first `@tag value` line.
    pub fn tag(&self, tag: &str) -> Option<String> {
        let prefix = format!("@{}", tag);
        self.lines().into_iter().find_map(|line| {
            let rest = line.strip_prefix(&prefix)?;
            if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
                return None;
            }
            let value = rest.trim();
            (!value.is_empty()).then(|| value.to_string())
        })
    }
}

impl SourceUnit {
    /// Exported classes, or every class when the unit exports none.
    pub fn primary_classes(&self) -> Vec<&ClassDecl> {
        let exported: Vec<&ClassDecl> = self.classes.iter().filter(|c| c.exported).collect();
        if exported.is_empty() {
            self.classes.iter().collect()
        } else {
            exported
        }
    }
}

impl ClassDecl {
    pub fn properties(&self) -> impl Iterator<Item = &PropertyDecl> {
        self.members.iter().filter_map(|m| match m {
            ClassMember::Property(p) => Some(p),
            _ => None,
        })
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDecl> {
        self.members.iter().filter_map(|m| match m {
            ClassMember::Method(m) => Some(m),
            _ => None,
        })
    }

    /// Looks up a property by name; `want_static` selects static or instance properties.
    pub fn property(&self, name: &str, want_static: bool) -> Option<&PropertyDecl> {
        self.properties()
            .find(|p| p.name == name && p.is_static == want_static)
    }
}

impl SourceParser {
    /// Reads and parses a single source file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read. Malformed content never fails;
    /// constructs the parser does not understand are skipped.
    pub fn parse_file(path: &Path) -> Result<SourceUnit> {
        debug!("Parsing file: {}", path.display());

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        let unit = Self::parse_str(path, &content);
        debug!(
            "Parsed {} with {} classes",
            path.display(),
            unit.classes.len()
        );
        Ok(unit)
    }

    /// Parses source text that is already in memory.
    pub fn parse_str(path: &Path, content: &str) -> SourceUnit {
        let classes = match syntax_tree(content) {
            Some(tree) => {
                let root = tree.root_node();
                if root.has_error() {
                    debug!("{} has syntax errors, keeping what parsed", path.display());
                }
                UnitVisitor::new(content).classes(root)
            }
            None => {
                warn!("tree-sitter produced no tree for {}", path.display());
                Vec::new()
            }
        };

        SourceUnit {
            path: path.to_path_buf(),
            classes,
        }
    }

    /// Parses multiple source files, continuing even if some cannot be read.
    ///
    /// Returns one result per input path, in input order.
    pub fn parse_files(paths: &[PathBuf]) -> Vec<Result<SourceUnit>> {
        debug!("Parsing {} files", paths.len());

        let results: Vec<Result<SourceUnit>> = paths
            .iter()
            .map(|path| match Self::parse_file(path) {
                Ok(unit) => Ok(unit),
                Err(e) => {
                    warn!("Failed to parse {}: {}", path.display(), e);
                    Err(e)
                }
            })
            .collect();

        let success_count = results.iter().filter(|r| r.is_ok()).count();
        debug!(
            "Parsing complete: {} succeeded, {} failed",
            success_count,
            results.len() - success_count
        );

        results
    }
}

fn syntax_tree(content: &str) -> Option<Tree> {
    let language: Language = tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into();
    let mut parser = Parser::new();
    if let Err(e) = parser.set_language(&language) {
        warn!("TypeScript grammar rejected by tree-sitter: {}", e);
        return None;
    }
    parser.parse(content, None)
}

/// Collapses whitespace runs, so multi-line annotations compare as one line.
fn compact(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Visits a syntax tree, reading node text from the unit's source.
struct UnitVisitor<'s> {
    source: &'s str,
}

impl<'s> UnitVisitor<'s> {
    fn new(source: &'s str) -> Self {
        Self { source }
    }

    fn text(&self, node: Node<'_>) -> &'s str {
        node.utf8_text(self.source.as_bytes()).unwrap_or_default()
    }

    fn classes(&self, root: Node<'_>) -> Vec<ClassDecl> {
        let mut classes = Vec::new();
        let mut pending_doc: Option<DocComment> = None;

        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            match child.kind() {
                "comment" => {
                    if let Some(doc) = self.doc_comment(child) {
                        pending_doc = Some(doc);
                    }
                }
                "export_statement" => {
                    if let Some(declaration) = exported_class(child) {
                        classes.extend(self.class(declaration, true, pending_doc.take()));
                    }
                }
                "class_declaration" | "abstract_class_declaration" => {
                    classes.extend(self.class(child, false, pending_doc.take()));
                }
                _ => {}
            }
        }
        classes
    }

    fn class(&self, node: Node<'_>, exported: bool, doc: Option<DocComment>) -> Option<ClassDecl> {
        let name = self.text(node.child_by_field_name("name")?).to_string();
        if name.is_empty() {
            return None;
        }
        let body = node.child_by_field_name("body")?;

        Some(ClassDecl {
            name,
            exported,
            doc,
            members: self.members(body),
        })
    }

    fn members(&self, body: Node<'_>) -> Vec<ClassMember> {
        let mut members = Vec::new();
        let mut pending_doc: Option<DocComment> = None;

        let mut cursor = body.walk();
        for child in body.named_children(&mut cursor) {
            match child.kind() {
                "comment" => {
                    if let Some(doc) = self.doc_comment(child) {
                        pending_doc = Some(doc);
                    }
                }
                "public_field_definition" => {
                    let doc = pending_doc.take();
                    members.extend(self.property(child, doc).map(ClassMember::Property));
                }
                "method_definition" => {
                    let doc = pending_doc.take();
                    members.extend(self.method(child, doc).map(ClassMember::Method));
                }
                // signatures, index signatures, static blocks and ERROR nodes
                _ => pending_doc = None,
            }
        }
        members
    }

    fn property(&self, node: Node<'_>, doc: Option<DocComment>) -> Option<PropertyDecl> {
        let name = self.property_key(node.child_by_field_name("name")?)?;
        let modifiers = self.modifiers(node);

        Some(PropertyDecl {
            name,
            optional: modifiers.optional,
            is_static: modifiers.is_static,
            doc,
            type_annotation: node
                .child_by_field_name("type")
                .and_then(annotated_type)
                .map(|ty| self.type_node(ty)),
            initializer: node.child_by_field_name("value").map(|value| self.expr(value)),
        })
    }

    fn method(&self, node: Node<'_>, doc: Option<DocComment>) -> Option<MethodDecl> {
        let name = self.property_key(node.child_by_field_name("name")?)?;
        let modifiers = self.modifiers(node);

        let params = match node.child_by_field_name("parameters") {
            Some(list) => {
                let mut cursor = list.walk();
                list.named_children(&mut cursor)
                    .filter_map(|param| self.param(param))
                    .collect()
            }
            None => Vec::new(),
        };

        Some(MethodDecl {
            name,
            visibility: modifiers.visibility.unwrap_or(Visibility::Public),
            is_static: modifiers.is_static,
            is_async: modifiers.is_async,
            is_accessor: modifiers.is_accessor,
            doc,
            params,
            return_type: node
                .child_by_field_name("return_type")
                .filter(|n| n.kind() == "type_annotation")
                .and_then(annotated_type)
                .map(|ty| self.type_node(ty)),
            body: node
                .child_by_field_name("body")
                .map(|body| self.method_body(body))
                .unwrap_or_default(),
        })
    }

    /// Keyword children that precede a member's name.
    fn modifiers(&self, node: Node<'_>) -> Modifiers {
        let mut modifiers = Modifiers::default();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "accessibility_modifier" => {
                    modifiers.visibility = match self.text(child) {
                        "private" => Some(Visibility::Private),
                        "protected" => Some(Visibility::Protected),
                        _ => Some(Visibility::Public),
                    }
                }
                "static" if !child.is_named() => modifiers.is_static = true,
                "async" if !child.is_named() => modifiers.is_async = true,
                "get" | "set" if !child.is_named() => modifiers.is_accessor = true,
                "?" if !child.is_named() => modifiers.optional = true,
                _ => {}
            }
        }
        modifiers
    }

    fn param(&self, node: Node<'_>) -> Option<ParamDecl> {
        let optional = match node.kind() {
            "required_parameter" => false,
            "optional_parameter" => true,
            _ => return None,
        };

        let pattern = node.child_by_field_name("pattern")?;
        let name = match pattern.kind() {
            "identifier" => self.text(pattern).to_string(),
            "rest_pattern" => {
                let mut cursor = pattern.walk();
                let inner = pattern
                    .named_children(&mut cursor)
                    .find(|n| n.kind() == "identifier")?;
                self.text(inner).to_string()
            }
            _ => return None,
        };

        let type_text = node
            .child_by_field_name("type")
            .and_then(annotated_type)
            .map(|ty| compact(self.text(ty)))
            .unwrap_or_default();

        Some(ParamDecl {
            name,
            optional,
            has_default: node.child_by_field_name("value").is_some(),
            type_text,
        })
    }

    fn type_node(&self, node: Node<'_>) -> TypeNode {
        let shape = match node.kind() {
            "generic_type" => {
                let name = node
                    .child_by_field_name("name")
                    .map(|n| self.text(n).to_string())
                    .unwrap_or_default();
                let args = match node.child_by_field_name("type_arguments") {
                    Some(list) => {
                        let mut cursor = list.walk();
                        list.named_children(&mut cursor)
                            .filter(|n| n.kind() != "comment")
                            .map(|n| self.type_node(n))
                            .collect()
                    }
                    None => Vec::new(),
                };
                TypeShape::Generic { name, args }
            }
            "object_type" => {
                let mut cursor = node.walk();
                let members = node
                    .named_children(&mut cursor)
                    .filter(|n| n.kind() == "property_signature")
                    .filter_map(|member| {
                        let key = self.property_key(member.child_by_field_name("name")?)?;
                        let ty = member.child_by_field_name("type").and_then(annotated_type)?;
                        Some((key, self.type_node(ty)))
                    })
                    .collect();
                TypeShape::Object(members)
            }
            _ => TypeShape::Other,
        };

        TypeNode {
            text: compact(self.text(node)),
            shape,
        }
    }

    fn expr(&self, node: Node<'_>) -> Expr {
        match node.kind() {
            "string" => Expr::Str(self.string_value(node)),
            "array" => {
                let mut cursor = node.walk();
                Expr::Array(
                    node.named_children(&mut cursor)
                        .filter(|n| n.kind() != "comment")
                        .map(|n| self.expr(n))
                        .collect(),
                )
            }
            "object" => {
                let mut cursor = node.walk();
                Expr::Object(
                    node.named_children(&mut cursor)
                        .filter(|n| n.kind() == "pair")
                        .filter_map(|pair| self.pair(pair))
                        .collect(),
                )
            }
            _ => Expr::Other {
                text: compact(self.text(node)),
                strings: self.strings_in(node),
            },
        }
    }

    fn pair(&self, node: Node<'_>) -> Option<(String, Expr)> {
        let key = self.property_key(node.child_by_field_name("key")?)?;
        let value = node.child_by_field_name("value")?;
        Some((key, self.expr(value)))
    }

    /// Collects bindings and object pairs anywhere under `body`, nested callbacks included.
    fn method_body(&self, body: Node<'_>) -> MethodBody {
        let mut summary = MethodBody::default();

        for node in preorder(body) {
            match node.kind() {
                "variable_declarator" => {
                    if let (Some(name), Some(value)) =
                        (node.child_by_field_name("name"), node.child_by_field_name("value"))
                    {
                        summary.bindings.push((self.text(name).to_string(), self.expr(value)));
                    }
                }
                "assignment_expression" => {
                    if let (Some(left), Some(right)) =
                        (node.child_by_field_name("left"), node.child_by_field_name("right"))
                    {
                        summary.bindings.push((compact(self.text(left)), self.expr(right)));
                    }
                }
                "pair" => summary.pairs.extend(self.pair(node)),
                _ => {}
            }
        }
        summary
    }

    /// String literals under `node` in source order.
    fn strings_in(&self, node: Node<'_>) -> Vec<String> {
        preorder(node)
            .into_iter()
            .filter(|n| n.kind() == "string")
            .map(|n| self.string_value(n))
            .collect()
    }

    /// Contents of a string literal without its quotes.
    fn string_value(&self, node: Node<'_>) -> String {
        let mut cursor = node.walk();
        node.named_children(&mut cursor)
            .map(|part| self.text(part))
            .collect()
    }

    /// A member or object key; computed keys have no static name.
    fn property_key(&self, node: Node<'_>) -> Option<String> {
        match node.kind() {
            "string" => Some(self.string_value(node)),
            "property_identifier" | "identifier" | "number" | "type_identifier" => {
                Some(self.text(node).to_string())
            }
            "private_property_identifier" => Some(self.text(node).trim_start_matches('#').to_string()),
            _ => None,
        }
        .filter(|key| !key.is_empty())
    }

    fn doc_comment(&self, node: Node<'_>) -> Option<DocComment> {
        let text = self.text(node);
        let body = text.strip_prefix("/**")?;
        Some(DocComment::new(body.strip_suffix("*/").unwrap_or(body)))
    }
}

#[derive(Default)]
struct Modifiers {
    visibility: Option<Visibility>,
    is_static: bool,
    is_async: bool,
    is_accessor: bool,
    optional: bool,
}

/// The class declared by an `export` statement, if any.
fn exported_class(node: Node<'_>) -> Option<Node<'_>> {
    let is_class = |n: &Node<'_>| matches!(n.kind(), "class_declaration" | "abstract_class_declaration");
    if let Some(declaration) = node.child_by_field_name("declaration") {
        return is_class(&declaration).then_some(declaration);
    }
    let mut cursor = node.walk();
    let found = node.named_children(&mut cursor).find(is_class);
    found
}

/// The type inside a `type_annotation` (`: T`).
fn annotated_type(annotation: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = annotation.walk();
    let found = annotation
        .named_children(&mut cursor)
        .find(|n| n.kind() != "comment");
    found
}

/// Every node under `root` (inclusive) in source order, without recursion. String literals
/// are not descended into.
fn preorder(root: Node<'_>) -> Vec<Node<'_>> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        out.push(node);
        if node.kind() == "string" {
            continue;
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    out
}
