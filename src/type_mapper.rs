//! Mapping of SDK type annotations to schema type descriptors.
//!
//! [`map`] is total: every input produces a descriptor. Tokens outside the SDK's small type
//! vocabulary degrade to [`SchemaType::Any`].

use crate::extractor::{PrimitiveKind, SchemaType};
use log::debug;

/// Maps a type annotation token to a [`SchemaType`].
///
/// Rules, in priority order: homogeneous arrays (`T[]`, `Array<T>`, `ReadonlyArray<T>`),
/// primitive keywords, `Date`, capitalised names as references, everything else `Any`.
/// Nullable markers (`| null`, `| undefined`, trailing `?`), a trailing `;` and enclosing
/// parentheses are stripped first.
///
/// # Example
///
/// ```
/// use openapi_from_sdk::type_mapper::map;
/// use openapi_from_sdk::extractor::SchemaType;
///
/// assert_eq!(map("Array<string>"), SchemaType::array(SchemaType::string()));
/// assert_eq!(map("Order202309Item"), SchemaType::reference("Order202309Item"));
/// ```
pub fn map(token: &str) -> SchemaType {
    let token = clean(token);
    let token = token.as_str();

    if let Some(element) = array_element(token) {
        return SchemaType::array(map(element));
    }

    match token {
        "string" => return SchemaType::Primitive(PrimitiveKind::String),
        "number" => return SchemaType::Primitive(PrimitiveKind::Number),
        "integer" => return SchemaType::Primitive(PrimitiveKind::Integer),
        "boolean" => return SchemaType::Primitive(PrimitiveKind::Boolean),
        "Date" => return SchemaType::DateTime,
        _ => {}
    }

    let members = split_union(token);
    if members.len() > 1 {
        // literal unions like `'ASC' | 'DESC'`
        if members.iter().all(|m| is_string_literal(m)) {
            return SchemaType::string();
        }
        debug!("Union type '{}' mapped to any", token);
        return SchemaType::Any;
    }
    if is_string_literal(token) {
        return SchemaType::string();
    }

    if is_identifier(token) && token.starts_with(|c: char| c.is_ascii_uppercase()) {
        return SchemaType::Reference(token.to_string());
    }

    if !token.is_empty() && token != "any" && token != "object" {
        debug!("Unrecognised type '{}' mapped to any", token);
    }
    SchemaType::Any
}

/// Removes decoration that does not change the mapped type.
fn clean(token: &str) -> String {
    let mut current = token.trim().to_string();
    loop {
        let before = current.clone();

        current = current.trim().trim_end_matches(';').trim().to_string();
        if let Some(stripped) = current.strip_suffix('?') {
            current = stripped.trim_end().to_string();
        }

        let members = split_union(&current);
        if members.len() > 1 {
            let kept: Vec<&str> = members
                .into_iter()
                .filter(|m| *m != "null" && *m != "undefined")
                .collect();
            if !kept.is_empty() {
                current = kept.join(" | ");
            }
        }

        if let Some(inner) = enclosing_parens(&current) {
            current = inner.trim().to_string();
        }

        if current == before {
            return current;
        }
    }
}

/// Element type of an array form, if the whole token is one.
fn array_element(token: &str) -> Option<&str> {
    if let Some(element) = token.strip_suffix("[]") {
        return (!element.trim().is_empty()).then_some(element);
    }
    for wrapper in ["Array<", "ReadonlyArray<"] {
        if let Some(rest) = token.strip_prefix(wrapper) {
            let inner = rest.strip_suffix('>')?;
            // `Array<A> | Array<B>` is not a single array form
            if balanced(inner) {
                return Some(inner);
            }
        }
    }
    None
}

/// Splits on `|` at nesting depth zero.
fn split_union(token: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (idx, c) in token.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '<' | '(' | '[' | '{') => depth += 1,
            (None, '>' | ')' | ']' | '}') => depth -= 1,
            (None, '|') if depth == 0 => {
                parts.push(token[start..idx].trim());
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(token[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

fn enclosing_parens(token: &str) -> Option<&str> {
    let inner = token.strip_prefix('(')?.strip_suffix(')')?;
    balanced(inner).then_some(inner)
}

/// True when every bracket opened in `text` is closed before it ends, never dipping below zero.
fn balanced(text: &str) -> bool {
    let mut depth: i32 = 0;
    for c in text.chars() {
        match c {
            '<' | '(' | '[' | '{' => depth += 1,
            '>' | ')' | ']' | '}' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

fn is_identifier(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

fn is_string_literal(token: &str) -> bool {
    token.len() >= 2
        && ((token.starts_with('\'') && token.ends_with('\''))
            || (token.starts_with('"') && token.ends_with('"')))
}
