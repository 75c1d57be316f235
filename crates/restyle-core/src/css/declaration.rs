//! Style declaration parsing and serialization.

use crate::dom::selector::split_top_level;
use std::fmt;

/// A single `property: value [!important]` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Lowercased property name (custom properties keep their case).
    pub property: String,
    pub value: String,
    pub important: bool,
}

impl Declaration {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
            important: false,
        }
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.property, self.value)?;
        if self.important {
            f.write_str(" !important")?;
        }
        Ok(())
    }
}

/// A declaration that could not be parsed, with the offending source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationError {
    pub text: String,
    pub reason: &'static str,
}

impl fmt::Display for DeclarationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}': {}", self.text, self.reason)
    }
}

/// Parses one declaration such as `color: red !important`.
pub fn parse_declaration(text: &str) -> Result<Declaration, DeclarationError> {
    let text = text.trim();
    let fail = |reason| DeclarationError {
        text: text.to_string(),
        reason,
    };

    let (property, value) = text.split_once(':').ok_or_else(|| fail("missing ':'"))?;
    let property = property.trim();
    if !is_property_name(property) {
        return Err(fail("invalid property name"));
    }

    let mut value = value.trim();
    let mut important = false;
    if let Some(bang) = value.rfind('!') {
        if value[bang + 1..].trim().eq_ignore_ascii_case("important") {
            important = true;
            value = value[..bang].trim_end();
        }
    }
    if value.is_empty() {
        return Err(fail("empty value"));
    }
    if !balanced(value) {
        return Err(fail("unbalanced quotes or parentheses"));
    }

    let property = if property.starts_with("--") {
        property.to_string()
    } else {
        property.to_ascii_lowercase()
    };
    Ok(Declaration {
        property,
        value: value.to_string(),
        important,
    })
}

/// Splits a declaration block on `;` outside of strings and parentheses and
/// parses each piece. Empty pieces are dropped; failures are returned in place.
pub fn parse_declaration_block(text: &str) -> Vec<Result<Declaration, DeclarationError>> {
    split_top_level(text, ';')
        .into_iter()
        .filter(|piece| !piece.trim().is_empty())
        .map(parse_declaration)
        .collect()
}

/// Parses a block keeping only the well-formed declarations.
pub fn parse_valid_declarations(text: &str) -> Vec<Declaration> {
    parse_declaration_block(text)
        .into_iter()
        .filter_map(Result::ok)
        .collect()
}

/// Serializes declarations in the `a: b; c: d` form used for `style` attributes.
pub fn serialize_declarations(declarations: &[Declaration]) -> String {
    declarations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Inserts or replaces `decl` by property name, keeping the original position.
pub fn upsert_declaration(declarations: &mut Vec<Declaration>, decl: Declaration) {
    match declarations
        .iter_mut()
        .find(|d| d.property == decl.property)
    {
        Some(existing) => *existing = decl,
        None => declarations.push(decl),
    }
}

fn is_property_name(name: &str) -> bool {
    if let Some(custom) = name.strip_prefix("--") {
        return !custom.is_empty()
            && custom
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    }
    let body = name.strip_prefix('-').unwrap_or(name);
    body.starts_with(|c: char| c.is_ascii_alphabetic())
        && body.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn balanced(value: &str) -> bool {
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for ch in value.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, ch) {
            (_, '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '(') => depth += 1,
            (None, ')') => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0 && quote.is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_with_bad_declaration() {
        let parsed = parse_declaration_block("color: red; bogus-prop purple");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0], Ok(Declaration::new("color", "red")));
        assert!(parsed[1].is_err());
    }

    #[test]
    fn test_semicolons_inside_strings_and_urls() {
        let decls = parse_valid_declarations(
            r#"font-family: "a;b", serif; background-image: url(data:image/png;base64,AAA)"#,
        );
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].value, r#""a;b", serif"#);
        assert_eq!(decls[1].value, "url(data:image/png;base64,AAA)");
    }

    #[test]
    fn test_important_and_case() {
        let decl = parse_declaration("COLOR : Blue ! IMPORTANT").unwrap();
        assert_eq!(decl.property, "color");
        assert_eq!(decl.value, "Blue");
        assert!(decl.important);
        assert_eq!(decl.to_string(), "color: Blue !important");
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(parse_declaration("color:").is_err());
        assert!(parse_declaration("1color: red").is_err());
        assert!(parse_declaration("width: calc(1px + (2px)").is_err());
    }

    #[test]
    fn test_upsert_keeps_position() {
        let mut decls = parse_valid_declarations("margin: 0; color: red");
        upsert_declaration(&mut decls, Declaration::new("margin", "4px"));
        upsert_declaration(&mut decls, Declaration::new("padding", "1px"));
        assert_eq!(
            serialize_declarations(&decls),
            "margin: 4px; color: red; padding: 1px"
        );
    }
}
