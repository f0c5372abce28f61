//! Typed value extraction from `#define` right-hand sides
//!
//! Bare identifiers are resolved one level against the registry before
//! coercion. Arithmetic is never evaluated: a right-hand side such as
//! `X_BED_SIZE/2` is kept verbatim as [`FieldValue::Expression`]. Text that
//! cannot be coerced to the declared type is passed through as a string and
//! the fallback is reported to the caller.

use crate::mapping::{FieldSpec, FieldType};
use crate::preprocessor::literal::{parse_float_literal, parse_integer_literal, unquote};
use crate::preprocessor::DefineRegistry;
use crate::value::FieldValue;

/// Result of extracting one value
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    /// Typed value, or the raw text on fallback
    pub value: FieldValue,
    /// Set when the text did not fit the declared type
    pub fallback: Option<String>,
}

impl Extracted {
    fn ok(value: FieldValue) -> Self {
        Self {
            value,
            fallback: None,
        }
    }

    fn fallback(text: &str, message: String) -> Self {
        Self {
            value: FieldValue::String(text.to_string()),
            fallback: Some(format!("{}; kept as text", message)),
        }
    }

    fn truncated(text: &str, value: f64) -> Self {
        let n = value.trunc() as i64;
        Self {
            value: FieldValue::Integer(n),
            fallback: Some(format!("'{}' is not an integer; truncated to {}", text, n)),
        }
    }
}

/// Converts raw define text into typed values
pub struct ValueExtractor<'a> {
    registry: &'a DefineRegistry,
}

impl<'a> ValueExtractor<'a> {
    /// An extractor resolving identifiers against `registry`
    pub fn new(registry: &'a DefineRegistry) -> Self {
        Self { registry }
    }

    /// Extract a value for `spec` from a define's raw text (`None` for a bare define)
    pub fn extract(&self, raw: Option<&str>, spec: &FieldSpec) -> Extracted {
        let Some(raw) = raw else {
            return Extracted::ok(match spec.field_type {
                FieldType::Boolean => FieldValue::Boolean(true),
                _ => FieldValue::String("enabled".to_string()),
            });
        };

        let text = self.registry.resolve(raw.trim());
        match spec.field_type {
            FieldType::Array => match split_brace_list(text) {
                Some(items) => {
                    let values = items
                        .iter()
                        .map(|item| self.element(item, spec.element_type).value)
                        .collect();
                    Extracted::ok(FieldValue::Array(values))
                }
                None => Extracted::fallback(text, format!("'{}' is not a {{ ... }} list", text)),
            },
            ty => coerce(text, ty),
        }
    }

    /// Extract element `index` of a `{ ... }` list
    pub fn extract_element(
        &self,
        raw: Option<&str>,
        index: usize,
        spec: &FieldSpec,
    ) -> Result<Extracted, String> {
        let raw = raw.ok_or_else(|| "define has no value to index".to_string())?;
        let text = self.registry.resolve(raw.trim());
        let items = split_brace_list(text).ok_or_else(|| format!("'{}' is not a {{ ... }} list", text))?;
        let item = items
            .get(index)
            .ok_or_else(|| format!("index {} out of range ({} elements)", index, items.len()))?;

        let element_type = match spec.field_type {
            FieldType::Array => spec.element_type,
            ty => Some(ty),
        };
        Ok(self.element(item, element_type))
    }

    fn element(&self, item: &str, element_type: Option<FieldType>) -> Extracted {
        let text = self.registry.resolve(item.trim());
        match element_type {
            Some(FieldType::Array) | None => Extracted::ok(infer(text)),
            Some(ty) => coerce(text, ty),
        }
    }
}

/// Coerce scalar text to a declared type
fn coerce(text: &str, ty: FieldType) -> Extracted {
    match ty {
        FieldType::String | FieldType::Raw => {
            Extracted::ok(FieldValue::String(unquote(text).unwrap_or(text).to_string()))
        }
        FieldType::Boolean => Extracted::ok(FieldValue::Boolean(parse_boolean(text))),
        FieldType::Integer => {
            let inner = strip_outer_parens(text);
            if let Some(n) = parse_integer_literal(inner) {
                Extracted::ok(FieldValue::Integer(n))
            } else if let Some(f) = parse_float_literal(inner) {
                if f.abs() >= i64::MAX as f64 {
                    Extracted::fallback(text, format!("'{}' is out of integer range", text))
                } else if f.fract() == 0.0 {
                    Extracted::ok(FieldValue::Integer(f as i64))
                } else {
                    Extracted::truncated(text, f)
                }
            } else if looks_like_expression(text) {
                Extracted::ok(FieldValue::Expression(text.to_string()))
            } else {
                Extracted::fallback(text, format!("'{}' is not an integer", text))
            }
        }
        FieldType::Float => {
            let inner = strip_outer_parens(text);
            if let Some(f) = parse_float_literal(inner) {
                Extracted::ok(FieldValue::Float(f))
            } else if looks_like_expression(text) {
                Extracted::ok(FieldValue::Expression(text.to_string()))
            } else {
                Extracted::fallback(text, format!("'{}' is not a number", text))
            }
        }
        FieldType::Array => match split_brace_list(text) {
            Some(items) => Extracted::ok(FieldValue::Array(items.iter().map(|i| infer(i)).collect())),
            None => Extracted::fallback(text, format!("'{}' is not a {{ ... }} list", text)),
        },
    }
}

/// Best-effort typing for list elements without a declared type
fn infer(text: &str) -> FieldValue {
    let text = text.trim();
    if let Some(s) = unquote(text) {
        return FieldValue::String(s.to_string());
    }
    if let Some(items) = split_brace_list(text) {
        return FieldValue::Array(items.iter().map(|i| infer(i)).collect());
    }
    let inner = strip_outer_parens(text);
    if let Some(n) = parse_integer_literal(inner) {
        return FieldValue::Integer(n);
    }
    if let Some(f) = parse_float_literal(inner) {
        return FieldValue::Float(f);
    }
    match text {
        "true" => FieldValue::Boolean(true),
        "false" => FieldValue::Boolean(false),
        _ if looks_like_expression(text) => FieldValue::Expression(text.to_string()),
        _ => FieldValue::String(text.to_string()),
    }
}

/// `true`, `1` and `enabled` (any case) are true; everything else is false
pub fn parse_boolean(text: &str) -> bool {
    let text = unquote(text).unwrap_or(text).trim();
    text.eq_ignore_ascii_case("true") || text == "1" || text.eq_ignore_ascii_case("enabled")
}

/// Elements of a `{ a, b, c }` list, or `None` if `text` is not one.
///
/// Commas inside quotes, nested braces and parentheses do not split.
pub fn split_brace_list(text: &str) -> Option<Vec<String>> {
    let inner = text.trim().strip_prefix('{')?.strip_suffix('}')?;
    if inner.trim().is_empty() {
        return Some(Vec::new());
    }

    let mut items = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut depth = 0usize;

    for ch in inner.chars() {
        match ch {
            '"' | '\'' if quote.is_none() => quote = Some(ch),
            c if Some(c) == quote => quote = None,
            '{' | '(' if quote.is_none() => depth += 1,
            '}' | ')' if quote.is_none() => depth = depth.saturating_sub(1),
            ',' if quote.is_none() && depth == 0 => {
                items.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    items.push(current.trim().to_string());

    // `{ 1, 2, }`
    if items.last().is_some_and(String::is_empty) {
        items.pop();
    }
    Some(items)
}

/// Text that carries arithmetic or a macro call rather than a literal
pub fn looks_like_expression(text: &str) -> bool {
    let text = text.trim();
    if text.is_empty() || unquote(text).is_some() {
        return false;
    }
    let body = text.strip_prefix('-').unwrap_or(text);
    body.contains(['+', '-', '*', '/', '%', '<', '>', '&', '|', '?', '(', '~', '^'])
}

fn strip_outer_parens(text: &str) -> &str {
    let mut text = text.trim();
    while let Some(inner) = text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        if !inner.contains(['(', ')']) {
            text = inner.trim();
        } else {
            break;
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn spec(ty: FieldType) -> FieldSpec {
        FieldSpec::new("X", ty)
    }

    fn extract(raw: Option<&str>, ty: FieldType) -> Extracted {
        let registry = DefineRegistry::new();
        ValueExtractor::new(&registry).extract(raw, &spec(ty))
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            extract(Some("\"Ender-3 V2\""), FieldType::String).value,
            FieldValue::String("Ender-3 V2".into())
        );
        assert_eq!(
            extract(Some("LANG_EN"), FieldType::String).value,
            FieldValue::String("LANG_EN".into())
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(extract(Some("115200"), FieldType::Integer).value, FieldValue::Integer(115200));
        assert_eq!(extract(Some("0x1F"), FieldType::Integer).value, FieldValue::Integer(31));
        assert_eq!(extract(Some("-2"), FieldType::Integer).value, FieldValue::Integer(-2));
        assert_eq!(extract(Some("(5)"), FieldType::Integer).value, FieldValue::Integer(5));
        assert_eq!(extract(Some("-1.2"), FieldType::Float).value, FieldValue::Float(-1.2));
        assert_eq!(extract(Some("30"), FieldType::Float).value, FieldValue::Float(30.0));
    }

    #[test]
    fn test_fractional_integer_truncates() {
        let out = extract(Some("1.5"), FieldType::Integer);
        assert_eq!(out.value, FieldValue::Integer(1));
        assert!(out.fallback.unwrap().contains("truncated to 1"));
        assert_eq!(extract(Some("-2.7"), FieldType::Integer).value, FieldValue::Integer(-2));
        let whole = extract(Some("30.0"), FieldType::Integer);
        assert_eq!(whole.value, FieldValue::Integer(30));
        assert!(whole.fallback.is_none());
        let huge = extract(Some("1e30"), FieldType::Integer);
        assert_eq!(huge.value, FieldValue::String("1e30".into()));
        assert!(huge.fallback.is_some());
    }

    #[test]
    fn test_expression_kept_verbatim() {
        let out = extract(Some("X_BED_SIZE/2"), FieldType::Integer);
        assert_eq!(out.value, FieldValue::Expression("X_BED_SIZE/2".into()));
        assert!(out.fallback.is_none());
        let out = extract(Some("(-(X_BED_SIZE) / 2)"), FieldType::Float);
        assert_eq!(out.value, FieldValue::Expression("(-(X_BED_SIZE) / 2)".into()));
    }

    #[test]
    fn test_unparsable_number_falls_back() {
        let out = extract(Some("FAST"), FieldType::Integer);
        assert_eq!(out.value, FieldValue::String("FAST".into()));
        assert!(out.fallback.is_some());
    }

    #[test]
    fn test_booleans() {
        assert_eq!(extract(None, FieldType::Boolean).value, FieldValue::Boolean(true));
        assert_eq!(extract(Some("true"), FieldType::Boolean).value, FieldValue::Boolean(true));
        assert_eq!(extract(Some("1"), FieldType::Boolean).value, FieldValue::Boolean(true));
        assert_eq!(extract(Some("Enabled"), FieldType::Boolean).value, FieldValue::Boolean(true));
        assert_eq!(extract(Some("false"), FieldType::Boolean).value, FieldValue::Boolean(false));
        assert_eq!(extract(Some("0"), FieldType::Boolean).value, FieldValue::Boolean(false));
        assert_eq!(extract(None, FieldType::Integer).value, FieldValue::String("enabled".into()));
    }

    #[test]
    fn test_identifier_resolved_one_level() {
        let mut registry = DefineRegistry::new();
        registry.define("DEFAULT_SPEED", Some("250"));
        registry.define("ALIAS", Some("DEFAULT_SPEED"));
        let extractor = ValueExtractor::new(&registry);
        assert_eq!(
            extractor.extract(Some("DEFAULT_SPEED"), &spec(FieldType::Integer)).value,
            FieldValue::Integer(250)
        );
        let out = extractor.extract(Some("ALIAS"), &spec(FieldType::Integer));
        assert_eq!(out.value, FieldValue::String("DEFAULT_SPEED".into()));
    }

    #[test]
    fn test_arrays() {
        let mut registry = DefineRegistry::new();
        registry.define("E_STEPS", Some("93"));
        let extractor = ValueExtractor::new(&registry);

        let mut s = spec(FieldType::Array);
        s.element_type = Some(FieldType::Float);
        assert_eq!(
            extractor.extract(Some("{ 80, 80, 400, E_STEPS }"), &s).value,
            FieldValue::Array(vec![
                FieldValue::Float(80.0),
                FieldValue::Float(80.0),
                FieldValue::Float(400.0),
                FieldValue::Float(93.0),
            ])
        );

        let untyped = extractor.extract(Some("{ 0, -1.5, \"a,b\", X/2 }"), &spec(FieldType::Array));
        assert_eq!(
            untyped.value,
            FieldValue::Array(vec![
                FieldValue::Integer(0),
                FieldValue::Float(-1.5),
                FieldValue::String("a,b".into()),
                FieldValue::Expression("X/2".into()),
            ])
        );

        assert!(extractor.extract(Some("42"), &spec(FieldType::Array)).fallback.is_some());
    }

    #[test]
    fn test_extract_element() {
        let registry = DefineRegistry::new();
        let extractor = ValueExtractor::new(&registry);
        let raw = Some("{ 80, 80, 400, 93 }");

        let s = spec(FieldType::Integer);
        assert_eq!(extractor.extract_element(raw, 2, &s).unwrap().value, FieldValue::Integer(400));
        assert_eq!(extractor.extract_element(raw, 3, &s).unwrap().value, FieldValue::Integer(93));
        assert!(extractor.extract_element(raw, 4, &s).is_err());
        assert!(extractor.extract_element(Some("7"), 0, &s).is_err());
        assert!(extractor.extract_element(None, 0, &s).is_err());

        let mut arr = spec(FieldType::Array);
        arr.element_type = Some(FieldType::Float);
        assert_eq!(extractor.extract_element(raw, 0, &arr).unwrap().value, FieldValue::Float(80.0));
    }

    #[test]
    fn test_split_brace_list() {
        assert_eq!(
            split_brace_list("{ {1, 2}, MAX(3, 4), 5, }"),
            Some(vec!["{1, 2}".to_string(), "MAX(3, 4)".to_string(), "5".to_string()])
        );
        assert_eq!(split_brace_list("{}"), Some(vec![]));
        assert_eq!(split_brace_list("1, 2"), None);
    }
}
