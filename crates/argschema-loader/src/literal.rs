//! Static evaluation of JavaScript literal expressions
//!
//! Only values that can be known without running code are supported: strings, numbers,
//! booleans, `null`/`undefined`, arrays, objects, template strings without
//! substitutions, unary `-`/`+`/`!`, property access, and references to top-level
//! constants of the same module or values imported from another scanned module (including
//! `...spread` and shorthand properties).

use anyhow::{anyhow, bail, Context, Result};
use ast_grep_core::{Doc, Node};
use serde_json::{Map, Number, Value};
use std::collections::HashMap;

use argschema_core::constraints::{is_truthy, js_property_order};

const MAX_DEPTH: usize = 64;

/// Names a module can refer to
///
/// Locals are the top-level `const`/`let`/`var` initializers of the module. Imported values
/// were evaluated in the exporting module, which is always scanned first.
pub(crate) struct Bindings<'r, D: Doc> {
    locals: HashMap<String, Node<'r, D>>,
    imported: HashMap<String, Result<Value, String>>,
}

impl<'r, D: Doc> Default for Bindings<'r, D> {
    fn default() -> Self {
        Bindings {
            locals: HashMap::new(),
            imported: HashMap::new(),
        }
    }
}

impl<'r, D: Doc> Bindings<'r, D> {
    pub(crate) fn insert_local(&mut self, name: String, initializer: Node<'r, D>) {
        self.locals.insert(name, initializer);
    }

    pub(crate) fn insert_imported(&mut self, name: String, value: Result<Value, String>) {
        self.imported.insert(name, value);
    }

    pub(crate) fn local(&self, name: &str) -> Option<&Node<'r, D>> {
        self.locals.get(name)
    }
}

pub(crate) fn evaluate<'r, D: Doc>(node: &Node<'r, D>, bindings: &Bindings<'r, D>) -> Result<Value> {
    eval(node, bindings, 0)
}

/// Evaluate whatever `name` is bound to in the module
pub(crate) fn evaluate_name<'r, D: Doc>(name: &str, bindings: &Bindings<'r, D>) -> Result<Value> {
    lookup(name, bindings, 0)
}

fn lookup<'r, D: Doc>(name: &str, bindings: &Bindings<'r, D>, depth: usize) -> Result<Value> {
    // `const x = require('./x')` is both a local and an import; the import wins
    match bindings.imported.get(name) {
        Some(Ok(value)) => return Ok(value.clone()),
        Some(Err(message)) => bail!("imported '{}' is not static: {}", name, message),
        None => {}
    }
    let bound = bindings
        .local(name)
        .ok_or_else(|| anyhow!("'{}' is not a top-level constant of this module", name))?;
    eval(bound, bindings, depth + 1).with_context(|| format!("in the value of '{}'", name))
}

fn eval<'r, D: Doc>(node: &Node<'r, D>, bindings: &Bindings<'r, D>, depth: usize) -> Result<Value> {
    if depth > MAX_DEPTH {
        bail!("expression is nested too deeply or refers to itself");
    }

    let kind = node.kind();
    match kind.as_ref() {
        "object" => eval_object(node, bindings, depth),
        "array" => eval_array(node, bindings, depth),
        "string" => Ok(Value::String(unquote(&node.text())?)),
        "template_string" => eval_template(node),
        "number" => Ok(Value::Number(parse_number(&node.text())?)),
        "true" => Ok(Value::Bool(true)),
        "false" => Ok(Value::Bool(false)),
        "null" | "undefined" => Ok(Value::Null),
        "unary_expression" => eval_unary(node, bindings, depth),
        "parenthesized_expression"
        | "as_expression"
        | "satisfies_expression"
        | "non_null_expression" => {
            let inner = first_named_child(node)
                .ok_or_else(|| anyhow!("empty expression `{}`", snippet(node)))?;
            eval(&inner, bindings, depth + 1)
        }
        "identifier" => {
            let name = node.text();
            if name == "undefined" {
                return Ok(Value::Null);
            }
            lookup(&name, bindings, depth)
        }
        "member_expression" => eval_member(node, bindings, depth),
        other => bail!("unsupported expression `{}` ({})", snippet(node), other),
    }
}

fn eval_object<'r, D: Doc>(
    node: &Node<'r, D>,
    bindings: &Bindings<'r, D>,
    depth: usize,
) -> Result<Value> {
    let mut map = Map::new();

    for child in node.children() {
        match child.kind().as_ref() {
            "pair" => {
                let key_node = child
                    .field("key")
                    .ok_or_else(|| anyhow!("property without a key: `{}`", snippet(&child)))?;
                let value_node = child
                    .field("value")
                    .ok_or_else(|| anyhow!("property without a value: `{}`", snippet(&child)))?;
                let key = property_key(&key_node, bindings, depth)?;
                let value = eval(&value_node, bindings, depth + 1)
                    .with_context(|| format!("in property '{}'", key))?;
                map.insert(key, value);
            }
            "shorthand_property_identifier" => {
                let name = child.text().to_string();
                let value = lookup(&name, bindings, depth)?;
                map.insert(name, value);
            }
            "spread_element" => {
                let inner = first_named_child(&child)
                    .ok_or_else(|| anyhow!("empty spread `{}`", snippet(&child)))?;
                match eval(&inner, bindings, depth + 1)? {
                    Value::Object(spread) => map.extend(spread),
                    Value::Null => {}
                    other => bail!("cannot spread {} into an object", other),
                }
            }
            "method_definition" => {
                bail!("methods are not supported in constraint objects: `{}`", snippet(&child))
            }
            _ => {}
        }
    }

    Ok(Value::Object(js_property_order(map)))
}

/// `object.property` on a statically known object
fn eval_member<'r, D: Doc>(
    node: &Node<'r, D>,
    bindings: &Bindings<'r, D>,
    depth: usize,
) -> Result<Value> {
    let (Some(object), Some(property)) = (node.field("object"), node.field("property")) else {
        bail!("malformed member expression `{}`", snippet(node));
    };
    if property.kind() != "property_identifier" {
        bail!("unsupported member expression `{}`", snippet(node));
    }
    let target = eval(&object, bindings, depth + 1)?;
    let name = property.text();
    match target.as_object().and_then(|map| map.get(name.as_ref())) {
        Some(value) => Ok(value.clone()),
        None => bail!("`{}` has no static property '{}'", snippet(&object), name),
    }
}

fn eval_array<'r, D: Doc>(
    node: &Node<'r, D>,
    bindings: &Bindings<'r, D>,
    depth: usize,
) -> Result<Value> {
    let mut values = Vec::new();

    for child in node.children().filter(|c| c.is_named() && c.kind() != "comment") {
        if child.kind() == "spread_element" {
            let inner = first_named_child(&child)
                .ok_or_else(|| anyhow!("empty spread `{}`", snippet(&child)))?;
            match eval(&inner, bindings, depth + 1)? {
                Value::Array(items) => values.extend(items),
                other => bail!("cannot spread {} into an array", other),
            }
        } else {
            values.push(eval(&child, bindings, depth + 1)?);
        }
    }

    Ok(Value::Array(values))
}

fn eval_unary<'r, D: Doc>(
    node: &Node<'r, D>,
    bindings: &Bindings<'r, D>,
    depth: usize,
) -> Result<Value> {
    let operator = node
        .field("operator")
        .map(|op| op.text().to_string())
        .unwrap_or_default();
    let argument = node
        .field("argument")
        .ok_or_else(|| anyhow!("unary expression without operand: `{}`", snippet(node)))?;
    let value = eval(&argument, bindings, depth + 1)?;

    match (operator.as_str(), value) {
        ("!", value) => Ok(Value::Bool(!is_truthy(&value))),
        ("+", Value::Number(n)) => Ok(Value::Number(n)),
        ("-", Value::Number(n)) => negate(&n).map(Value::Number),
        _ => bail!("unsupported unary expression `{}`", snippet(node)),
    }
}

fn eval_template<D: Doc>(node: &Node<'_, D>) -> Result<Value> {
    if node
        .children()
        .any(|c| c.kind() == "template_substitution")
    {
        bail!("template strings with substitutions are not static: `{}`", snippet(node));
    }
    Ok(Value::String(unquote(&node.text())?))
}

fn property_key<'r, D: Doc>(
    node: &Node<'r, D>,
    bindings: &Bindings<'r, D>,
    depth: usize,
) -> Result<String> {
    match node.kind().as_ref() {
        "property_identifier" | "identifier" => Ok(node.text().to_string()),
        "string" => unquote(&node.text()),
        "number" => Ok(number_to_key(&parse_number(&node.text())?)),
        "computed_property_name" => {
            let inner = first_named_child(node)
                .ok_or_else(|| anyhow!("empty computed key `{}`", snippet(node)))?;
            match eval(&inner, bindings, depth + 1)? {
                Value::String(s) => Ok(s),
                Value::Number(n) => Ok(number_to_key(&n)),
                other => bail!("unsupported computed key {}", other),
            }
        }
        other => bail!("unsupported property key `{}` ({})", snippet(node), other),
    }
}

pub(crate) fn first_named_child<'r, D: Doc>(node: &Node<'r, D>) -> Option<Node<'r, D>> {
    node.children()
        .find(|c| c.is_named() && c.kind() != "comment")
}

/// Strip the surrounding quotes (or backticks) of a literal and decode its escapes
pub(crate) fn unquote(text: &str) -> Result<String> {
    let mut chars = text.chars();
    let (Some(open), Some(close)) = (chars.next(), chars.next_back()) else {
        bail!("malformed string literal {}", text);
    };
    if open != close || !matches!(open, '"' | '\'' | '`') {
        bail!("malformed string literal {}", text);
    }
    unescape(chars.as_str())
}

fn unescape(raw: &str) -> Result<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('0') => out.push('\0'),
            Some('x') => out.push(hex_char(&take(&mut chars, 2))?),
            Some('u') => {
                let code = if chars.peek() == Some(&'{') {
                    chars.next();
                    let digits: String = chars.by_ref().take_while(|c| *c != '}').collect();
                    parse_hex(&digits)?
                } else {
                    parse_hex(&take(&mut chars, 4))?
                };
                out.push(decode_utf16_escape(code, &mut chars)?);
            }
            // line continuation
            Some('\n') => {}
            Some('\r') => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    Ok(out)
}

fn decode_utf16_escape(
    code: u32,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
) -> Result<char> {
    if (0xD800..0xDC00).contains(&code) {
        // high surrogate; the low half must follow as another \uXXXX escape
        if chars.next() == Some('\\') && chars.next() == Some('u') {
            let low = parse_hex(&take(chars, 4))?;
            if (0xDC00..0xE000).contains(&low) {
                let combined = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
                return char::from_u32(combined)
                    .ok_or_else(|| anyhow!("invalid surrogate pair in string literal"));
            }
        }
        bail!("unpaired surrogate in string literal");
    }
    char::from_u32(code).ok_or_else(|| anyhow!("invalid unicode escape {:x}", code))
}

fn take(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, n: usize) -> String {
    chars.by_ref().take(n).collect()
}

fn parse_hex(digits: &str) -> Result<u32> {
    u32::from_str_radix(digits, 16).with_context(|| format!("invalid hex escape '{}'", digits))
}

fn hex_char(digits: &str) -> Result<char> {
    let code = parse_hex(digits)?;
    char::from_u32(code).ok_or_else(|| anyhow!("invalid hex escape '{}'", digits))
}

/// Parse a JavaScript numeric literal
pub(crate) fn parse_number(text: &str) -> Result<Number> {
    let cleaned: String = text
        .chars()
        .filter(|c| *c != '_')
        .collect::<String>()
        .to_ascii_lowercase();
    let cleaned = cleaned.strip_suffix('n').unwrap_or(&cleaned);

    let radix = match cleaned.get(..2) {
        Some("0x") => Some(16),
        Some("0o") => Some(8),
        Some("0b") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        let value = i64::from_str_radix(&cleaned[2..], radix)
            .with_context(|| format!("invalid number literal {}", text))?;
        return Ok(Number::from(value));
    }

    if let Ok(int) = cleaned.parse::<i64>() {
        return Ok(Number::from(int));
    }

    let float: f64 = cleaned
        .parse()
        .with_context(|| format!("invalid number literal {}", text))?;
    Number::from_f64(float).ok_or_else(|| anyhow!("non-finite number literal {}", text))
}

fn negate(n: &Number) -> Result<Number> {
    if let Some(int) = n.as_i64().and_then(i64::checked_neg) {
        return Ok(Number::from(int));
    }
    n.as_f64()
        .and_then(|f| Number::from_f64(-f))
        .ok_or_else(|| anyhow!("cannot negate {}", n))
}

fn number_to_key(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e21 => format!("{}", f as i64),
        _ => n.to_string(),
    }
}

/// First line of a node's source, for error messages
pub(crate) fn snippet<D: Doc>(node: &Node<'_, D>) -> String {
    let text = node.text();
    let first = text.lines().next().unwrap_or_default();
    if first.len() > 60 {
        let cut = first
            .char_indices()
            .nth(60)
            .map(|(i, _)| i)
            .unwrap_or(first.len());
        format!("{}...", &first[..cut])
    } else {
        first.to_string()
    }
}

#[cfg(test)]
mod tests {
    use crate::javascript::collect_bindings;
    use crate::literal::*;
    use ast_grep_core::AstGrep;
    use ast_grep_language::JavaScript;
    use serde_json::json;

    /// Evaluate the initializer of `const value = ...;` in `source`
    fn eval_source(source: &str) -> Result<Value> {
        let sg = AstGrep::new(source, JavaScript);
        let root = sg.root();
        let bindings = collect_bindings(&root);
        let target = bindings
            .local("value")
            .ok_or_else(|| anyhow!("no `value` binding"))?;
        evaluate(target, &bindings)
    }

    #[test]
    fn test_literals() {
        let value = eval_source(
            r#"const value = {a: 'x', "b": 1.5, c: true, d: null, e: [1, -2, 0x10], 'f-g': `t`, 3: !0};"#,
        );
        assert_eq!(
            value.ok(),
            Some(json!({"a": "x", "b": 1.5, "c": true, "d": null, "e": [1, -2, 16], "f-g": "t", "3": true}))
        );
    }

    #[test]
    fn test_references_and_spread() {
        let source = r#"
            const PLATFORMS = ['iOS', 'tvOS'];
            const common = {port: {isNumber: true}};
            const platform = {inclusion: PLATFORMS};
            const value = {...common, platform, udid: {isString: true}};
        "#;
        assert_eq!(
            eval_source(source).ok(),
            Some(json!({
                "port": {"isNumber": true},
                "platform": {"inclusion": ["iOS", "tvOS"]},
                "udid": {"isString": true}
            }))
        );
    }

    #[test]
    fn test_integer_keys_iterate_first() {
        let value = eval_source("const value = {b: 1, 10: 2, '2': 3, '01': 4, a: 5};");
        let keys: Vec<String> = value
            .ok()
            .and_then(|v| v.as_object().map(|m| m.keys().cloned().collect()))
            .unwrap_or_default();
        assert_eq!(keys, vec!["2", "10", "b", "01", "a"]);
    }

    #[test]
    fn test_imported_values_and_member_access() {
        let source = "const value = {...shared, port: ns.port, host: broken};";
        let sg = AstGrep::new(source, JavaScript);
        let root = sg.root();
        let mut bindings = collect_bindings(&root);
        bindings.insert_imported("shared".to_string(), Ok(json!({"udid": {"isString": true}})));
        bindings.insert_imported("ns".to_string(), Ok(json!({"port": {"isNumber": true}})));
        let Some(target) = bindings.local("value").cloned() else {
            panic!("expected a `value` binding");
        };

        let err = evaluate(&target, &bindings).err().map(|e| format!("{:#}", e));
        assert!(err.is_some_and(|e| e.contains("'broken' is not a top-level constant")));

        bindings.insert_imported("broken".to_string(), Err("calls a function".to_string()));
        let err = evaluate(&target, &bindings).err().map(|e| format!("{:#}", e));
        assert!(err.is_some_and(|e| e.contains("imported 'broken' is not static")));

        bindings.insert_imported("broken".to_string(), Ok(json!({})));
        assert_eq!(
            evaluate(&target, &bindings).ok(),
            Some(json!({"udid": {"isString": true}, "port": {"isNumber": true}, "host": {}}))
        );
    }

    #[test]
    fn test_self_reference_is_rejected() {
        assert!(eval_source("const value = {a: value};").is_err());
    }

    #[test]
    fn test_dynamic_values_are_rejected() {
        assert!(eval_source("const value = {a: compute()};").is_err());
        assert!(eval_source("const value = {a: `x${y}`};").is_err());
        assert!(eval_source("const value = {a: imported};").is_err());
    }

    #[test]
    fn test_unquote_escapes() {
        assert_eq!(unquote(r#""a\nb""#).ok(), Some("a\nb".to_string()));
        assert_eq!(unquote(r"'it\'s'").ok(), Some("it's".to_string()));
        assert_eq!(unquote(r"'\x41B\u{43}'").ok(), Some("ABC".to_string()));
        assert_eq!(unquote(r"'\uD83D\uDE00'").ok(), Some("\u{1F600}".to_string()));
        assert!(unquote("'unterminated").is_err());
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("42").ok(), Some(Number::from(42)));
        assert_eq!(parse_number("1_000").ok(), Some(Number::from(1000)));
        assert_eq!(parse_number("0b101").ok(), Some(Number::from(5)));
        assert_eq!(parse_number("0o17").ok(), Some(Number::from(15)));
        assert_eq!(parse_number("1e3").ok().and_then(|n| n.as_f64()), Some(1000.0));
        assert!(parse_number("abc").is_err());
    }
}
