//! The JSON backend.
//!
//! This is additive to the core: the lexer/parser never depend on it.

use crate::ast::Node;
use serde_json::{Map, Value};

/// Structured JSON value for a node, built via `NodeKind`'s own `Serialize`
/// impl (tag = `kind`, fields flattened) plus `range`/`annotations`/
/// `children` per the contract. Useful for callers that want a `Value` tree
/// rather than text; [`to_json_string`] applies the contract's custom string
/// escaping on top of this.
pub fn to_json(node: &Node) -> Value {
    let mut obj = match serde_json::to_value(&node.kind) {
        Ok(Value::Object(map)) => map,
        _ => unreachable!("NodeKind always serialises to a JSON object"),
    };

    obj.insert(
        "range".to_string(),
        Value::Array(node.range.as_tuple().iter().map(|n| Value::from(*n)).collect()),
    );

    let mut annotations = Map::new();
    for (key, value) in &node.annotations {
        annotations.insert(key.clone(), Value::String(value.clone()));
    }
    obj.insert("annotations".to_string(), Value::Object(annotations));

    if !node.children.is_empty() {
        let children: Vec<Value> = node.children.iter().map(to_json).collect();
        obj.insert("children".to_string(), Value::Array(children));
    }

    Value::Object(obj)
}

/// Render a node as a JSON string with the following escaping rules:
/// `"`, `\`, `/`, and the BS/FF/CR/LF/TAB control codes escaped
/// conventionally; printable ASCII verbatim; everything else as `\uXXXX`
/// (a surrogate pair for non-BMP code points).
pub fn to_json_string(node: &Node) -> String {
    let mut out = String::new();
    write_value(&to_json(node), &mut out);
    out
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_escaped_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (i, (key, value)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_escaped_string(key, out);
                out.push(':');
                write_value(value, out);
            }
            out.push('}');
        }
    }
}

fn write_escaped_string(s: &str, out: &mut String) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '/' => out.push_str("\\/"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c if c.is_ascii() => out.push(c),
            c if (c as u32) <= 0xFFFF => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => {
                let code = c as u32 - 0x10000;
                let high = 0xD800 + (code >> 10);
                let low = 0xDC00 + (code & 0x3FF);
                out.push_str(&format!("\\u{:04x}\\u{:04x}", high, low));
            }
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeKind;
    use crate::position::{Position, Range};

    #[test]
    fn leaf_node_includes_kind_range_and_empty_annotations() {
        let node = Node::new(
            NodeKind::Text { content: "hi".into() },
            Range::new(Position::new(1, 1), Position::new(1, 3)),
        );
        let value = to_json(&node);
        assert_eq!(value["kind"], "text");
        assert_eq!(value["content"], "hi");
        assert_eq!(value["range"], serde_json::json!([1, 1, 1, 3]));
        assert_eq!(value["annotations"], serde_json::json!({}));
        assert!(value.get("children").is_none());
    }

    #[test]
    fn children_present_only_when_non_empty() {
        let mut parent = Node::new(NodeKind::Paragraph, Range::at(Position::start()));
        parent.push_child(Node::new(NodeKind::Text { content: "x".into() }, Range::at(Position::start())));
        let value = to_json(&parent);
        assert!(value["children"].is_array());
        assert_eq!(value["children"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn non_ascii_bytes_escape_as_unicode_sequences() {
        let node = Node::new(NodeKind::Text { content: "caf\u{e9}".into() }, Range::at(Position::start()));
        let s = to_json_string(&node);
        assert!(s.contains("caf\\u00e9"));
        assert!(!s.contains('\u{e9}'));
    }

    #[test]
    fn forward_slash_and_control_chars_escape_conventionally() {
        let node = Node::new(NodeKind::Text { content: "a/b\tc".into() }, Range::at(Position::start()));
        let s = to_json_string(&node);
        assert!(s.contains("a\\/b\\tc"));
    }
}
