// content/sanitizer.rs - очистка дерева перед отправкой и сериализация в разметку

use super::{ContentNode, Element};

/// Префиксы служебных атрибутов рендерера
pub const INTERNAL_ATTR_PREFIXES: &[&str] = &["data-"];

pub fn is_internal_attr(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    INTERNAL_ATTR_PREFIXES.iter().any(|p| lower.starts_with(p))
}

/// Очищает копию дерева и сериализует её как фрагмент.
///
/// Входное дерево не меняется. Внешняя пара тегов корня снимается,
/// потому что черновик принимает фрагмент, а не документ.
pub fn sanitize(content: &ContentNode) -> String {
    let mut copy = content.clone();
    strip_internal_attrs(&mut copy);

    match &copy {
        ContentNode::Element(root) if !root.is_void() => {
            let mut out = String::new();
            for child in &root.children {
                write_node(child, &mut out);
            }
            out
        }
        _ => serialize(&copy),
    }
}

fn strip_internal_attrs(node: &mut ContentNode) {
    if let ContentNode::Element(element) = node {
        element.attrs.retain(|(name, _)| !is_internal_attr(name));
        for child in &mut element.children {
            strip_internal_attrs(child);
        }
    }
}

pub fn serialize(node: &ContentNode) -> String {
    let mut out = String::new();
    write_node(node, &mut out);
    out
}

fn write_node(node: &ContentNode, out: &mut String) {
    match node {
        ContentNode::Text(text) => escape_into(text, false, out),
        ContentNode::Element(element) => write_element(element, out),
    }
}

fn write_element(element: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&element.tag);
    for (name, value) in &element.attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_into(value, true, out);
        out.push('"');
    }

    if element.is_void() {
        out.push_str(" />");
        return;
    }
    out.push('>');

    let raw = element.tag.eq_ignore_ascii_case("script") || element.tag.eq_ignore_ascii_case("style");
    for child in &element.children {
        match child {
            ContentNode::Text(text) if raw => out.push_str(text),
            _ => write_node(child, out),
        }
    }

    out.push_str("</");
    out.push_str(&element.tag);
    out.push('>');
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}
