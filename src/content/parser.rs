// content/parser.rs - терпимый разбор HTML фрагмента в дерево ContentNode

use super::{is_void_element, ContentNode, Element};
use tracing::debug;

/// Содержимое этих тегов не разбирается как разметка
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Разбирает фрагмент HTML в список узлов верхнего уровня.
///
/// Комментарии и `<!doctype>` отбрасываются, незакрытые теги закрываются
/// в конце ввода, лишние закрывающие теги игнорируются.
pub fn parse_fragment(html: &str) -> Vec<ContentNode> {
    let mut builder = TreeBuilder::default();
    let mut rest = html;

    while !rest.is_empty() {
        let Some(lt) = rest.find('<') else {
            builder.text(rest);
            break;
        };

        if lt > 0 {
            builder.text(&rest[..lt]);
        }
        rest = &rest[lt..];

        if let Some(after) = rest.strip_prefix("<!--") {
            rest = after.find("-->").map(|end| &after[end + 3..]).unwrap_or("");
        } else if rest.starts_with("<!") || rest.starts_with("<?") {
            rest = rest.find('>').map(|end| &rest[end + 1..]).unwrap_or("");
        } else if let Some(after) = rest.strip_prefix("</") {
            let end = after.find('>').unwrap_or(after.len());
            builder.close(after[..end].trim());
            rest = after.get(end + 1..).unwrap_or("");
        } else if let Some((tag, consumed)) = parse_open_tag(rest) {
            rest = &rest[consumed..];
            let raw = RAW_TEXT_ELEMENTS
                .iter()
                .any(|r| r.eq_ignore_ascii_case(&tag.element.tag));

            if tag.self_closing || tag.element.is_void() {
                builder.leaf(tag.element);
            } else if raw {
                let close = format!("</{}", tag.element.tag.to_ascii_lowercase());
                let end = rest.to_ascii_lowercase().find(&close).unwrap_or(rest.len());
                let mut element = tag.element;
                if end > 0 {
                    element.children.push(ContentNode::text(&rest[..end]));
                }
                builder.leaf(element);
                rest = &rest[end..];
                rest = rest.find('>').map(|e| &rest[e + 1..]).unwrap_or("");
            } else {
                builder.open(tag.element);
            }
        } else {
            // одиночный '<' без имени тега считается текстом
            builder.text("<");
            rest = &rest[1..];
        }
    }

    builder.finish()
}

#[derive(Default)]
struct TreeBuilder {
    roots: Vec<ContentNode>,
    stack: Vec<Element>,
}

impl TreeBuilder {
    fn push(&mut self, node: ContentNode) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.roots.push(node),
        }
    }

    fn text(&mut self, raw: &str) {
        if raw.is_empty() {
            return;
        }
        let decoded = decode_entities(raw);
        // соседние текстовые куски склеиваются в один узел
        let last = match self.stack.last_mut() {
            Some(parent) => parent.children.last_mut(),
            None => self.roots.last_mut(),
        };
        match last {
            Some(ContentNode::Text(existing)) => existing.push_str(&decoded),
            _ => self.push(ContentNode::Text(decoded)),
        }
    }

    fn leaf(&mut self, element: Element) {
        self.push(ContentNode::Element(element));
    }

    fn open(&mut self, element: Element) {
        self.stack.push(element);
    }

    fn close(&mut self, tag: &str) {
        let Some(pos) = self
            .stack
            .iter()
            .rposition(|e| e.tag.eq_ignore_ascii_case(tag))
        else {
            debug!("Ignoring unmatched closing tag </{}>", tag);
            return;
        };

        while self.stack.len() > pos {
            self.pop();
        }
    }

    fn pop(&mut self) {
        if let Some(element) = self.stack.pop() {
            self.push(ContentNode::Element(element));
        }
    }

    fn finish(mut self) -> Vec<ContentNode> {
        while !self.stack.is_empty() {
            self.pop();
        }
        self.roots
    }
}

struct OpenTag {
    element: Element,
    self_closing: bool,
}

/// Разбирает `<tag attr=...>`; возвращает тег и число прочитанных байт
fn parse_open_tag(input: &str) -> Option<(OpenTag, usize)> {
    let bytes = input.as_bytes();
    let mut i = 1;

    let name_start = i;
    while i < bytes.len() && is_name_byte(bytes[i]) {
        i += 1;
    }
    if i == name_start || !bytes[name_start].is_ascii_alphabetic() {
        return None;
    }
    let mut element = Element::new(input[name_start..i].to_ascii_lowercase());
    let mut self_closing = false;

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            return Some((OpenTag { element, self_closing }, i));
        }
        match bytes[i] {
            b'>' => {
                return Some((OpenTag { element, self_closing }, i + 1));
            }
            b'/' => {
                self_closing = true;
                i += 1;
                continue;
            }
            _ => {}
        }
        self_closing = false;

        let attr_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/')
        {
            i += 1;
        }
        let name = input[attr_start..i].to_string();
        if name.is_empty() {
            i += 1;
            continue;
        }

        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] != b'=' {
            element.attrs.push((name, String::new()));
            continue;
        }
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }

        let value = match bytes.get(i) {
            Some(&quote @ (b'"' | b'\'')) => {
                let start = i + 1;
                let end = input[start..]
                    .find(quote as char)
                    .map(|e| start + e)
                    .unwrap_or(input.len());
                i = (end + 1).min(input.len());
                &input[start..end]
            }
            _ => {
                let start = i;
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                    i += 1;
                }
                &input[start..i]
            }
        };
        element.attrs.push((name, decode_entities(value)));
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b':' || b == b'_'
}

/// Декодирует основные именованные и числовые сущности
pub fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&rest[1..semi]).map(|c| (c, semi)));

        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}
