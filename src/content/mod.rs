//! Дерево контента статьи.
//!
//! Рендерер отдаёт HTML, который разбирается в [`ContentNode`]. Конвейер
//! публикации ищет в дереве изображения, переписывает их `src` и
//! сериализует очищенную копию.

pub mod parser;
pub mod sanitizer;

use crate::error::{AppError, AppResult};
use crate::models::ImageReference;

pub use parser::parse_fragment;
pub use sanitizer::sanitize;

/// Путь к узлу: индексы детей от корня
pub type NodePath = Vec<usize>;

/// Элементы без закрывающего тега
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(tag))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentNode {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<ContentNode>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Element {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Заменяет значение атрибута или добавляет новый
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .attrs
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|classes| classes.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn is_void(&self) -> bool {
        is_void_element(&self.tag)
    }
}

#[cfg(test)]
impl Element {
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_child(mut self, child: ContentNode) -> Self {
        self.children.push(child);
        self
    }
}

impl From<Element> for ContentNode {
    fn from(element: Element) -> Self {
        ContentNode::Element(element)
    }
}

impl ContentNode {
    pub fn text(text: impl Into<String>) -> Self {
        ContentNode::Text(text.into())
    }

    /// Текстовое содержимое всего поддерева, как textContent в DOM
    pub fn flatten_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            ContentNode::Text(t) => out.push_str(t),
            ContentNode::Element(e) => {
                for child in &e.children {
                    child.collect_text(out);
                }
            }
        }
    }

    /// Все `<img>` в порядке документа; пустой `src` даёт ссылку без адреса
    pub fn find_images(&self) -> Vec<ImageReference> {
        let mut found = Vec::new();
        let mut path = Vec::new();
        self.collect_images(&mut path, &mut found);
        found
    }

    fn collect_images(&self, path: &mut NodePath, found: &mut Vec<ImageReference>) {
        let ContentNode::Element(element) = self else {
            return;
        };

        if element.tag.eq_ignore_ascii_case("img") {
            found.push(ImageReference {
                source_locator: element
                    .attr("src")
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
                position: path.clone(),
            });
        }

        for (index, child) in element.children.iter().enumerate() {
            path.push(index);
            child.collect_images(path, found);
            path.pop();
        }
    }

    pub fn node_mut(&mut self, path: &[usize]) -> Option<&mut ContentNode> {
        let mut node = self;
        for &index in path {
            node = match node {
                ContentNode::Element(e) => e.children.get_mut(index)?,
                ContentNode::Text(_) => return None,
            };
        }
        Some(node)
    }

    /// Переписывает `src` изображения по пути; false, если там не элемент
    pub fn set_image_source(&mut self, path: &[usize], src: &str) -> bool {
        match self.node_mut(path) {
            Some(ContentNode::Element(e)) => {
                e.set_attr("src", src);
                true
            }
            _ => false,
        }
    }

    /// Первый элемент с заданным CSS классом (обход в глубину)
    pub fn find_by_class(&self, class: &str) -> Option<&ContentNode> {
        match self {
            ContentNode::Element(e) if e.has_class(class) => Some(self),
            ContentNode::Element(e) => e.children.iter().find_map(|c| c.find_by_class(class)),
            ContentNode::Text(_) => None,
        }
    }
}

#[cfg(test)]
impl ContentNode {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            ContentNode::Element(e) => Some(e),
            ContentNode::Text(_) => None,
        }
    }
}

/// Выбирает секцию статьи по CSS классу.
///
/// Без секции публиковать нечего: обвязка превью в черновик не уходит.
pub fn select_content(nodes: &[ContentNode], class: &str) -> AppResult<ContentNode> {
    nodes
        .iter()
        .find_map(|n| n.find_by_class(class))
        .cloned()
        .ok_or_else(|| AppError::Validation(format!("content section .{} not found", class)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn img(src: &str) -> ContentNode {
        Element::new("img").with_attr("src", src).into()
    }

    fn sample() -> ContentNode {
        Element::new("section")
            .with_child(
                Element::new("p")
                    .with_child(ContentNode::text("Hello "))
                    .with_child(img("https://a.example/1.png"))
                    .into(),
            )
            .with_child(Element::new("img").into())
            .with_child(
                Element::new("div")
                    .with_child(ContentNode::text("world"))
                    .with_child(img("data:image/png;base64,AAAA"))
                    .into(),
            )
            .into()
    }

    #[test]
    fn test_find_images_in_document_order() {
        let images = sample().find_images();
        assert_eq!(images.len(), 3);
        assert_eq!(images[0].source_locator.as_deref(), Some("https://a.example/1.png"));
        assert_eq!(images[0].position, vec![0, 1]);
        // <img> без src сохраняет своё место в порядке
        assert_eq!(images[1].source_locator, None);
        assert_eq!(images[1].position, vec![1]);
        assert_eq!(images[2].source_locator.as_deref(), Some("data:image/png;base64,AAAA"));
        assert_eq!(images[2].position, vec![2, 1]);
    }

    #[test]
    fn test_blank_src_has_no_locator() {
        let tree: ContentNode = Element::new("p").with_child(img("   ")).into();
        let images = tree.find_images();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].source_locator, None);
    }

    #[test]
    fn test_flatten_text() {
        assert_eq!(sample().flatten_text(), "Hello world");
    }

    #[test]
    fn test_set_image_source_by_path() {
        let mut tree = sample();
        assert!(tree.set_image_source(&[2, 1], "https://mmbiz.example/x"));
        let images = tree.find_images();
        assert_eq!(images[2].source_locator.as_deref(), Some("https://mmbiz.example/x"));
        assert!(!tree.set_image_source(&[9, 9], "nope"));
    }

    #[test]
    fn test_select_content_by_class() {
        let nodes = vec![Element::new("div")
            .with_attr("class", "preview")
            .with_child(
                Element::new("section")
                    .with_attr("class", "wrapper mp-content-section")
                    .with_child(ContentNode::text("body"))
                    .into(),
            )
            .into()];
        let selected = select_content(&nodes, "mp-content-section").unwrap();
        assert_eq!(selected.flatten_text(), "body");
        assert!(selected.as_element().unwrap().has_class("wrapper"));
    }

    #[test]
    fn test_select_content_missing_section() {
        let nodes = vec![
            Element::new("div")
                .with_attr("class", "toolbar")
                .with_child(ContentNode::text("Copy"))
                .into(),
            ContentNode::text("loose text"),
        ];
        let err = select_content(&nodes, "mp-content-section").unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m.contains("mp-content-section")));
    }
}
