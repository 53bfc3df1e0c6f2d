//! Output element tree.
//!
//! Policy documents are built incrementally and append-only: handlers add
//! attributes and children in the order they want them written, and nothing
//! is ever removed. See [`crate::xml`] for serialization.

use serde::{Deserialize, Serialize};

/// A name/value attribute of an [`Element`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name.
    pub name: String,
    /// Attribute value, possibly carrying the inline expression marker.
    pub value: String,
}

/// A child of an [`Element`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    /// Nested element.
    Element(Element),
    /// Text content, possibly carrying the inline expression marker.
    Text(String),
    /// Markup written verbatim.
    Raw(String),
}

/// An element of a policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    /// Element name.
    pub name: String,
    /// Attributes in insertion order.
    pub attributes: Vec<Attribute>,
    /// Children in insertion order.
    pub children: Vec<Node>,
}

impl Element {
    /// Creates an empty element.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Adds an attribute, builder style.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_attribute(name, value);
        self
    }

    /// Adds a text child, builder style.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.add_text(text);
        self
    }

    /// Appends an attribute.
    pub fn add_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.push(Attribute {
            name: name.into(),
            value: value.into(),
        });
    }

    /// Appends a child element.
    pub fn add_element(&mut self, element: Self) {
        self.children.push(Node::Element(element));
    }

    /// Appends a text child.
    pub fn add_text(&mut self, text: impl Into<String>) {
        self.children.push(Node::Text(text.into()));
    }

    /// Appends verbatim markup.
    pub fn add_raw(&mut self, markup: impl Into<String>) {
        self.children.push(Node::Raw(markup.into()));
    }

    /// Returns the value of the first attribute with the given name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Iterates over child elements, skipping text.
    pub fn elements(&self) -> impl Iterator<Item = &Self> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Returns the first child element with the given name.
    #[must_use]
    pub fn element(&self, name: &str) -> Option<&Self> {
        self.elements().find(|e| e.name == name)
    }

    /// Concatenated text and raw content of the direct children.
    #[must_use]
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(t) | Node::Raw(t) => Some(t.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    /// Returns true if the element has no attributes and no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.children.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_keep_insertion_order() {
        let element = Element::new("rate-limit")
            .with_attribute("renewal-period", "60")
            .with_attribute("calls", "10");

        let names: Vec<_> = element.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["renewal-period", "calls"]);
        assert_eq!(element.attribute("calls"), Some("10"));
        assert_eq!(element.attribute("missing"), None);
    }

    #[test]
    fn test_elements_skip_text() {
        let mut element = Element::new("set-header");
        element.add_text("ignored");
        element.add_element(Element::new("value").with_text("a"));
        element.add_element(Element::new("value").with_text("b"));

        let values: Vec<_> = element.elements().map(Element::text).collect();
        assert_eq!(values, vec!["a", "b"]);
        assert_eq!(element.text(), "ignored");
    }

    #[test]
    fn test_is_empty() {
        assert!(Element::new("inbound").is_empty());
        assert!(!Element::new("base").with_attribute("a", "b").is_empty());
    }
}
