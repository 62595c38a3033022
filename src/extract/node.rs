//! Read-only document tree consumed by the extraction pipeline.
//!
//! The pipeline never mutates the tree; callers build it from whatever DOM
//! or parser they have at the boundary and hand in a reference.

/// A node in the document fragment: an element with a tag, attributes, and
/// children, or a text run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomNode {
    /// An element node.
    Element {
        /// Tag name as written in the source (matched case-insensitively).
        tag: String,
        /// Attributes in document order.
        attrs: Vec<(String, String)>,
        /// Child nodes in document order.
        children: Vec<DomNode>,
    },
    /// A text node. Never a media candidate.
    Text(String),
}

impl DomNode {
    /// Creates an element node with no attributes or children.
    #[must_use]
    pub fn element(tag: impl Into<String>) -> Self {
        Self::Element {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Creates a text node.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    /// Adds an attribute. No-op on text nodes.
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Self::Element { attrs, .. } = &mut self {
            attrs.push((name.into(), value.into()));
        }
        self
    }

    /// Appends a child node. No-op on text nodes.
    #[must_use]
    pub fn child(mut self, node: Self) -> Self {
        if let Self::Element { children, .. } = &mut self {
            children.push(node);
        }
        self
    }

    /// Returns the tag name for elements, `None` for text nodes.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Element { tag, .. } => Some(tag),
            Self::Text(_) => None,
        }
    }

    /// Looks up an attribute by ASCII case-insensitive name; first match wins.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        match self {
            Self::Element { attrs, .. } => attrs
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str()),
            Self::Text(_) => None,
        }
    }

    /// Returns the children of an element, or an empty slice for text nodes.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        match self {
            Self::Element { children, .. } => children,
            Self::Text(_) => &[],
        }
    }

    /// Returns true for element nodes.
    #[must_use]
    pub fn is_element(&self) -> bool {
        matches!(self, Self::Element { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_produces_nested_tree() {
        let tree = DomNode::element("div")
            .child(DomNode::element("img").attr("src", "/a.jpg"))
            .child(DomNode::text("caption"));

        assert_eq!(tree.tag(), Some("div"));
        assert_eq!(tree.children().len(), 2);
        assert_eq!(tree.children()[0].attribute("src"), Some("/a.jpg"));
        assert!(!tree.children()[1].is_element());
    }

    #[test]
    fn test_attribute_lookup_is_case_insensitive() {
        let node = DomNode::element("img").attr("SRC", "/a.jpg");
        assert_eq!(node.attribute("src"), Some("/a.jpg"));
        assert_eq!(node.attribute("Src"), Some("/a.jpg"));
        assert_eq!(node.attribute("data-src"), None);
    }

    #[test]
    fn test_first_attribute_wins_on_duplicates() {
        let node = DomNode::element("img")
            .attr("src", "/first.jpg")
            .attr("src", "/second.jpg");
        assert_eq!(node.attribute("src"), Some("/first.jpg"));
    }

    #[test]
    fn test_text_node_builder_calls_are_no_ops() {
        let node = DomNode::text("hello").attr("src", "/x").child(DomNode::element("img"));
        assert_eq!(node, DomNode::text("hello"));
        assert!(node.children().is_empty());
    }
}
