//! Syntax tree types for the template config document

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// AST node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// A `name="value"` pair on an element
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: Spanned<String>,
    pub value: Spanned<String>,
}

/// An element with its attributes and child elements
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: Spanned<String>,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Spanned<Element>>,
}

impl Element {
    /// Tag name of the element
    pub fn tag(&self) -> &str {
        &self.name.node
    }

    /// Value of an attribute, if present
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attribute(name).map(|a| a.value.node.as_str())
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name.node == name)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// All descendants with the given tag, in document order
    pub fn descendants_named<'a>(&'a self, tag: &str) -> Vec<&'a Spanned<Element>> {
        let mut found = Vec::new();
        collect_descendants(&self.children, tag, &mut found);
        found
    }

    /// Attributes as an owned name -> value map
    pub fn attribute_map(&self) -> std::collections::BTreeMap<String, String> {
        self.attributes
            .iter()
            .map(|a| (a.name.node.clone(), a.value.node.clone()))
            .collect()
    }
}

fn collect_descendants<'a>(
    children: &'a [Spanned<Element>],
    tag: &str,
    found: &mut Vec<&'a Spanned<Element>>,
) {
    for child in children {
        if child.node.tag() == tag {
            found.push(child);
        }
        collect_descendants(&child.node.children, tag, found);
    }
}

/// Root AST node - a complete config document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub root: Spanned<Element>,
}
