//! Key, switch, case and folder definitions of a template

use std::collections::BTreeMap;
use std::fmt;

use crate::parser::ast::Element;

/// The fixed set of key types a template can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyType {
    Value,
    Uuid,
    Lowercase,
    Uppercase,
    Replace,
    Escape,
    Concatenate,
    Input,
}

impl KeyType {
    pub const ALL: [KeyType; 8] = [
        KeyType::Value,
        KeyType::Uuid,
        KeyType::Lowercase,
        KeyType::Uppercase,
        KeyType::Replace,
        KeyType::Escape,
        KeyType::Concatenate,
        KeyType::Input,
    ];

    /// Types the engine computes itself, in bulk-resolution order.
    /// `input` keys come from the user instead.
    pub const COMPUTED: [KeyType; 7] = [
        KeyType::Value,
        KeyType::Uuid,
        KeyType::Lowercase,
        KeyType::Uppercase,
        KeyType::Replace,
        KeyType::Escape,
        KeyType::Concatenate,
    ];

    /// The string used in the `type="..."` attribute
    pub fn tag(self) -> &'static str {
        match self {
            KeyType::Value => "value",
            KeyType::Uuid => "uuid",
            KeyType::Lowercase => "lowercase",
            KeyType::Uppercase => "uppercase",
            KeyType::Replace => "replace",
            KeyType::Escape => "escape",
            KeyType::Concatenate => "concatenate",
            KeyType::Input => "input",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.tag() == tag)
    }

    /// Attributes a key of this type must carry besides `name` and `type`
    pub fn required_attributes(self) -> &'static [&'static str] {
        match self {
            KeyType::Value => &["value"],
            KeyType::Uuid => &[],
            KeyType::Lowercase | KeyType::Uppercase | KeyType::Concatenate => &["format"],
            KeyType::Replace => &["format", "match", "replacement"],
            KeyType::Escape => &["format", "char"],
            KeyType::Input => &["prompt"],
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A declarative rule producing one named value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDefinition {
    pub name: String,
    /// Raw `type` attribute; may name a type that has no handler
    pub key_type: String,
    pub attributes: BTreeMap<String, String>,
}

impl KeyDefinition {
    pub fn new(name: impl Into<String>, key_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key_type: key_type.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Build from a `<key>` element. Returns None when `name` or `type` is missing.
    pub fn from_element(element: &Element) -> Option<Self> {
        let name = element.attr("name")?;
        let key_type = element.attr("type")?;
        let mut attributes = element.attribute_map();
        attributes.remove("name");
        attributes.remove("type");
        Some(Self {
            name: name.to_string(),
            key_type: key_type.to_string(),
            attributes,
        })
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// The parsed key type, if the tag is one of the known types
    pub fn kind(&self) -> Option<KeyType> {
        KeyType::from_tag(&self.key_type)
    }
}

/// One option of a switch, carrying literal key overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseDefinition {
    pub name: String,
    pub overrides: Vec<KeyDefinition>,
}

/// A named choice point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchDefinition {
    pub name: String,
    pub switch_type: String,
    pub prompt: Option<String>,
    pub cases: Vec<CaseDefinition>,
}

impl SwitchDefinition {
    pub fn case_named(&self, name: &str) -> Option<&CaseDefinition> {
        self.cases.iter().find(|c| c.name == name)
    }

    pub fn case_names(&self) -> Vec<&str> {
        self.cases.iter().map(|c| c.name.as_str()).collect()
    }
}

/// A template folder copied into the workspace under a resolved name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderDefinition {
    pub name: String,
    /// Format string for the target folder name
    pub rename: String,
}
