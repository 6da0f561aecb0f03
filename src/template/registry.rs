//! Template registry for storing and retrieving template definitions

use thiserror::Error;

use crate::parser::ast::{Document, Element};

use super::keys::{
    CaseDefinition, FolderDefinition, KeyDefinition, KeyType, SwitchDefinition,
};

/// Errors that can occur during template operations
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Template not found in registry
    #[error("template not found: {name}")]
    NotFound { name: String },

    /// No template was chosen
    #[error("no template selected")]
    NotSelected,

    /// Duplicate template definition
    #[error("duplicate template definition: {name}")]
    Duplicate { name: String },

    /// Element lacks an attribute the registry needs to build it
    #[error("tag '{tag}' is missing the attribute '{attribute}'")]
    MissingAttribute { tag: String, attribute: String },
}

impl TemplateError {
    fn missing(tag: &str, attribute: &str) -> Self {
        Self::MissingAttribute {
            tag: tag.to_string(),
            attribute: attribute.to_string(),
        }
    }
}

/// A stored template definition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateDefinition {
    /// Template name
    pub name: String,
    /// Human-readable description shown when choosing a template
    pub description: String,
    /// Key definitions, excluding the override keys inside cases
    pub keys: Vec<KeyDefinition>,
    pub switches: Vec<SwitchDefinition>,
    pub folders: Vec<FolderDefinition>,
}

impl TemplateDefinition {
    /// Create an empty template definition
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Create a template definition from a `<template>` element
    pub fn from_element(element: &Element) -> Result<Self, TemplateError> {
        let name = element
            .attr("name")
            .ok_or_else(|| TemplateError::missing("template", "name"))?;

        let mut keys = Vec::new();
        collect_keys(element, &mut keys)?;

        let switches = element
            .descendants_named("switch")
            .into_iter()
            .map(|s| switch_from_element(&s.node))
            .collect::<Result<Vec<_>, _>>()?;

        let folders = element
            .descendants_named("folder")
            .into_iter()
            .map(|f| {
                Ok(FolderDefinition {
                    name: f
                        .node
                        .attr("name")
                        .ok_or_else(|| TemplateError::missing("folder", "name"))?
                        .to_string(),
                    rename: f
                        .node
                        .attr("rename")
                        .ok_or_else(|| TemplateError::missing("folder", "rename"))?
                        .to_string(),
                })
            })
            .collect::<Result<Vec<_>, TemplateError>>()?;

        Ok(Self {
            name: name.to_string(),
            description: element.attr("desc").unwrap_or_default().to_string(),
            keys,
            switches,
            folders,
        })
    }

    /// Add a key definition
    pub fn with_key(mut self, key: KeyDefinition) -> Self {
        self.keys.push(key);
        self
    }

    /// Add a switch definition
    pub fn with_switch(mut self, switch: SwitchDefinition) -> Self {
        self.switches.push(switch);
        self
    }

    /// Add a folder definition
    pub fn with_folder(mut self, folder: FolderDefinition) -> Self {
        self.folders.push(folder);
        self
    }

    /// All key definitions whose `type` is the given key type
    pub fn definitions_of_type(
        &self,
        key_type: KeyType,
    ) -> impl Iterator<Item = &KeyDefinition> + '_ {
        self.keys
            .iter()
            .filter(move |k| k.key_type == key_type.tag())
    }

    /// Look up a key definition by name
    pub fn definition_named(&self, name: &str) -> Option<&KeyDefinition> {
        self.keys.iter().find(|k| k.name == name)
    }

    pub fn folders(&self) -> &[FolderDefinition] {
        &self.folders
    }

    pub fn switch_named(&self, name: &str) -> Option<&SwitchDefinition> {
        self.switches.iter().find(|s| s.name == name)
    }

    /// Switches with the given `type` attribute (the CLI prompts for `input` switches)
    pub fn switches_of_type<'a>(
        &'a self,
        switch_type: &'a str,
    ) -> impl Iterator<Item = &'a SwitchDefinition> + 'a {
        self.switches
            .iter()
            .filter(move |s| s.switch_type == switch_type)
    }
}

/// Collect `<key>` elements, skipping anything nested inside a `<switch>`
fn collect_keys(element: &Element, keys: &mut Vec<KeyDefinition>) -> Result<(), TemplateError> {
    for child in &element.children {
        match child.node.tag() {
            "switch" => {}
            "key" => keys.push(key_from_element(&child.node)?),
            _ => collect_keys(&child.node, keys)?,
        }
    }
    Ok(())
}

fn key_from_element(element: &Element) -> Result<KeyDefinition, TemplateError> {
    KeyDefinition::from_element(element).ok_or_else(|| {
        let attribute = if element.has_attr("name") { "type" } else { "name" };
        TemplateError::missing("key", attribute)
    })
}

fn switch_from_element(element: &Element) -> Result<SwitchDefinition, TemplateError> {
    let name = element
        .attr("name")
        .ok_or_else(|| TemplateError::missing("switch", "name"))?;
    let switch_type = element
        .attr("type")
        .ok_or_else(|| TemplateError::missing("switch", "type"))?;

    let cases = element
        .descendants_named("case")
        .into_iter()
        .map(|c| {
            let case_name = c
                .node
                .attr("name")
                .ok_or_else(|| TemplateError::missing("case", "name"))?;
            let overrides = c
                .node
                .descendants_named("key")
                .into_iter()
                .map(|k| key_from_element(&k.node))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(CaseDefinition {
                name: case_name.to_string(),
                overrides,
            })
        })
        .collect::<Result<Vec<_>, TemplateError>>()?;

    Ok(SwitchDefinition {
        name: name.to_string(),
        switch_type: switch_type.to_string(),
        prompt: element.attr("prompt").map(str::to_string),
        cases,
    })
}

/// Registry for storing template definitions, in document order
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: Vec<TemplateDefinition>,
}

impl TemplateRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from every `<template>` in a parsed document
    pub fn from_document(doc: &Document) -> Result<Self, TemplateError> {
        let mut registry = Self::new();
        let root = &doc.root.node;
        let templates = if root.tag() == "template" {
            vec![&doc.root]
        } else {
            root.descendants_named("template")
        };
        for template in templates {
            registry.register(TemplateDefinition::from_element(&template.node)?)?;
        }
        Ok(registry)
    }

    /// Register a template definition directly
    pub fn register(&mut self, def: TemplateDefinition) -> Result<(), TemplateError> {
        if self.contains(&def.name) {
            return Err(TemplateError::Duplicate {
                name: def.name.clone(),
            });
        }
        self.templates.push(def);
        Ok(())
    }

    /// Get a template by name
    pub fn get(&self, name: &str) -> Option<&TemplateDefinition> {
        self.templates.iter().find(|t| t.name == name)
    }

    /// Get a template by name, failing with `NotFound`
    pub fn select(&self, name: &str) -> Result<&TemplateDefinition, TemplateError> {
        self.get(name).ok_or_else(|| TemplateError::NotFound {
            name: name.to_string(),
        })
    }

    /// Check if a template exists
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Get all template names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.iter().map(|t| t.name.as_str())
    }

    /// Template names with their descriptions, as listed to the user
    pub fn descriptions(&self) -> impl Iterator<Item = (&str, &str)> {
        self.templates
            .iter()
            .map(|t| (t.name.as_str(), t.description.as_str()))
    }

    /// All templates in document order
    pub fn templates(&self) -> &[TemplateDefinition] {
        &self.templates
    }
}
