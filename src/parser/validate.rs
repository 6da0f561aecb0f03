//! Structural checks on a parsed config document
//!
//! Runs before any template is built so that every problem in the document
//! can be reported at once, with source locations.

use std::collections::HashSet;

use ariadne::ReportKind;
use thiserror::Error;

use crate::error::format_report;
use crate::template::KeyType;

use super::ast::{Document, Element, Span, Spanned};

/// A problem found while validating the config document
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("tag '{tag}' doesn't have an attribute '{attribute}'")]
    MissingAttribute {
        tag: String,
        attribute: String,
        span: Span,
    },

    #[error("template '{name}' is defined more than once")]
    DuplicateTemplate { name: String, span: Span },

    #[error("key '{name}' is defined more than once in template '{template}'")]
    DuplicateKey {
        template: String,
        name: String,
        span: Span,
    },

    #[error("the document does not define any template")]
    NoTemplates { span: Span },
}

impl ValidationError {
    pub fn span(&self) -> Span {
        match self {
            Self::MissingAttribute { span, .. }
            | Self::DuplicateTemplate { span, .. }
            | Self::DuplicateKey { span, .. }
            | Self::NoTemplates { span } => span.clone(),
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let message = self.to_string();
        format_report(
            ReportKind::Error,
            source,
            filename,
            self.span(),
            &message,
            &message,
        )
    }
}

/// Required attributes per tag. Tags not listed are accepted as they are.
fn required_attributes(tag: &str) -> &'static [&'static str] {
    match tag {
        "template" => &["name", "desc"],
        "folder" => &["name", "rename"],
        "key" => &["name", "type"],
        "switch" => &["name", "type"],
        "case" => &["name"],
        _ => &[],
    }
}

/// Check the whole document and return every problem found
pub fn validate(doc: &Document) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    check_element(&doc.root, &mut errors);
    check_templates(doc, &mut errors);
    errors
}

fn check_element(element: &Spanned<Element>, errors: &mut Vec<ValidationError>) {
    let node = &element.node;
    let tag = node.tag();

    let mut missing = |attribute: &str| {
        errors.push(ValidationError::MissingAttribute {
            tag: tag.to_string(),
            attribute: attribute.to_string(),
            span: node.name.span.clone(),
        })
    };

    for &attribute in required_attributes(tag) {
        if !node.has_attr(attribute) {
            missing(attribute);
        }
    }

    match tag {
        // Unknown key types are left to the resolver
        "key" => {
            if let Some(key_type) = node.attr("type").and_then(KeyType::from_tag) {
                for &attribute in key_type.required_attributes() {
                    if !node.has_attr(attribute) {
                        missing(attribute);
                    }
                }
            }
        }
        "switch" if node.attr("type") == Some("input") && !node.has_attr("prompt") => {
            missing("prompt")
        }
        _ => {}
    }

    for child in &node.children {
        check_element(child, errors);
    }
}

fn check_templates(doc: &Document, errors: &mut Vec<ValidationError>) {
    let templates = if doc.root.node.tag() == "template" {
        vec![&doc.root]
    } else {
        doc.root.node.descendants_named("template")
    };

    if templates.is_empty() {
        errors.push(ValidationError::NoTemplates {
            span: doc.root.node.name.span.clone(),
        });
        return;
    }

    let mut seen_templates = HashSet::new();
    for template in templates {
        let Some(name) = template.node.attr("name") else {
            continue;
        };
        if !seen_templates.insert(name) {
            errors.push(ValidationError::DuplicateTemplate {
                name: name.to_string(),
                span: template.node.name.span.clone(),
            });
        }

        let mut seen_keys = HashSet::new();
        let mut keys = Vec::new();
        template_keys(&template.node, &mut keys);
        for key in keys {
            let Some(key_name) = key.node.attr("name") else {
                continue;
            };
            if !seen_keys.insert(key_name) {
                errors.push(ValidationError::DuplicateKey {
                    template: name.to_string(),
                    name: key_name.to_string(),
                    span: key.span.clone(),
                });
            }
        }
    }
}

/// `<key>` elements of a template, excluding case overrides
fn template_keys<'a>(element: &'a Element, keys: &mut Vec<&'a Spanned<Element>>) {
    for child in &element.children {
        match child.node.tag() {
            "switch" => {}
            "key" => keys.push(child),
            _ => template_keys(&child.node, keys),
        }
    }
}
