//! Key resolution - turns a template's key definitions into resolved values
//!
//! A [`Session`] is bound to one template and owns the resolved key table.
//! Keys are computed eagerly by [`Session::resolve_all`] and lazily whenever
//! a format string references a key that has no value yet. Every key is
//! computed at most once per session.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use thiserror::Error;

use crate::answers::Answers;
use crate::diagnostics::Severity;

use super::format;
use super::keys::{KeyDefinition, KeyType};
use super::registry::TemplateDefinition;

/// Errors that abort a resolution session
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// A definition lacks an attribute its type requires
    #[error("key '{key}' doesn't have an attribute '{attribute}'")]
    MissingAttribute { key: String, attribute: String },

    /// A definition's type has no evaluation rule
    #[error("key '{key}' has unsupported type '{key_type}'")]
    UnknownKeyType { key: String, key_type: String },

    /// A format string references a key that is not defined
    #[error("key '{symbol}' could not be resolved: no such key in the template")]
    UndefinedSymbol { symbol: String },

    /// An applied switch or case does not exist
    #[error("undefined switch case '{case}' for switch '{switch}'")]
    UndefinedSwitchCase { switch: String, case: String },

    /// A key references itself, directly or through other keys
    #[error("cyclic key reference: {}", chain.join(" -> "))]
    CyclicReference { chain: Vec<String> },

    /// An `input` key is needed but the user supplied no value for it
    #[error("input key '{key}' has no value")]
    MissingInput { key: String },
}

impl ResolveError {
    pub fn severity(&self) -> Severity {
        match self {
            Self::MissingAttribute { .. }
            | Self::UnknownKeyType { .. }
            | Self::UndefinedSwitchCase { .. } => Severity::Error,
            Self::UndefinedSymbol { .. }
            | Self::CyclicReference { .. }
            | Self::MissingInput { .. } => Severity::Critical,
        }
    }

    fn missing_attribute(key: &str, attribute: &str) -> Self {
        Self::MissingAttribute {
            key: key.to_string(),
            attribute: attribute.to_string(),
        }
    }
}

/// The resolved key table: key name -> final value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResolvedKeys {
    values: BTreeMap<String, String>,
}

impl ResolvedKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Set a value, replacing any earlier one. Returns the replaced value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.values.insert(name.into(), value.into())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Replace `$(name)` tokens for every key in the table, leaving unknown tokens untouched
    pub fn substitute(&self, text: &str) -> String {
        format::substitute(text, |name| self.get(name))
    }
}

impl FromIterator<(String, String)> for ResolvedKeys {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// A template folder with its target name resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFolder {
    /// Folder name inside the template source tree
    pub source: String,
    /// Folder name inside the workspace
    pub target: String,
}

/// Everything a finished session hands to the output stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTemplate {
    pub template: String,
    pub keys: ResolvedKeys,
    pub folders: Vec<ResolvedFolder>,
}

/// A key definition checked against the attributes its type requires
#[derive(Debug, Clone, Copy)]
enum KeyRule<'d> {
    Value(&'d str),
    Uuid,
    Lowercase(&'d str),
    Uppercase(&'d str),
    Replace {
        format: &'d str,
        pattern: &'d str,
        replacement: &'d str,
    },
    Escape {
        format: &'d str,
        ch: &'d str,
    },
    Concatenate(&'d str),
}

impl<'d> KeyRule<'d> {
    fn parse(key_type: KeyType, def: &'d KeyDefinition) -> Result<Self, ResolveError> {
        let attr = |name: &str| {
            def.attr(name)
                .ok_or_else(|| ResolveError::missing_attribute(&def.name, name))
        };

        Ok(match key_type {
            KeyType::Value => KeyRule::Value(attr("value")?),
            KeyType::Uuid => KeyRule::Uuid,
            KeyType::Lowercase => KeyRule::Lowercase(attr("format")?),
            KeyType::Uppercase => KeyRule::Uppercase(attr("format")?),
            KeyType::Replace => KeyRule::Replace {
                format: attr("format")?,
                pattern: attr("match")?,
                replacement: attr("replacement")?,
            },
            KeyType::Escape => KeyRule::Escape {
                format: attr("format")?,
                ch: attr("char")?,
            },
            KeyType::Concatenate => KeyRule::Concatenate(attr("format")?),
            KeyType::Input => {
                return Err(ResolveError::MissingInput {
                    key: def.name.clone(),
                })
            }
        })
    }
}

/// One template-expansion session
#[derive(Debug)]
pub struct Session<'a> {
    template: &'a TemplateDefinition,
    keys: ResolvedKeys,
    /// Names set by a case override; nothing else may replace them
    overridden: BTreeSet<String>,
    /// Keys currently being evaluated (for cycle detection)
    resolving: Vec<String>,
}

impl<'a> Session<'a> {
    /// Start a session for the given template with an empty key table
    pub fn new(template: &'a TemplateDefinition) -> Self {
        Self {
            template,
            keys: ResolvedKeys::new(),
            overridden: BTreeSet::new(),
            resolving: Vec::new(),
        }
    }

    /// Switch to another template. All resolved state is discarded.
    pub fn select(&mut self, template: &'a TemplateDefinition) {
        tracing::debug!(template = %template.name, "selecting template");
        *self = Self::new(template);
    }

    pub fn keys(&self) -> &ResolvedKeys {
        &self.keys
    }

    /// Finish the session and hand out the resolved key table
    pub fn into_keys(self) -> ResolvedKeys {
        self.keys
    }

    /// Write user-supplied values into the table. Case overrides keep precedence.
    pub fn absorb_inputs(&mut self, inputs: &BTreeMap<String, String>) {
        for (name, value) in inputs {
            if self.overridden.contains(name) {
                tracing::debug!(key = %name, "input ignored, key is set by a case override");
                continue;
            }
            self.keys.insert(name.clone(), value.clone());
        }
    }

    /// Resolve every key of the template.
    ///
    /// User inputs are absorbed first, then each computed key type is handled
    /// in turn. Keys that already have a value are kept as they are.
    pub fn resolve_all(&mut self, inputs: &BTreeMap<String, String>) -> Result<(), ResolveError> {
        self.absorb_inputs(inputs);

        let template = self.template;
        if let Some(def) = template.keys.iter().find(|k| k.kind().is_none()) {
            return Err(ResolveError::UnknownKeyType {
                key: def.name.clone(),
                key_type: def.key_type.clone(),
            });
        }
        if let Some(def) = template
            .definitions_of_type(KeyType::Input)
            .find(|k| !self.keys.contains(&k.name))
        {
            return Err(ResolveError::MissingInput {
                key: def.name.clone(),
            });
        }

        for key_type in KeyType::COMPUTED {
            let definitions: Vec<&KeyDefinition> = template.definitions_of_type(key_type).collect();
            if definitions.is_empty() {
                continue;
            }
            let resolved = self.handle(key_type, &definitions)?;
            self.merge(resolved);
        }

        tracing::info!(
            template = %template.name,
            keys = self.keys.len(),
            "resolved all keys"
        );
        Ok(())
    }

    /// Evaluate definitions of one key type and return their values
    pub fn handle(
        &mut self,
        key_type: KeyType,
        definitions: &[&KeyDefinition],
    ) -> Result<BTreeMap<String, String>, ResolveError> {
        let mut resolved = BTreeMap::new();
        for def in definitions {
            let value = self.evaluate(key_type, def)?;
            resolved.insert(def.name.clone(), value);
        }
        Ok(resolved)
    }

    /// Resolve a single key by name, computing it on first use
    pub fn resolve_symbol(&mut self, name: &str) -> Result<String, ResolveError> {
        if let Some(value) = self.keys.get(name) {
            return Ok(value.to_string());
        }

        let template = self.template;
        let def = template
            .definition_named(name)
            .ok_or_else(|| ResolveError::UndefinedSymbol {
                symbol: name.to_string(),
            })?;
        let key_type = def.kind().ok_or_else(|| ResolveError::UnknownKeyType {
            key: def.name.clone(),
            key_type: def.key_type.clone(),
        })?;

        tracing::debug!(key = %name, key_type = %key_type, "resolving key on demand");
        let resolved = self.handle(key_type, &[def])?;
        self.merge(resolved);

        self.keys
            .get(name)
            .map(str::to_string)
            .ok_or_else(|| ResolveError::UndefinedSymbol {
                symbol: name.to_string(),
            })
    }

    /// Substitute every `$(name)` reference in `format`, resolving keys as needed
    pub fn interpolate(&mut self, format: &str) -> Result<String, ResolveError> {
        for name in format::references(format) {
            if !self.keys.contains(name) {
                self.resolve_symbol(name)?;
            }
        }

        let keys = &self.keys;
        Ok(format::substitute(format, |name| keys.get(name)))
    }

    /// Apply the overrides of `case` in `switch`. Override values win for the rest of the session.
    pub fn apply_case(&mut self, switch: &str, case: &str) -> Result<(), ResolveError> {
        let undefined = || ResolveError::UndefinedSwitchCase {
            switch: switch.to_string(),
            case: case.to_string(),
        };

        let template = self.template;
        let case_def = template
            .switch_named(switch)
            .and_then(|s| s.case_named(case))
            .ok_or_else(undefined)?;

        let overrides = case_def
            .overrides
            .iter()
            .map(|key| {
                key.attr("value")
                    .map(|value| (key.name.as_str(), value))
                    .ok_or_else(|| ResolveError::missing_attribute(&key.name, "value"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (name, value) in overrides {
            if let Some(previous) = self.keys.insert(name, value) {
                tracing::debug!(key = %name, previous = %previous, "case override replaces value");
            }
            self.overridden.insert(name.to_string());
        }
        tracing::info!(switch = %switch, case = %case, "applied case");
        Ok(())
    }

    /// Resolve the target name of every template folder.
    ///
    /// A `rename` without references that names a key resolves to that key's
    /// value; anything else is interpolated as a format string.
    pub fn resolve_folders(&mut self) -> Result<Vec<ResolvedFolder>, ResolveError> {
        let template = self.template;
        let mut folders = Vec::with_capacity(template.folders.len());
        for folder in &template.folders {
            let rename = folder.rename.as_str();
            let names_key = format::references(rename).is_empty()
                && (self.keys.contains(rename) || template.definition_named(rename).is_some());
            let target = if names_key {
                self.resolve_symbol(rename)?
            } else {
                self.interpolate(rename)?
            };
            folders.push(ResolvedFolder {
                source: folder.name.clone(),
                target,
            });
        }
        Ok(folders)
    }

    /// Compute one definition, or return its existing value
    fn evaluate(&mut self, key_type: KeyType, def: &KeyDefinition) -> Result<String, ResolveError> {
        if let Some(existing) = self.keys.get(&def.name) {
            return Ok(existing.to_string());
        }

        if let Some(pos) = self.resolving.iter().position(|n| *n == def.name) {
            let mut chain = self.resolving[pos..].to_vec();
            chain.push(def.name.clone());
            return Err(ResolveError::CyclicReference { chain });
        }

        let rule = KeyRule::parse(key_type, def)?;

        self.resolving.push(def.name.clone());
        let result = self.apply_rule(rule);
        self.resolving.pop();
        let value = result?;

        tracing::debug!(key = %def.name, key_type = %key_type, value = %value, "resolved key");
        self.keys.insert(def.name.clone(), value.clone());
        Ok(value)
    }

    fn apply_rule(&mut self, rule: KeyRule<'_>) -> Result<String, ResolveError> {
        Ok(match rule {
            KeyRule::Value(value) => value.to_string(),
            KeyRule::Uuid => uuid::Uuid::new_v4().to_string(),
            KeyRule::Lowercase(format) => self.interpolate(format)?.to_lowercase(),
            KeyRule::Uppercase(format) => self.interpolate(format)?.to_uppercase(),
            KeyRule::Replace {
                format,
                pattern,
                replacement,
            } => self.interpolate(format)?.replace(pattern, replacement),
            KeyRule::Escape { format, ch } => self
                .interpolate(format)?
                .replace(ch, &format!("\\{}", ch)),
            KeyRule::Concatenate(format) => self.interpolate(format)?,
        })
    }

    fn merge(&mut self, resolved: BTreeMap<String, String>) {
        for (name, value) in resolved {
            if !self.overridden.contains(&name) {
                self.keys.insert(name, value);
            }
        }
    }
}

/// Run a complete session: inputs, chosen cases, every key, then folder names.
///
/// On failure no partial table is returned.
pub fn resolve_template(
    template: &TemplateDefinition,
    answers: &Answers,
) -> Result<ResolvedTemplate, ResolveError> {
    let mut session = Session::new(template);
    session.absorb_inputs(&answers.inputs);
    for (switch, case) in &answers.cases {
        session.apply_case(switch, case)?;
    }
    session.resolve_all(&answers.inputs)?;
    let folders = session.resolve_folders()?;

    Ok(ResolvedTemplate {
        template: template.name.clone(),
        keys: session.into_keys(),
        folders,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::keys::{CaseDefinition, FolderDefinition, SwitchDefinition};
    use pretty_assertions::assert_eq;

    fn value(name: &str, v: &str) -> KeyDefinition {
        KeyDefinition::new(name, "value").with_attr("value", v)
    }

    fn formatted(name: &str, key_type: &str, format: &str) -> KeyDefinition {
        KeyDefinition::new(name, key_type).with_attr("format", format)
    }

    fn region_switch() -> SwitchDefinition {
        SwitchDefinition {
            name: "region".to_string(),
            switch_type: "input".to_string(),
            prompt: Some("Region".to_string()),
            cases: vec![
                CaseDefinition {
                    name: "eu".to_string(),
                    overrides: vec![value("region", "eu")],
                },
                CaseDefinition {
                    name: "us".to_string(),
                    overrides: vec![value("region", "us")],
                },
            ],
        }
    }

    fn inputs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_value_key() {
        let template = TemplateDefinition::new("t").with_key(value("author", "Jane"));
        let mut session = Session::new(&template);
        session.resolve_all(&BTreeMap::new()).unwrap();
        assert_eq!(session.keys().get("author"), Some("Jane"));
    }

    #[test]
    fn test_uppercase_of_resolved_key() {
        let template = TemplateDefinition::new("t")
            .with_key(formatted("author_upper", "uppercase", "$(author)"))
            .with_key(value("author", "Jane"));
        let mut session = Session::new(&template);
        session.resolve_all(&BTreeMap::new()).unwrap();
        assert_eq!(session.keys().get("author_upper"), Some("JANE"));
    }

    #[test]
    fn test_lowercase() {
        let template = TemplateDefinition::new("t")
            .with_key(formatted("lower", "lowercase", "$(name)_Lib"));
        let mut session = Session::new(&template);
        session
            .resolve_all(&inputs(&[("name", "MyProject")]))
            .unwrap();
        assert_eq!(session.keys().get("lower"), Some("myproject_lib"));
    }

    #[test]
    fn test_replace() {
        let template = TemplateDefinition::new("t")
            .with_key(value("author", "Jane"))
            .with_key(
                formatted("slug", "replace", "$(author)_project")
                    .with_attr("match", "_")
                    .with_attr("replacement", "-"),
            );
        let mut session = Session::new(&template);
        session.resolve_all(&BTreeMap::new()).unwrap();
        assert_eq!(session.keys().get("slug"), Some("Jane-project"));
    }

    #[test]
    fn test_escape() {
        let template = TemplateDefinition::new("t")
            .with_key(value("path", "a.b.c"))
            .with_key(formatted("pattern", "escape", "$(path)").with_attr("char", "."));
        let mut session = Session::new(&template);
        session.resolve_all(&BTreeMap::new()).unwrap();
        assert_eq!(session.keys().get("pattern"), Some(r"a\.b\.c"));
    }

    #[test]
    fn test_concatenate_legacy_names() {
        let template = TemplateDefinition::new("t")
            .with_key(value("(bfp_name)", "Widget"))
            .with_key(formatted("(bfp_file)", "concatenate", "$((bfp_name)).cpp"));
        let mut session = Session::new(&template);
        session.resolve_all(&BTreeMap::new()).unwrap();
        assert_eq!(session.keys().get("(bfp_file)"), Some("Widget.cpp"));
    }

    #[test]
    fn test_case_override_feeds_concatenate() {
        let template = TemplateDefinition::new("t")
            .with_switch(region_switch())
            .with_key(formatted("cfg", "concatenate", "$(region)-config"));
        let mut session = Session::new(&template);
        session.apply_case("region", "eu").unwrap();
        insta::assert_snapshot!(session.interpolate("$(region)-config").unwrap(), @"eu-config");
        session.resolve_all(&BTreeMap::new()).unwrap();
        assert_eq!(session.keys().get("cfg"), Some("eu-config"));
    }

    #[test]
    fn test_missing_value_attribute() {
        let template = TemplateDefinition::new("t").with_key(KeyDefinition::new("broken", "value"));
        let mut session = Session::new(&template);
        let err = session.resolve_all(&BTreeMap::new()).unwrap_err();
        assert_eq!(
            err,
            ResolveError::MissingAttribute {
                key: "broken".to_string(),
                attribute: "value".to_string(),
            }
        );
        assert_eq!(err.severity(), Severity::Error);
    }

    #[test]
    fn test_replace_requires_all_attributes() {
        let template = TemplateDefinition::new("t")
            .with_key(formatted("slug", "replace", "x").with_attr("match", "_"));
        let mut session = Session::new(&template);
        let err = session.resolve_all(&BTreeMap::new()).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::MissingAttribute { ref attribute, .. } if attribute == "replacement"
        ));
    }

    #[test]
    fn test_formatted_types_require_format() {
        for key_type in ["lowercase", "uppercase", "concatenate"] {
            let template = TemplateDefinition::new("t").with_key(KeyDefinition::new("k", key_type));
            let mut session = Session::new(&template);
            assert_eq!(
                session.resolve_all(&BTreeMap::new()).unwrap_err(),
                ResolveError::missing_attribute("k", "format"),
                "type {}",
                key_type
            );
        }
    }

    #[test]
    fn test_escape_requires_char() {
        let template = TemplateDefinition::new("t")
            .with_key(value("path", "a.b"))
            .with_key(formatted("pattern", "escape", "$(path)"));
        let mut session = Session::new(&template);
        assert_eq!(
            session.resolve_all(&BTreeMap::new()).unwrap_err(),
            ResolveError::missing_attribute("pattern", "char")
        );
        assert!(!session.keys().contains("pattern"));
    }

    #[test]
    fn test_undefined_symbol() {
        let template = TemplateDefinition::new("t");
        let mut session = Session::new(&template);
        let err = session.interpolate("$(undeclared)").unwrap_err();
        assert_eq!(
            err,
            ResolveError::UndefinedSymbol {
                symbol: "undeclared".to_string()
            }
        );
        assert_eq!(err.severity(), Severity::Critical);
    }

    #[test]
    fn test_unknown_key_type_aborts() {
        let template = TemplateDefinition::new("t")
            .with_key(value("a", "1"))
            .with_key(KeyDefinition::new("odd", "reverse").with_attr("format", "x"));
        let mut session = Session::new(&template);
        let err = session.resolve_all(&BTreeMap::new()).unwrap_err();
        assert_eq!(
            err,
            ResolveError::UnknownKeyType {
                key: "odd".to_string(),
                key_type: "reverse".to_string(),
            }
        );
    }

    #[test]
    fn test_unknown_key_type_on_demand() {
        let template = TemplateDefinition::new("t").with_key(KeyDefinition::new("odd", "reverse"));
        let mut session = Session::new(&template);
        let err = session.resolve_symbol("odd").unwrap_err();
        assert!(matches!(err, ResolveError::UnknownKeyType { .. }));
    }

    #[test]
    fn test_interpolate_identity_without_references() {
        let template = TemplateDefinition::new("t");
        let mut session = Session::new(&template);
        for text in ["", "plain", "cost: $5 (approx)", "$(Upper)"] {
            assert_eq!(session.interpolate(text).unwrap(), text);
        }
        assert!(session.keys().is_empty());
    }

    #[test]
    fn test_uuid_is_stable_within_a_session() {
        let template = TemplateDefinition::new("t")
            .with_key(KeyDefinition::new("guid", "uuid"))
            .with_key(formatted("upper_guid", "uppercase", "$(guid)"));
        let mut session = Session::new(&template);

        let first = session.resolve_symbol("guid").unwrap();
        let second = session.resolve_symbol("guid").unwrap();
        assert_eq!(first, second);

        session.resolve_all(&BTreeMap::new()).unwrap();
        assert_eq!(session.keys().get("guid"), Some(first.as_str()));
        assert_eq!(
            session.keys().get("upper_guid"),
            Some(first.to_uppercase().as_str())
        );

        let parsed = uuid::Uuid::parse_str(&first).expect("valid uuid");
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn test_uuid_differs_between_sessions() {
        let template = TemplateDefinition::new("t").with_key(KeyDefinition::new("guid", "uuid"));
        let a = Session::new(&template).resolve_symbol("guid").unwrap();
        let b = Session::new(&template).resolve_symbol("guid").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_override_beats_computed_value() {
        let template = TemplateDefinition::new("t")
            .with_switch(region_switch())
            .with_key(value("region", "default"));
        let mut session = Session::new(&template);
        session.resolve_all(&BTreeMap::new()).unwrap();
        assert_eq!(session.keys().get("region"), Some("default"));

        session.apply_case("region", "us").unwrap();
        assert_eq!(session.keys().get("region"), Some("us"));

        // A second bulk pass does not undo the override
        session.resolve_all(&BTreeMap::new()).unwrap();
        assert_eq!(session.keys().get("region"), Some("us"));
    }

    #[test]
    fn test_override_beats_later_inputs() {
        let template = TemplateDefinition::new("t").with_switch(region_switch());
        let mut session = Session::new(&template);
        session.apply_case("region", "eu").unwrap();
        session.absorb_inputs(&inputs(&[("region", "mars")]));
        assert_eq!(session.keys().get("region"), Some("eu"));
    }

    #[test]
    fn test_undefined_switch_or_case() {
        let template = TemplateDefinition::new("t").with_switch(region_switch());
        let mut session = Session::new(&template);
        assert!(matches!(
            session.apply_case("region", "asia"),
            Err(ResolveError::UndefinedSwitchCase { .. })
        ));
        assert!(matches!(
            session.apply_case("color", "eu"),
            Err(ResolveError::UndefinedSwitchCase { .. })
        ));
    }

    #[test]
    fn test_override_without_value_is_rejected() {
        let mut switch = region_switch();
        switch.cases[0].overrides.push(KeyDefinition::new("zone", "value"));
        let template = TemplateDefinition::new("t").with_switch(switch);
        let mut session = Session::new(&template);
        let err = session.apply_case("region", "eu").unwrap_err();
        assert!(matches!(err, ResolveError::MissingAttribute { ref key, .. } if key == "zone"));
        // Nothing from the failed case was applied
        assert!(session.keys().get("region").is_none());
    }

    #[test]
    fn test_direct_cycle() {
        let template =
            TemplateDefinition::new("t").with_key(formatted("me", "concatenate", "x$(me)"));
        let mut session = Session::new(&template);
        let err = session.resolve_all(&BTreeMap::new()).unwrap_err();
        assert_eq!(
            err,
            ResolveError::CyclicReference {
                chain: vec!["me".to_string(), "me".to_string()]
            }
        );
    }

    #[test]
    fn test_indirect_cycle() {
        let template = TemplateDefinition::new("t")
            .with_key(formatted("a", "concatenate", "$(b)"))
            .with_key(formatted("b", "uppercase", "$(c)"))
            .with_key(formatted("c", "lowercase", "$(a)"));
        let mut session = Session::new(&template);
        let err = session.resolve_symbol("a").unwrap_err();
        assert_eq!(err.to_string(), "cyclic key reference: a -> b -> c -> a");
    }

    #[test]
    fn test_input_keys_come_from_user() {
        let template = TemplateDefinition::new("t")
            .with_key(KeyDefinition::new("project", "input").with_attr("prompt", "Name: "))
            .with_key(formatted("upper", "uppercase", "$(project)"));
        let mut session = Session::new(&template);
        session.resolve_all(&inputs(&[("project", "demo")])).unwrap();
        assert_eq!(session.keys().get("upper"), Some("DEMO"));
    }

    #[test]
    fn test_missing_input() {
        let template = TemplateDefinition::new("t")
            .with_key(KeyDefinition::new("project", "input").with_attr("prompt", "Name: "));
        let mut session = Session::new(&template);
        assert_eq!(
            session.resolve_symbol("project").unwrap_err(),
            ResolveError::MissingInput {
                key: "project".to_string()
            }
        );
        assert!(matches!(
            session.resolve_all(&BTreeMap::new()),
            Err(ResolveError::MissingInput { .. })
        ));
    }

    #[test]
    fn test_inputs_are_authoritative() {
        let template = TemplateDefinition::new("t").with_key(value("author", "Jane"));
        let mut session = Session::new(&template);
        session.resolve_all(&inputs(&[("author", "Ada")])).unwrap();
        assert_eq!(session.keys().get("author"), Some("Ada"));
    }

    #[test]
    fn test_interpolation_is_single_pass() {
        let template = TemplateDefinition::new("t")
            .with_key(value("outer", "[$(inner)]"))
            .with_key(value("inner", "x"));
        let mut session = Session::new(&template);
        assert_eq!(session.interpolate("$(outer)").unwrap(), "[$(inner)]");
        assert!(!session.keys().contains("inner"));
    }

    #[test]
    fn test_select_resets_state() {
        let first = TemplateDefinition::new("first").with_key(value("a", "1"));
        let second = TemplateDefinition::new("second").with_key(value("b", "2"));
        let mut session = Session::new(&first);
        session.resolve_all(&BTreeMap::new()).unwrap();
        assert!(session.keys().contains("a"));

        session.select(&second);
        assert!(session.keys().is_empty());
        assert!(matches!(session.resolve_symbol("b").as_deref(), Ok("2")));
        assert!(matches!(
            session.resolve_symbol("a"),
            Err(ResolveError::UndefinedSymbol { .. })
        ));
    }

    #[test]
    fn test_handle_returns_mapping() {
        let template = TemplateDefinition::new("t")
            .with_key(value("a", "1"))
            .with_key(value("b", "2"));
        let mut session = Session::new(&template);
        let definitions: Vec<_> = template.definitions_of_type(KeyType::Value).collect();
        let resolved = session.handle(KeyType::Value, &definitions).unwrap();
        assert_eq!(resolved, inputs(&[("a", "1"), ("b", "2")]));
    }

    #[test]
    fn test_resolve_template_end_to_end() {
        let template = TemplateDefinition::new("lib")
            .with_switch(region_switch())
            .with_key(KeyDefinition::new("project", "input").with_attr("prompt", "Name: "))
            .with_key(formatted("cfg", "concatenate", "$(region)-config"))
            .with_folder(FolderDefinition {
                name: "src".to_string(),
                rename: "$(project)_src".to_string(),
            });
        let answers = Answers {
            template: Some("lib".to_string()),
            inputs: inputs(&[("project", "demo")]),
            cases: inputs(&[("region", "eu")]),
        };

        let resolved = resolve_template(&template, &answers).unwrap();
        assert_eq!(resolved.keys.get("cfg"), Some("eu-config"));
        assert_eq!(
            resolved.folders,
            vec![ResolvedFolder {
                source: "src".to_string(),
                target: "demo_src".to_string(),
            }]
        );
    }

    #[test]
    fn test_folder_rename_naming_a_key() {
        let template = TemplateDefinition::new("t")
            .with_key(value("(bfp_folder)", "widgets"))
            .with_key(formatted("(bfp_upper)", "uppercase", "$((bfp_folder))"))
            .with_folder(FolderDefinition {
                name: "src".to_string(),
                rename: "(bfp_folder)".to_string(),
            })
            .with_folder(FolderDefinition {
                name: "inc".to_string(),
                rename: "(bfp_upper)".to_string(),
            })
            .with_folder(FolderDefinition {
                name: "doc".to_string(),
                rename: "$((bfp_folder))_doc".to_string(),
            })
            .with_folder(FolderDefinition {
                name: "misc".to_string(),
                rename: "misc".to_string(),
            });
        let mut session = Session::new(&template);
        let targets: Vec<_> = session
            .resolve_folders()
            .unwrap()
            .into_iter()
            .map(|f| f.target)
            .collect();
        assert_eq!(targets, vec!["widgets", "WIDGETS", "widgets_doc", "misc"]);
    }

    #[test]
    fn test_folder_rename_naming_an_input() {
        let template = TemplateDefinition::new("t")
            .with_key(KeyDefinition::new("project", "input").with_attr("prompt", "Name: "))
            .with_folder(FolderDefinition {
                name: "src".to_string(),
                rename: "project".to_string(),
            });
        let mut session = Session::new(&template);
        session.resolve_all(&inputs(&[("project", "demo")])).unwrap();
        let folders = session.resolve_folders().unwrap();
        assert_eq!(folders[0].target, "demo");
    }

    #[test]
    fn test_resolve_template_returns_no_partial_table() {
        let template = TemplateDefinition::new("t")
            .with_key(value("good", "ok"))
            .with_key(KeyDefinition::new("broken", "value"));
        let result = resolve_template(&template, &Answers::default());
        assert!(matches!(result, Err(ResolveError::MissingAttribute { .. })));
    }

    #[test]
    fn test_substitute_uses_final_table() {
        let keys: ResolvedKeys = [("name".to_string(), "demo".to_string())]
            .into_iter()
            .collect();
        assert_eq!(keys.substitute("$(name)/$(other)"), "demo/$(other)");
    }
}
