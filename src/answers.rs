//! User answers: the chosen template, input values and switch cases
//!
//! Answers can be read from a TOML file and completed interactively:
//!
//! ```toml
//! template = "lib"
//!
//! [inputs]
//! project = "demo"
//!
//! [cases]
//! region = "eu"
//! ```

use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::template::{KeyType, TemplateDefinition, TemplateRegistry};

/// Errors that can occur when loading or collecting answers
#[derive(Error, Debug)]
pub enum AnswersError {
    #[error("Failed to read answers: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse answers TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("input ended while asking for {what}")]
    EndOfInput { what: String },
}

/// Everything the user decides for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Answers {
    pub template: Option<String>,
    /// Values for `input` keys
    pub inputs: BTreeMap<String, String>,
    /// Chosen case per switch
    pub cases: BTreeMap<String, String>,
}

impl Answers {
    /// Load answers from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, AnswersError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load answers from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, AnswersError> {
        Ok(toml::from_str(content)?)
    }

    pub fn with_template(mut self, name: impl Into<String>) -> Self {
        self.template = Some(name.into());
        self
    }

    pub fn with_input(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.inputs.insert(key.into(), value.into());
        self
    }

    pub fn with_case(mut self, switch: impl Into<String>, case: impl Into<String>) -> Self {
        self.cases.insert(switch.into(), case.into());
        self
    }
}

/// Asks the user for whatever the answers do not already contain
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Fill in the template choice, missing inputs and missing input-switch cases
    pub fn complete(
        &mut self,
        registry: &TemplateRegistry,
        mut answers: Answers,
    ) -> Result<Answers, AnswersError> {
        let name = match answers.template.take() {
            Some(name) => name,
            None => self.choose_template(registry)?,
        };
        if let Some(template) = registry.get(&name) {
            self.collect_inputs(template, &mut answers.inputs)?;
            self.collect_cases(template, &mut answers.cases)?;
        }
        answers.template = Some(name);
        Ok(answers)
    }

    /// List the templates and read a choice until it names one of them
    pub fn choose_template(&mut self, registry: &TemplateRegistry) -> Result<String, AnswersError> {
        writeln!(self.output)?;
        writeln!(self.output, "Please select the template you want to create:")?;
        writeln!(self.output)?;
        for (name, description) in registry.descriptions() {
            writeln!(self.output, "  * {}: {}", name, description)?;
        }
        writeln!(self.output)?;

        loop {
            write!(self.output, "Your choice: ")?;
            self.output.flush()?;
            let choice = self.read_line("a template")?;
            if registry.contains(&choice) {
                return Ok(choice);
            }
            writeln!(self.output, "Choice not valid, try again...")?;
        }
    }

    /// Ask for every `input` key that has no value yet. Empty answers are asked again.
    pub fn collect_inputs(
        &mut self,
        template: &TemplateDefinition,
        inputs: &mut BTreeMap<String, String>,
    ) -> Result<(), AnswersError> {
        for def in template.definitions_of_type(KeyType::Input) {
            if inputs.contains_key(&def.name) {
                continue;
            }
            let prompt = def.attr("prompt").unwrap_or(&def.name);
            let value = loop {
                write!(self.output, "{}", prompt)?;
                self.output.flush()?;
                let line = self.read_line(&def.name)?;
                if !line.is_empty() {
                    break line;
                }
            };
            inputs.insert(def.name.clone(), value);
        }
        Ok(())
    }

    /// Ask for a case of every `input` switch that has no choice yet
    pub fn collect_cases(
        &mut self,
        template: &TemplateDefinition,
        cases: &mut BTreeMap<String, String>,
    ) -> Result<(), AnswersError> {
        for switch in template.switches_of_type("input") {
            if cases.contains_key(&switch.name) {
                continue;
            }
            let names = switch.case_names();
            let prompt = switch.prompt.as_deref().unwrap_or(&switch.name);
            let choice = loop {
                writeln!(self.output, "{} [{}]:", prompt, names.join(", "))?;
                self.output.flush()?;
                let line = self.read_line(&switch.name)?;
                if names.contains(&line.as_str()) {
                    break line;
                }
            };
            cases.insert(switch.name.clone(), choice);
        }
        Ok(())
    }

    fn read_line(&mut self, what: &str) -> Result<String, AnswersError> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(AnswersError::EndOfInput {
                what: what.to_string(),
            });
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    const CONFIG: &str = r#"
        <config>
            <template name="lib" desc="A library">
                <key name="project" type="input" prompt="Project name: "/>
                <key name="author" type="value" value="Jane"/>
                <switch name="region" type="input" prompt="Region">
                    <case name="eu"><key name="region" type="value" value="eu"/></case>
                    <case name="us"><key name="region" type="value" value="us"/></case>
                </switch>
                <switch name="fixed" type="auto">
                    <case name="a"/>
                </switch>
            </template>
            <template name="app" desc="An application"/>
        </config>
    "#;

    fn registry() -> TemplateRegistry {
        TemplateRegistry::from_document(&crate::parse(CONFIG).unwrap()).unwrap()
    }

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn test_parse_answers_file() {
        let answers = Answers::from_str(
            r#"
template = "lib"

[inputs]
project = "demo"

[cases]
region = "eu"
"#,
        )
        .expect("Should parse");
        assert_eq!(
            answers,
            Answers::default()
                .with_template("lib")
                .with_input("project", "demo")
                .with_case("region", "eu")
        );
    }

    #[test]
    fn test_partial_answers_file() {
        let answers = Answers::from_str("[inputs]\nproject = \"demo\"\n").unwrap();
        assert_eq!(answers.template, None);
        assert!(answers.cases.is_empty());
    }

    #[test]
    fn test_invalid_toml_error() {
        assert!(matches!(
            Answers::from_str("template = [unclosed"),
            Err(AnswersError::ParseError(_))
        ));
    }

    #[test]
    fn test_choose_template_retries() {
        let registry = registry();
        let mut p = prompter("nope\napp\n");
        assert_eq!(p.choose_template(&registry).unwrap(), "app");

        let out = String::from_utf8(p.output).unwrap();
        assert!(out.contains("Please select the template you want to create:"));
        assert!(out.contains("  * lib: A library"));
        assert!(out.contains("  * app: An application"));
        assert_eq!(out.matches("Your choice: ").count(), 2);
        assert_eq!(out.matches("Choice not valid, try again...").count(), 1);
    }

    #[test]
    fn test_collect_inputs_reprompts_on_empty() {
        let registry = registry();
        let mut p = prompter("\ndemo\n");
        let mut inputs = BTreeMap::new();
        p.collect_inputs(registry.get("lib").unwrap(), &mut inputs)
            .unwrap();
        assert_eq!(inputs.get("project").map(String::as_str), Some("demo"));
        let out = String::from_utf8(p.output).unwrap();
        assert_eq!(out.matches("Project name: ").count(), 2);
    }

    #[test]
    fn test_collect_cases_only_for_input_switches() {
        let registry = registry();
        let mut p = prompter("asia\nus\n");
        let mut cases = BTreeMap::new();
        p.collect_cases(registry.get("lib").unwrap(), &mut cases)
            .unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases.get("region").map(String::as_str), Some("us"));
        let out = String::from_utf8(p.output).unwrap();
        assert_eq!(out.matches("Region [eu, us]:").count(), 2);
    }

    #[test]
    fn test_complete_keeps_existing_answers() {
        let registry = registry();
        let answers = Answers::default()
            .with_template("lib")
            .with_input("project", "demo")
            .with_case("region", "eu");
        let mut p = prompter("");
        let completed = p.complete(&registry, answers.clone()).unwrap();
        assert_eq!(completed, answers);
        assert!(p.output.is_empty());
    }

    #[test]
    fn test_end_of_input() {
        let registry = registry();
        let mut p = prompter("");
        let result = p.complete(&registry, Answers::default().with_template("lib"));
        assert!(matches!(result, Err(AnswersError::EndOfInput { what }) if what == "project"));
    }
}
