//! AngryLion - project scaffolding from key-driven templates
//!
//! A config document declares templates. Each template has keys (named
//! values computed from user input, constants, uuids and format strings),
//! switches whose cases override keys, and folders to copy. This library
//! parses the document, resolves the keys of a chosen template and writes
//! the substituted folders into a workspace.
//!
//! # Example
//!
//! ```rust
//! use angrylion::{load, resolve, Answers};
//!
//! let registry = load(r#"
//!     <template name="lib" desc="A library">
//!         <key name="project" type="input" prompt="Project name: "/>
//!         <key name="upper" type="uppercase" format="$(project)_LIB"/>
//!     </template>
//! "#).unwrap();
//!
//! let answers = Answers::default()
//!     .with_template("lib")
//!     .with_input("project", "demo");
//! let resolved = resolve(&registry, &answers).unwrap();
//! assert_eq!(resolved.keys.get("upper"), Some("DEMO_LIB"));
//! ```

pub mod answers;
pub mod diagnostics;
pub mod error;
pub mod parser;
pub mod template;
pub mod workspace;

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use answers::{Answers, AnswersError, Prompter};
pub use diagnostics::{Diagnostic, Severity};
pub use error::ParseError;
pub use parser::{parse, validate, Document, ValidationError};
pub use template::{
    resolve_template, KeyDefinition, KeyType, ResolveError, ResolvedFolder, ResolvedKeys,
    ResolvedTemplate, Session, TemplateDefinition, TemplateError, TemplateRegistry,
};
pub use workspace::{Workspace, WorkspaceError};

/// Keys naming the template source folder, relative to the config file.
/// The parenthesized form is the legacy spelling.
pub const TEMPLATE_FOLDER_KEYS: [&str; 2] = ["template_folder", "(template_folder)"];

/// Errors that can occur while loading the config document
#[derive(Debug, Error)]
pub enum LoadError {
    /// Error during parsing
    #[error("parse errors: {}", join_errors(.0))]
    Parse(Vec<ParseError>),

    /// The document parsed but is not a valid config
    #[error("invalid config: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),

    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl From<Vec<ParseError>> for LoadError {
    fn from(errors: Vec<ParseError>) -> Self {
        LoadError::Parse(errors)
    }
}

impl LoadError {
    /// Format every contained error with source context
    pub fn format(&self, source: &str, filename: &str) -> String {
        match self {
            LoadError::Parse(errors) => errors
                .iter()
                .map(|e| e.format(source, filename))
                .collect::<Vec<_>>()
                .join("\n"),
            LoadError::Invalid(errors) => errors
                .iter()
                .map(|e| e.format(source, filename))
                .collect::<Vec<_>>()
                .join("\n"),
            LoadError::Template(e) => e.to_string(),
        }
    }
}

fn join_errors<E: std::fmt::Display>(errors: &[E]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors that can occur after the config is loaded
#[derive(Debug, Error)]
pub enum ScaffoldError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
}

impl ScaffoldError {
    pub fn severity(&self) -> Severity {
        match self {
            ScaffoldError::Resolve(e) => e.severity(),
            _ => Severity::Error,
        }
    }
}

/// What a scaffold run produced
#[derive(Debug)]
pub struct ScaffoldOutcome {
    pub resolved: ResolvedTemplate,
    /// Files written into the workspace
    pub files: Vec<PathBuf>,
}

/// Parse and validate a config document and build its template registry
pub fn load(source: &str) -> Result<TemplateRegistry, LoadError> {
    let doc = parse(source)?;
    let errors = validate(&doc);
    if !errors.is_empty() {
        return Err(LoadError::Invalid(errors));
    }
    let registry = TemplateRegistry::from_document(&doc)?;
    tracing::debug!(templates = registry.templates().len(), "loaded config");
    Ok(registry)
}

/// Resolve every key and folder name of the template the answers select
pub fn resolve(
    registry: &TemplateRegistry,
    answers: &Answers,
) -> Result<ResolvedTemplate, ScaffoldError> {
    let name = answers
        .template
        .as_deref()
        .ok_or(TemplateError::NotSelected)?;
    let template = registry.select(name)?;
    tracing::info!(template = %name, "resolving template");
    Ok(resolve_template(template, answers)?)
}

/// Directory holding the template folders: the config directory, joined with
/// the `template_folder` key when the template defines one
pub fn source_root(config_dir: &Path, keys: &ResolvedKeys) -> PathBuf {
    TEMPLATE_FOLDER_KEYS
        .iter()
        .find_map(|key| keys.get(key))
        .map(|folder| config_dir.join(folder))
        .unwrap_or_else(|| config_dir.to_path_buf())
}

/// Resolve the selected template and write its folders into the workspace
pub fn scaffold(
    registry: &TemplateRegistry,
    answers: &Answers,
    config_dir: &Path,
    workspace: &Workspace,
) -> Result<ScaffoldOutcome, ScaffoldError> {
    let resolved = resolve(registry, answers)?;
    let root = source_root(config_dir, &resolved.keys);

    workspace.check_folders(&resolved.folders)?;
    workspace.prepare()?;
    let files = workspace.populate(&root, &resolved.folders, &resolved.keys)?;
    tracing::info!(
        files = files.len(),
        workspace = %workspace.root().display(),
        "template written"
    );

    Ok(ScaffoldOutcome { resolved, files })
}
