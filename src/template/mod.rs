//! Templates and key resolution
//!
//! A template declares named keys, switches with cases, and folders. A
//! [`Session`] resolves the keys of one template into a [`ResolvedKeys`]
//! table that the workspace stage uses for substitution.
//!
//! # Example
//!
//! ```text
//! <template name="lib" desc="A library">
//!     <folder name="src" rename="$(project)"/>
//!     <key name="project" type="input" prompt="Project name: "/>
//!     <key name="upper" type="uppercase" format="$(project)"/>
//! </template>
//! ```

pub mod format;
mod keys;
mod registry;
mod resolver;

pub use keys::{CaseDefinition, FolderDefinition, KeyDefinition, KeyType, SwitchDefinition};
pub use registry::{TemplateDefinition, TemplateError, TemplateRegistry};
pub use resolver::{
    resolve_template, ResolveError, ResolvedFolder, ResolvedKeys, ResolvedTemplate, Session,
};
