//! Output stage: copies template folders into the workspace
//!
//! Each resolved folder is copied from the template source tree to its
//! target name. `$(name)` tokens are replaced in file names and in the
//! content of UTF-8 files; other files are copied unchanged.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::diagnostics::Diagnostic;
use crate::template::{format, ResolvedFolder, ResolvedKeys};

/// Errors that can occur while populating the workspace
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to {action} '{}': {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        source: io::Error,
    },

    #[error("failed to walk '{}': {source}", path.display())]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[error("template folder '{}' does not exist", path.display())]
    MissingSource { path: PathBuf },

    /// A resolved name would place output outside the workspace
    #[error("refusing to write '{}' outside the workspace", path.display())]
    UnsafeTarget { path: PathBuf },
}

impl WorkspaceError {
    fn io<'a>(action: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> Self + 'a {
        move |source| Self::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// The directory that receives the generated files
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Empty the workspace, creating it if needed
    pub fn prepare(&self) -> Result<(), WorkspaceError> {
        if self.root.exists() {
            tracing::info!(path = %self.root.display(), "cleaning the workspace folder");
            fs::remove_dir_all(&self.root).map_err(WorkspaceError::io("clean", &self.root))?;
        }
        fs::create_dir_all(&self.root).map_err(WorkspaceError::io("create", &self.root))
    }

    /// Fail if any folder target would land outside the workspace
    pub fn check_folders(&self, folders: &[ResolvedFolder]) -> Result<(), WorkspaceError> {
        for folder in folders {
            contained(&folder.target)?;
        }
        Ok(())
    }

    /// Copy every folder from `source_root` and substitute keys.
    /// Returns the written files in walk order.
    pub fn populate(
        &self,
        source_root: &Path,
        folders: &[ResolvedFolder],
        keys: &ResolvedKeys,
    ) -> Result<Vec<PathBuf>, WorkspaceError> {
        self.check_folders(folders)?;
        let mut written = Vec::new();
        for folder in folders {
            let source = source_root.join(&folder.source);
            if !source.is_dir() {
                return Err(WorkspaceError::MissingSource { path: source });
            }
            let target = self.root.join(&folder.target);
            tracing::info!(
                source = %source.display(),
                target = %target.display(),
                "copying template folder"
            );
            fs::create_dir_all(&target).map_err(WorkspaceError::io("create", &target))?;
            self.copy_tree(&source, &target, keys, &mut written)?;
        }
        Ok(written)
    }

    fn copy_tree(
        &self,
        source: &Path,
        target: &Path,
        keys: &ResolvedKeys,
        written: &mut Vec<PathBuf>,
    ) -> Result<(), WorkspaceError> {
        for entry in WalkDir::new(source).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| WorkspaceError::Walk {
                path: source.to_path_buf(),
                source: e,
            })?;
            let Ok(relative) = entry.path().strip_prefix(source) else {
                continue;
            };

            let mut dest = target.to_path_buf();
            for component in relative.components() {
                let name = component.as_os_str().to_string_lossy();
                let resolved = substitute_logged(keys, &name, entry.path());
                dest.push(contained(&resolved)?);
            }

            if entry.file_type().is_dir() {
                fs::create_dir_all(&dest).map_err(WorkspaceError::io("create", &dest))?;
                continue;
            }

            let bytes = fs::read(entry.path()).map_err(WorkspaceError::io("read", entry.path()))?;
            let content = match String::from_utf8(bytes) {
                Ok(text) => substitute_logged(keys, &text, entry.path()).into_bytes(),
                Err(binary) => {
                    tracing::debug!(path = %entry.path().display(), "binary file copied verbatim");
                    binary.into_bytes()
                }
            };
            fs::write(&dest, content).map_err(WorkspaceError::io("write", &dest))?;

            if let Ok(metadata) = entry.metadata() {
                fs::set_permissions(&dest, metadata.permissions())
                    .map_err(WorkspaceError::io("set permissions on", &dest))?;
            }
            tracing::debug!(path = %dest.display(), "wrote file");
            written.push(dest);
        }
        Ok(())
    }
}

/// `name` as a relative path that cannot leave the directory it is joined to
fn contained(name: &str) -> Result<&Path, WorkspaceError> {
    let path = Path::new(name);
    let escapes = path.components().any(|c| {
        matches!(
            c,
            Component::RootDir | Component::Prefix(_) | Component::ParentDir
        )
    });
    if escapes || path.is_absolute() {
        return Err(WorkspaceError::UnsafeTarget {
            path: path.to_path_buf(),
        });
    }
    Ok(path)
}

/// Substitute known keys and warn about tokens that stay in place
fn substitute_logged(keys: &ResolvedKeys, text: &str, origin: &Path) -> String {
    for name in format::references(text) {
        if !keys.contains(name) {
            Diagnostic::warn(format!(
                "unknown key token '{}' left in place in '{}'",
                format::token(name),
                origin.display()
            ))
            .emit();
        }
    }
    keys.substitute(text)
}
