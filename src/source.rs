//! Source files on disk
//!
//! Loading is the only place the compiler touches the file system for input;
//! the file handle lives exactly as long as one [`SourceFile::load`] call.

use crate::common::Mark;
use miette::Diagnostic;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// File and import errors
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum FileError {
    #[error("File not found: {}", path.display())]
    #[diagnostic(code(file::not_found))]
    NotFound { path: PathBuf },

    #[error("File encoding was not UTF-8: {}", path.display())]
    #[diagnostic(code(file::bad_encoding))]
    BadEncoding { path: PathBuf },

    #[error("{mark} -- could not import '{name}': no library path contains it")]
    #[diagnostic(
        code(file::import_not_found),
        help("add the directory containing the module with `-L <dir>`")
    )]
    ImportNotFound { name: String, mark: Mark },

    #[error("{mark} -- cyclic import: {}", chain.join(" -> "))]
    #[diagnostic(code(file::cyclic_import))]
    CyclicImport { chain: Vec<String>, mark: Mark },

    #[error("Could not write {}: {reason}", path.display())]
    #[diagnostic(code(file::write_failed))]
    WriteFailed { path: PathBuf, reason: String },
}

/// Loaded source text together with the identity of the file it came from
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: Arc<str>,
    pub path: Option<PathBuf>,
    pub content: Arc<str>,
}

impl SourceFile {
    /// In-memory source, used by tests and the library entry point
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
            path: None,
            content: Arc::from(content.into()),
        }
    }

    /// Read a UTF-8 source file
    pub fn load(path: &Path) -> Result<Self, FileError> {
        let bytes = std::fs::read(path).map_err(|_| FileError::NotFound {
            path: path.to_path_buf(),
        })?;
        let text = String::from_utf8(bytes).map_err(|_| FileError::BadEncoding {
            path: path.to_path_buf(),
        })?;

        Ok(Self {
            name: Arc::from(path.to_string_lossy().as_ref()),
            path: Some(path.to_path_buf()),
            content: Arc::from(text),
        })
    }

    /// Check that a file exists before it is queued for compilation
    pub fn validate(path: &Path) -> Result<(), FileError> {
        if path.is_file() {
            Ok(())
        } else {
            Err(FileError::NotFound {
                path: path.to_path_buf(),
            })
        }
    }

    /// Module name derived from the file stem, e.g. `lib/io.bolt` -> `io`
    pub fn module_name(&self) -> String {
        match &self.path {
            Some(path) => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.name.to_string()),
            None => self.name.to_string(),
        }
    }

    pub fn mark(&self, line: u32, column: u32) -> Mark {
        Mark::new(self.name.clone(), line, column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_not_found() {
        let path = Path::new("/definitely/not/here.bolt");
        assert_eq!(
            SourceFile::load(path).unwrap_err(),
            FileError::NotFound {
                path: path.to_path_buf()
            }
        );
        assert!(SourceFile::validate(path).is_err());
    }

    #[test]
    fn test_module_name_from_memory_source() {
        let source = SourceFile::new("main", "func<Int> main() { return 0 }");
        assert_eq!(source.module_name(), "main");
    }
}
