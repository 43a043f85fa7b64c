//! Retrieval of program text for `load`, `join` and `open`.
//!
//! The engine never reaches out on its own: hosts hand in a
//! [`SourceLoader`] through [`EngineOptions`](crate::EngineOptions). Any
//! closure `Fn(&str) -> Result<String, E>` is a loader, and [`FileLoader`]
//! serves addresses as paths below a root directory.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    Rejected(String),
}

/// Maps an address to program text.
pub trait SourceLoader: Send + Sync {
    fn fetch(&self, address: &str) -> Result<String, LoadError>;
}

impl<F, E> SourceLoader for F
where
    F: Fn(&str) -> Result<String, E> + Send + Sync,
    E: fmt::Display,
{
    fn fetch(&self, address: &str) -> Result<String, LoadError> {
        self(address).map_err(|error| LoadError::Rejected(error.to_string()))
    }
}

/// Reads addresses as file paths relative to `root`.
#[derive(Debug, Clone, Default)]
pub struct FileLoader {
    root: PathBuf,
}

impl FileLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl SourceLoader for FileLoader {
    fn fetch(&self, address: &str) -> Result<String, LoadError> {
        let path = self.root.join(address);
        fs::read_to_string(&path).map_err(|source| LoadError::Io { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_closure_loader() {
        let library: HashMap<&str, &str> = [("lib", "X = 20")].into_iter().collect();
        let loader = move |address: &str| {
            library
                .get(address)
                .map(|source| source.to_string())
                .ok_or_else(|| format!("no program at '{}'", address))
        };

        assert_eq!(loader.fetch("lib").unwrap(), "X = 20");
        let err = loader.fetch("missing").unwrap_err();
        assert_eq!(err.to_string(), "no program at 'missing'");
    }

    #[test]
    fn test_file_loader_reads_below_root() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("algorithm.kat"), "X = 20").unwrap();

        let loader = FileLoader::new(dir.path());
        assert_eq!(loader.fetch("algorithm.kat").unwrap(), "X = 20");
        assert!(matches!(
            loader.fetch("absent.kat"),
            Err(LoadError::Io { .. })
        ));
    }
}
