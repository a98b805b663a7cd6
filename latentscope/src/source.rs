// Copyright 2025 the Latentscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::collections::HashMap;
use std::path::PathBuf;

use latentscope_dataset::{LoadError, Tensor};

/// Where dataset documents come from.
pub trait DatasetSource {
    /// Returns the text of the document at `path`.
    fn fetch(&self, path: &str) -> Result<String, LoadError>;

    /// Fetches the document at `path` and decodes it as a tensor.
    fn load_tensor(&self, path: &str) -> Result<Tensor, LoadError> {
        Tensor::from_json_str(&self.fetch(path)?)
    }
}

/// Reads dataset documents relative to a root directory.
#[derive(Clone, Debug)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    /// Creates a source rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl DatasetSource for DirSource {
    fn fetch(&self, path: &str) -> Result<String, LoadError> {
        std::fs::read_to_string(self.root.join(path)).map_err(|err| LoadError::Fetch {
            path: path.to_owned(),
            message: err.to_string(),
        })
    }
}

/// Serves documents that are already in memory.
///
/// Useful for hosts that fetch over the network themselves.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    documents: HashMap<String, String>,
}

impl MemorySource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a document, replacing any previous one at `path`.
    #[must_use]
    pub fn with(mut self, path: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }

    /// Adds a document, replacing any previous one at `path`.
    pub fn insert(&mut self, path: impl Into<String>, text: impl Into<String>) {
        self.documents.insert(path.into(), text.into());
    }
}

impl DatasetSource for MemorySource {
    fn fetch(&self, path: &str) -> Result<String, LoadError> {
        self.documents
            .get(path)
            .cloned()
            .ok_or_else(|| LoadError::Fetch {
                path: path.to_owned(),
                message: "no such document".into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use latentscope_dataset::LoadError;

    use super::{DatasetSource, DirSource, MemorySource};

    #[test]
    fn memory_source_serves_tensors() {
        let source = MemorySource::new().with("y.json", "[1, 2, 3]");
        let t = source.load_tensor("y.json").unwrap();
        assert_eq!(t.dims(), [3]);
        assert!(matches!(
            source.load_tensor("x.json"),
            Err(LoadError::Fetch { .. })
        ));
    }

    #[test]
    fn dir_source_reads_files() {
        let dir = std::env::temp_dir().join(format!("latentscope-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("x.json"), "[[0.5, 1.0]]").unwrap();

        let source = DirSource::new(&dir);
        let t = source.load_tensor("x.json").unwrap();
        assert_eq!(t.dims(), [1, 2]);
        assert!(matches!(
            source.fetch("missing.json"),
            Err(LoadError::Fetch { .. })
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
