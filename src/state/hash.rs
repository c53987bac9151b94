//! Content hash of the calculation engine's source tree

use crate::config::HashRules;
use crate::error::HashError;
use sha2::{Digest, Sha256};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Deterministic SHA-256 over every qualifying file in a directory
#[derive(Debug, Clone, Default)]
pub struct HashEngine {
    rules: HashRules,
}

impl HashEngine {
    pub fn new(rules: HashRules) -> Self {
        Self { rules }
    }

    /// Hash the qualifying files under `root`
    ///
    /// Relative paths are sorted before folding so the result does not depend
    /// on directory enumeration order. Each `(path, file_hash)` pair feeds the
    /// combined hasher, so renames change the result as well as content.
    pub fn compute_directory_hash(&self, root: &Path) -> Result<String, HashError> {
        self.hash_with(root, |path| std::fs::read(path))
    }

    /// Hash `root` reading file contents through `read`; any read failure
    /// aborts without a partial result
    fn hash_with<F>(&self, root: &Path, read: F) -> Result<String, HashError>
    where
        F: Fn(&Path) -> std::io::Result<Vec<u8>>,
    {
        if !root.is_dir() {
            return Err(HashError::MissingRoot(root.to_path_buf()));
        }

        let mut files = self.qualifying_files(root)?;
        if files.is_empty() {
            return Err(HashError::EmptyInput(root.to_path_buf()));
        }
        files.sort_by(|a, b| a.0.cmp(&b.0));

        let mut combined = Sha256::new();
        for (rel_path, abs_path) in &files {
            let content = read(abs_path).map_err(|source| HashError::Io {
                path: abs_path.clone(),
                source,
            })?;
            let file_hash = format!("{:x}", Sha256::digest(&content));

            combined.update(rel_path.as_bytes());
            combined.update([0u8]);
            combined.update(file_hash.as_bytes());
            combined.update([b'\n']);
        }

        let hash = format!("{:x}", combined.finalize());
        tracing::debug!(root = %root.display(), files = files.len(), %hash, "Computed source hash");
        Ok(hash)
    }

    /// Collect `(relative '/'-joined path, absolute path)` for qualifying files
    fn qualifying_files(&self, root: &Path) -> Result<Vec<(String, PathBuf)>, HashError> {
        let mut files = Vec::new();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.is_excluded_dir(e));

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
                HashError::Io { path, source }
            })?;

            if !entry.file_type().is_file() || !self.has_qualifying_extension(entry.path()) {
                continue;
            }

            if let Ok(rel) = entry.path().strip_prefix(root) {
                files.push((normalize_rel_path(rel), entry.path().to_path_buf()));
            }
        }

        Ok(files)
    }

    fn is_excluded_dir(&self, entry: &walkdir::DirEntry) -> bool {
        entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| self.rules.excluded_dirs.iter().any(|d| d == name))
    }

    fn has_qualifying_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.rules.extensions.iter().any(|e| e == ext))
    }
}

fn normalize_rel_path(rel: &Path) -> String {
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
