use std::path::{Component, Path, PathBuf};

use super::{RepoId, SnapshotSource};
use crate::error::SourceError;
use crate::models::{FileEntry, RepositoryMetadata};
use crate::walk::walk_directory;

/// A repository checkout already on disk.
pub struct LocalSource {
    root: PathBuf,
}

impl LocalSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Identifier derived from the directory name, owner `local`.
    pub fn repo_id(&self) -> RepoId {
        let name = self
            .root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "repository".to_string());
        RepoId::new("local", name)
    }
}

/// Resolve a slash-separated relative path under `root`, refusing anything
/// that would escape it.
pub(crate) fn resolve_under(root: &Path, rel: &str) -> Result<PathBuf, SourceError> {
    let rel_path = Path::new(rel);
    if rel_path
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(SourceError::NotFound(rel.to_string()));
    }
    Ok(root.join(rel_path))
}

/// Branch named by `.git/HEAD`, when the directory is a git checkout.
fn checked_out_branch(root: &Path) -> Option<String> {
    let head = std::fs::read_to_string(root.join(".git").join("HEAD")).ok()?;
    head.trim()
        .strip_prefix("ref: refs/heads/")
        .map(|b| b.to_string())
}

impl SnapshotSource for LocalSource {
    fn repository_metadata(&self, repo: &RepoId) -> Result<RepositoryMetadata, SourceError> {
        if !self.root.is_dir() {
            return Err(SourceError::NotFound(self.root.display().to_string()));
        }
        Ok(RepositoryMetadata {
            name: repo.name.clone(),
            default_branch: checked_out_branch(&self.root).unwrap_or_else(|| "HEAD".to_string()),
            description: None,
            language: None,
        })
    }

    fn list_all_files(&self, _repo: &RepoId, _branch: &str) -> Result<Vec<FileEntry>, SourceError> {
        walk_directory(&self.root)
    }

    fn read_file(&self, _repo: &RepoId, path: &str, _branch: &str) -> Result<Vec<u8>, SourceError> {
        Ok(std::fs::read(resolve_under(&self.root, path)?)?)
    }

    fn repository_url(&self, _repo: &RepoId) -> String {
        self.root.display().to_string()
    }
}
