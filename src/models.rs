//! Core data models used throughout the engine.
//!
//! These types represent the snapshot, file entries, retrieved content and
//! chunks that flow through the assembly pipeline.

use crate::classify::Role;

/// Repository metadata as reported by a snapshot source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryMetadata {
    /// Repository display name (may differ in case from the identifier).
    pub name: String,
    pub default_branch: String,
    pub description: Option<String>,
    pub language: Option<String>,
}

/// A repository pinned at one revision. Created once per build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySnapshot {
    pub owner: String,
    pub name: String,
    pub default_branch: String,
    pub description: Option<String>,
    pub language: Option<String>,
    /// Web URL or local path identifying the repository.
    pub url: String,
}

/// Kind tag of a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Blob,
    Tree,
}

/// A path in the repository, slash-separated and relative to the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: String,
    pub kind: EntryKind,
}

impl FileEntry {
    pub fn blob(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Blob,
        }
    }

    pub fn tree(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Tree,
        }
    }

    pub fn is_blob(&self) -> bool {
        self.kind == EntryKind::Blob
    }
}

/// A file entry annotated with its role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedFile {
    pub entry: FileEntry,
    pub role: Role,
}

impl ClassifiedFile {
    pub fn path(&self) -> &str {
        &self.entry.path
    }
}

/// Decoded, possibly truncated, content of one included file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedContent {
    pub path: String,
    pub role: Role,
    pub text: String,
    pub truncated: bool,
}

/// A line-aligned slice of an assembled document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextChunk {
    /// Zero-based position in the chunk sequence.
    pub index: usize,
    pub text: String,
}

impl ContextChunk {
    pub fn byte_len(&self) -> usize {
        self.text.len()
    }
}
