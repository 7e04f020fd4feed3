//! Local directory tree walker.
//!
//! Produces [`FileEntry`]s for every directory and file under a root, in a
//! reproducible order (siblings sorted by name). Hidden directories and
//! dependency/build directories are pruned during traversal, so their
//! contents are never visited at any depth.

use std::path::Path;
use walkdir::{DirEntry, WalkDir};

use crate::error::SourceError;
use crate::models::FileEntry;

/// Directory names never descended into.
pub const PRUNED_DIRS: &[&str] = &[
    "node_modules",
    "__pycache__",
    "venv",
    "env",
    "target",
    "dist",
    "build",
    "bower_components",
    "vendor",
];

/// Walk `root` and return entries relative to it, slash-separated.
pub fn walk_directory(root: &Path) -> Result<Vec<FileEntry>, SourceError> {
    if !root.is_dir() {
        return Err(SourceError::NotFound(format!(
            "directory {}",
            root.display()
        )));
    }

    let mut entries = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_pruned(e));

    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.depth() == 0 {
            continue;
        }

        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let rel_str = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let file_type = entry.file_type();
        if file_type.is_dir() {
            entries.push(FileEntry::tree(rel_str));
        } else if file_type.is_file() {
            entries.push(FileEntry::blob(rel_str));
        }
        // symlinks are skipped
    }

    Ok(entries)
}

fn is_pruned(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    let name: &str = &name;
    name.starts_with('.') || PRUNED_DIRS.contains(&name)
}
