//! Context build pipeline.
//!
//! ```text
//! identifier ─▶ metadata ─▶ tree listing ─▶ classify ─▶ cap lists ─▶ retrieve ─▶ assemble ─▶ chunk
//!     │             │             │                                    │
//!  Invalid-     Repository-   Structure-                        per-file failure:
//!  Identifier   NotFound      Unavailable                       logged and skipped
//! ```
//!
//! The builder is stateless: every call creates its own snapshot source and
//! returns the document and its chunks to the caller, which owns storage.

use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::assemble::{assemble, AssemblyInput};
use crate::chunk::split_document;
use crate::classify::{Classifier, Role};
use crate::config::{Backend, Config};
use crate::error::{ContextError, SourceError};
use crate::models::{
    ClassifiedFile, ContextChunk, FileEntry, RepositorySnapshot, RetrievedContent,
};
use crate::retrieve::retrieve;
use crate::source::{GithubApiSource, GithubArchiveSource, LocalSource, RepoId, SnapshotSource};

/// Result of a successful build.
#[derive(Debug, Clone)]
pub struct ContextOutput {
    /// `{name}_context`, used to name downloads.
    pub base_filename: String,
    pub document: String,
    /// One chunk holding the whole document unless it exceeds the ceiling.
    pub chunks: Vec<ContextChunk>,
    pub stats: BuildStats,
}

impl ContextOutput {
    pub fn is_chunked(&self) -> bool {
        self.chunks.len() > 1
    }
}

/// Counters reported after a build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Blob entries returned by the tree walk.
    pub listed: usize,
    pub excluded: usize,
    /// Files dropped by per-section file caps.
    pub capped: usize,
    pub included: usize,
    /// Files whose retrieval failed.
    pub skipped: usize,
    pub truncated: usize,
}

pub struct ContextBuilder {
    config: Config,
    classifier: Classifier,
}

impl ContextBuilder {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        config.validate()?;
        let classifier = config.classifier()?;
        Ok(Self { config, classifier })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build the context of a remote repository with the configured backend.
    ///
    /// Blocking: run it off the async runtime.
    pub fn build(&self, identifier: &str) -> Result<ContextOutput, ContextError> {
        let repo = RepoId::parse(identifier)?;
        let not_found = |source: SourceError| ContextError::RepositoryNotFound {
            repo: repo.to_string(),
            source,
        };

        let source: Box<dyn SnapshotSource> = match self.config.source.backend {
            Backend::Api => Box::new(GithubApiSource::new(&self.config.source).map_err(not_found)?),
            Backend::Archive => {
                Box::new(GithubArchiveSource::new(&self.config.source).map_err(not_found)?)
            }
        };

        self.build_from_source(source.as_ref(), &repo, Utc::now())
    }

    /// Build the context of a directory on disk.
    pub fn build_local(&self, root: &Path) -> Result<ContextOutput, ContextError> {
        let source = LocalSource::new(root);
        let repo = source.repo_id();
        self.build_from_source(&source, &repo, Utc::now())
    }

    /// Run the pipeline against any snapshot source.
    pub fn build_from_source(
        &self,
        source: &dyn SnapshotSource,
        repo: &RepoId,
        generated_at: DateTime<Utc>,
    ) -> Result<ContextOutput, ContextError> {
        info!(repo = %repo, "building context");

        let metadata =
            source
                .repository_metadata(repo)
                .map_err(|source| ContextError::RepositoryNotFound {
                    repo: repo.to_string(),
                    source,
                })?;

        let snapshot = RepositorySnapshot {
            owner: repo.owner.clone(),
            name: metadata.name,
            default_branch: metadata.default_branch,
            description: metadata.description,
            language: metadata.language,
            url: source.repository_url(repo),
        };

        let entries = source
            .list_all_files(repo, &snapshot.default_branch)
            .map_err(|source| ContextError::StructureUnavailable {
                repo: repo.to_string(),
                source,
            })?;

        let mut stats = BuildStats::default();

        let (blobs, trees): (Vec<FileEntry>, Vec<FileEntry>) =
            entries.into_iter().partition(|e| e.is_blob());
        let directories: Vec<String> = trees
            .into_iter()
            .map(|e| e.path)
            .filter(|path| !self.classifier.excludes_dir(path))
            .collect();

        let listing: Vec<ClassifiedFile> = blobs
            .into_iter()
            .inspect(|_| stats.listed += 1)
            .map(|entry| {
                let role = self.classifier.classify(&entry.path);
                ClassifiedFile { entry, role }
            })
            .filter(|f| f.role != Role::Excluded)
            .collect();
        stats.excluded = stats.listed - listing.len();

        let selected = self.select_for_retrieval(&listing, &mut stats);

        let mut contents: Vec<RetrievedContent> = Vec::with_capacity(selected.len());
        for file in selected {
            match retrieve(
                source,
                repo,
                &snapshot.default_branch,
                file.path(),
                file.role.clone(),
                &self.config.limits,
            ) {
                Ok(content) => {
                    if content.truncated {
                        stats.truncated += 1;
                    }
                    contents.push(content);
                }
                Err(e) => {
                    warn!(path = %e.path, error = %e.source, "skipping file");
                    stats.skipped += 1;
                }
            }
        }
        stats.included = contents.len();

        let document = assemble(
            &AssemblyInput {
                snapshot: &snapshot,
                listing: &listing,
                directories: &directories,
                contents: &contents,
                generated_at,
            },
            &self.config.output,
        );

        let ceiling = self.config.output.chunk_ceiling_bytes;
        let chunks = if document.len() > ceiling {
            split_document(&document, ceiling)
        } else {
            vec![ContextChunk {
                index: 0,
                text: document.clone(),
            }]
        };

        info!(
            repo = %repo,
            listed = stats.listed,
            included = stats.included,
            skipped = stats.skipped,
            truncated = stats.truncated,
            bytes = document.len(),
            chunks = chunks.len(),
            "context built"
        );

        Ok(ContextOutput {
            base_filename: base_filename(&snapshot.name),
            document,
            chunks,
            stats,
        })
    }

    /// Apply per-section file caps, keeping walk order within each role.
    fn select_for_retrieval<'a>(
        &self,
        listing: &'a [ClassifiedFile],
        stats: &mut BuildStats,
    ) -> Vec<&'a ClassifiedFile> {
        let limits = &self.config.limits;
        let mut docs = 0usize;
        let mut configs = 0usize;
        let mut sources = 0usize;

        let mut selected = Vec::new();
        for file in listing {
            let (count, cap) = match file.role {
                Role::Documentation => (&mut docs, limits.max_documentation_files),
                Role::Configuration => (&mut configs, limits.max_configuration_files),
                Role::Source(_) => (&mut sources, limits.max_source_files),
                Role::Image | Role::Excluded => continue,
            };
            if cap.is_some_and(|cap| *count >= cap) {
                debug!(path = %file.path(), role = file.role.label(), "dropped by file cap");
                stats.capped += 1;
                continue;
            }
            *count += 1;
            selected.push(file);
        }
        selected
    }
}

/// Download base name for a repository: `{name}_context`, with characters
/// unsafe in file names replaced by `_`.
pub fn base_filename(name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let safe = safe.trim_matches('.');
    if safe.is_empty() {
        "repository_context".to_string()
    } else {
        format!("{}_context", safe)
    }
}
