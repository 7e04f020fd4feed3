//! Snapshot sources: where repository metadata, file listings and file bytes
//! come from.
//!
//! | Backend | Listing | Contents |
//! |---------|---------|----------|
//! | [`GithubApiSource`] | recursive git tree API | contents API (base64) |
//! | [`GithubArchiveSource`] | walk of the extracted branch zip | local read |
//! | [`LocalSource`] | walk of a directory on disk | local read |
//!
//! All backends are blocking; the pipeline is synchronous and fetches files
//! one at a time.

mod archive;
mod github;
mod local;

pub use archive::GithubArchiveSource;
pub use github::GithubApiSource;
pub use local::LocalSource;

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

use crate::config::SourceConfig;
use crate::error::{ContextError, SourceError};
use crate::models::{FileEntry, RepositoryMetadata};

/// Capability shared by every backend.
pub trait SnapshotSource {
    /// Fetch repository metadata. Failure means the repository is unusable.
    fn repository_metadata(&self, repo: &RepoId) -> Result<RepositoryMetadata, SourceError>;

    /// List every entry of the tree at `branch`.
    fn list_all_files(&self, repo: &RepoId, branch: &str) -> Result<Vec<FileEntry>, SourceError>;

    /// Raw bytes of one file at `branch`.
    fn read_file(&self, repo: &RepoId, path: &str, branch: &str) -> Result<Vec<u8>, SourceError>;

    /// Web URL (or local path) rendered in the document header.
    fn repository_url(&self, repo: &RepoId) -> String {
        format!("https://github.com/{}", repo)
    }
}

/// `owner/name` pair identifying a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse `owner/name` or a `https://github.com/owner/name` URL
    /// (optionally ending in `/` or `.git`).
    pub fn parse(input: &str) -> Result<Self, ContextError> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            Regex::new(
                r"^(?:https?://(?:www\.)?github\.com/)?([A-Za-z0-9_.\-]+)/([A-Za-z0-9_.\-]+?)(?:\.git)?/?$",
            )
            .expect("repository identifier pattern is valid")
        });

        let trimmed = input.trim();
        let caps = pattern
            .captures(trimmed)
            .ok_or_else(|| ContextError::InvalidIdentifier(input.to_string()))?;

        let owner = &caps[1];
        let name = &caps[2];
        if is_dot_segment(owner) || is_dot_segment(name) {
            return Err(ContextError::InvalidIdentifier(input.to_string()));
        }
        Ok(Self::new(owner, name))
    }
}

fn is_dot_segment(s: &str) -> bool {
    s.chars().all(|c| c == '.')
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Blocking HTTP client shared by the remote backends. Every request made
/// through it is bounded by `timeout_secs`.
pub(crate) fn http_client(
    config: &SourceConfig,
) -> Result<reqwest::blocking::Client, SourceError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Map a non-success response to [`SourceError::Status`].
pub(crate) fn check_status(
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(SourceError::Status {
            status: status.as_u16(),
            url: response.url().to_string(),
        })
    }
}
