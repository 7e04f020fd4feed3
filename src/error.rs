//! Error types for the context assembly engine.
//!
//! Only three failures abort a build ([`ContextError`]). Everything that goes
//! wrong for a single file is a [`RetrievalFailure`], which the pipeline logs
//! and skips.

use thiserror::Error;

/// Failures that abort a context build. No document is produced.
#[derive(Debug, Error)]
pub enum ContextError {
    /// The repository reference is not of the `owner/name` shape.
    #[error("invalid repository identifier '{0}': expected owner/name or https://github.com/owner/name")]
    InvalidIdentifier(String),

    /// Metadata fetch failed (not found, private, or rate-limited).
    #[error("repository {repo} not found or private: {source}")]
    RepositoryNotFound {
        repo: String,
        #[source]
        source: SourceError,
    },

    /// Tree listing failed after metadata succeeded.
    #[error("file structure of {repo} is unavailable: {source}")]
    StructureUnavailable {
        repo: String,
        #[source]
        source: SourceError,
    },
}

/// Errors raised by a [`SnapshotSource`](crate::source::SnapshotSource) backend.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Upstream answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Transport failure, including timeouts.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Local read failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Downloaded archive could not be opened or extracted.
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Contents payload carried invalid base64.
    #[error("invalid base64 content: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Response was well-formed HTTP but not the shape we expected.
    #[error("unexpected response: {0}")]
    Malformed(String),

    /// Requested path or revision does not exist in the snapshot.
    #[error("not found: {0}")]
    NotFound(String),
}

/// A single file could not be fetched. Recovered by omitting the file.
#[derive(Debug, Error)]
#[error("failed to retrieve {path}: {source}")]
pub struct RetrievalFailure {
    pub path: String,
    #[source]
    pub source: SourceError,
}
