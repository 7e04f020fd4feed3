//! GitHub branch-archive backend.
//!
//! Downloads `{web_base}/{owner}/{name}/archive/refs/heads/{branch}.zip`,
//! trying each candidate branch in turn (`main`, then `master`), and
//! extracts it into a temporary directory owned by the source. The archive
//! carries no metadata beyond the branch, so description and language are
//! absent. The temporary directory is removed when the source is dropped.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::TempDir;
use tracing::{debug, info};

use super::local::resolve_under;
use super::{check_status, http_client, RepoId, SnapshotSource};
use crate::config::SourceConfig;
use crate::error::SourceError;
use crate::models::{FileEntry, RepositoryMetadata};
use crate::walk::walk_directory;

/// Branches tried, in order, when downloading an archive.
pub const CANDIDATE_BRANCHES: &[&str] = &["main", "master"];

pub struct GithubArchiveSource {
    client: reqwest::blocking::Client,
    web_base: String,
    extracted: Mutex<Option<Extracted>>,
}

struct Extracted {
    // Held for its Drop; removes the extraction directory.
    _dir: TempDir,
    root: PathBuf,
    branch: String,
}

impl GithubArchiveSource {
    pub fn new(config: &SourceConfig) -> Result<Self, SourceError> {
        Ok(Self {
            client: http_client(config)?,
            web_base: config.web_base.trim_end_matches('/').to_string(),
            extracted: Mutex::new(None),
        })
    }

    /// Download and extract the first candidate branch that exists.
    /// Returns the extracted root and branch; later calls reuse them.
    fn ensure_extracted(&self, repo: &RepoId) -> Result<(PathBuf, String), SourceError> {
        let mut guard = self
            .extracted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(extracted) = guard.as_ref() {
            return Ok((extracted.root.clone(), extracted.branch.clone()));
        }

        let mut last_err = SourceError::NotFound(format!("no archive branch for {}", repo));
        for branch in CANDIDATE_BRANCHES {
            let url = format!(
                "{}/{}/{}/archive/refs/heads/{}.zip",
                self.web_base, repo.owner, repo.name, branch
            );
            debug!(url = %url, "downloading archive");
            let bytes = match self
                .client
                .get(&url)
                .send()
                .map_err(SourceError::from)
                .and_then(check_status)
            {
                Ok(response) => response.bytes()?,
                Err(e) => {
                    debug!(branch, error = %e, "archive branch unavailable");
                    last_err = e;
                    continue;
                }
            };

            let dir = TempDir::new()?;
            extract_zip(&bytes, dir.path())?;
            let root = archive_root(dir.path())?;
            info!(repo = %repo, branch, bytes = bytes.len(), "archive extracted");

            let result = (root.clone(), branch.to_string());
            *guard = Some(Extracted {
                _dir: dir,
                root,
                branch: branch.to_string(),
            });
            return Ok(result);
        }
        Err(last_err)
    }
}

fn extract_zip(bytes: &[u8], dest: &Path) -> Result<(), SourceError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    archive.extract(dest)?;
    Ok(())
}

/// GitHub archives wrap everything in a single `{name}-{branch}/` folder.
fn archive_root(dir: &Path) -> Result<PathBuf, SourceError> {
    let mut children = std::fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    if children.len() == 1 && children[0].file_type()?.is_dir() {
        if let Some(only) = children.pop() {
            return Ok(only.path());
        }
    }
    Ok(dir.to_path_buf())
}

impl SnapshotSource for GithubArchiveSource {
    fn repository_metadata(&self, repo: &RepoId) -> Result<RepositoryMetadata, SourceError> {
        let (_, branch) = self.ensure_extracted(repo)?;
        Ok(RepositoryMetadata {
            name: repo.name.clone(),
            default_branch: branch,
            description: None,
            language: None,
        })
    }

    fn list_all_files(&self, repo: &RepoId, _branch: &str) -> Result<Vec<FileEntry>, SourceError> {
        let (root, _) = self.ensure_extracted(repo)?;
        walk_directory(&root)
    }

    fn read_file(&self, repo: &RepoId, path: &str, _branch: &str) -> Result<Vec<u8>, SourceError> {
        let (root, _) = self.ensure_extracted(repo)?;
        Ok(std::fs::read(resolve_under(&root, path)?)?)
    }

    fn repository_url(&self, repo: &RepoId) -> String {
        format!("{}/{}/{}", self.web_base, repo.owner, repo.name)
    }
}
