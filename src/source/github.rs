//! GitHub REST API backend.
//!
//! Three endpoints are used:
//!
//! - `GET /repos/{owner}/{name}`: metadata (default branch, description,
//!   primary language).
//! - `GET /repos/{owner}/{name}/git/trees/{branch}?recursive=1`: the whole
//!   file tree in one call.
//! - `GET /repos/{owner}/{name}/contents/{path}?ref={branch}`: file bytes,
//!   base64-encoded. Files too large for inline content fall back to the
//!   `download_url` the API returns alongside.
//!
//! Requests are unauthenticated.

use base64::Engine;
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{check_status, http_client, RepoId, SnapshotSource};
use crate::config::SourceConfig;
use crate::error::SourceError;
use crate::models::{EntryKind, FileEntry, RepositoryMetadata};

pub struct GithubApiSource {
    client: reqwest::blocking::Client,
    api_base: String,
    web_base: String,
}

#[derive(Debug, Deserialize)]
struct RepoResponse {
    name: String,
    #[serde(default)]
    default_branch: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    tree: Vec<TreeItem>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct TreeItem {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    download_url: Option<String>,
}

impl GithubApiSource {
    pub fn new(config: &SourceConfig) -> Result<Self, SourceError> {
        Ok(Self {
            client: http_client(config)?,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            web_base: config.web_base.trim_end_matches('/').to_string(),
        })
    }

    /// API URL from `api_base` plus path segments. Each segment is
    /// percent-encoded, so `#`, `?` and `%` in file names stay in the path.
    fn endpoint<'s>(
        &self,
        segments: impl IntoIterator<Item = &'s str>,
        query: &[(&str, &str)],
    ) -> Result<Url, SourceError> {
        let mut url = Url::parse(&self.api_base).map_err(|e| {
            SourceError::Malformed(format!("invalid api_base {}: {}", self.api_base, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| SourceError::Malformed(format!("api_base {} cannot hold a path", self.api_base)))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn get(&self, url: Url) -> Result<reqwest::blocking::Response, SourceError> {
        debug!(url = %url, "GET");
        let response = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .send()?;
        check_status(response)
    }
}

impl SnapshotSource for GithubApiSource {
    fn repository_metadata(&self, repo: &RepoId) -> Result<RepositoryMetadata, SourceError> {
        let url = self.endpoint(["repos", repo.owner.as_str(), repo.name.as_str()], &[])?;
        let body: RepoResponse = self.get(url)?.json()?;

        Ok(RepositoryMetadata {
            name: body.name,
            default_branch: body.default_branch.unwrap_or_else(|| "main".to_string()),
            description: body.description.filter(|d| !d.trim().is_empty()),
            language: body.language,
        })
    }

    fn list_all_files(&self, repo: &RepoId, branch: &str) -> Result<Vec<FileEntry>, SourceError> {
        let url = self.endpoint(
            ["repos", repo.owner.as_str(), repo.name.as_str(), "git", "trees", branch],
            &[("recursive", "1")],
        )?;
        let body: TreeResponse = self.get(url)?.json()?;

        if body.truncated {
            warn!(repo = %repo, "tree listing was truncated by the API; some files are missing");
        }

        let entries = body
            .tree
            .into_iter()
            .filter_map(|item| {
                let kind = match item.kind.as_str() {
                    "blob" => EntryKind::Blob,
                    "tree" => EntryKind::Tree,
                    // submodule commits and anything else
                    _ => return None,
                };
                Some(FileEntry {
                    path: item.path,
                    kind,
                })
            })
            .collect();
        Ok(entries)
    }

    fn read_file(&self, repo: &RepoId, path: &str, branch: &str) -> Result<Vec<u8>, SourceError> {
        let prefix = ["repos", repo.owner.as_str(), repo.name.as_str(), "contents"];
        let url = self.endpoint(
            prefix.into_iter().chain(path.split('/')),
            &[("ref", branch)],
        )?;
        let body: ContentsResponse = self.get(url)?.json()?;

        match (body.encoding.as_deref(), body.content) {
            (Some("base64"), Some(content)) if !content.is_empty() => {
                // The API wraps base64 at 60 columns.
                let cleaned: String = content.split_whitespace().collect();
                Ok(base64::engine::general_purpose::STANDARD.decode(cleaned)?)
            }
            _ => match body.download_url {
                Some(raw_url) => {
                    let bytes = check_status(self.client.get(&raw_url).send()?)?.bytes()?;
                    Ok(bytes.to_vec())
                }
                None => Err(SourceError::Malformed(format!(
                    "no inline content or download_url for {}",
                    path
                ))),
            },
        }
    }

    fn repository_url(&self, repo: &RepoId) -> String {
        format!("{}/{}/{}", self.web_base, repo.owner, repo.name)
    }
}
