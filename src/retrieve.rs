//! Per-file content retrieval and truncation.
//!
//! Bytes come from a [`SnapshotSource`]. They are decoded lossily as UTF-8 and
//! capped at a character budget that depends on the file's role. A failed
//! fetch is returned as a [`RetrievalFailure`]; callers skip the file.

use crate::classify::Role;
use crate::config::LimitsConfig;
use crate::error::RetrievalFailure;
use crate::models::RetrievedContent;
use crate::source::{RepoId, SnapshotSource};

/// Appended to content cut off at its character cap.
pub const TRUNCATION_MARKER: &str = "\n... (truncated)";

/// Fetch, decode and cap one file.
pub fn retrieve(
    source: &dyn SnapshotSource,
    repo: &RepoId,
    branch: &str,
    path: &str,
    role: Role,
    limits: &LimitsConfig,
) -> Result<RetrievedContent, RetrievalFailure> {
    let bytes = source
        .read_file(repo, path, branch)
        .map_err(|source| RetrievalFailure {
            path: path.to_string(),
            source,
        })?;

    let text = String::from_utf8_lossy(&bytes).into_owned();
    let cap = limits.char_cap(&role);
    let (text, truncated) = truncate_chars(text, cap);

    Ok(RetrievedContent {
        path: path.to_string(),
        role,
        text,
        truncated,
    })
}

/// Keep the first `cap` characters and append [`TRUNCATION_MARKER`] when
/// the text is longer than `cap`. Returns whether truncation happened.
pub fn truncate_chars(mut text: String, cap: usize) -> (String, bool) {
    match text.char_indices().nth(cap) {
        Some((byte_idx, _)) => {
            text.truncate(byte_idx);
            text.push_str(TRUNCATION_MARKER);
            (text, true)
        }
        None => (text, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::FileTypeKey;
    use crate::error::SourceError;
    use crate::models::{FileEntry, RepositoryMetadata};

    struct OneFile(Option<Vec<u8>>);

    impl SnapshotSource for OneFile {
        fn repository_metadata(&self, _repo: &RepoId) -> Result<RepositoryMetadata, SourceError> {
            unreachable!()
        }

        fn list_all_files(
            &self,
            _repo: &RepoId,
            _branch: &str,
        ) -> Result<Vec<FileEntry>, SourceError> {
            unreachable!()
        }

        fn read_file(
            &self,
            _repo: &RepoId,
            path: &str,
            _branch: &str,
        ) -> Result<Vec<u8>, SourceError> {
            self.0
                .clone()
                .ok_or_else(|| SourceError::NotFound(path.to_string()))
        }
    }

    fn repo() -> RepoId {
        RepoId::new("acme", "widgets")
    }

    #[test]
    fn test_truncate_under_cap_untouched() {
        let (text, truncated) = truncate_chars("hello".to_string(), 5);
        assert_eq!(text, "hello");
        assert!(!truncated);
    }

    #[test]
    fn test_truncate_over_cap_keeps_exact_prefix() {
        let original = "abcdefghij".to_string();
        let (text, truncated) = truncate_chars(original.clone(), 4);
        assert!(truncated);
        assert_eq!(text, format!("abcd{}", TRUNCATION_MARKER));
        assert!(text.ends_with(TRUNCATION_MARKER));
        assert_eq!(&text[..text.len() - TRUNCATION_MARKER.len()], &original[..4]);
    }

    #[test]
    fn test_truncate_counts_characters_not_bytes() {
        let (text, truncated) = truncate_chars("ééééé".to_string(), 3);
        assert!(truncated);
        assert_eq!(text, format!("ééé{}", TRUNCATION_MARKER));

        let (text, truncated) = truncate_chars("ééé".to_string(), 3);
        assert!(!truncated);
        assert_eq!(text, "ééé");
    }

    #[test]
    fn test_retrieve_decodes_lossily() {
        let source = OneFile(Some(vec![b'o', b'k', 0xff, 0xfe, b'!']));
        let content = retrieve(
            &source,
            &repo(),
            "main",
            "src/a.py",
            Role::Source(FileTypeKey::new("py")),
            &LimitsConfig::default(),
        )
        .unwrap();
        assert_eq!(content.text, "ok\u{FFFD}\u{FFFD}!");
        assert!(!content.truncated);
    }

    #[test]
    fn test_retrieve_applies_role_cap() {
        let limits = LimitsConfig::default();
        let body = "x".repeat(limits.source_chars + 10);
        let source = OneFile(Some(body.into_bytes()));
        let content = retrieve(
            &source,
            &repo(),
            "main",
            "src/a.py",
            Role::Source(FileTypeKey::new("py")),
            &limits,
        )
        .unwrap();
        assert!(content.truncated);
        assert_eq!(
            content.text.len(),
            limits.source_chars + TRUNCATION_MARKER.len()
        );
    }

    #[test]
    fn test_retrieve_failure_names_path() {
        let source = OneFile(None);
        let err = retrieve(
            &source,
            &repo(),
            "main",
            "missing.md",
            Role::Documentation,
            &LimitsConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.path, "missing.md");
        assert!(err.to_string().contains("missing.md"));
    }
}
