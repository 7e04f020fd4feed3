//! Per-session storage of generated chunks.
//!
//! The engine never touches this store. The HTTP layer puts the chunks of
//! the latest build under the caller's session id and serves them back by
//! index. A new build for the same session overwrites the entry; entries
//! live as long as the process.

use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;

use crate::chunk::chunk_filename;
use crate::models::ContextChunk;

/// What a session remembers about its latest build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredContext {
    pub chunks: Vec<ContextChunk>,
    pub base_filename: String,
}

/// Key/value store of [`StoredContext`] by session id.
pub trait SessionStore: Send + Sync {
    /// Replace whatever the session held before.
    fn put(&self, session_id: &str, context: StoredContext);

    fn get(&self, session_id: &str) -> Option<StoredContext>;
}

/// Process-local [`SessionStore`].
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    inner: RwLock<HashMap<String, StoredContext>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn put(&self, session_id: &str, context: StoredContext) {
        let mut map = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        map.insert(session_id.to_string(), context);
    }

    fn get(&self, session_id: &str) -> Option<StoredContext> {
        let map = self
            .inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        map.get(session_id).cloned()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DownloadError {
    #[error("no generated context for this session")]
    UnknownSession,

    #[error("chunk index {index} out of range (session has {len} chunks)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// A chunk ready to be sent as an attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDownload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Look up chunk `index` (zero-based) of the session's latest build.
pub fn download_chunk(
    store: &dyn SessionStore,
    session_id: &str,
    index: usize,
) -> Result<ChunkDownload, DownloadError> {
    let stored = store
        .get(session_id)
        .ok_or(DownloadError::UnknownSession)?;
    let len = stored.chunks.len();
    let chunk = stored
        .chunks
        .into_iter()
        .nth(index)
        .ok_or(DownloadError::IndexOutOfRange { index, len })?;

    Ok(ChunkDownload {
        filename: chunk_filename(&stored.base_filename, index),
        bytes: chunk.text.into_bytes(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(texts: &[&str]) -> StoredContext {
        StoredContext {
            chunks: texts
                .iter()
                .enumerate()
                .map(|(index, t)| ContextChunk {
                    index,
                    text: t.to_string(),
                })
                .collect(),
            base_filename: "widgets_context".to_string(),
        }
    }

    #[test]
    fn test_download_by_index() {
        let store = MemorySessionStore::new();
        store.put("s1", stored(&["first\n", "second\n"]));

        let dl = download_chunk(&store, "s1", 1).unwrap();
        assert_eq!(dl.filename, "widgets_context_2.txt");
        assert_eq!(dl.bytes, b"second\n".to_vec());
    }

    #[test]
    fn test_out_of_range_index() {
        let store = MemorySessionStore::new();
        store.put("s1", stored(&["only\n"]));
        assert_eq!(
            download_chunk(&store, "s1", 1).unwrap_err(),
            DownloadError::IndexOutOfRange { index: 1, len: 1 }
        );
    }

    #[test]
    fn test_unknown_session() {
        let store = MemorySessionStore::new();
        assert_eq!(
            download_chunk(&store, "nobody", 0).unwrap_err(),
            DownloadError::UnknownSession
        );
    }

    #[test]
    fn test_put_overwrites_wholesale() {
        let store = MemorySessionStore::new();
        store.put("s1", stored(&["a\n", "b\n", "c\n"]));
        store.put("s1", stored(&["z\n"]));
        assert_eq!(store.get("s1").unwrap().chunks.len(), 1);
        assert!(download_chunk(&store, "s1", 2).is_err());
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = MemorySessionStore::new();
        store.put("s1", stored(&["one\n"]));
        store.put("s2", stored(&["two\n"]));
        assert_eq!(download_chunk(&store, "s1", 0).unwrap().bytes, b"one\n".to_vec());
        assert_eq!(download_chunk(&store, "s2", 0).unwrap().bytes, b"two\n".to_vec());
    }
}
