//! Line-boundary document chunker.
//!
//! Splits an assembled document into [`ContextChunk`]s whose byte length
//! stays under a ceiling. Splitting happens only between lines (each line
//! keeps its `\n`), so concatenating the chunks in order reproduces the
//! document byte for byte.
//!
//! A single line longer than the ceiling is never cut; it becomes its own
//! oversized chunk.

use crate::models::ContextChunk;

/// Split `text` into line-aligned chunks of at most `ceiling_bytes` bytes.
/// Returns no chunks for an empty document.
pub fn split_document(text: &str, ceiling_bytes: usize) -> Vec<ContextChunk> {
    let mut chunks = Vec::new();
    let mut current_buf = String::new();

    for line in text.split_inclusive('\n') {
        // If adding this line would exceed the ceiling, flush current buffer
        if !current_buf.is_empty() && current_buf.len() + line.len() > ceiling_bytes {
            push_chunk(&mut chunks, std::mem::take(&mut current_buf));
        }
        current_buf.push_str(line);
    }

    // Flush remaining
    if !current_buf.is_empty() {
        push_chunk(&mut chunks, current_buf);
    }

    chunks
}

fn push_chunk(chunks: &mut Vec<ContextChunk>, text: String) {
    chunks.push(ContextChunk {
        index: chunks.len(),
        text,
    });
}

/// Download name of chunk `index` (zero-based): `{base}_{index + 1}.txt`.
pub fn chunk_filename(base: &str, index: usize) -> String {
    format!("{}_{}.txt", base, index + 1)
}
