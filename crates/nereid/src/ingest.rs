//! Reading indexer output.
//!
//! The indexer hand-off format is JSON Lines: one [`DocumentRecord`] per line.

use std::io::BufRead;

use crate::error::{Error, Result};
use crate::types::DocumentRecord;

/// Parse one document record per line from `reader`.
///
/// Blank lines are skipped.
///
/// # Errors
///
/// Returns [`Error::MalformedRecord`] with the 1-based line number for the
/// first line that is not a valid record, or [`Error::Io`] if reading fails.
pub fn read_documents_jsonl<R: BufRead>(reader: R) -> Result<Vec<DocumentRecord>> {
    let mut documents = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|source| Error::MalformedRecord {
            line: idx + 1,
            source,
        })?;
        documents.push(record);
    }

    tracing::debug!(documents = documents.len(), "Read document records");
    Ok(documents)
}
