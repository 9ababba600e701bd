//! Read snapshots of one key's edge set.
//!
//! A [`Snapshot`] owns a connection with an open read transaction. Under WAL,
//! every query on it sees the database exactly as it was when the snapshot
//! was pinned, so a rebuild that commits mid-traversal cannot tear the graph
//! a reader is walking.

use std::collections::HashMap;

use rusqlite::{params, Connection, OptionalExtension};

use super::helpers::{get_count, row_to_document, row_to_edge, DOCUMENT_COLUMNS, EDGE_COLUMNS};
use crate::error::Result;
use crate::graph::EdgeSource;
use crate::types::{DependencyEdge, DocumentMeta, RepoKey};

/// A consistent, read-only view of one `(owner, repo)` key.
///
/// Dropping the snapshot ends its read transaction.
pub struct Snapshot {
    conn: Connection,
    key: RepoKey,
    generation: u64,
    rebuilt_at: Option<String>,
}

impl Snapshot {
    /// Start a read transaction on `conn` and pin it.
    pub(crate) fn begin(conn: Connection, key: RepoKey) -> Result<Self> {
        conn.execute_batch("BEGIN DEFERRED")?;

        // WAL pins the read snapshot at the first read, not at BEGIN
        let current: Option<(i64, String)> = conn
            .query_row(
                "SELECT generation, rebuilt_at FROM edge_generations
                 WHERE owner_id = ?1 AND repo_url = ?2",
                params![key.owner(), key.repo()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let (generation, rebuilt_at) = match current {
            Some((generation, rebuilt_at)) => {
                (u64::try_from(generation).unwrap_or_default(), Some(rebuilt_at))
            }
            None => (0, None),
        };

        Ok(Self {
            conn,
            key,
            generation,
            rebuilt_at,
        })
    }

    /// The key this snapshot reads.
    #[must_use]
    pub fn key(&self) -> &RepoKey {
        &self.key
    }

    /// Edge generation visible to this snapshot (0 if never rebuilt).
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// When the visible generation was committed, as RFC 3339.
    #[must_use]
    pub fn rebuilt_at(&self) -> Option<&str> {
        self.rebuilt_at.as_deref()
    }

    /// The connection carrying the read transaction.
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    /// All edges for the key, ordered by `(source, target)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn edges(&self) -> Result<Vec<DependencyEdge>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EDGE_COLUMNS} FROM file_dependencies
             WHERE owner_id = ?1 AND repo_url = ?2
             ORDER BY source_file, target_file"
        ))?;

        let edges = stmt
            .query_map(params![self.key.owner(), self.key.repo()], row_to_edge)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(edges)
    }

    /// Direct outgoing edges of `source_file`, ordered by target.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn edges_from(&self, source_file: &str) -> Result<Vec<DependencyEdge>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {EDGE_COLUMNS} FROM file_dependencies
             WHERE owner_id = ?1 AND repo_url = ?2 AND source_file = ?3
             ORDER BY target_file"
        ))?;

        let edges = stmt
            .query_map(
                params![self.key.owner(), self.key.repo(), source_file],
                row_to_edge,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(edges)
    }

    /// Number of edges for the key.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn edge_count(&self) -> Result<usize> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM file_dependencies WHERE owner_id = ?1 AND repo_url = ?2",
            params![self.key.owner(), self.key.repo()],
            |row| get_count(row, 0),
        )?;
        Ok(count)
    }

    /// Document metadata for the key, keyed by relative path.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn documents(&self) -> Result<HashMap<String, DocumentMeta>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE owner_id = ?1 AND repo_url = ?2"
        ))?;

        let documents = stmt
            .query_map(params![self.key.owner(), self.key.repo()], row_to_document)?
            .map(|doc| doc.map(|d| (d.relative_path.clone(), d)))
            .collect::<std::result::Result<HashMap<_, _>, _>>()?;

        Ok(documents)
    }
}

impl EdgeSource for Snapshot {
    fn outgoing(&self, file: &str) -> Result<Vec<DependencyEdge>> {
        self.edges_from(file)
    }
}

impl Drop for Snapshot {
    fn drop(&mut self) {
        if let Err(e) = self.conn.execute_batch("ROLLBACK") {
            tracing::debug!(key = %self.key, error = %e, "Failed to end read snapshot");
        }
    }
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("key", &self.key)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
