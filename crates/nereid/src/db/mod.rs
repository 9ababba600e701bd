//! `SQLite` storage layer for Nereid.
//!
//! One database holds both the occurrence store (written by the external
//! indexer hand-off) and the edge store (written only by rebuilds). See the
//! `graph` module for the traversal and assembly code built on top of it.
//!
//! ## Module Structure
//!
//! - `schema` - Database schema (DDL)
//! - `helpers` - Row conversion and parsing utilities
//! - `locks` - Per-key rebuild serialization
//! - `snapshot` - Read transactions pinned to one edge generation
//! - `documents` - Occurrence store operations
//! - `file_deps` - Edge extraction and the atomic edge swap
//!
//! ## Connections
//!
//! `Store` does not keep a connection open. Each operation opens its own, so
//! readers run in parallel under WAL and a rebuild never waits behind a
//! long-running traversal. Operational connections are opened without the
//! create flag: a database file that has disappeared is reported as
//! unavailable rather than silently recreated empty.

mod documents;
mod file_deps;
mod helpers;
mod locks;
mod schema;
mod snapshot;

pub use snapshot::Snapshot;

use std::path::{Path, PathBuf};
use std::sync::PoisonError;
use std::time::Duration;

use rusqlite::{params, Connection, OpenFlags, Transaction, TransactionBehavior};

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use crate::types::RepoKey;
use helpers::get_count;
use locks::KeyLocks;
use schema::SCHEMA;

/// What a committed rebuild produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RebuildOutcome {
    /// Edges removed from the previous generation
    pub removed: usize,
    /// Edges in the new generation
    pub edges: usize,
    /// The new generation number
    pub generation: u64,
}

/// Handle to the Nereid database.
#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    busy_timeout: Duration,
    rebuild_locks: KeyLocks,
}

impl Store {
    /// Open or create the database and apply the schema.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageUnavailable`] if the file cannot be created or
    /// opened, and [`Error::Io`] if its parent directory cannot be created.
    pub fn open(path: &Path, config: &StorageConfig) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).map_err(Error::StorageUnavailable)?;

        // WAL is persistent in the file; later connections inherit it
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;

        tracing::debug!(path = %path.display(), "Opened dependency store");

        Ok(Self {
            path: path.to_path_buf(),
            busy_timeout: Duration::from_millis(config.busy_timeout_ms),
            rebuild_locks: KeyLocks::default(),
        })
    }

    /// Path of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a fresh operational connection.
    ///
    /// Every failure here means the store cannot be reached, whatever the
    /// underlying `SQLite` code.
    pub(crate) fn connect(&self) -> Result<Connection> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
                | OpenFlags::SQLITE_OPEN_URI,
        )
        .map_err(Error::StorageUnavailable)?;
        conn.busy_timeout(self.busy_timeout)
            .map_err(Error::StorageUnavailable)?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(Error::StorageUnavailable)?;
        Ok(conn)
    }

    /// Begin a read snapshot of `key`'s edge set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageUnavailable`] if the database cannot be reached.
    pub fn snapshot(&self, key: &RepoKey) -> Result<Snapshot> {
        Snapshot::begin(self.connect()?, key.clone())
    }

    /// Atomically replace `key`'s edge set.
    ///
    /// Deletes the current generation, lets `stage` insert the new one, bumps
    /// the generation counter, and commits, all in one `IMMEDIATE`
    /// transaction. Concurrent rebuilds of the same key wait on the key's
    /// mutex. If anything fails after the transaction began, it is rolled
    /// back and the previous edge set is untouched.
    pub(crate) fn rebuild<F>(&self, key: &RepoKey, stage: F) -> Result<RebuildOutcome>
    where
        F: FnOnce(&Transaction<'_>) -> rusqlite::Result<()>,
    {
        let lock = self.rebuild_locks.lock_for(key)?;
        // A panicked rebuild already rolled back its transaction; the mutex
        // guards no data of its own.
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut conn = self.connect()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(Error::StorageUnavailable)?;

        let staged = swap_edges(&tx, key, stage);
        let committed = match staged {
            Ok(outcome) => tx.commit().map(|()| outcome),
            Err(e) => {
                drop(tx);
                Err(e)
            }
        };

        committed.map_err(|source| {
            tracing::warn!(
                owner = %key.owner(),
                repo = %key.repo(),
                error = %source,
                "Edge rebuild aborted; previous edge set kept"
            );
            Error::PartialRebuildPrevented {
                key: key.clone(),
                source,
            }
        })
    }

    /// Update `SQLite` query planner statistics.
    ///
    /// Worth running after a large import so the extraction join picks the
    /// symbol index.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be reached or `ANALYZE` fails.
    pub fn analyze(&self) -> Result<()> {
        let conn = self.connect()?;

        conn.execute_batch("ANALYZE")?;
        Ok(())
    }
}

/// Delete, stage, and record a new generation inside an open transaction.
fn swap_edges<F>(tx: &Transaction<'_>, key: &RepoKey, stage: F) -> rusqlite::Result<RebuildOutcome>
where
    F: FnOnce(&Transaction<'_>) -> rusqlite::Result<()>,
{
    let removed = tx.execute(
        "DELETE FROM file_dependencies WHERE owner_id = ?1 AND repo_url = ?2",
        params![key.owner(), key.repo()],
    )?;

    stage(tx)?;

    let edges = tx.query_row(
        "SELECT COUNT(*) FROM file_dependencies WHERE owner_id = ?1 AND repo_url = ?2",
        params![key.owner(), key.repo()],
        |row| get_count(row, 0),
    )?;

    let rebuilt_at = chrono::Utc::now().to_rfc3339();
    let generation: i64 = tx.query_row(
        "INSERT INTO edge_generations (owner_id, repo_url, generation, edge_count, rebuilt_at)
         VALUES (?1, ?2, 1, ?3, ?4)
         ON CONFLICT(owner_id, repo_url) DO UPDATE SET
             generation = generation + 1,
             edge_count = excluded.edge_count,
             rebuilt_at = excluded.rebuilt_at
         RETURNING generation",
        params![key.owner(), key.repo(), i64::try_from(edges).unwrap_or(i64::MAX), rebuilt_at],
        |row| row.get(0),
    )?;

    Ok(RebuildOutcome {
        removed,
        edges,
        // Generation starts at 1 and only increments
        generation: u64::try_from(generation).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, Store) {
        let dir = tempfile::tempdir().expect("should create temp directory");
        let store = Store::open(&dir.path().join("graph.db"), &StorageConfig::default())
            .expect("should open store");
        (dir, store)
    }

    #[test]
    fn open_creates_database_and_schema() {
        let (_dir, store) = temp_store();
        let conn = store.connect().expect("should connect");

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"documents".to_string()));
        assert!(tables.contains(&"occurrences".to_string()));
        assert!(tables.contains(&"file_dependencies".to_string()));
        assert!(tables.contains(&"edge_generations".to_string()));
    }

    #[test]
    fn open_is_idempotent() {
        let (dir, _store) = temp_store();

        let reopened = Store::open(&dir.path().join("graph.db"), &StorageConfig::default());

        assert!(reopened.is_ok(), "schema must apply cleanly twice");
    }

    #[test]
    fn connect_does_not_recreate_a_deleted_database() {
        let (_dir, store) = temp_store();
        std::fs::remove_file(store.path()).expect("should delete database");

        let err = store.connect().expect_err("connect should fail");

        assert!(matches!(err, Error::StorageUnavailable(_)));
        assert!(!store.path().exists(), "no empty database may be created");
    }

    #[test]
    fn self_loops_are_rejected_by_the_schema() {
        let (_dir, store) = temp_store();
        let conn = store.connect().unwrap();

        let result = conn.execute(
            "INSERT INTO file_dependencies (owner_id, repo_url, source_file, target_file, dep_kinds)
             VALUES ('1', 'r', 'a.rs', 'a.rs', 2)",
            [],
        );

        assert!(result.is_err(), "CHECK constraint should reject self-loop");
    }

    #[test]
    fn rebuild_bumps_generation_on_each_commit() {
        let (_dir, store) = temp_store();
        let key = RepoKey::new("1", "repo").unwrap();

        let first = store.rebuild(&key, |_| Ok(())).unwrap();
        let second = store.rebuild(&key, |_| Ok(())).unwrap();

        assert_eq!(first.generation, 1);
        assert_eq!(second.generation, 2);
        assert_eq!(second.edges, 0);
    }

    #[test]
    fn failed_stage_rolls_back_and_keeps_generation() {
        let (_dir, store) = temp_store();
        let key = RepoKey::new("1", "repo").unwrap();
        store
            .rebuild(&key, |tx| {
                tx.execute(
                    "INSERT INTO file_dependencies (owner_id, repo_url, source_file, target_file, dep_kinds)
                     VALUES ('1', 'repo', 'a.rs', 'b.rs', 2)",
                    [],
                )
                .map(|_| ())
            })
            .unwrap();

        let err = store
            .rebuild(&key, |_| Err(rusqlite::Error::InvalidQuery))
            .expect_err("stage failure should abort the rebuild");

        assert!(matches!(err, Error::PartialRebuildPrevented { .. }));
        let snapshot = store.snapshot(&key).unwrap();
        assert_eq!(snapshot.generation(), 1);
        assert_eq!(snapshot.edges().unwrap().len(), 1);
    }
}
