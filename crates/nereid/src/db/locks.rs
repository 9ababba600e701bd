//! Per-key serialization of edge rebuilds.
//!
//! `SQLite` already serializes writers at the database level, but a caller
//! that loses the race for the write lock would otherwise spin on the busy
//! timeout and may give up. Rebuilds for the same `(owner, repo)` queue up on
//! an in-process mutex instead, so the second caller simply waits for the first
//! to commit or roll back.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::types::RepoKey;

/// Registry of one mutex per `(owner, repo)` key.
#[derive(Debug, Default)]
pub(crate) struct KeyLocks {
    locks: Mutex<HashMap<RepoKey, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    /// Get (creating on first use) the mutex guarding rebuilds of `key`.
    pub(crate) fn lock_for(&self, key: &RepoKey) -> Result<Arc<Mutex<()>>> {
        let mut locks = self.locks.lock().map_err(|e| {
            Error::Internal(format!("rebuild lock registry poisoned: {e}"))
        })?;
        Ok(Arc::clone(locks.entry(key.clone()).or_default()))
    }
}
