//! # Nereid: File-Level Dependency Graphs from Symbol Occurrences
//!
//! Nereid derives a directed "file depends on file" graph from a symbol
//! occurrence index, stores it in `SQLite`, and answers bounded closure and
//! cycle queries against it.
//!
//! ## Design Philosophy
//!
//! - **Whole-key rebuilds** - An `(owner, repo)` edge set is only ever replaced
//!   wholesale, inside one transaction; readers never see half a graph
//! - **Snapshot reads** - Every query reads one pinned generation, even while
//!   a rebuild commits underneath it
//! - **Explicit traversal** - Depth limits and cycle cuts live in Rust code,
//!   not in store-specific recursive SQL
//! - **Library first, CLI second**
//!
//! ## Quick Start
//!
//! ```no_run
//! use nereid::{Nereid, RepoKey};
//! use std::path::Path;
//!
//! let nereid = Nereid::open(Path::new("/path/to/workspace"))?;
//! let key = RepoKey::new("42", "https://github.com/acme/app")?;
//!
//! // Derive edges from the imported occurrence index
//! let edges = nereid.extract_edges(&key)?;
//! println!("{edges} dependency edges");
//!
//! // What does main.rs transitively depend on?
//! let closure = nereid.compute_closure(&key, "src/main.rs", 3)?;
//! for cycle in &closure.cycles {
//!     println!("cycle: {cycle}");
//! }
//! # Ok::<(), nereid::Error>(())
//! ```

pub mod config;
mod db;
mod error;
mod graph;
mod ingest;
mod types;

pub use config::Config;
pub use db::Snapshot;
pub use error::{Error, Result};
pub use graph::{
    assemble, compute_closure, edge_id, effective_max_depth, node_id, CycleAnalysis, EdgeMap,
    EdgeSource, GraphEdge, GraphNode, GraphView,
};
pub use ingest::read_documents_jsonl;
pub use types::{
    CancellationFlag, Closure, ClosurePath, Cycle, DepKinds, DependencyEdge, DocumentId,
    DocumentMeta, DocumentRecord, ImportStats, Language, OccurrenceRecord, Range,
    ReferenceResult, RepoKey, RepoStats, RoleFlags,
};

use std::path::Path;

use db::Store;
use tracing::info;

/// Dependency graph engine bound to one database.
///
/// `Nereid` is `Send + Sync`; share it behind an `Arc` to serve concurrent
/// readers and writers. Rebuilds of the same key are serialized internally.
#[derive(Debug)]
pub struct Nereid {
    config: Config,
    store: Store,
}

impl Nereid {
    /// Open the engine for a working directory.
    ///
    /// Reads `.nereid/config.yaml` under `dir` (defaults if absent) and opens
    /// or creates the configured database.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an invalid config file and
    /// [`Error::StorageUnavailable`] if the database cannot be opened.
    pub fn open(dir: &Path) -> Result<Self> {
        let config = Config::load_or_default(dir)?;
        let db_path = config.database_path(dir);
        Self::with_config(&db_path, config)
    }

    /// Open the engine on an explicit database path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `config` fails validation and
    /// [`Error::StorageUnavailable`] if the database cannot be opened.
    pub fn with_config(db_path: &Path, config: Config) -> Result<Self> {
        config.validate()?;
        let store = Store::open(db_path, &config.storage)?;
        Ok(Self { config, store })
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Path of the database file.
    #[must_use]
    pub fn database_path(&self) -> &Path {
        self.store.path()
    }

    // === Occurrence store ===

    /// Replace the documents and occurrences stored under `key`.
    ///
    /// Edges are not touched; run [`Nereid::extract_edges`] afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] for blank or duplicate paths or
    /// blank symbols, and a storage error if the import cannot commit.
    pub fn import_documents(&self, key: &RepoKey, documents: &[DocumentRecord]) -> Result<ImportStats> {
        self.store.import_documents(key, documents)
    }

    /// Look up document metadata by id.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the database cannot be read.
    pub fn lookup_document(&self, id: DocumentId) -> Result<Option<DocumentMeta>> {
        self.store.lookup_document(id)
    }

    /// Every reference to `symbol` under `key`, ordered by file and position.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] for a blank symbol.
    pub fn find_references(&self, key: &RepoKey, symbol: &str) -> Result<Vec<ReferenceResult>> {
        self.store.find_references(key, symbol)
    }

    // === Edge extraction and storage ===

    /// Rebuild `key`'s edges from its occurrences and return the edge count.
    ///
    /// A file that references a symbol another file defines depends on that
    /// file. Each file pair yields one edge however many symbols link them.
    ///
    /// # Errors
    ///
    /// - [`Error::StorageUnavailable`] if the database cannot be reached
    /// - [`Error::PartialRebuildPrevented`] if the rebuild failed after it
    ///   started; the previous edge set is unchanged
    pub fn extract_edges(&self, key: &RepoKey) -> Result<usize> {
        info!(owner = %key.owner(), repo = %key.repo(), "Extracting dependency edges");

        let outcome = self.store.extract_edges(key)?;

        info!(
            owner = %key.owner(),
            repo = %key.repo(),
            edges = outcome.edges,
            removed = outcome.removed,
            generation = outcome.generation,
            "Dependency edges rebuilt"
        );
        Ok(outcome.edges)
    }

    /// Atomically replace `key`'s edges with `edges` and return the stored count.
    ///
    /// Duplicate pairs are merged: kinds are unioned and weights summed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] (before touching the store) if an
    /// edge belongs to another key, has a blank endpoint, or is a self-loop.
    /// Storage failures are reported as for [`Nereid::extract_edges`].
    pub fn replace_edges(&self, key: &RepoKey, edges: &[DependencyEdge]) -> Result<usize> {
        let outcome = self.store.replace_all(key, edges)?;

        info!(
            owner = %key.owner(),
            repo = %key.repo(),
            edges = outcome.edges,
            generation = outcome.generation,
            "Dependency edges replaced"
        );
        Ok(outcome.edges)
    }

    /// Pin a read snapshot of `key`'s current edge generation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageUnavailable`] if the database cannot be reached.
    pub fn snapshot(&self, key: &RepoKey) -> Result<Snapshot> {
        self.store.snapshot(key)
    }

    /// All edges for `key`, ordered by `(source, target)`.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the database cannot be read.
    pub fn edges(&self, key: &RepoKey) -> Result<Vec<DependencyEdge>> {
        self.store.snapshot(key)?.edges()
    }

    /// Direct outgoing edges of `source_file`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] for a blank file and a storage
    /// error if the database cannot be read.
    pub fn edges_from(&self, key: &RepoKey, source_file: &str) -> Result<Vec<DependencyEdge>> {
        if source_file.trim().is_empty() {
            return Err(Error::invalid("source file must not be blank"));
        }
        self.store.snapshot(key)?.edges_from(source_file)
    }

    // === Queries ===

    /// Bounded transitive closure of `root`.
    ///
    /// `max_depth` above `closure.max-depth-limit` is clamped to it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] for a non-positive depth or blank
    /// root without touching the store, and a storage error otherwise.
    pub fn compute_closure(&self, key: &RepoKey, root: &str, max_depth: i64) -> Result<Closure> {
        self.compute_closure_with_cancel(key, root, max_depth, &CancellationFlag::new())
    }

    /// Like [`Nereid::compute_closure`], but abandonable through `cancel`.
    ///
    /// # Errors
    ///
    /// As [`Nereid::compute_closure`], plus [`Error::Cancelled`].
    pub fn compute_closure_with_cancel(
        &self,
        key: &RepoKey,
        root: &str,
        max_depth: i64,
        cancel: &CancellationFlag,
    ) -> Result<Closure> {
        let depth = effective_max_depth(max_depth, self.config.closure.max_depth_limit)?;
        if root.trim().is_empty() {
            return Err(Error::invalid("root file must not be blank"));
        }

        let snapshot = self.store.snapshot(key)?;
        compute_closure(&snapshot, root, depth, cancel)
    }

    /// Closure using the configured default depth.
    ///
    /// # Errors
    ///
    /// As [`Nereid::compute_closure`].
    pub fn compute_default_closure(&self, key: &RepoKey, root: &str) -> Result<Closure> {
        self.compute_closure(key, root, i64::from(self.config.closure.default_max_depth))
    }

    /// Render `key`'s whole edge set as a [`GraphView`].
    ///
    /// # Errors
    ///
    /// Returns a storage error if the database cannot be read.
    pub fn assemble_graph(&self, key: &RepoKey) -> Result<GraphView> {
        let snapshot = self.store.snapshot(key)?;
        let edges = snapshot.edges()?;
        let documents = snapshot.documents()?;
        Ok(assemble(&edges, &documents))
    }

    /// Strongly connected groups of files under `key`.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the database cannot be read.
    pub fn detect_cycles(&self, key: &RepoKey) -> Result<Vec<Cycle>> {
        let edges = self.edges(key)?;
        Ok(CycleAnalysis::from_edges(&edges).into_cycles())
    }

    /// Store contents for `key`.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the database cannot be read.
    pub fn stats(&self, key: &RepoKey) -> Result<RepoStats> {
        self.store.stats(key)
    }

    /// Refresh `SQLite` planner statistics.
    ///
    /// # Errors
    ///
    /// Returns a storage error if `ANALYZE` fails.
    pub fn analyze(&self) -> Result<()> {
        self.store.analyze()
    }
}
