//! Domain types for the Nereid dependency graph.
//!
//! These types represent the core domain model:
//! - **Keys**: `RepoKey` scopes every document and edge by `(owner, repo)`
//! - **Occurrence input**: `DocumentRecord`, `OccurrenceRecord`, `RoleFlags`
//!   (produced by an external indexer, read-only to the engine)
//! - **Entities**: `DependencyEdge` (the only thing Nereid writes)
//! - **Results**: `ClosurePath`, `Closure`, `Cycle`, `ReferenceResult`, `RepoStats`
//!
//! ## Design Decisions
//!
//! | Decision | Choice | Rationale |
//! |----------|--------|-----------|
//! | Edge uniqueness | One row per `(source, target)` | Kinds aggregate into `DepKinds` |
//! | Role flags | Bitset, unknown bits kept | Indexers may add roles later |
//! | Depth | `u32` inside, `i64` at the API edge | Non-positive input must be rejectable |

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// Scoping key
// ============================================================================

/// The `(owner, repository)` partition key.
///
/// Construction rejects blank components, so any `RepoKey` that reaches the
/// store is already valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RepoKey {
    owner: String,
    repo: String,
}

impl RepoKey {
    /// Create a key, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if either component is blank.
    pub fn new(owner: impl AsRef<str>, repo: impl AsRef<str>) -> Result<Self> {
        let owner = owner.as_ref().trim();
        let repo = repo.as_ref().trim();
        if owner.is_empty() {
            return Err(Error::invalid("owner must not be blank"));
        }
        if repo.is_empty() {
            return Err(Error::invalid("repository must not be blank"));
        }
        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    /// The owner component.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// The repository component (usually a URL).
    #[must_use]
    pub fn repo(&self) -> &str {
        &self.repo
    }
}

impl fmt::Display for RepoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.owner, self.repo)
    }
}

/// A strongly-typed document ID.
///
/// Prevents mixing database row IDs with other integers such as depths or
/// role bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DocumentId(pub i64);

impl DocumentId {
    /// Extract the raw i64 value.
    #[must_use]
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl From<i64> for DocumentId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

// ============================================================================
// Bitsets
// ============================================================================

bitflags! {
    /// Roles an occurrence plays for its symbol.
    ///
    /// Only the two low bits carry meaning; anything else an indexer sets is
    /// retained and ignored.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RoleFlags: u32 {
        /// The occurrence defines the symbol
        const DEFINITION = 0b01;
        /// The occurrence references the symbol
        const REFERENCE = 0b10;
    }
}

impl RoleFlags {
    /// Build from raw indexer bits without dropping reserved bits.
    #[must_use]
    pub fn from_raw(bits: u32) -> Self {
        Self::from_bits_retain(bits)
    }

    /// Whether the definition bit is set.
    #[must_use]
    pub fn is_definition(self) -> bool {
        self.contains(Self::DEFINITION)
    }

    /// Whether the reference bit is set.
    #[must_use]
    pub fn is_reference(self) -> bool {
        self.contains(Self::REFERENCE)
    }
}

bitflags! {
    /// The dependency types aggregated onto a single file pair.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DepKinds: u8 {
        /// An explicit import relationship
        const IMPORT = 0b01;
        /// A symbol defined in the target is referenced by the source
        const REFERENCE = 0b10;
    }
}

impl DepKinds {
    /// Human-readable type string used by the graph view.
    #[must_use]
    pub fn label(self) -> &'static str {
        match (self.contains(Self::IMPORT), self.contains(Self::REFERENCE)) {
            (true, true) => "import+reference",
            (true, false) => "import",
            _ => "reference",
        }
    }

    /// Parse a label produced by [`DepKinds::label`] or a single type name.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "import" => Some(Self::IMPORT),
            "reference" => Some(Self::REFERENCE),
            "import+reference" => Some(Self::IMPORT | Self::REFERENCE),
            _ => None,
        }
    }
}

impl Serialize for DepKinds {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

// ============================================================================
// Language detection
// ============================================================================

/// Languages Nereid can infer from a file extension when the indexer did not
/// record one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    /// Rust source files (`.rs`)
    Rust,
    /// C# source files (`.cs`)
    CSharp,
    /// Java source files (`.java`)
    Java,
    /// Kotlin source files (`.kt`, `.kts`)
    Kotlin,
    /// TypeScript source files (`.ts`, `.tsx`, `.mts`, `.cts`)
    TypeScript,
    /// JavaScript source files (`.js`, `.jsx`, `.mjs`, `.cjs`)
    JavaScript,
    /// Python source files (`.py`)
    Python,
    /// Go source files (`.go`)
    Go,
}

impl Language {
    /// Detect language from file extension.
    ///
    /// # Returns
    ///
    /// `None` if the extension is not recognized.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "rs" => Some(Self::Rust),
            "cs" => Some(Self::CSharp),
            "java" => Some(Self::Java),
            "kt" | "kts" => Some(Self::Kotlin),
            "ts" | "tsx" | "mts" | "cts" => Some(Self::TypeScript),
            "js" | "jsx" | "mjs" | "cjs" => Some(Self::JavaScript),
            "py" => Some(Self::Python),
            "go" => Some(Self::Go),
            _ => None,
        }
    }

    /// Detect language from a relative path's extension.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Lowercase name as stored by common indexers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rust => "rust",
            Self::CSharp => "csharp",
            Self::Java => "java",
            Self::Kotlin => "kotlin",
            Self::TypeScript => "typescript",
            Self::JavaScript => "javascript",
            Self::Python => "python",
            Self::Go => "go",
        }
    }
}

// ============================================================================
// Occurrence input (external indexer hand-off)
// ============================================================================

/// Source range of an occurrence, `[startLine, startChar, endLine, endChar]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u32; 4]", into = "[u32; 4]")]
pub struct Range {
    /// Starting line (0-indexed, as indexers emit it)
    pub start_line: u32,
    /// Starting character
    pub start_char: u32,
    /// Ending line
    pub end_line: u32,
    /// Ending character
    pub end_char: u32,
}

impl From<[u32; 4]> for Range {
    fn from([start_line, start_char, end_line, end_char]: [u32; 4]) -> Self {
        Self {
            start_line,
            start_char,
            end_line,
            end_char,
        }
    }
}

impl From<Range> for [u32; 4] {
    fn from(r: Range) -> Self {
        [r.start_line, r.start_char, r.end_line, r.end_char]
    }
}

/// One symbol occurrence inside a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccurrenceRecord {
    /// Globally unique symbol string
    pub symbol: String,
    /// Raw role bits (bit 0 definition, bit 1 reference)
    pub role_flags: u32,
    /// Position of the occurrence
    #[serde(default)]
    pub range: Range,
}

impl OccurrenceRecord {
    /// Typed view of the role bits.
    #[must_use]
    pub fn roles(&self) -> RoleFlags {
        RoleFlags::from_raw(self.role_flags)
    }
}

/// A document (file) with its occurrences, as handed over by the indexer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    /// Path relative to the repository root
    pub relative_path: String,
    /// Language reported by the indexer, if any
    #[serde(default)]
    pub language: Option<String>,
    /// Occurrences found in the document
    #[serde(default)]
    pub occurrences: Vec<OccurrenceRecord>,
}

/// File metadata used to enrich graph nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMeta {
    /// Database primary key
    pub id: DocumentId,
    /// Path relative to the repository root
    pub relative_path: String,
    /// Language reported by the indexer, if any
    pub language: Option<String>,
}

// ============================================================================
// Edges
// ============================================================================

/// A directed file-level dependency: `source_file` depends on `target_file`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyEdge {
    /// Owner partition
    pub owner_id: String,
    /// Repository partition
    pub repo_url: String,
    /// The dependent file
    pub source_file: String,
    /// The file depended upon
    pub target_file: String,
    /// Aggregated dependency types for this pair
    pub dep_kinds: DepKinds,
    /// Distinct symbols contributing to this edge
    pub symbol_count: u32,
}

impl DependencyEdge {
    /// Create a single-symbol edge of the given kind for `key`.
    #[must_use]
    pub fn new(
        key: &RepoKey,
        source_file: impl Into<String>,
        target_file: impl Into<String>,
        dep_kinds: DepKinds,
    ) -> Self {
        Self {
            owner_id: key.owner().to_string(),
            repo_url: key.repo().to_string(),
            source_file: source_file.into(),
            target_file: target_file.into(),
            dep_kinds,
            symbol_count: 1,
        }
    }

    /// Whether this edge belongs to `key`.
    #[must_use]
    pub fn belongs_to(&self, key: &RepoKey) -> bool {
        self.owner_id == key.owner() && self.repo_url == key.repo()
    }
}

// ============================================================================
// Closure results
// ============================================================================

/// One edge discovered during a closure traversal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosurePath {
    /// The dependent file
    pub source_file: String,
    /// The file depended upon
    pub target_file: String,
    /// Hop index from the root (root's own edges are depth 0)
    pub depth: u32,
    /// Whether `target_file` already appeared earlier on this path
    pub is_cycle: bool,
}

/// Result of a bounded transitive-closure query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Closure {
    /// Root file the traversal started from
    pub root: String,
    /// Effective depth bound (after clamping)
    pub max_depth: u32,
    /// Discovered edges, in discovery order unless [`Closure::sort`] was called
    pub edges: Vec<ClosurePath>,
    /// Cycle edges rendered as `"source → target"`, without duplicates
    pub cycles: Vec<String>,
}

impl Closure {
    /// Sort edges by `(depth, source, target)` for deterministic output.
    pub fn sort(&mut self) {
        self.edges.sort_by(|a, b| {
            (a.depth, &a.source_file, &a.target_file).cmp(&(
                b.depth,
                &b.source_file,
                &b.target_file,
            ))
        });
    }

    /// Deepest level that produced an edge, if any edge was found.
    #[must_use]
    pub fn max_depth_reached(&self) -> Option<u32> {
        self.edges.iter().map(|e| e.depth).max()
    }

    /// Whether any traversal path closed a cycle.
    #[must_use]
    pub fn has_cycles(&self) -> bool {
        !self.cycles.is_empty()
    }
}

/// A strongly connected set of files (every file reaches every other).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Cycle {
    /// Files in the component, sorted
    pub files: Vec<String>,
}

/// Cooperative cancellation for long traversals.
///
/// Clones share the same flag. The closure engine checks it before expanding
/// each depth level.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// Create a flag that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// ============================================================================
// Occurrence query results
// ============================================================================

/// A single reference occurrence of a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceResult {
    /// File containing the occurrence
    pub file_path: String,
    /// Starting line
    pub start_line: u32,
    /// Starting character
    pub start_char: u32,
    /// Ending line
    pub end_line: u32,
    /// Ending character
    pub end_char: u32,
    /// The referenced symbol
    pub symbol: String,
    /// Raw role bits of the occurrence
    pub role_flags: u32,
}

/// Outcome of importing a batch of documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    /// Documents stored
    pub documents: usize,
    /// Occurrences stored
    pub occurrences: usize,
}

/// Contents of the store for one key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepoStats {
    /// Indexed documents
    pub documents: usize,
    /// Indexed occurrences
    pub occurrences: usize,
    /// Occurrences with the definition bit
    pub definitions: usize,
    /// Occurrences with the reference bit
    pub references: usize,
    /// Persisted dependency edges
    pub edges: usize,
    /// Number of successful rebuilds (0 if never extracted)
    pub generation: u64,
    /// When the current generation was committed (RFC 3339)
    pub rebuilt_at: Option<String>,
}
