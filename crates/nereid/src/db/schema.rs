//! Database schema definition for Nereid.

/// Database schema definition.
pub(crate) const SCHEMA: &str = r"
-- Documents handed over by the external indexer, scoped by owner and repository
CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY,
    owner_id TEXT NOT NULL,
    repo_url TEXT NOT NULL,
    relative_path TEXT NOT NULL,
    language TEXT,
    UNIQUE (owner_id, repo_url, relative_path)
);

CREATE INDEX IF NOT EXISTS idx_documents_repo ON documents(owner_id, repo_url);

-- Symbol occurrences
-- role_flags: bit 0 = definition, bit 1 = reference, other bits reserved
CREATE TABLE IF NOT EXISTS occurrences (
    id INTEGER PRIMARY KEY,
    document_id INTEGER NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    symbol TEXT NOT NULL,
    role_flags INTEGER NOT NULL,
    start_line INTEGER NOT NULL DEFAULT 0,
    start_char INTEGER NOT NULL DEFAULT 0,
    end_line INTEGER NOT NULL DEFAULT 0,
    end_char INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_occurrences_symbol ON occurrences(symbol);
CREATE INDEX IF NOT EXISTS idx_occurrences_document ON occurrences(document_id);

-- File-level dependency edges: source_file depends on target_file.
-- Only ever written through a whole-key rebuild; never updated in place.
CREATE TABLE IF NOT EXISTS file_dependencies (
    owner_id TEXT NOT NULL,
    repo_url TEXT NOT NULL,
    source_file TEXT NOT NULL,
    target_file TEXT NOT NULL,
    dep_kinds INTEGER NOT NULL,
    symbol_count INTEGER NOT NULL DEFAULT 1,
    PRIMARY KEY (owner_id, repo_url, source_file, target_file),
    CHECK (source_file <> target_file)
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS idx_file_dependencies_target
    ON file_dependencies(owner_id, repo_url, target_file);

-- One row per key, bumped by every committed rebuild
CREATE TABLE IF NOT EXISTS edge_generations (
    owner_id TEXT NOT NULL,
    repo_url TEXT NOT NULL,
    generation INTEGER NOT NULL,
    edge_count INTEGER NOT NULL,
    rebuilt_at TEXT NOT NULL,
    PRIMARY KEY (owner_id, repo_url)
);
";
