//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};

use nereid::{Config, DependencyEdge, DocumentRecord, Nereid, OccurrenceRecord, Range, RepoKey};
use tempfile::TempDir;

/// Definition role bit.
pub const DEF: u32 = 0b01;
/// Reference role bit.
pub const REF: u32 = 0b10;

/// Open a Nereid on a fresh temporary database.
pub fn temp_nereid() -> (TempDir, Nereid) {
    temp_nereid_with(Config::default())
}

/// Open a Nereid on a fresh temporary database with `config`.
pub fn temp_nereid_with(config: Config) -> (TempDir, Nereid) {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let nereid = Nereid::with_config(&dir.path().join("graph.db"), config)
        .expect("should open nereid");
    (dir, nereid)
}

/// The key most tests run against.
pub fn key() -> RepoKey {
    RepoKey::new("42", "https://git.example/acme/app").expect("valid key")
}

/// A document with `(symbol, role_flags)` occurrences.
pub fn doc(path: &str, occurrences: &[(&str, u32)]) -> DocumentRecord {
    DocumentRecord {
        relative_path: path.to_string(),
        language: None,
        occurrences: occurrences
            .iter()
            .enumerate()
            .map(|(line, &(symbol, role_flags))| OccurrenceRecord {
                symbol: symbol.to_string(),
                role_flags,
                range: Range::from([u32::try_from(line).unwrap_or(u32::MAX), 0, 0, 0]),
            })
            .collect(),
    }
}

/// Occurrence documents whose extraction yields exactly `pairs`.
///
/// For each `(source, target)`, `target` defines `sym::<target>` and `source`
/// references it.
pub fn documents_for(pairs: &[(&str, &str)]) -> Vec<DocumentRecord> {
    let mut occurrences: BTreeMap<&str, Vec<(String, u32)>> = BTreeMap::new();

    for &(source, target) in pairs {
        let symbol = format!("sym::{target}");
        let defs = occurrences.entry(target).or_default();
        if !defs.iter().any(|(s, r)| *s == symbol && *r == DEF) {
            defs.push((symbol.clone(), DEF));
        }
        occurrences.entry(source).or_default().push((symbol, REF));
    }

    occurrences
        .into_iter()
        .map(|(path, occs)| {
            let refs: Vec<(&str, u32)> = occs.iter().map(|(s, r)| (s.as_str(), *r)).collect();
            doc(path, &refs)
        })
        .collect()
}

/// Import documents for `pairs` and extract, returning the edge count.
pub fn seed_graph(nereid: &Nereid, key: &RepoKey, pairs: &[(&str, &str)]) -> usize {
    nereid
        .import_documents(key, &documents_for(pairs))
        .expect("import should succeed");
    nereid.extract_edges(key).expect("extract should succeed")
}

/// `(source, target)` pairs of an edge list.
pub fn pair_set(edges: &[DependencyEdge]) -> BTreeSet<(String, String)> {
    edges
        .iter()
        .map(|e| (e.source_file.clone(), e.target_file.clone()))
        .collect()
}

/// Owned `(source, target)` pairs.
pub fn owned_pairs(pairs: &[(&str, &str)]) -> BTreeSet<(String, String)> {
    pairs
        .iter()
        .map(|&(s, t)| (s.to_string(), t.to_string()))
        .collect()
}
