//! Edge extraction and bulk edge replacement for the Nereid store.
//!
//! Both entry points go through [`Store::rebuild`], so they share the same
//! all-or-nothing swap: readers see either the old generation or the new one.

use std::collections::BTreeMap;

use rusqlite::params;

use super::{RebuildOutcome, Store};
use crate::error::{Error, Result};
use crate::types::{DepKinds, DependencyEdge, RepoKey, RoleFlags};

/// Derive reference edges for one key from the occurrence tables.
///
/// A symbol referenced in `ref_doc` and defined in `def_doc` makes `ref_doc`
/// depend on `def_doc`. Rows collapse to one per file pair; `symbol_count`
/// counts the distinct symbols behind each pair. The `<>` on document ids
/// keeps same-file pairs out, which the table's CHECK would reject anyway.
const EXTRACT_EDGES_SQL: &str = "
INSERT INTO file_dependencies
    (owner_id, repo_url, source_file, target_file, dep_kinds, symbol_count)
SELECT ?1, ?2,
       ref_doc.relative_path,
       def_doc.relative_path,
       ?5,
       COUNT(DISTINCT ref_occ.symbol)
FROM occurrences ref_occ
JOIN documents   ref_doc ON ref_doc.id = ref_occ.document_id
JOIN occurrences def_occ ON def_occ.symbol = ref_occ.symbol
JOIN documents   def_doc ON def_doc.id = def_occ.document_id
WHERE ref_doc.owner_id = ?1
  AND ref_doc.repo_url = ?2
  AND def_doc.owner_id = ?1
  AND def_doc.repo_url = ?2
  AND (ref_occ.role_flags & ?3) <> 0
  AND (def_occ.role_flags & ?4) <> 0
  AND ref_doc.id <> def_doc.id
GROUP BY ref_doc.relative_path, def_doc.relative_path
";

impl Store {
    /// Rebuild `key`'s edge set from its occurrences.
    ///
    /// The join runs inside `SQLite`; occurrences are never loaded into
    /// process memory.
    pub(crate) fn extract_edges(&self, key: &RepoKey) -> Result<RebuildOutcome> {
        self.rebuild(key, |tx| {
            tx.execute(
                EXTRACT_EDGES_SQL,
                params![
                    key.owner(),
                    key.repo(),
                    RoleFlags::REFERENCE.bits(),
                    RoleFlags::DEFINITION.bits(),
                    DepKinds::REFERENCE.bits(),
                ],
            )
            .map(|_| ())
        })
    }

    /// Replace `key`'s edge set with caller-supplied edges.
    ///
    /// Edges are validated and merged before the store is touched.
    pub(crate) fn replace_all(&self, key: &RepoKey, edges: &[DependencyEdge]) -> Result<RebuildOutcome> {
        let merged = merge_edges(key, edges)?;

        self.rebuild(key, |tx| {
            let mut stmt = tx.prepare(
                "INSERT INTO file_dependencies
                     (owner_id, repo_url, source_file, target_file, dep_kinds, symbol_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for edge in &merged {
                stmt.execute(params![
                    edge.owner_id,
                    edge.repo_url,
                    edge.source_file,
                    edge.target_file,
                    edge.dep_kinds.bits(),
                    edge.symbol_count,
                ])?;
            }
            Ok(())
        })
    }
}

/// Validate edges for `key` and collapse duplicates to one per file pair.
///
/// Duplicate pairs union their kinds and sum their symbol counts. The result
/// is ordered by `(source, target)`.
pub(crate) fn merge_edges(key: &RepoKey, edges: &[DependencyEdge]) -> Result<Vec<DependencyEdge>> {
    let mut merged: BTreeMap<(&str, &str), (DepKinds, u32)> = BTreeMap::new();

    for edge in edges {
        if !edge.belongs_to(key) {
            return Err(Error::invalid(format!(
                "edge {} -> {} belongs to {}@{}, not {key}",
                edge.source_file, edge.target_file, edge.owner_id, edge.repo_url
            )));
        }
        if edge.source_file.trim().is_empty() || edge.target_file.trim().is_empty() {
            return Err(Error::invalid("edge endpoints must not be blank"));
        }
        if edge.source_file == edge.target_file {
            return Err(Error::invalid(format!(
                "self-loop on {} cannot be stored",
                edge.source_file
            )));
        }
        if edge.dep_kinds.is_empty() {
            return Err(Error::invalid(format!(
                "edge {} -> {} has no dependency kind",
                edge.source_file, edge.target_file
            )));
        }

        let entry = merged
            .entry((edge.source_file.as_str(), edge.target_file.as_str()))
            .or_insert((DepKinds::empty(), 0));
        entry.0 |= edge.dep_kinds;
        entry.1 = entry.1.saturating_add(edge.symbol_count.max(1));
    }

    Ok(merged
        .into_iter()
        .map(|((source, target), (kinds, count))| DependencyEdge {
            owner_id: key.owner().to_string(),
            repo_url: key.repo().to_string(),
            source_file: source.to_string(),
            target_file: target.to_string(),
            dep_kinds: kinds,
            symbol_count: count,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> RepoKey {
        RepoKey::new("1", "https://git.example/app").unwrap()
    }

    #[test]
    fn merge_collapses_duplicate_pairs_and_unions_kinds() {
        let key = key();
        let edges = vec![
            DependencyEdge::new(&key, "a.rs", "b.rs", DepKinds::REFERENCE),
            DependencyEdge::new(&key, "a.rs", "b.rs", DepKinds::IMPORT),
            DependencyEdge::new(&key, "a.rs", "c.rs", DepKinds::REFERENCE),
        ];

        let merged = merge_edges(&key, &edges).unwrap();

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].target_file, "b.rs");
        assert_eq!(merged[0].dep_kinds, DepKinds::IMPORT | DepKinds::REFERENCE);
        assert_eq!(merged[0].symbol_count, 2);
        assert_eq!(merged[1].target_file, "c.rs");
    }

    #[test]
    fn merge_rejects_self_loops() {
        let key = key();
        let edges = vec![DependencyEdge::new(&key, "a.rs", "a.rs", DepKinds::REFERENCE)];

        let err = merge_edges(&key, &edges).expect_err("self-loop should be rejected");

        assert!(matches!(err, Error::InvalidParameter(ref msg) if msg.contains("self-loop")));
    }

    #[test]
    fn merge_rejects_edges_from_another_key() {
        let key = key();
        let other = RepoKey::new("2", "https://git.example/app").unwrap();
        let edges = vec![DependencyEdge::new(&other, "a.rs", "b.rs", DepKinds::REFERENCE)];

        assert!(matches!(
            merge_edges(&key, &edges),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn merge_rejects_empty_kinds() {
        let key = key();
        let edges = vec![DependencyEdge::new(&key, "a.rs", "b.rs", DepKinds::empty())];

        assert!(matches!(
            merge_edges(&key, &edges),
            Err(Error::InvalidParameter(_))
        ));
    }
}
