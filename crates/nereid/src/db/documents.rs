//! Occurrence store operations.
//!
//! Documents and occurrences arrive from an external indexer. Nereid only
//! replaces them wholesale per key and reads them back; extraction is the
//! one consumer that matters.

use std::collections::HashSet;

use rusqlite::{params, OptionalExtension, TransactionBehavior};

use super::helpers::{get_count, row_to_document, row_to_reference, DOCUMENT_COLUMNS};
use super::Store;
use crate::error::{Error, Result};
use crate::types::{
    DocumentId, DocumentMeta, DocumentRecord, ImportStats, ReferenceResult, RepoKey, RepoStats,
    RoleFlags,
};

impl Store {
    /// Replace every document and occurrence stored under `key`.
    ///
    /// The batch is checked for blank or duplicate paths first; nothing is
    /// written unless the whole batch commits. Edges are left alone.
    pub(crate) fn import_documents(
        &self,
        key: &RepoKey,
        documents: &[DocumentRecord],
    ) -> Result<ImportStats> {
        validate_documents(documents)?;

        let mut conn = self.connect()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(Error::StorageUnavailable)?;

        // Occurrences go with their documents (ON DELETE CASCADE)
        tx.execute(
            "DELETE FROM documents WHERE owner_id = ?1 AND repo_url = ?2",
            params![key.owner(), key.repo()],
        )?;

        let mut stats = ImportStats::default();
        {
            let mut insert_doc = tx.prepare(
                "INSERT INTO documents (owner_id, repo_url, relative_path, language)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            let mut insert_occ = tx.prepare(
                "INSERT INTO occurrences
                     (document_id, symbol, role_flags, start_line, start_char, end_line, end_char)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;

            for doc in documents {
                insert_doc.execute(params![
                    key.owner(),
                    key.repo(),
                    doc.relative_path.trim(),
                    doc.language,
                ])?;
                let document_id = tx.last_insert_rowid();
                stats.documents += 1;

                for occ in &doc.occurrences {
                    insert_occ.execute(params![
                        document_id,
                        occ.symbol,
                        occ.role_flags,
                        occ.range.start_line,
                        occ.range.start_char,
                        occ.range.end_line,
                        occ.range.end_char,
                    ])?;
                    stats.occurrences += 1;
                }
            }
        }

        tx.commit()?;

        tracing::info!(
            owner = %key.owner(),
            repo = %key.repo(),
            documents = stats.documents,
            occurrences = stats.occurrences,
            "Imported occurrence index"
        );

        Ok(stats)
    }

    /// Look up a document by its row id.
    pub(crate) fn lookup_document(&self, id: DocumentId) -> Result<Option<DocumentMeta>> {
        let conn = self.connect()?;

        let doc = conn
            .query_row(
                &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?1"),
                [id.as_i64()],
                row_to_document,
            )
            .optional()?;

        Ok(doc)
    }

    /// All reference occurrences of `symbol` under `key`, by file and position.
    pub(crate) fn find_references(&self, key: &RepoKey, symbol: &str) -> Result<Vec<ReferenceResult>> {
        if symbol.trim().is_empty() {
            return Err(Error::invalid("symbol must not be blank"));
        }

        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT d.relative_path, o.start_line, o.start_char, o.end_line, o.end_char,
                    o.symbol, o.role_flags
             FROM occurrences o
             JOIN documents d ON d.id = o.document_id
             WHERE d.owner_id = ?1 AND d.repo_url = ?2
               AND o.symbol = ?3
               AND (o.role_flags & ?4) <> 0
             ORDER BY d.relative_path, o.start_line, o.start_char",
        )?;

        let refs = stmt
            .query_map(
                params![key.owner(), key.repo(), symbol, RoleFlags::REFERENCE.bits()],
                row_to_reference,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(refs)
    }

    /// Counts for `key`, all read from one snapshot.
    pub(crate) fn stats(&self, key: &RepoKey) -> Result<RepoStats> {
        let snapshot = self.snapshot(key)?;
        let conn = snapshot.connection();

        let documents = conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE owner_id = ?1 AND repo_url = ?2",
            params![key.owner(), key.repo()],
            |row| get_count(row, 0),
        )?;

        let (occurrences, definitions, references) = conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM((o.role_flags & ?3) <> 0), 0),
                    COALESCE(SUM((o.role_flags & ?4) <> 0), 0)
             FROM occurrences o
             JOIN documents d ON d.id = o.document_id
             WHERE d.owner_id = ?1 AND d.repo_url = ?2",
            params![
                key.owner(),
                key.repo(),
                RoleFlags::DEFINITION.bits(),
                RoleFlags::REFERENCE.bits(),
            ],
            |row| Ok((get_count(row, 0)?, get_count(row, 1)?, get_count(row, 2)?)),
        )?;

        Ok(RepoStats {
            documents,
            occurrences,
            definitions,
            references,
            edges: snapshot.edge_count()?,
            generation: snapshot.generation(),
            rebuilt_at: snapshot.rebuilt_at().map(str::to_string),
        })
    }
}

fn validate_documents(documents: &[DocumentRecord]) -> Result<()> {
    let mut seen = HashSet::with_capacity(documents.len());
    for doc in documents {
        let path = doc.relative_path.trim();
        if path.is_empty() {
            return Err(Error::invalid("document path must not be blank"));
        }
        if !seen.insert(path) {
            return Err(Error::invalid(format!("duplicate document path: {path}")));
        }
        if let Some(occ) = doc.occurrences.iter().find(|o| o.symbol.trim().is_empty()) {
            return Err(Error::invalid(format!(
                "blank symbol in {path} (role flags {})",
                occ.role_flags
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::types::{OccurrenceRecord, Range};
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, Store) {
        let dir = tempfile::tempdir().expect("should create temp directory");
        let store = Store::open(&dir.path().join("graph.db"), &StorageConfig::default())
            .expect("should open store");
        (dir, store)
    }

    fn doc(path: &str, occurrences: &[(&str, u32, u32)]) -> DocumentRecord {
        DocumentRecord {
            relative_path: path.to_string(),
            language: None,
            occurrences: occurrences
                .iter()
                .map(|&(symbol, role_flags, line)| OccurrenceRecord {
                    symbol: symbol.to_string(),
                    role_flags,
                    range: Range::from([line, 0, line, 5]),
                })
                .collect(),
        }
    }

    #[test]
    fn import_replaces_previous_documents() {
        let (_dir, store) = temp_store();
        let key = RepoKey::new("1", "repo").unwrap();

        store
            .import_documents(&key, &[doc("a.rs", &[("s", 1, 0)]), doc("b.rs", &[])])
            .unwrap();
        let stats = store
            .import_documents(&key, &[doc("c.rs", &[("s", 2, 3), ("t", 1, 4)])])
            .unwrap();

        assert_eq!(stats, ImportStats { documents: 1, occurrences: 2 });
        let repo = store.stats(&key).unwrap();
        assert_eq!(repo.documents, 1);
        assert_eq!(repo.occurrences, 2, "old occurrences cascade away");
    }

    #[test]
    fn import_rejects_duplicate_paths_without_writing() {
        let (_dir, store) = temp_store();
        let key = RepoKey::new("1", "repo").unwrap();
        store.import_documents(&key, &[doc("keep.rs", &[])]).unwrap();

        let err = store
            .import_documents(&key, &[doc("a.rs", &[]), doc(" a.rs ", &[])])
            .expect_err("duplicate path should be rejected");

        assert!(matches!(err, Error::InvalidParameter(_)));
        assert_eq!(store.stats(&key).unwrap().documents, 1);
    }

    #[test]
    fn find_references_returns_only_reference_occurrences_in_order() {
        let (_dir, store) = temp_store();
        let key = RepoKey::new("1", "repo").unwrap();
        store
            .import_documents(
                &key,
                &[
                    doc("b.rs", &[("sym", 2, 9), ("sym", 2, 1)]),
                    doc("a.rs", &[("sym", 1, 0), ("sym", 0b110, 7)]),
                ],
            )
            .unwrap();

        let refs = store.find_references(&key, "sym").unwrap();

        let positions: Vec<_> = refs.iter().map(|r| (r.file_path.as_str(), r.start_line)).collect();
        assert_eq!(positions, vec![("a.rs", 7), ("b.rs", 1), ("b.rs", 9)]);
        assert_eq!(refs[0].role_flags, 0b110);
    }

    #[test]
    fn find_references_rejects_blank_symbol() {
        let (_dir, store) = temp_store();
        let key = RepoKey::new("1", "repo").unwrap();

        assert!(matches!(
            store.find_references(&key, "  "),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn lookup_document_by_id() {
        let (_dir, store) = temp_store();
        let key = RepoKey::new("1", "repo").unwrap();
        let mut record = doc("src/lib.rs", &[]);
        record.language = Some("rust".to_string());
        store.import_documents(&key, &[record]).unwrap();

        let id = store
            .connect()
            .unwrap()
            .query_row("SELECT id FROM documents", [], |row| row.get::<_, i64>(0))
            .unwrap();
        let meta = store.lookup_document(DocumentId(id)).unwrap().unwrap();

        assert_eq!(meta.relative_path, "src/lib.rs");
        assert_eq!(meta.language.as_deref(), Some("rust"));
        assert!(store.lookup_document(DocumentId(id + 100)).unwrap().is_none());
    }

    #[test]
    fn stats_counts_roles_per_key() {
        let (_dir, store) = temp_store();
        let key = RepoKey::new("1", "repo").unwrap();
        let other = RepoKey::new("2", "repo").unwrap();
        store
            .import_documents(&key, &[doc("a.rs", &[("s", 1, 0), ("t", 3, 1), ("u", 2, 2)])])
            .unwrap();
        store.import_documents(&other, &[doc("a.rs", &[("s", 2, 0)])]).unwrap();

        let stats = store.stats(&key).unwrap();

        assert_eq!(stats.occurrences, 3);
        assert_eq!(stats.definitions, 2);
        assert_eq!(stats.references, 2);
        assert_eq!(stats.generation, 0);
        assert!(stats.rebuilt_at.is_none());
    }
}
