//! Helper functions for database row conversion and parsing.
//!
//! These utilities convert between database representations and domain types.
//! Also provides SQL column list constants to reduce duplication across query modules.

use rusqlite::types::Type;
use rusqlite::Row;

use crate::types::{DepKinds, DependencyEdge, DocumentId, DocumentMeta, ReferenceResult};

/// SQL column list for the `file_dependencies` table.
///
/// Use with `row_to_edge` for consistent column ordering.
pub(crate) const EDGE_COLUMNS: &str =
    "owner_id, repo_url, source_file, target_file, dep_kinds, symbol_count";

/// SQL column list for the `documents` table.
///
/// Use with `row_to_document` for consistent column ordering.
pub(crate) const DOCUMENT_COLUMNS: &str = "id, relative_path, language";

/// Parse a dependency-kind bitset from the database.
///
/// Returns an error for unknown bits or an empty set, indicating possible
/// database corruption.
pub(crate) fn parse_dep_kinds(raw: i64) -> rusqlite::Result<DepKinds> {
    u8::try_from(raw)
        .ok()
        .and_then(DepKinds::from_bits)
        .filter(|kinds| !kinds.is_empty())
        .ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                Type::Integer,
                format!("Unknown dependency kinds '{raw}' in database. Database may be corrupted or from a newer version.").into(),
            )
        })
}

/// Read a non-negative integer column as `u32`.
pub(crate) fn get_u32(row: &Row<'_>, idx: usize) -> rusqlite::Result<u32> {
    let raw: i64 = row.get(idx)?;
    u32::try_from(raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, e.into()))
}

/// Read a `COUNT(*)`-style column as `usize`.
pub(crate) fn get_count(row: &Row<'_>, idx: usize) -> rusqlite::Result<usize> {
    let raw: i64 = row.get(idx)?;
    usize::try_from(raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, e.into()))
}

/// Convert a row selected with [`EDGE_COLUMNS`] into a [`DependencyEdge`].
pub(crate) fn row_to_edge(row: &Row<'_>) -> rusqlite::Result<DependencyEdge> {
    Ok(DependencyEdge {
        owner_id: row.get(0)?,
        repo_url: row.get(1)?,
        source_file: row.get(2)?,
        target_file: row.get(3)?,
        dep_kinds: parse_dep_kinds(row.get(4)?)?,
        symbol_count: get_u32(row, 5)?,
    })
}

/// Convert a row selected with [`DOCUMENT_COLUMNS`] into a [`DocumentMeta`].
pub(crate) fn row_to_document(row: &Row<'_>) -> rusqlite::Result<DocumentMeta> {
    Ok(DocumentMeta {
        id: DocumentId::from(row.get::<_, i64>(0)?),
        relative_path: row.get(1)?,
        language: row.get(2)?,
    })
}

/// Convert an occurrence joined with its document into a [`ReferenceResult`].
///
/// Expected columns: `relative_path, start_line, start_char, end_line,
/// end_char, symbol, role_flags`.
pub(crate) fn row_to_reference(row: &Row<'_>) -> rusqlite::Result<ReferenceResult> {
    Ok(ReferenceResult {
        file_path: row.get(0)?,
        start_line: get_u32(row, 1)?,
        start_char: get_u32(row, 2)?,
        end_line: get_u32(row, 3)?,
        end_char: get_u32(row, 4)?,
        symbol: row.get(5)?,
        role_flags: get_u32(row, 6)?,
    })
}
