//! SQLite-backed store.
//!
//! Uniqueness of fingerprints, interpretation source rows and category labels
//! is enforced by the schema, so a racing writer fails instead of duplicating.

use std::path::Path;

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use varinterp_common::{DatabaseConfig, Fingerprint};

use crate::error::{DbError, Result};
use crate::schema::{
    BulkLoad, BulkLoaded, Category, CategoryId, CategoryKind, EntryId, Interpretation,
    InterpretationId, InterpretationRef, KnowledgeBaseEntry, NewEntry, NewInterpretation,
    TABLE_ENTRIES, TABLE_INTERPRETATIONS,
};
use crate::store::KnowledgeBaseStore;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS categories (
    id    INTEGER PRIMARY KEY AUTOINCREMENT,
    kind  TEXT NOT NULL,
    label TEXT NOT NULL,
    UNIQUE (kind, label)
);

CREATE TABLE IF NOT EXISTS interpretations (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    text       TEXT NOT NULL,
    citations  TEXT NOT NULL,
    source_row INTEGER NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS entries (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    gene              TEXT NOT NULL,
    tumor_type        TEXT NOT NULL,
    tissue_type       TEXT NOT NULL,
    variant           TEXT NOT NULL,
    tier              INTEGER NOT NULL,
    interpretation_id INTEGER NOT NULL REFERENCES interpretations (id),
    source_row        INTEGER NOT NULL,
    fingerprint       BLOB NOT NULL UNIQUE
);

CREATE INDEX IF NOT EXISTS idx_entries_gene ON entries (gene);
";

const ENTRY_COLUMNS: &str =
    "id, gene, tumor_type, tissue_type, variant, tier, interpretation_id, source_row, fingerprint";

const INSERT_ENTRY: &str = "INSERT INTO entries
    (gene, tumor_type, tissue_type, variant, tier, interpretation_id, source_row, fingerprint)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

const INSERT_INTERPRETATION: &str =
    "INSERT INTO interpretations (text, citations, source_row) VALUES (?1, ?2, ?3)";

/// Main database handle.
pub struct SqliteStore {
    conn: Connection,
    path: String,
}

impl SqliteStore {
    /// Open or create a database file, creating its parent directory if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn, path.to_string_lossy().to_string())
    }

    /// Open the database file named by the `[database]` config section.
    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        Self::open(&config.path)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, ":memory:".to_string())
    }

    fn with_connection(conn: Connection, path: String) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let store = Self { conn, path };
        store.initialize()?;
        Ok(store)
    }

    /// Create all tables. Safe to call on an initialized database.
    pub fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        tracing::debug!(path = %self.path, "SQLite schema initialized");
        Ok(())
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn count(&self, table: &'static str) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {table}");
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

// ── Row mapping ──────────────────────────────────────────────────────────────

fn row_to_interpretation(row: &Row<'_>) -> rusqlite::Result<Interpretation> {
    Ok(Interpretation {
        id: InterpretationId(row.get(0)?),
        text: row.get(1)?,
        citations: row.get(2)?,
        source_row: row.get(3)?,
    })
}

/// Entry row with the fingerprint still as raw bytes; length is checked after.
fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<(KnowledgeBaseEntry, Vec<u8>)> {
    let entry = KnowledgeBaseEntry {
        id: EntryId(row.get(0)?),
        gene: row.get(1)?,
        tumor_type: row.get(2)?,
        tissue_type: row.get(3)?,
        variant: row.get(4)?,
        tier: row.get(5)?,
        interpretation_id: InterpretationId(row.get(6)?),
        source_row: row.get(7)?,
        fingerprint: Fingerprint::from_bytes([0; 16]),
    };
    Ok((entry, row.get(8)?))
}

fn finish_entry((mut entry, bytes): (KnowledgeBaseEntry, Vec<u8>)) -> Result<KnowledgeBaseEntry> {
    let bytes: [u8; 16] = bytes.try_into().map_err(|raw: Vec<u8>| DbError::Corrupt {
        table: TABLE_ENTRIES,
        message: format!("entry {} has a {}-byte fingerprint", entry.id, raw.len()),
    })?;
    entry.fingerprint = Fingerprint::from_bytes(bytes);
    Ok(entry)
}

/// Turn constraint failures into the store's error kinds.
fn map_write_err(err: rusqlite::Error, what: impl FnOnce() -> String) -> DbError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        match failure.extended_code {
            rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                return DbError::Duplicate(what());
            }
            rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                return DbError::NotFound(what());
            }
            _ => {}
        }
    }
    DbError::Sqlite(err)
}

fn insert_interpretation_on(conn: &Connection, new: &NewInterpretation) -> Result<Interpretation> {
    conn.execute(INSERT_INTERPRETATION, params![new.text, new.citations, new.source_row])
        .map_err(|e| map_write_err(e, || format!("interpretation for source row {}", new.source_row)))?;
    Ok(Interpretation {
        id: InterpretationId(conn.last_insert_rowid()),
        text: new.text.clone(),
        citations: new.citations.clone(),
        source_row: new.source_row,
    })
}

fn insert_entry_on(conn: &Connection, new: &NewEntry) -> Result<KnowledgeBaseEntry> {
    let mut stmt = conn.prepare_cached(INSERT_ENTRY)?;
    stmt.execute(params![
        new.gene,
        new.tumor_type,
        new.tissue_type,
        new.variant,
        new.tier,
        new.interpretation_id.0,
        new.source_row,
        new.fingerprint.as_bytes().as_slice(),
    ])
    .map_err(|e| {
        map_write_err(e, || {
            format!(
                "entry fingerprint {} (interpretation {})",
                new.fingerprint, new.interpretation_id
            )
        })
    })?;
    Ok(new.clone().into_entry(EntryId(conn.last_insert_rowid())))
}

impl KnowledgeBaseStore for SqliteStore {
    fn find_category(&self, kind: CategoryKind, label: &str) -> Result<Option<Category>> {
        let found = self
            .conn
            .query_row(
                "SELECT id, label FROM categories WHERE kind = ?1 AND label = ?2",
                params![kind.as_str(), label],
                |row| {
                    Ok(Category {
                        id: CategoryId(row.get(0)?),
                        kind,
                        label: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(found)
    }

    fn insert_category(&mut self, kind: CategoryKind, label: &str) -> Result<Category> {
        self.conn
            .execute(
                "INSERT INTO categories (kind, label) VALUES (?1, ?2)",
                params![kind.as_str(), label],
            )
            .map_err(|e| map_write_err(e, || format!("{kind} category '{label}'")))?;
        Ok(Category {
            id: CategoryId(self.conn.last_insert_rowid()),
            kind,
            label: label.to_string(),
        })
    }

    fn category_labels(&self, kind: CategoryKind) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT label FROM categories WHERE kind = ?1 ORDER BY label")?;
        let labels = stmt
            .query_map(params![kind.as_str()], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(labels)
    }

    fn count_categories(&self, kind: CategoryKind) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM categories WHERE kind = ?1",
            params![kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn find_interpretation_by_source(&self, source_row: u32) -> Result<Option<Interpretation>> {
        let found = self
            .conn
            .query_row(
                "SELECT id, text, citations, source_row FROM interpretations WHERE source_row = ?1",
                params![source_row],
                row_to_interpretation,
            )
            .optional()?;
        Ok(found)
    }

    fn insert_interpretation(&mut self, new: &NewInterpretation) -> Result<Interpretation> {
        insert_interpretation_on(&self.conn, new)
    }

    fn insert_interpretations(&mut self, new: &[NewInterpretation]) -> Result<Vec<Interpretation>> {
        let tx = self.conn.transaction()?;
        let created = new
            .iter()
            .map(|item| insert_interpretation_on(&tx, item))
            .collect::<Result<Vec<_>>>()?;
        tx.commit()?;
        Ok(created)
    }

    fn interpretations_by_id(&self, ids: &[InterpretationId]) -> Result<Vec<Interpretation>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT id, text, citations, source_row FROM {TABLE_INTERPRETATIONS}
             WHERE id IN ({placeholders}) ORDER BY id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(ids.iter().map(|id| id.0)), row_to_interpretation)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn count_interpretations(&self) -> Result<usize> {
        self.count(TABLE_INTERPRETATIONS)
    }

    fn find_entry_by_fingerprint(&self, fingerprint: &Fingerprint) -> Result<Option<KnowledgeBaseEntry>> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM {TABLE_ENTRIES} WHERE fingerprint = ?1");
        let found = self
            .conn
            .query_row(&sql, params![fingerprint.as_bytes().as_slice()], row_to_entry)
            .optional()?;
        found.map(finish_entry).transpose()
    }

    fn insert_entry(&mut self, new: &NewEntry) -> Result<KnowledgeBaseEntry> {
        insert_entry_on(&self.conn, new)
    }

    fn insert_entries(&mut self, new: &[NewEntry]) -> Result<Vec<KnowledgeBaseEntry>> {
        // Dropping the transaction on error rolls the whole batch back.
        let tx = self.conn.transaction()?;
        let created = new
            .iter()
            .map(|item| insert_entry_on(&tx, item))
            .collect::<Result<Vec<_>>>()?;
        tx.commit()?;
        tracing::debug!(count = created.len(), path = %self.path, "Bulk inserted entries");
        Ok(created)
    }

    fn entries_for_genes(&self, genes: &[String]) -> Result<Vec<KnowledgeBaseEntry>> {
        if genes.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; genes.len()].join(", ");
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM {TABLE_ENTRIES} WHERE gene IN ({placeholders}) ORDER BY id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(genes.iter()), row_to_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(finish_entry).collect()
    }

    fn count_entries(&self) -> Result<usize> {
        self.count(TABLE_ENTRIES)
    }

    fn insert_bulk(&mut self, load: &BulkLoad) -> Result<BulkLoaded> {
        let tx = self.conn.transaction()?;
        let interpretations = load
            .interpretations
            .iter()
            .map(|item| insert_interpretation_on(&tx, item))
            .collect::<Result<Vec<_>>>()?;

        let mut entries = Vec::with_capacity(load.entries.len());
        for (reference, item) in &load.entries {
            let interpretation_id = match *reference {
                InterpretationRef::Stored(id) => id,
                InterpretationRef::Pending(idx) => interpretations
                    .get(idx)
                    .map(|created: &Interpretation| created.id)
                    .ok_or_else(|| DbError::NotFound(format!("pending interpretation #{idx}")))?,
            };
            entries.push(insert_entry_on(&tx, &item.with_interpretation(interpretation_id))?);
        }
        tx.commit()?;

        tracing::debug!(
            interpretations = interpretations.len(),
            entries = entries.len(),
            path = %self.path,
            "Bulk loaded SQLite store"
        );
        Ok(BulkLoaded {
            interpretations,
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TABLE_CATEGORIES;

    #[test]
    fn test_initialize_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.initialize().unwrap();
        assert_eq!(store.count(TABLE_CATEGORIES).unwrap(), 0);
        assert_eq!(store.path(), ":memory:");
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("kb.sqlite3");
        let mut store = SqliteStore::open(&path).unwrap();
        store.insert_category(CategoryKind::Tumor, "Any").unwrap();
        drop(store);

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.category_labels(CategoryKind::Tumor).unwrap(), vec!["Any"]);
    }

    #[test]
    fn test_from_config_opens_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("kb.sqlite3");
        let config = DatabaseConfig { path: path.to_string_lossy().to_string() };

        let store = SqliteStore::from_config(&config).unwrap();
        assert_eq!(store.path(), config.path);
        assert!(path.exists());
    }

    #[test]
    fn test_short_fingerprint_is_reported_as_corrupt() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let interpretation = store
            .insert_interpretation(&NewInterpretation {
                text: "Bar".into(),
                citations: String::new(),
                source_row: 0,
            })
            .unwrap();
        store
            .conn
            .execute(
                "INSERT INTO entries
                 (gene, tumor_type, tissue_type, variant, tier, interpretation_id, source_row, fingerprint)
                 VALUES ('NRAS', 'Any', 'Any', 'NRAS Q61K', 1, ?1, 0, x'00ff')",
                params![interpretation.id.0],
            )
            .unwrap();

        let err = store.entries_for_genes(&["NRAS".to_string()]).unwrap_err();
        assert!(matches!(err, DbError::Corrupt { table: TABLE_ENTRIES, .. }), "got {err:?}");
    }
}
