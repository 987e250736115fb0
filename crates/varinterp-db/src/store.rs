//! The logical read/write contract the importer and matcher need from a store.
//!
//! Writes take `&mut self`: a store is only mutated from one place at a time,
//! and rows are never updated after they are created.

use varinterp_common::Fingerprint;

use crate::error::Result;
use crate::schema::{
    BulkLoad, BulkLoaded, Category, CategoryKind, Interpretation, InterpretationId,
    KnowledgeBaseEntry, NewEntry, NewInterpretation,
};

/// Outcome of a get-or-create: the row that was found, or the row just inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upserted<T> {
    Existing(T),
    Created(T),
}

impl<T> Upserted<T> {
    pub fn was_created(&self) -> bool {
        matches!(self, Upserted::Created(_))
    }

    pub fn get(&self) -> &T {
        match self {
            Upserted::Existing(value) | Upserted::Created(value) => value,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Upserted::Existing(value) | Upserted::Created(value) => value,
        }
    }
}

pub trait KnowledgeBaseStore {
    // ── Categories ───────────────────────────────────────────────────────────

    fn find_category(&self, kind: CategoryKind, label: &str) -> Result<Option<Category>>;

    /// Fails with `DbError::Duplicate` if `(kind, label)` already exists.
    fn insert_category(&mut self, kind: CategoryKind, label: &str) -> Result<Category>;

    /// Distinct labels of one kind, sorted ascending.
    fn category_labels(&self, kind: CategoryKind) -> Result<Vec<String>>;

    fn count_categories(&self, kind: CategoryKind) -> Result<usize>;

    // ── Interpretations ──────────────────────────────────────────────────────

    fn find_interpretation_by_source(&self, source_row: u32) -> Result<Option<Interpretation>>;

    /// Fails with `DbError::Duplicate` if the source row is taken.
    fn insert_interpretation(&mut self, new: &NewInterpretation) -> Result<Interpretation>;

    /// Insert every interpretation or none of them.
    fn insert_interpretations(&mut self, new: &[NewInterpretation]) -> Result<Vec<Interpretation>>;

    /// Interpretations with the given ids, in ascending id order. Unknown ids are ignored.
    fn interpretations_by_id(&self, ids: &[InterpretationId]) -> Result<Vec<Interpretation>>;

    fn count_interpretations(&self) -> Result<usize>;

    // ── Entries ──────────────────────────────────────────────────────────────

    fn find_entry_by_fingerprint(&self, fingerprint: &Fingerprint) -> Result<Option<KnowledgeBaseEntry>>;

    /// Fails with `DbError::Duplicate` on a fingerprint clash and
    /// `DbError::NotFound` if the interpretation does not exist.
    fn insert_entry(&mut self, new: &NewEntry) -> Result<KnowledgeBaseEntry>;

    /// Insert every entry or none of them.
    fn insert_entries(&mut self, new: &[NewEntry]) -> Result<Vec<KnowledgeBaseEntry>>;

    /// Every entry whose gene is one of `genes`, in ascending id order.
    fn entries_for_genes(&self, genes: &[String]) -> Result<Vec<KnowledgeBaseEntry>>;

    fn count_entries(&self) -> Result<usize>;

    /// Write new interpretations and the entries that reference them as one
    /// unit: either every row is stored or none is. A `Pending` reference past
    /// the end of `interpretations` fails with `DbError::NotFound`.
    fn insert_bulk(&mut self, load: &BulkLoad) -> Result<BulkLoaded>;

    // ── Get-or-create ────────────────────────────────────────────────────────

    fn get_or_create_category(&mut self, kind: CategoryKind, label: &str) -> Result<Upserted<Category>> {
        if let Some(existing) = self.find_category(kind, label)? {
            return Ok(Upserted::Existing(existing));
        }
        self.insert_category(kind, label).map(Upserted::Created)
    }

    fn get_or_create_interpretation(&mut self, new: &NewInterpretation) -> Result<Upserted<Interpretation>> {
        if let Some(existing) = self.find_interpretation_by_source(new.source_row)? {
            return Ok(Upserted::Existing(existing));
        }
        self.insert_interpretation(new).map(Upserted::Created)
    }

    fn get_or_create_entry(&mut self, new: &NewEntry) -> Result<Upserted<KnowledgeBaseEntry>> {
        if let Some(existing) = self.find_entry_by_fingerprint(&new.fingerprint)? {
            return Ok(Upserted::Existing(existing));
        }
        self.insert_entry(new).map(Upserted::Created)
    }
}
