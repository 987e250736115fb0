//! In-process store.
//!
//! Tables are plain vectors indexed by position; hash indexes cover every
//! natural key the store contract looks rows up by.

use std::collections::{BTreeSet, HashMap, HashSet};

use varinterp_common::Fingerprint;

use crate::error::{DbError, Result};
use crate::schema::{
    BulkLoad, BulkLoaded, Category, CategoryId, CategoryKind, EntryId, Interpretation,
    InterpretationId, InterpretationRef, KnowledgeBaseEntry, NewEntry, NewInterpretation,
};
use crate::store::KnowledgeBaseStore;

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    categories: Vec<Category>,
    interpretations: Vec<Interpretation>,
    entries: Vec<KnowledgeBaseEntry>,

    category_index: HashMap<(CategoryKind, String), usize>,
    source_index: HashMap<u32, usize>,
    fingerprint_index: HashMap<Fingerprint, usize>,
    gene_index: HashMap<String, Vec<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Ids are 1-based positions, like SQLite rowids on a table with no deletes.
    fn interpretation_index(&self, id: InterpretationId) -> Option<usize> {
        let idx = usize::try_from(id.0).ok()?.checked_sub(1)?;
        (idx < self.interpretations.len()).then_some(idx)
    }

    fn check_interpretation(&self, new: &NewInterpretation) -> Result<()> {
        if self.source_index.contains_key(&new.source_row) {
            return Err(DbError::Duplicate(format!(
                "interpretation for source row {}",
                new.source_row
            )));
        }
        Ok(())
    }

    fn check_interpretation_batch(&self, new: &[NewInterpretation]) -> Result<()> {
        let mut batch_rows = HashSet::with_capacity(new.len());
        for item in new {
            self.check_interpretation(item)?;
            if !batch_rows.insert(item.source_row) {
                return Err(DbError::Duplicate(format!(
                    "interpretation for source row {} repeated in batch",
                    item.source_row
                )));
            }
        }
        Ok(())
    }

    fn check_entry(&self, new: &NewEntry) -> Result<()> {
        if self.fingerprint_index.contains_key(&new.fingerprint) {
            return Err(DbError::Duplicate(format!("entry fingerprint {}", new.fingerprint)));
        }
        if self.interpretation_index(new.interpretation_id).is_none() {
            return Err(DbError::NotFound(format!("interpretation {}", new.interpretation_id)));
        }
        Ok(())
    }

    fn push_interpretation(&mut self, new: &NewInterpretation) -> Interpretation {
        let idx = self.interpretations.len();
        let interpretation = Interpretation {
            id: InterpretationId(idx as i64 + 1),
            text: new.text.clone(),
            citations: new.citations.clone(),
            source_row: new.source_row,
        };
        self.source_index.insert(new.source_row, idx);
        self.interpretations.push(interpretation.clone());
        interpretation
    }

    fn push_entry(&mut self, new: &NewEntry) -> KnowledgeBaseEntry {
        let idx = self.entries.len();
        let entry = new.clone().into_entry(EntryId(idx as i64 + 1));
        self.fingerprint_index.insert(entry.fingerprint, idx);
        self.gene_index.entry(entry.gene.clone()).or_default().push(idx);
        self.entries.push(entry.clone());
        entry
    }
}

impl KnowledgeBaseStore for MemoryStore {
    fn find_category(&self, kind: CategoryKind, label: &str) -> Result<Option<Category>> {
        Ok(self
            .category_index
            .get(&(kind, label.to_string()))
            .map(|&idx| self.categories[idx].clone()))
    }

    fn insert_category(&mut self, kind: CategoryKind, label: &str) -> Result<Category> {
        let key = (kind, label.to_string());
        if self.category_index.contains_key(&key) {
            return Err(DbError::Duplicate(format!("{kind} category '{label}'")));
        }
        let idx = self.categories.len();
        let category = Category {
            id: CategoryId(idx as i64 + 1),
            kind,
            label: label.to_string(),
        };
        self.category_index.insert(key, idx);
        self.categories.push(category.clone());
        Ok(category)
    }

    fn category_labels(&self, kind: CategoryKind) -> Result<Vec<String>> {
        let labels: BTreeSet<&str> = self
            .categories
            .iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.label.as_str())
            .collect();
        Ok(labels.into_iter().map(str::to_string).collect())
    }

    fn count_categories(&self, kind: CategoryKind) -> Result<usize> {
        Ok(self.categories.iter().filter(|c| c.kind == kind).count())
    }

    fn find_interpretation_by_source(&self, source_row: u32) -> Result<Option<Interpretation>> {
        Ok(self
            .source_index
            .get(&source_row)
            .map(|&idx| self.interpretations[idx].clone()))
    }

    fn insert_interpretation(&mut self, new: &NewInterpretation) -> Result<Interpretation> {
        self.check_interpretation(new)?;
        Ok(self.push_interpretation(new))
    }

    fn insert_interpretations(&mut self, new: &[NewInterpretation]) -> Result<Vec<Interpretation>> {
        self.check_interpretation_batch(new)?;
        Ok(new.iter().map(|item| self.push_interpretation(item)).collect())
    }

    fn interpretations_by_id(&self, ids: &[InterpretationId]) -> Result<Vec<Interpretation>> {
        let wanted: BTreeSet<InterpretationId> = ids.iter().copied().collect();
        Ok(wanted
            .into_iter()
            .filter_map(|id| self.interpretation_index(id))
            .map(|idx| self.interpretations[idx].clone())
            .collect())
    }

    fn count_interpretations(&self) -> Result<usize> {
        Ok(self.interpretations.len())
    }

    fn find_entry_by_fingerprint(&self, fingerprint: &Fingerprint) -> Result<Option<KnowledgeBaseEntry>> {
        Ok(self
            .fingerprint_index
            .get(fingerprint)
            .map(|&idx| self.entries[idx].clone()))
    }

    fn insert_entry(&mut self, new: &NewEntry) -> Result<KnowledgeBaseEntry> {
        self.check_entry(new)?;
        Ok(self.push_entry(new))
    }

    fn insert_entries(&mut self, new: &[NewEntry]) -> Result<Vec<KnowledgeBaseEntry>> {
        let mut batch_fingerprints = HashSet::with_capacity(new.len());
        for item in new {
            self.check_entry(item)?;
            if !batch_fingerprints.insert(item.fingerprint) {
                return Err(DbError::Duplicate(format!(
                    "entry fingerprint {} repeated in batch",
                    item.fingerprint
                )));
            }
        }
        let created: Vec<KnowledgeBaseEntry> = new.iter().map(|item| self.push_entry(item)).collect();
        tracing::debug!(count = created.len(), "Bulk inserted entries into memory store");
        Ok(created)
    }

    fn entries_for_genes(&self, genes: &[String]) -> Result<Vec<KnowledgeBaseEntry>> {
        let positions: BTreeSet<usize> = genes
            .iter()
            .filter_map(|gene| self.gene_index.get(gene))
            .flatten()
            .copied()
            .collect();
        Ok(positions.into_iter().map(|idx| self.entries[idx].clone()).collect())
    }

    fn count_entries(&self) -> Result<usize> {
        Ok(self.entries.len())
    }

    fn insert_bulk(&mut self, load: &BulkLoad) -> Result<BulkLoaded> {
        self.check_interpretation_batch(&load.interpretations)?;

        // Pending interpretations take the next positions once pushed.
        let first_pending = self.interpretations.len() as i64 + 1;
        let mut resolved = Vec::with_capacity(load.entries.len());
        let mut batch_fingerprints = HashSet::with_capacity(load.entries.len());
        for (reference, item) in &load.entries {
            let interpretation_id = match *reference {
                InterpretationRef::Stored(id) if self.interpretation_index(id).is_some() => id,
                InterpretationRef::Stored(id) => {
                    return Err(DbError::NotFound(format!("interpretation {id}")));
                }
                InterpretationRef::Pending(idx) if idx < load.interpretations.len() => {
                    InterpretationId(first_pending + idx as i64)
                }
                InterpretationRef::Pending(idx) => {
                    return Err(DbError::NotFound(format!("pending interpretation #{idx}")));
                }
            };
            if self.fingerprint_index.contains_key(&item.fingerprint)
                || !batch_fingerprints.insert(item.fingerprint)
            {
                return Err(DbError::Duplicate(format!("entry fingerprint {}", item.fingerprint)));
            }
            resolved.push(item.with_interpretation(interpretation_id));
        }

        let interpretations: Vec<Interpretation> = load
            .interpretations
            .iter()
            .map(|item| self.push_interpretation(item))
            .collect();
        let entries: Vec<KnowledgeBaseEntry> = resolved.iter().map(|item| self.push_entry(item)).collect();
        tracing::debug!(
            interpretations = interpretations.len(),
            entries = entries.len(),
            "Bulk loaded memory store"
        );
        Ok(BulkLoaded {
            interpretations,
            entries,
        })
    }
}
