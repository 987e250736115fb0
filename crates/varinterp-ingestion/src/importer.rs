//! Knowledge-base importer.
//!
//! Loads expanded curated rows into a store at most once per fingerprint:
//!   1. Canonicalise labels and fingerprint every row
//!   2. Drop in-batch duplicates and rows with malformed labels
//!   3. Check every referenced category label exists
//!   4. Write: one bulk insert into an empty store, otherwise get-or-create
//!      row by row
//!
//! Re-running a batch is safe: the second run creates nothing.

use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use varinterp_common::{canonicalize_category, Fingerprint, ImportConfig};
use varinterp_db::{
    BulkLoad, CategoryKind, InterpretationId, InterpretationRef, KnowledgeBaseEntry,
    KnowledgeBaseStore, NewEntry, NewInterpretation, Upserted,
};

use crate::error::{ImportError, Result};
use crate::pmkb::{CurationSheet, CuratedRow};

// ── Summary types ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportPath {
    /// Empty store: new interpretations and all entries in one write.
    Bulk,
    /// Populated store: lookup-then-insert per row.
    Incremental,
}

impl fmt::Display for ImportPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportPath::Bulk => write!(f, "bulk"),
            ImportPath::Incremental => write!(f, "incremental"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Same logical row appeared earlier in the batch.
    DuplicateInBatch,
    /// Fingerprint already taken by a row with different content.
    FingerprintCollision,
    /// Source row already holds an interpretation with different text or citations.
    ConflictingInterpretation,
    /// Tumor or tissue label with a control character or a comma.
    MalformedLabel,
    MalformedTier,
}

/// A row that was not inserted, kept for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRow {
    pub source_row: u32,
    pub gene: String,
    pub variant: String,
    pub fingerprint: Fingerprint,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSummary {
    pub batch_id: Uuid,
    pub path: ImportPath,
    pub created: usize,
    pub skipped: usize,
    pub interpretations_created: usize,
    pub interpretations_skipped: usize,
    pub skipped_rows: Vec<SkippedRow>,
    pub finished_at: DateTime<Utc>,
}

impl ImportSummary {
    /// Skipped rows that need a curator's attention (everything except
    /// plain in-batch duplicates).
    pub fn anomalies(&self) -> impl Iterator<Item = &SkippedRow> {
        self.skipped_rows
            .iter()
            .filter(|row| row.reason != SkipReason::DuplicateInBatch)
    }
}

// ── Batch planning ───────────────────────────────────────────────────────────

/// A curated row with canonical labels and its fingerprint.
struct PlannedRow<'r> {
    row: &'r CuratedRow,
    tumor_type: String,
    tissue_type: String,
    tier: Option<i64>,
    fingerprint: Fingerprint,
}

impl<'r> PlannedRow<'r> {
    fn new(row: &'r CuratedRow) -> Self {
        Self {
            row,
            tumor_type: canonicalize_category(&row.tumor_type),
            tissue_type: canonicalize_category(&row.tissue_type),
            tier: row.tier(),
            fingerprint: row.fingerprint(),
        }
    }

    fn same_content(&self, other: &PlannedRow<'_>) -> bool {
        self.row.gene == other.row.gene
            && self.tumor_type == other.tumor_type
            && self.tissue_type == other.tissue_type
            && self.row.variant == other.row.variant
            && self.tier == other.tier
            && self.row.interpretation == other.row.interpretation
            && self.row.citation == other.row.citation
            && self.row.source_row == other.row.source_row
    }

    fn matches_entry(&self, entry: &KnowledgeBaseEntry) -> bool {
        entry.gene == self.row.gene
            && entry.tumor_type == self.tumor_type
            && entry.tissue_type == self.tissue_type
            && entry.variant == self.row.variant
            && Some(entry.tier) == self.tier
            && entry.source_row == self.row.source_row
    }

    fn new_interpretation(&self) -> NewInterpretation {
        NewInterpretation {
            text: self.row.interpretation.clone(),
            citations: self.row.citation.clone(),
            source_row: self.row.source_row,
        }
    }

    fn new_entry(&self, tier: i64, interpretation_id: InterpretationId) -> NewEntry {
        NewEntry {
            gene: self.row.gene.clone(),
            tumor_type: self.tumor_type.clone(),
            tissue_type: self.tissue_type.clone(),
            variant: self.row.variant.clone(),
            tier,
            interpretation_id,
            source_row: self.row.source_row,
            fingerprint: self.fingerprint,
        }
    }

    fn skipped(&self, reason: SkipReason) -> SkippedRow {
        SkippedRow {
            source_row: self.row.source_row,
            gene: self.row.gene.clone(),
            variant: self.row.variant.clone(),
            fingerprint: self.fingerprint,
            reason,
        }
    }
}

fn is_malformed_label(label: &str) -> bool {
    label.chars().any(|c| c.is_control() || c == ',')
}

/// Cache key for interpretations during one bulk load. Distinct from the
/// entry fingerprint: one interpretation backs many entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct InterpretationKey {
    text: String,
    citations: String,
    source_row: u32,
}

impl From<&NewInterpretation> for InterpretationKey {
    fn from(new: &NewInterpretation) -> Self {
        Self {
            text: new.text.clone(),
            citations: new.citations.clone(),
            source_row: new.source_row,
        }
    }
}

/// Counters shared by both write paths.
#[derive(Default)]
struct Tally {
    created: usize,
    skipped: usize,
    interpretations_created: usize,
    interpretations_skipped: usize,
    skipped_rows: Vec<SkippedRow>,
}

impl Tally {
    fn skip(&mut self, planned: &PlannedRow<'_>, reason: SkipReason) {
        let skipped = planned.skipped(reason);
        if reason == SkipReason::DuplicateInBatch {
            debug!(source_row = skipped.source_row, gene = %skipped.gene, "Duplicate row in batch, skipping");
        } else {
            warn!(
                source_row = skipped.source_row,
                gene = %skipped.gene,
                variant = %skipped.variant,
                fingerprint = %skipped.fingerprint,
                reason = ?reason,
                "Row not imported"
            );
        }
        self.skipped += 1;
        self.skipped_rows.push(skipped);
    }
}

// ── Importer ─────────────────────────────────────────────────────────────────

pub struct Importer<'s, S: KnowledgeBaseStore + ?Sized> {
    store: &'s mut S,
    config: ImportConfig,
}

impl<'s, S: KnowledgeBaseStore + ?Sized> Importer<'s, S> {
    pub fn new(store: &'s mut S, config: ImportConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &*self.store
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Expand and import a whole curated sheet.
    pub fn import_sheet(&mut self, sheet: &CurationSheet) -> Result<ImportSummary> {
        self.import_batch(&sheet.expand())
    }

    /// Import a batch of curated rows.
    ///
    /// Fails without writing anything if a referenced category label is not
    /// in the store, or (bulk path only) if any row has a malformed tier.
    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub fn import_batch(&mut self, rows: &[CuratedRow]) -> Result<ImportSummary> {
        let batch_id = Uuid::new_v4();
        let mut tally = Tally::default();

        // Pre-pass: first occurrence of each fingerprint wins.
        let mut planned: Vec<PlannedRow<'_>> = Vec::with_capacity(rows.len());
        let mut first_seen: HashMap<Fingerprint, usize> = HashMap::with_capacity(rows.len());
        for row in rows {
            let candidate = PlannedRow::new(row);
            if is_malformed_label(&row.tumor_type) || is_malformed_label(&row.tissue_type) {
                tally.skip(&candidate, SkipReason::MalformedLabel);
                continue;
            }
            if let Some(&idx) = first_seen.get(&candidate.fingerprint) {
                let reason = if planned[idx].same_content(&candidate) {
                    SkipReason::DuplicateInBatch
                } else {
                    SkipReason::FingerprintCollision
                };
                tally.skip(&candidate, reason);
                continue;
            }
            first_seen.insert(candidate.fingerprint, planned.len());
            planned.push(candidate);
        }

        self.check_categories(&planned)?;

        let path = if self.config.bulk_load && self.store.count_entries()? == 0 {
            ImportPath::Bulk
        } else {
            ImportPath::Incremental
        };
        info!(
            batch_id = %batch_id,
            path = %path,
            unique_rows = planned.len(),
            limit = ?self.config.limit(),
            "Starting knowledge-base import"
        );

        match path {
            ImportPath::Bulk => self.bulk_load(&planned, &mut tally)?,
            ImportPath::Incremental => self.incremental_load(&planned, &mut tally)?,
        }

        let summary = ImportSummary {
            batch_id,
            path,
            created: tally.created,
            skipped: tally.skipped,
            interpretations_created: tally.interpretations_created,
            interpretations_skipped: tally.interpretations_skipped,
            skipped_rows: tally.skipped_rows,
            finished_at: Utc::now(),
        };
        info!(
            batch_id = %summary.batch_id,
            path = %summary.path,
            created = summary.created,
            skipped = summary.skipped,
            interpretations_created = summary.interpretations_created,
            interpretations_skipped = summary.interpretations_skipped,
            anomalies = summary.anomalies().count(),
            "Knowledge-base import complete"
        );
        Ok(summary)
    }

    /// Every label a planned row references must already be in the store.
    fn check_categories(&self, planned: &[PlannedRow<'_>]) -> Result<()> {
        let mut checked: HashSet<(CategoryKind, &str)> = HashSet::new();
        for row in planned {
            for (kind, label) in [
                (CategoryKind::Tumor, row.tumor_type.as_str()),
                (CategoryKind::Tissue, row.tissue_type.as_str()),
            ] {
                if !checked.insert((kind, label)) {
                    continue;
                }
                if self.store.find_category(kind, label)?.is_none() {
                    return Err(ImportError::MissingCategory {
                        kind,
                        label: label.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn bulk_load(&mut self, planned: &[PlannedRow<'_>], tally: &mut Tally) -> Result<()> {
        let limit = self.config.limit().unwrap_or(usize::MAX);
        let planned = &planned[..planned.len().min(limit)];

        // No partial bulk write: every tier must parse before anything is stored.
        let mut tiers = Vec::with_capacity(planned.len());
        for row in planned {
            let tier = row.tier.ok_or_else(|| ImportError::MalformedTier {
                source_row: row.row.source_row,
                value: row.row.tier.clone(),
            })?;
            tiers.push(tier);
        }

        // Interpretation cache for this batch only.
        let mut cache: HashMap<InterpretationKey, InterpretationRef> = HashMap::new();
        let mut claimed_sources: HashMap<u32, InterpretationKey> = HashMap::new();
        let mut load = BulkLoad::default();

        // Rows whose key never reaches the cache are reported below.
        for row in planned {
            let new = row.new_interpretation();
            let key = InterpretationKey::from(&new);
            if cache.contains_key(&key) {
                continue;
            }
            if claimed_sources.get(&new.source_row).is_some_and(|claimed| *claimed != key) {
                continue;
            }
            claimed_sources.insert(new.source_row, key.clone());

            match self.store.find_interpretation_by_source(new.source_row)? {
                Some(existing) if existing.text == new.text && existing.citations == new.citations => {
                    tally.interpretations_skipped += 1;
                    cache.insert(key, InterpretationRef::Stored(existing.id));
                }
                Some(_) => {}
                None => {
                    cache.insert(key, InterpretationRef::Pending(load.interpretations.len()));
                    load.interpretations.push(new);
                }
            }
        }

        for (row, tier) in planned.iter().zip(tiers) {
            let key = InterpretationKey::from(&row.new_interpretation());
            match cache.get(&key) {
                Some(&reference) => {
                    let stored_id = match reference {
                        InterpretationRef::Stored(id) => id,
                        InterpretationRef::Pending(_) => InterpretationId::UNASSIGNED,
                    };
                    load.entries.push((reference, row.new_entry(tier, stored_id)));
                }
                None => tally.skip(row, SkipReason::ConflictingInterpretation),
            }
        }

        // One write for both tables: a failure leaves no interpretations behind.
        let loaded = self.store.insert_bulk(&load)?;
        tally.interpretations_created += loaded.interpretations.len();
        tally.created += loaded.entries.len();
        debug!(
            entries = loaded.entries.len(),
            interpretations = loaded.interpretations.len(),
            "Bulk write complete"
        );
        Ok(())
    }

    fn incremental_load(&mut self, planned: &[PlannedRow<'_>], tally: &mut Tally) -> Result<()> {
        let limit = self.config.limit();
        let mut counted_sources: HashSet<u32> = HashSet::new();

        for row in planned {
            if limit.is_some_and(|limit| tally.created >= limit) {
                debug!(created = tally.created, "Import limit reached");
                break;
            }

            let Some(tier) = row.tier else {
                tally.skip(row, SkipReason::MalformedTier);
                continue;
            };

            let new = row.new_interpretation();
            let upserted = self.store.get_or_create_interpretation(&new)?;
            if counted_sources.insert(new.source_row) {
                if upserted.was_created() {
                    tally.interpretations_created += 1;
                } else {
                    tally.interpretations_skipped += 1;
                }
            }
            let interpretation = upserted.into_inner();
            if interpretation.text != new.text || interpretation.citations != new.citations {
                tally.skip(row, SkipReason::ConflictingInterpretation);
                continue;
            }

            match self.store.get_or_create_entry(&row.new_entry(tier, interpretation.id))? {
                Upserted::Created(entry) => {
                    debug!(entry_id = %entry.id, fingerprint = %entry.fingerprint, "Created entry");
                    tally.created += 1;
                }
                Upserted::Existing(entry) if row.matches_entry(&entry) => {
                    tally.skipped += 1;
                }
                Upserted::Existing(_) => tally.skip(row, SkipReason::FingerprintCollision),
            }
        }
        Ok(())
    }
}
