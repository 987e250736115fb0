//! Entity definitions for the knowledge-base store.
//!
//! Rows are handed out as typed values; callers never see backend rows.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use varinterp_common::Fingerprint;

pub const TABLE_CATEGORIES: &str = "categories";
pub const TABLE_INTERPRETATIONS: &str = "interpretations";
pub const TABLE_ENTRIES: &str = "entries";

// =============================================================================
// Identifiers
// =============================================================================

macro_rules! row_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

row_id!(CategoryId);
row_id!(InterpretationId);
row_id!(EntryId);

impl InterpretationId {
    /// Placeholder for an interpretation that has not been written yet.
    /// Never assigned by a store.
    pub const UNASSIGNED: Self = Self(0);
}

// =============================================================================
// Category Schema
// =============================================================================

/// The two category dimensions a knowledge-base entry is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    Tumor,
    Tissue,
}

impl CategoryKind {
    pub const ALL: [CategoryKind; 2] = [CategoryKind::Tumor, CategoryKind::Tissue];

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryKind::Tumor => "tumor",
            CategoryKind::Tissue => "tissue",
        }
    }
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tumor" => Ok(CategoryKind::Tumor),
            "tissue" => Ok(CategoryKind::Tissue),
            other => Err(format!("unknown category kind: {other}")),
        }
    }
}

/// A canonical tumor-type or tissue-type label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub kind: CategoryKind,
    pub label: String,
}

// =============================================================================
// Interpretation Schema
// =============================================================================

/// Curated clinical text plus citations, keyed by the sheet row it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interpretation {
    pub id: InterpretationId,
    pub text: String,
    pub citations: String,
    pub source_row: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NewInterpretation {
    pub text: String,
    pub citations: String,
    pub source_row: u32,
}

// =============================================================================
// Knowledge-base Entry Schema
// =============================================================================

/// One curated variant-to-interpretation association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeBaseEntry {
    pub id: EntryId,
    pub gene: String,
    pub tumor_type: String,
    pub tissue_type: String,
    pub variant: String,
    pub tier: i64,
    pub interpretation_id: InterpretationId,
    pub source_row: u32,
    pub fingerprint: Fingerprint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEntry {
    pub gene: String,
    pub tumor_type: String,
    pub tissue_type: String,
    pub variant: String,
    pub tier: i64,
    pub interpretation_id: InterpretationId,
    pub source_row: u32,
    pub fingerprint: Fingerprint,
}

impl NewEntry {
    pub(crate) fn with_interpretation(&self, interpretation_id: InterpretationId) -> Self {
        Self {
            interpretation_id,
            ..self.clone()
        }
    }

    pub(crate) fn into_entry(self, id: EntryId) -> KnowledgeBaseEntry {
        KnowledgeBaseEntry {
            id,
            gene: self.gene,
            tumor_type: self.tumor_type,
            tissue_type: self.tissue_type,
            variant: self.variant,
            tier: self.tier,
            interpretation_id: self.interpretation_id,
            source_row: self.source_row,
            fingerprint: self.fingerprint,
        }
    }
}

// =============================================================================
// Bulk Load Schema
// =============================================================================

/// The interpretation a bulk-loaded entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterpretationRef {
    /// Already in the store.
    Stored(InterpretationId),
    /// Index into the same load's `interpretations`.
    Pending(usize),
}

/// Interpretations and entries written in one all-or-nothing step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkLoad {
    pub interpretations: Vec<NewInterpretation>,
    /// The `interpretation_id` of each entry is replaced by what its
    /// [`InterpretationRef`] resolves to.
    pub entries: Vec<(InterpretationRef, NewEntry)>,
}

impl BulkLoad {
    pub fn is_empty(&self) -> bool {
        self.interpretations.is_empty() && self.entries.is_empty()
    }
}

/// Rows created by a [`BulkLoad`], in load order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkLoaded {
    pub interpretations: Vec<Interpretation>,
    pub entries: Vec<KnowledgeBaseEntry>,
}
