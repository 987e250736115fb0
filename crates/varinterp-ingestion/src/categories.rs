//! Tumor-type and tissue-type reference lists.
//!
//! The importer only files entries under labels that already exist, so these
//! lists are loaded into the store before any knowledge-base rows.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use varinterp_common::{canonicalize_category, ANY_LABEL};
use varinterp_db::{CategoryKind, KnowledgeBaseStore};

use crate::error::Result;
use crate::pmkb::CuratedRow;

/// Sorted, distinct canonical labels per category kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryLists {
    pub tumor_types: Vec<String>,
    pub tissue_types: Vec<String>,
}

impl CategoryLists {
    pub fn labels(&self, kind: CategoryKind) -> &[String] {
        match kind {
            CategoryKind::Tumor => &self.tumor_types,
            CategoryKind::Tissue => &self.tissue_types,
        }
    }
}

/// Collect the canonical tumor and tissue labels used by expanded sheet rows.
pub fn derive_category_lists(rows: &[CuratedRow]) -> CategoryLists {
    let mut tumor_types = BTreeSet::new();
    let mut tissue_types = BTreeSet::new();
    for row in rows {
        tumor_types.insert(canonicalize_category(&row.tumor_type));
        tissue_types.insert(canonicalize_category(&row.tissue_type));
    }
    CategoryLists {
        tumor_types: tumor_types.into_iter().collect(),
        tissue_types: tissue_types.into_iter().collect(),
    }
}

pub fn write_category_list(path: impl AsRef<Path>, labels: &[String]) -> Result<()> {
    let json = serde_json::to_string_pretty(labels)?;
    std::fs::write(path.as_ref(), json)?;
    debug!(path = %path.as_ref().display(), labels = labels.len(), "Wrote category list");
    Ok(())
}

pub fn read_category_list(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path.as_ref())?;
    Ok(serde_json::from_str(&content)?)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryImport {
    pub created: usize,
    pub skipped: usize,
}

/// Canonicalise `labels` and get-or-create each one. The `"Any"` label is
/// always present afterwards, exactly once.
pub fn import_categories<S: KnowledgeBaseStore + ?Sized>(
    store: &mut S,
    kind: CategoryKind,
    labels: &[String],
) -> Result<CategoryImport> {
    let canonical: BTreeSet<String> = labels
        .iter()
        .map(|label| canonicalize_category(label))
        .chain(std::iter::once(ANY_LABEL.to_string()))
        .collect();

    let mut summary = CategoryImport::default();
    for label in &canonical {
        if store.get_or_create_category(kind, label)?.was_created() {
            summary.created += 1;
        } else {
            summary.skipped += 1;
        }
    }

    info!(
        kind = %kind,
        created = summary.created,
        skipped = summary.skipped,
        "Imported category labels"
    );
    Ok(summary)
}
