//! Interpretation matcher.
//!
//! Looks up every knowledge-base entry for a gene set, narrows it by tumor
//! type, tissue type and variant, and groups what is left under the
//! interpretation each entry references.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use varinterp_common::{canonicalize_category, ANY_LABEL};
use varinterp_db::{
    CategoryKind, EntryId, Interpretation, InterpretationId, KnowledgeBaseEntry, KnowledgeBaseStore,
};

use crate::error::{KbError, Result};

// ── Filter ───────────────────────────────────────────────────────────────────

/// Optional constraints on the three filter dimensions.
///
/// `None` and the `"Any"` label both mean "unconstrained". Tumor and tissue
/// labels are canonicalised on the way in, so `"lung"` constrains to `"Lung"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchFilter {
    tumor_type: Option<String>,
    tissue_type: Option<String>,
    variant: Option<String>,
}

impl MatchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tumor_type(mut self, label: impl AsRef<str>) -> Self {
        self.tumor_type = category_constraint(label.as_ref());
        self
    }

    pub fn tissue_type(mut self, label: impl AsRef<str>) -> Self {
        self.tissue_type = category_constraint(label.as_ref());
        self
    }

    /// Variants match exactly; only surrounding whitespace is dropped.
    pub fn variant(mut self, variant: impl AsRef<str>) -> Self {
        let variant = variant.as_ref().trim();
        self.variant = (!variant.is_empty() && variant != ANY_LABEL).then(|| variant.to_string());
        self
    }

    /// Overlay a table's tumor/tissue context. Absent context values keep
    /// whatever this filter already says.
    pub fn with_context(&self, tumor_type: Option<&str>, tissue_type: Option<&str>) -> Self {
        let mut filter = self.clone();
        if let Some(label) = tumor_type {
            filter = filter.tumor_type(label);
        }
        if let Some(label) = tissue_type {
            filter = filter.tissue_type(label);
        }
        filter
    }

    pub fn tumor_type_constraint(&self) -> Option<&str> {
        self.tumor_type.as_deref()
    }

    pub fn tissue_type_constraint(&self) -> Option<&str> {
        self.tissue_type.as_deref()
    }

    pub fn variant_constraint(&self) -> Option<&str> {
        self.variant.as_deref()
    }

    pub fn is_unconstrained(&self) -> bool {
        self.tumor_type.is_none() && self.tissue_type.is_none() && self.variant.is_none()
    }

    /// Narrow `entries` by tumor type, then tissue type, then variant.
    fn apply(&self, entries: &mut Vec<KnowledgeBaseEntry>) {
        if let Some(tumor_type) = &self.tumor_type {
            entries.retain(|e| &e.tumor_type == tumor_type);
        }
        if let Some(tissue_type) = &self.tissue_type {
            entries.retain(|e| &e.tissue_type == tissue_type);
        }
        if let Some(variant) = &self.variant {
            entries.retain(|e| &e.variant == variant);
        }
    }
}

fn category_constraint(label: &str) -> Option<String> {
    let canonical = canonicalize_category(label);
    (canonical != ANY_LABEL).then_some(canonical)
}

// ── Result ───────────────────────────────────────────────────────────────────

/// One matched interpretation and the entries that led to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterpretationMatch {
    pub interpretation: Interpretation,
    /// Distinct entries, ascending by id.
    pub variants: Vec<KnowledgeBaseEntry>,
}

/// Matched interpretations, ascending by interpretation source row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub groups: Vec<InterpretationMatch>,
}

impl MatchResult {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, InterpretationMatch> {
        self.groups.iter()
    }

    /// Total number of entries across all groups.
    pub fn variant_count(&self) -> usize {
        self.groups.iter().map(|g| g.variants.len()).sum()
    }

    pub fn get(&self, source_row: u32) -> Option<&InterpretationMatch> {
        self.groups
            .iter()
            .find(|g| g.interpretation.source_row == source_row)
    }
}

impl<'a> IntoIterator for &'a MatchResult {
    type Item = &'a InterpretationMatch;
    type IntoIter = std::slice::Iter<'a, InterpretationMatch>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

// ── Matcher ──────────────────────────────────────────────────────────────────

pub struct Matcher<'s, S: KnowledgeBaseStore + ?Sized> {
    store: &'s S,
}

impl<'s, S: KnowledgeBaseStore + ?Sized> Matcher<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Interpretations for any of `genes` that pass `filter`. An unknown gene
    /// or label gives an empty result, not an error.
    #[instrument(skip(self, genes, filter), fields(genes = genes.len()))]
    pub fn match_genes(&self, genes: &[String], filter: &MatchFilter) -> Result<MatchResult> {
        if genes.is_empty() {
            return Ok(MatchResult::default());
        }

        let mut candidates = self.store.entries_for_genes(genes)?;
        let found = candidates.len();
        filter.apply(&mut candidates);

        let mut seen: HashSet<EntryId> = HashSet::with_capacity(candidates.len());
        let mut grouped: BTreeMap<InterpretationId, Vec<KnowledgeBaseEntry>> = BTreeMap::new();
        for entry in candidates {
            if seen.insert(entry.id) {
                grouped.entry(entry.interpretation_id).or_default().push(entry);
            }
        }

        let ids: Vec<InterpretationId> = grouped.keys().copied().collect();
        let interpretations = self.store.interpretations_by_id(&ids)?;

        let mut groups = Vec::with_capacity(interpretations.len());
        for interpretation in interpretations {
            if let Some(mut variants) = grouped.remove(&interpretation.id) {
                variants.sort_by_key(|e| e.id);
                groups.push(InterpretationMatch {
                    interpretation,
                    variants,
                });
            }
        }
        if let Some(&missing) = grouped.keys().next() {
            return Err(KbError::MissingInterpretation(missing));
        }
        groups.sort_by_key(|g| (g.interpretation.source_row, g.interpretation.id));

        debug!(
            found,
            groups = groups.len(),
            unconstrained = filter.is_unconstrained(),
            "Matched knowledge-base entries"
        );
        Ok(MatchResult { groups })
    }

    /// Tumor-type labels known to the store, sorted.
    pub fn tumor_types(&self) -> Result<Vec<String>> {
        Ok(self.store.category_labels(CategoryKind::Tumor)?)
    }

    /// Tissue-type labels known to the store, sorted.
    pub fn tissue_types(&self) -> Result<Vec<String>> {
        Ok(self.store.category_labels(CategoryKind::Tissue)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use varinterp_db::MemoryStore;
    use varinterp_test_utils::{seed_nras_knowledge_base, NRAS_VARIANT};

    fn nras_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        seed_nras_knowledge_base(&mut store).unwrap();
        store
    }

    fn genes(names: &[&str]) -> Vec<String> {
        names.iter().map(|g| g.to_string()).collect()
    }

    #[test]
    fn test_filter_canonicalises_labels() {
        let filter = MatchFilter::new().tumor_type("adenocarcinoma").tissue_type(" All ");
        assert_eq!(filter.tumor_type_constraint(), Some("Adenocarcinoma"));
        assert_eq!(filter.tissue_type_constraint(), None);
        assert!(MatchFilter::new().tumor_type("Any").variant("").is_unconstrained());
    }

    #[test]
    fn test_context_overrides_only_present_values() {
        let base = MatchFilter::new().tumor_type("Carcinoma").variant(NRAS_VARIANT);
        let filter = base.with_context(None, Some("skin"));
        assert_eq!(filter.tumor_type_constraint(), Some("Carcinoma"));
        assert_eq!(filter.tissue_type_constraint(), Some("Skin"));
        assert_eq!(filter.variant_constraint(), Some(NRAS_VARIANT));
    }

    #[test]
    fn test_unfiltered_groups_by_interpretation() {
        let store = nras_store();
        let result = Matcher::new(&store)
            .match_genes(&genes(&["NRAS"]), &MatchFilter::new())
            .unwrap();

        assert_eq!(result.len(), 2);
        let texts: Vec<&str> = result.iter().map(|g| g.interpretation.text.as_str()).collect();
        assert_eq!(texts, vec!["Bar", "Baz"]);
        assert!(result.iter().all(|g| g.variants.len() == 9));
        assert_eq!(result.variant_count(), 18);
    }

    #[test]
    fn test_filters_compose() {
        let store = nras_store();
        let filter = MatchFilter::new().tissue_type("Lung").tumor_type("Adenocarcinoma");
        let result = Matcher::new(&store).match_genes(&genes(&["NRAS"]), &filter).unwrap();

        assert_eq!(result.len(), 2);
        for group in &result {
            assert_eq!(group.variants.len(), 1);
            assert_eq!(group.variants[0].tissue_type, "Lung");
            assert_eq!(group.variants[0].tumor_type, "Adenocarcinoma");
        }
    }

    #[test]
    fn test_unknown_gene_or_label_is_empty() {
        let store = nras_store();
        let matcher = Matcher::new(&store);
        assert!(matcher.match_genes(&genes(&["IDH1"]), &MatchFilter::new()).unwrap().is_empty());
        assert!(matcher.match_genes(&[], &MatchFilter::new()).unwrap().is_empty());
        let unknown = MatchFilter::new().tumor_type("Melanoma");
        assert!(matcher.match_genes(&genes(&["NRAS"]), &unknown).unwrap().is_empty());
        let other_variant = MatchFilter::new().variant("NRAS G12D");
        assert!(matcher.match_genes(&genes(&["NRAS"]), &other_variant).unwrap().is_empty());
    }

    #[test]
    fn test_gene_set_is_an_or() {
        let store = nras_store();
        let result = Matcher::new(&store)
            .match_genes(&genes(&["IDH1", "NRAS", "NRAS"]), &MatchFilter::new().tumor_type("Any"))
            .unwrap();
        // "Any" is a wildcard, and a repeated gene does not repeat entries
        assert_eq!(result.variant_count(), 18);
    }

    #[test]
    fn test_label_pick_lists() {
        let store = nras_store();
        let matcher = Matcher::new(&store);
        assert_eq!(matcher.tumor_types().unwrap(), vec!["Adenocarcinoma", "Any", "Carcinoma"]);
        assert_eq!(matcher.tissue_types().unwrap(), vec!["Any", "Lung", "Skin"]);
    }
}
