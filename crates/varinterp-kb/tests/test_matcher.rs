//! Matcher scenarios against both store backends, plus a sheet-to-match run.
//!
//! ```bash
//! cargo test --package varinterp-kb --test test_matcher
//! ```

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use varinterp_common::{Fingerprint, ImportConfig, IrConfig};
use varinterp_db::{
    CategoryKind, KnowledgeBaseStore, MemoryStore, NewEntry, NewInterpretation, SqliteStore,
};
use varinterp_ingestion::{derive_category_lists, import_categories, CurationSheet, Importer, TableContext, VariantTable};
use varinterp_kb::{interpret_table, MatchFilter, MatchResult, Matcher};
use varinterp_test_utils::{
    init_tracing, seed_nras_knowledge_base, temp_file, NRAS_SHEET_TSV, NRAS_VARIANT, TISSUE_TYPES,
    TUMOR_TYPES, VARIANT_TABLE_TSV,
};

fn nras() -> Vec<String> {
    vec!["NRAS".to_string()]
}

fn texts(result: &MatchResult) -> Vec<&str> {
    result.iter().map(|g| g.interpretation.text.as_str()).collect()
}

// ── Scenarios shared by both backends ────────────────────────────────────────

fn unfiltered_returns_every_combination<S: KnowledgeBaseStore>(store: &mut S) {
    seed_nras_knowledge_base(store).unwrap();
    let result = Matcher::new(&*store).match_genes(&nras(), &MatchFilter::new()).unwrap();

    assert_eq!(texts(&result), vec!["Bar", "Baz"]);
    for group in &result {
        assert_eq!(group.variants.len(), 9);
        assert!(group.variants.iter().all(|e| e.interpretation_id == group.interpretation.id));
        assert!(group.variants.windows(2).all(|w| w[0].id < w[1].id));
    }
}

fn tumor_and_tissue_narrow_to_one<S: KnowledgeBaseStore>(store: &mut S) {
    seed_nras_knowledge_base(store).unwrap();
    let filter = MatchFilter::new().tissue_type("Lung").tumor_type("Adenocarcinoma");
    let result = Matcher::new(&*store).match_genes(&nras(), &filter).unwrap();

    assert_eq!(result.len(), 2);
    for group in &result {
        assert_eq!(group.variants.len(), 1);
        let entry = &group.variants[0];
        assert_eq!((entry.tumor_type.as_str(), entry.tissue_type.as_str()), ("Adenocarcinoma", "Lung"));
        assert_eq!(entry.variant, NRAS_VARIANT);
    }
}

fn absent_gene_is_empty<S: KnowledgeBaseStore>(store: &mut S) {
    seed_nras_knowledge_base(store).unwrap();
    let result = Matcher::new(&*store)
        .match_genes(&["IDH1".to_string()], &MatchFilter::new())
        .unwrap();
    assert!(result.is_empty());
}

fn literal_any_label_is_matchable_through_other_dimensions<S: KnowledgeBaseStore>(store: &mut S) {
    seed_nras_knowledge_base(store).unwrap();
    // a tissue constraint still sees entries filed under the "Any" tumor label
    let filter = MatchFilter::new().tissue_type("Skin");
    let result = Matcher::new(&*store).match_genes(&nras(), &filter).unwrap();
    assert_eq!(result.variant_count(), 6);
    assert!(result
        .iter()
        .flat_map(|g| &g.variants)
        .any(|e| e.tumor_type == "Any"));
}

fn rows_with_identical_fields_are_both_kept<S: KnowledgeBaseStore>(store: &mut S) {
    let bar = store
        .insert_interpretation(&NewInterpretation {
            text: "Bar".to_string(),
            citations: "Smith et al. 2015".to_string(),
            source_row: 0,
        })
        .unwrap();
    // same visible fields, told apart only by fingerprint
    let twin = |byte: u8| NewEntry {
        gene: "NRAS".to_string(),
        tumor_type: "Any".to_string(),
        tissue_type: "Any".to_string(),
        variant: NRAS_VARIANT.to_string(),
        tier: 1,
        interpretation_id: bar.id,
        source_row: 0,
        fingerprint: Fingerprint::from_bytes([byte; 16]),
    };
    store.insert_entries(&[twin(1), twin(2)]).unwrap();

    let genes = vec!["NRAS".to_string(), "NRAS".to_string()];
    let result = Matcher::new(&*store).match_genes(&genes, &MatchFilter::new()).unwrap();
    assert_eq!(result.len(), 1);
    let variants = &result.groups[0].variants;
    assert_eq!(variants.len(), 2);
    assert_ne!(variants[0].id, variants[1].id);
    assert_ne!(variants[0].fingerprint, variants[1].fingerprint);
}

macro_rules! matcher_scenarios {
    ($($name:ident),* $(,)?) => {
        mod memory {
            $(
                #[test]
                fn $name() {
                    super::$name(&mut varinterp_db::MemoryStore::new());
                }
            )*
        }

        mod sqlite {
            $(
                #[test]
                fn $name() {
                    super::$name(&mut varinterp_db::SqliteStore::open_in_memory().unwrap());
                }
            )*
        }
    };
}

matcher_scenarios!(
    unfiltered_returns_every_combination,
    tumor_and_tissue_narrow_to_one,
    absent_gene_is_empty,
    literal_any_label_is_matchable_through_other_dimensions,
    rows_with_identical_fields_are_both_kept,
);

// ── Filter properties ────────────────────────────────────────────────────────

fn seeded() -> MemoryStore {
    let mut store = MemoryStore::new();
    seed_nras_knowledge_base(&mut store).unwrap();
    store
}

fn tumor_label() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["Adenocarcinoma", "Carcinoma", "Melanoma", "Any", "All", ""])
}

fn tissue_label() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["Lung", "Skin", "Colon", "Any"])
}

proptest! {
    #[test]
    fn tumor_filter_never_widens(tumor in tumor_label(), tissue in tissue_label()) {
        let store = seeded();
        let matcher = Matcher::new(&store);
        let base = MatchFilter::new().tissue_type(tissue);
        let wide = matcher.match_genes(&nras(), &base).unwrap();
        let narrow = matcher.match_genes(&nras(), &base.clone().tumor_type(tumor)).unwrap();
        prop_assert!(narrow.len() <= wide.len());
        prop_assert!(narrow.variant_count() <= wide.variant_count());
    }

    #[test]
    fn missing_and_any_filters_agree(tissue in tissue_label(), with_variant in any::<bool>()) {
        let store = seeded();
        let matcher = Matcher::new(&store);
        let mut base = MatchFilter::new().tissue_type(tissue);
        if with_variant {
            base = base.variant(NRAS_VARIANT);
        }
        let absent = matcher.match_genes(&nras(), &base).unwrap();
        let wildcard = matcher.match_genes(&nras(), &base.clone().tumor_type("Any")).unwrap();
        prop_assert_eq!(absent, wildcard);
    }
}

#[test]
fn every_concrete_pair_yields_one_entry_per_interpretation() {
    let store = seeded();
    let matcher = Matcher::new(&store);
    for tumor in TUMOR_TYPES.iter().filter(|&&t| t != "Any") {
        for tissue in TISSUE_TYPES.iter().filter(|&&t| t != "Any") {
            let filter = MatchFilter::new().tumor_type(tumor).tissue_type(tissue);
            let result = matcher.match_genes(&nras(), &filter).unwrap();
            assert_eq!(result.variant_count(), 2, "{tumor}/{tissue}");
        }
    }
}

// ── Sheet → store → matches ──────────────────────────────────────────────────

#[test]
fn imported_sheet_matches_like_the_seeded_fixture() -> anyhow::Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let mut store = SqliteStore::open(dir.path().join("kb.sqlite3"))?;

    let sheet = CurationSheet::from_reader(NRAS_SHEET_TSV.as_bytes())?;
    let lists = derive_category_lists(&sheet.expand());
    for kind in CategoryKind::ALL {
        import_categories(&mut store, kind, lists.labels(kind))?;
    }
    Importer::new(&mut store, ImportConfig::default()).import_sheet(&sheet)?;

    let matcher = Matcher::new(&store);
    let all = matcher.match_genes(&nras(), &MatchFilter::new())?;
    assert_eq!(texts(&all), vec!["Bar", "Baz"]);
    assert!(all.iter().all(|g| g.variants.len() == 9));
    assert_eq!(all.groups[0].interpretation.citations, "Smith et al. 2015\nJones et al. 2016");

    // the sheet spells the wildcard "All" and lower-cases "carcinoma"
    let carcinoma = matcher.match_genes(&nras(), &MatchFilter::new().tumor_type("carcinoma"))?;
    assert_eq!(carcinoma.variant_count(), 6);

    let table_file = temp_file(VARIANT_TABLE_TSV, ".tsv")?;
    let table = VariantTable::from_path(
        table_file.path(),
        &IrConfig::default(),
        TableContext::new(Some("Adenocarcinoma"), Some("Lung")),
    )?;
    let rows = interpret_table(&store, &table, &MatchFilter::new())?;
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0].result.variant_count(), 2);
    assert_eq!(rows.iter().filter(|r| !r.result.is_empty()).count(), 1);
    assert_eq!(table.issues().len(), 1);

    let json = serde_json::to_string(&rows[0].result)?;
    assert!(json.contains("\"Bar\""));
    Ok(())
}
