//! Curated sheet → store, end to end.
//!
//! ```bash
//! cargo test --package varinterp-ingestion --test test_import_pmkb
//! ```

use pretty_assertions::assert_eq;
use varinterp_common::ImportConfig;
use varinterp_db::{CategoryKind, KnowledgeBaseStore, MemoryStore, SqliteStore};
use varinterp_ingestion::{
    derive_category_lists, import_categories, sheet_export_path, CurationSheet, ImportError,
    ImportPath, Importer,
};
use varinterp_test_utils::{init_tracing, temp_file, NRAS_SHEET_TSV};

fn load_categories<S: KnowledgeBaseStore>(store: &mut S, sheet: &CurationSheet) -> anyhow::Result<()> {
    let lists = derive_category_lists(&sheet.expand());
    for kind in CategoryKind::ALL {
        import_categories(&mut *store, kind, lists.labels(kind))?;
    }
    Ok(())
}

fn import_twice<S: KnowledgeBaseStore>(store: &mut S) -> anyhow::Result<()> {
    let sheet = CurationSheet::from_reader(NRAS_SHEET_TSV.as_bytes())?;
    assert_eq!(sheet.len(), 2);
    load_categories(store, &sheet)?;

    let first = Importer::new(&mut *store, ImportConfig::default()).import_sheet(&sheet)?;
    assert_eq!(first.path, ImportPath::Bulk);
    assert_eq!(first.created, 18);
    assert_eq!(first.skipped, 0);
    assert_eq!(first.interpretations_created, 2);

    let entries = store.count_entries()?;
    let interpretations = store.count_interpretations()?;

    let second = Importer::new(&mut *store, ImportConfig::default()).import_sheet(&sheet)?;
    assert_eq!(second.path, ImportPath::Incremental);
    assert_eq!(second.created, 0);
    assert_eq!(second.skipped, 18);
    assert_eq!(second.interpretations_created, 0);
    assert_eq!(second.anomalies().count(), 0);
    assert_ne!(first.batch_id, second.batch_id);

    assert_eq!(store.count_entries()?, entries);
    assert_eq!(store.count_interpretations()?, interpretations);
    Ok(())
}

#[test]
fn test_import_is_idempotent_in_memory() -> anyhow::Result<()> {
    init_tracing();
    import_twice(&mut MemoryStore::new())
}

#[test]
fn test_import_is_idempotent_in_sqlite() -> anyhow::Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("kb.sqlite3");
    import_twice(&mut SqliteStore::open(&path)?)?;

    // and across process restarts
    let mut reopened = SqliteStore::open(&path)?;
    let sheet = CurationSheet::from_reader(NRAS_SHEET_TSV.as_bytes())?;
    let third = Importer::new(&mut reopened, ImportConfig::default()).import_sheet(&sheet)?;
    assert_eq!(third.created, 0);
    assert_eq!(reopened.count_entries()?, 18);
    Ok(())
}

#[test]
fn test_entries_carry_canonical_labels() -> anyhow::Result<()> {
    let mut store = MemoryStore::new();
    let sheet = CurationSheet::from_reader(NRAS_SHEET_TSV.as_bytes())?;
    load_categories(&mut store, &sheet)?;
    Importer::new(&mut store, ImportConfig::default()).import_sheet(&sheet)?;

    assert_eq!(
        store.category_labels(CategoryKind::Tumor)?,
        vec!["Adenocarcinoma", "Any", "Carcinoma"]
    );
    let entries = store.entries_for_genes(&["NRAS".to_string()])?;
    assert_eq!(entries.len(), 18);
    assert!(entries.iter().all(|e| e.tumor_type != "All" && e.tumor_type != "carcinoma"));
    // empty tier cell imports as tier 0
    let tiers: Vec<i64> = entries.iter().map(|e| e.tier).collect();
    assert_eq!(tiers.iter().filter(|&&t| t == 1).count(), 9);
    assert_eq!(tiers.iter().filter(|&&t| t == 0).count(), 9);

    let bar = store.find_interpretation_by_source(0)?.expect("row 0 interpretation");
    assert_eq!(bar.text, "Bar");
    assert_eq!(bar.citations, "Smith et al. 2015\nJones et al. 2016");
    Ok(())
}

#[test]
fn test_import_before_categories_is_rejected() -> anyhow::Result<()> {
    let mut store = MemoryStore::new();
    let sheet = CurationSheet::from_reader(NRAS_SHEET_TSV.as_bytes())?;

    let err = Importer::new(&mut store, ImportConfig::default())
        .import_sheet(&sheet)
        .unwrap_err();
    assert!(matches!(err, ImportError::MissingCategory { .. }), "got {err:?}");
    assert_eq!(store.count_entries()?, 0);
    Ok(())
}

#[test]
fn test_sheet_loads_from_export_path() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let workbook = dir.path().join("pmkb download.xlsx");
    let export = sheet_export_path(&workbook, "Interpretations");
    std::fs::write(&export, NRAS_SHEET_TSV)?;

    let sheet = CurationSheet::from_path(&export)?;
    assert_eq!(sheet.expand().len(), 18);

    let loose = temp_file(NRAS_SHEET_TSV, ".tsv")?;
    assert_eq!(CurationSheet::from_path(loose.path())?.len(), 2);
    Ok(())
}
