//! Shared fixtures for varinterp tests.
//!
//! The NRAS knowledge base has two interpretations ("Bar" and "Baz"), each
//! backing nine NRAS entries that span every tumor × tissue combination in
//! [`TUMOR_TYPES`] × [`TISSUE_TYPES`].

use std::io::Write;

use tracing_subscriber::EnvFilter;
use varinterp_common::FingerprintFields;
use varinterp_db::{CategoryKind, KnowledgeBaseStore, NewEntry, NewInterpretation};

pub const TUMOR_TYPES: [&str; 3] = ["Adenocarcinoma", "Any", "Carcinoma"];
pub const TISSUE_TYPES: [&str; 3] = ["Lung", "Any", "Skin"];

pub const NRAS_VARIANT: &str = "NRAS Q61K";

/// The NRAS knowledge base as a curated-sheet export. Labels are deliberately
/// not canonical (`All`, stray spaces) and the citations overflow into an
/// unnamed column, the way the published workbook does.
pub const NRAS_SHEET_TSV: &str = "\
Gene\tTumor Type(s)\tTissue Type(s)\tVariant(s)\tTier\tInterpretations\tCitations\tUnnamed: 7
NRAS\tAdenocarcinoma, All, carcinoma\tLung, Any , Skin\tNRAS Q61K\t1\tBar\tSmith et al. 2015\tJones et al. 2016
NRAS\tAdenocarcinoma, All, carcinoma\tLung, Any , Skin\tNRAS Q61K\t\tBaz\tDoe et al. 2017\t
";

/// A small variant-caller export with metadata lines, a fusion, a missing
/// frequency and one unparseable frequency cell.
pub const VARIANT_TABLE_TSV: &str = "\
##fileformat=IonReporter
##reference=hg19
Genes\tLocus\t% Frequency\tType
NRAS\tchr1:115256529\tAA=0.00, AG=0.00, CG=11.27, CT=0.00, GG=0.00\tSNV
TMPRSS2(1) - ERG(2)\tchr21:42880010\t9.09\tFUSION
IDH1\tchr2:209113112\t\tSNV
EGFR,EGFR-AS1\tchr7:55242464\tAA=0.00, AG=high\tINDEL
";

/// Install a test subscriber honouring `RUST_LOG`. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Load every tumor and tissue label of the NRAS knowledge base.
pub fn seed_categories<S: KnowledgeBaseStore + ?Sized>(store: &mut S) -> anyhow::Result<()> {
    for label in TUMOR_TYPES {
        store.get_or_create_category(CategoryKind::Tumor, label)?;
    }
    for label in TISSUE_TYPES {
        store.get_or_create_category(CategoryKind::Tissue, label)?;
    }
    Ok(())
}

/// Write the NRAS knowledge base straight into a store, bypassing the importer.
pub fn seed_nras_knowledge_base<S: KnowledgeBaseStore + ?Sized>(store: &mut S) -> anyhow::Result<()> {
    seed_categories(store)?;

    let interpretations = store.insert_interpretations(&[
        NewInterpretation {
            text: "Bar".to_string(),
            citations: "Smith et al. 2015".to_string(),
            source_row: 0,
        },
        NewInterpretation {
            text: "Baz".to_string(),
            citations: "Doe et al. 2017".to_string(),
            source_row: 1,
        },
    ])?;

    let mut entries = Vec::with_capacity(18);
    for interpretation in &interpretations {
        for tumor_type in TUMOR_TYPES {
            for tissue_type in TISSUE_TYPES {
                let fingerprint = FingerprintFields {
                    gene: "NRAS",
                    tumor_type,
                    tissue_type,
                    variant: NRAS_VARIANT,
                    tier: "1",
                    interpretation: &interpretation.text,
                    citation: &interpretation.citations,
                    source_row: interpretation.source_row,
                }
                .fingerprint();
                entries.push(NewEntry {
                    gene: "NRAS".to_string(),
                    tumor_type: tumor_type.to_string(),
                    tissue_type: tissue_type.to_string(),
                    variant: NRAS_VARIANT.to_string(),
                    tier: 1,
                    interpretation_id: interpretation.id,
                    source_row: interpretation.source_row,
                    fingerprint,
                });
            }
        }
    }
    store.insert_entries(&entries)?;
    Ok(())
}

/// Write `contents` to a named temp file with the given suffix (e.g. `".tsv"`).
pub fn temp_file(contents: &str, suffix: &str) -> anyhow::Result<tempfile::NamedTempFile> {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile()?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(file)
}
