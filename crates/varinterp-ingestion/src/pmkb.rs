//! Curated knowledge-base sheet loader.
//!
//! Reads the tab-separated export of the curated workbook's interpretation
//! sheet and expands every sheet row into one [`CuratedRow`] per
//! tumor × tissue × variant combination.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use varinterp_common::{Fingerprint, FingerprintFields, ImportConfig};

use crate::error::{ImportError, Result};

pub const COL_GENE: &str = "Gene";
pub const COL_TUMOR_TYPE: &str = "TumorType";
pub const COL_TISSUE_TYPE: &str = "TissueType";
pub const COL_VARIANT: &str = "Variant";
pub const COL_TIER: &str = "Tier";
pub const COL_INTERPRETATION: &str = "Interpretation";
pub const COL_CITATION: &str = "Citation";

/// Workbook headers and the names the loader uses for them.
const COLUMN_RENAMES: [(&str, &str); 5] = [
    ("Tumor Type(s)", COL_TUMOR_TYPE),
    ("Tissue Type(s)", COL_TISSUE_TYPE),
    ("Variant(s)", COL_VARIANT),
    ("Interpretations", COL_INTERPRETATION),
    ("Citations", COL_CITATION),
];

// ── Rows ─────────────────────────────────────────────────────────────────────

/// One row of the sheet, before multi-valued fields are expanded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetRow {
    /// 0-based data-row index in the sheet.
    pub source_row: u32,
    pub gene: String,
    pub tumor_types: String,
    pub tissue_types: String,
    pub variants: String,
    pub tier: String,
    pub interpretation: String,
    /// All citation columns joined by newlines.
    pub citation: String,
}

/// One knowledge-base row ready for import.
///
/// Labels are as written in the sheet; the importer canonicalises them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CuratedRow {
    pub gene: String,
    pub tumor_type: String,
    pub tissue_type: String,
    pub variant: String,
    /// Tier cell as exported; see [`CuratedRow::tier`].
    pub tier: String,
    pub interpretation: String,
    pub citation: String,
    pub source_row: u32,
}

impl CuratedRow {
    /// Numeric tier, with an empty cell meaning tier 0. `None` if malformed.
    pub fn tier(&self) -> Option<i64> {
        parse_tier(&self.tier)
    }

    pub fn fingerprint(&self) -> Fingerprint {
        let tier = self
            .tier()
            .map(|tier| tier.to_string())
            .unwrap_or_else(|| self.tier.trim().to_string());
        FingerprintFields {
            gene: &self.gene,
            tumor_type: &self.tumor_type,
            tissue_type: &self.tissue_type,
            variant: &self.variant,
            tier: &tier,
            interpretation: &self.interpretation,
            citation: &self.citation,
            source_row: self.source_row,
        }
        .fingerprint()
    }
}

/// Parse a tier cell. Spreadsheet exports write integer columns holding
/// blanks as floats, so `"2.0"` is accepted as tier 2.
pub fn parse_tier(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Some(0);
    }
    if let Ok(tier) = raw.parse::<i64>() {
        return Some(tier);
    }
    let float: f64 = raw.parse().ok()?;
    (float.is_finite() && float.fract() == 0.0).then_some(float as i64)
}

// ── Sheet ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct CurationSheet {
    rows: Vec<SheetRow>,
}

/// Column positions after renaming.
struct SheetColumns {
    gene: usize,
    tumor_type: usize,
    tissue_type: usize,
    variant: usize,
    tier: usize,
    interpretation: usize,
    citation: usize,
    width: usize,
}

impl SheetColumns {
    fn locate(headers: &csv::StringRecord) -> Result<Self> {
        let names: Vec<&str> = headers.iter().map(canonical_header).collect();
        let find = |name: &str| {
            names
                .iter()
                .position(|&header| header == name)
                .ok_or_else(|| ImportError::MissingColumn(name.to_string()))
        };
        Ok(Self {
            gene: find(COL_GENE)?,
            tumor_type: find(COL_TUMOR_TYPE)?,
            tissue_type: find(COL_TISSUE_TYPE)?,
            variant: find(COL_VARIANT)?,
            tier: find(COL_TIER)?,
            interpretation: find(COL_INTERPRETATION)?,
            citation: find(COL_CITATION)?,
            width: names.len(),
        })
    }
}

fn canonical_header(header: &str) -> &str {
    let header = header.trim();
    COLUMN_RENAMES
        .iter()
        .find(|(from, _)| *from == header)
        .map_or(header, |(_, to)| *to)
}

impl CurationSheet {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .quoting(false)
            .from_reader(reader);

        let columns = SheetColumns::locate(reader.headers()?)?;

        let mut rows = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result?;
            let cell = |i: usize| record.get(i).unwrap_or("").to_string();

            // the citation column and every unnamed overflow column after it
            let citation = (columns.citation..columns.width.max(record.len()))
                .map(|i| record.get(i).unwrap_or(""))
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string();

            rows.push(SheetRow {
                source_row: idx as u32,
                gene: cell(columns.gene).trim().to_string(),
                tumor_types: cell(columns.tumor_type),
                tissue_types: cell(columns.tissue_type),
                variants: cell(columns.variant),
                tier: cell(columns.tier),
                interpretation: cell(columns.interpretation),
                citation,
            });
        }

        debug!(rows = rows.len(), "Read curated sheet");
        Ok(Self { rows })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let sheet = Self::from_reader(io::BufReader::new(file))?;
        info!(path = %path.display(), rows = sheet.len(), "Loaded curated sheet");
        Ok(sheet)
    }

    /// Load the configured sheet from its TSV export next to `workbook`.
    pub fn from_workbook(workbook: impl AsRef<Path>, config: &ImportConfig) -> Result<Self> {
        Self::from_path(sheet_export_path(workbook.as_ref(), &config.sheet_name))
    }

    pub fn rows(&self) -> &[SheetRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Expand every sheet row, preserving sheet order.
    pub fn expand(&self) -> Vec<CuratedRow> {
        let expanded: Vec<CuratedRow> = self.rows.iter().flat_map(expand_row).collect();
        debug!(sheet_rows = self.rows.len(), entries = expanded.len(), "Expanded curated sheet");
        expanded
    }
}

/// Cross-join the tumor, tissue and variant lists of one sheet row.
pub fn expand_row(row: &SheetRow) -> Vec<CuratedRow> {
    let tumors = split_labels(&row.tumor_types);
    let tissues = split_labels(&row.tissue_types);
    let variants = split_variants(&row.variants);

    let mut out = Vec::with_capacity(tumors.len() * tissues.len() * variants.len());
    for tumor_type in &tumors {
        for tissue_type in &tissues {
            for variant in &variants {
                out.push(CuratedRow {
                    gene: row.gene.clone(),
                    tumor_type: tumor_type.clone(),
                    tissue_type: tissue_type.clone(),
                    variant: variant.clone(),
                    tier: row.tier.clone(),
                    interpretation: row.interpretation.clone(),
                    citation: row.citation.clone(),
                    source_row: row.source_row,
                });
            }
        }
    }
    out
}

/// Split a tumor or tissue cell on commas. An empty cell is one empty label.
pub fn split_labels(field: &str) -> Vec<String> {
    field.split(',').map(|part| part.trim().to_string()).collect()
}

/// Split a variant cell on commas that are followed by an upper-case letter.
///
/// Variant descriptions use commas internally (`"exon 19 deletion, insertion"`)
/// but separate distinct variants with a comma before the next capitalised
/// name (`"BRAF V600E, BRAF V600K"`).
pub fn split_variants(field: &str) -> Vec<String> {
    let separator = variant_separator();
    let mut parts = Vec::new();
    let mut start = 0;
    for m in separator.find_iter(field) {
        let next = field[m.end()..].chars().next();
        if next.is_some_and(|c| c.is_ascii_uppercase()) {
            parts.push(field[start..m.start()].trim().to_string());
            start = m.end();
        }
    }
    parts.push(field[start..].trim().to_string());
    parts
}

fn variant_separator() -> &'static Regex {
    use std::sync::OnceLock;
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*,\s*").expect("variant separator regex is valid"))
}

/// Where the TSV export of one workbook sheet lives: next to the workbook, as
/// `<workbook stem>.<sheet>.tsv` with spaces replaced by underscores.
pub fn sheet_export_path(workbook: &Path, sheet_name: &str) -> PathBuf {
    let stem = workbook
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let file_name = format!("{stem}.{sheet_name}.tsv").replace(' ', "_");
    workbook.with_file_name(file_name)
}
