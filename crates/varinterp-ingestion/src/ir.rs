//! Variant-caller table reader.
//!
//! Parses a tab-separated variant export (leading `##` metadata lines, a
//! header row, data rows) into [`VariantRecord`]s with parsed gene lists and
//! non-zero allele frequencies. A table describes one sample, so the tumor
//! and tissue context applies to every record in it.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use varinterp_common::{parse_allele_frequency, parse_genes, IrConfig};

use crate::error::IrError;

pub type Result<T> = std::result::Result<T, IrError>;

/// Prefix of metadata lines ahead of the header row.
const METADATA_PREFIX: &str = "##";

/// Fallback token when a frequency cell cannot be parsed.
const UNPARSEABLE_AF: &str = "nan";

/// Tumor and tissue labels shared by all records of one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableContext {
    pub tumor_type: Option<String>,
    pub tissue_type: Option<String>,
}

impl TableContext {
    pub fn new(tumor_type: Option<&str>, tissue_type: Option<&str>) -> Self {
        Self {
            tumor_type: tumor_type.map(str::to_string),
            tissue_type: tissue_type.map(str::to_string),
        }
    }
}

/// A cell problem that was recovered with a fallback value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordIssue {
    pub row: usize,
    pub column: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantRecord {
    /// 0-based data-row index in the table.
    pub row: usize,
    pub genes: Vec<String>,
    pub afs: Vec<String>,
    pub tumor_type: Option<String>,
    pub tissue_type: Option<String>,
    /// Every cell of the row by column name, in column order.
    fields: Vec<(String, String)>,
}

impl VariantRecord {
    /// Allele frequencies joined by spaces, for display.
    pub fn af_display(&self) -> String {
        self.afs.join(" ")
    }

    /// Raw cell value of any column.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }
}

/// Header and data rows of a variant table, metadata lines removed.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut body = text;
        while body.starts_with(METADATA_PREFIX) {
            body = match body.find('\n') {
                Some(end) => &body[end + 1..],
                None => "",
            };
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .quoting(false)
            .from_reader(body.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(IrError::MissingHeader);
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self { headers, rows })
    }

    fn column(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| IrError::MissingColumn(name.to_string()))
    }
}

/// Build one record per data row. Unparseable frequency cells fall back to
/// `["nan"]` and are listed in the returned issues.
pub fn build_records(
    table: &RawTable,
    config: &IrConfig,
    context: &TableContext,
) -> Result<(Vec<VariantRecord>, Vec<RecordIssue>)> {
    let genes_idx = table.column(&config.genes_column)?;
    let af_idx = table.column(&config.frequency_column)?;

    let mut records = Vec::with_capacity(table.rows.len());
    let mut issues = Vec::new();

    for (row, cells) in table.rows.iter().enumerate() {
        let cell = |idx: usize| cells.get(idx).map(String::as_str);

        let genes = match cell(genes_idx).map(str::trim) {
            Some(text) if !text.is_empty() => parse_genes(text),
            _ => {
                issues.push(RecordIssue {
                    row,
                    column: config.genes_column.clone(),
                    message: "empty gene cell".to_string(),
                });
                Vec::new()
            }
        };

        let afs = match parse_allele_frequency(cell(af_idx)) {
            Ok(afs) => afs,
            Err(err) => {
                warn!(row, column = %config.frequency_column, error = %err, "Unparseable allele frequency");
                issues.push(RecordIssue {
                    row,
                    column: config.frequency_column.clone(),
                    message: err.to_string(),
                });
                vec![UNPARSEABLE_AF.to_string()]
            }
        };

        let fields = table
            .headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), cell(idx).unwrap_or("").to_string()))
            .collect();

        records.push(VariantRecord {
            row,
            genes,
            afs,
            tumor_type: context.tumor_type.clone(),
            tissue_type: context.tissue_type.clone(),
            fields,
        });
    }

    Ok((records, issues))
}

/// A parsed variant table.
#[derive(Debug, Clone)]
pub struct VariantTable {
    headers: Vec<String>,
    records: Vec<VariantRecord>,
    issues: Vec<RecordIssue>,
    context: TableContext,
}

impl VariantTable {
    pub fn from_reader<R: Read>(reader: R, config: &IrConfig, context: TableContext) -> Result<Self> {
        let raw = RawTable::from_reader(reader)?;
        let (records, issues) = build_records(&raw, config, &context)?;
        debug!(records = records.len(), issues = issues.len(), "Built variant records");
        Ok(Self {
            headers: raw.headers,
            records,
            issues,
            context,
        })
    }

    pub fn from_path(path: impl AsRef<Path>, config: &IrConfig, context: TableContext) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(std::io::BufReader::new(file), config, context)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[VariantRecord] {
        &self.records
    }

    pub fn issues(&self) -> &[RecordIssue] {
        &self.issues
    }

    pub fn context(&self) -> &TableContext {
        &self.context
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
