//! Match every record of a variant table against the knowledge base.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use varinterp_db::KnowledgeBaseStore;
use varinterp_ingestion::VariantTable;

use crate::error::Result;
use crate::matcher::{MatchFilter, MatchResult, Matcher};

/// Matches for one variant record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordInterpretation {
    /// Data-row index of the record in its table.
    pub row: usize,
    pub genes: Vec<String>,
    pub afs: Vec<String>,
    pub result: MatchResult,
}

/// Run the matcher for each record in `table`. The table's tumor and tissue
/// context, when set, replaces the corresponding constraint of `base`.
#[instrument(skip_all, fields(records = table.len()))]
pub fn interpret_table<S: KnowledgeBaseStore + ?Sized>(
    store: &S,
    table: &VariantTable,
    base: &MatchFilter,
) -> Result<Vec<RecordInterpretation>> {
    let matcher = Matcher::new(store);
    let mut interpreted = Vec::with_capacity(table.len());

    for record in table.records() {
        let filter = base.with_context(record.tumor_type.as_deref(), record.tissue_type.as_deref());
        let result = matcher.match_genes(&record.genes, &filter)?;
        interpreted.push(RecordInterpretation {
            row: record.row,
            genes: record.genes.clone(),
            afs: record.afs.clone(),
            result,
        });
    }

    let hits = interpreted.iter().filter(|r| !r.result.is_empty()).count();
    info!(records = interpreted.len(), hits, "Interpreted variant table");
    Ok(interpreted)
}
