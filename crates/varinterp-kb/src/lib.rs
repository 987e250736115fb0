//! varinterp-kb — Querying the curated knowledge base.
//! - Gene/tumor/tissue/variant matching grouped by interpretation (`matcher`)
//! - Matching every record of a variant table (`interpret`)
//!
//! ```no_run
//! use varinterp_db::SqliteStore;
//! use varinterp_kb::{MatchFilter, Matcher};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteStore::open("./data/varinterp.sqlite3")?;
//! let filter = MatchFilter::new().tumor_type("Adenocarcinoma").tissue_type("Lung");
//! let result = Matcher::new(&store).match_genes(&["NRAS".to_string()], &filter)?;
//! for group in &result {
//!     println!("{}: {} variants", group.interpretation.text, group.variants.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod interpret;
pub mod matcher;

pub use error::{KbError, Result};
pub use interpret::{interpret_table, RecordInterpretation};
pub use matcher::{InterpretationMatch, MatchFilter, MatchResult, Matcher};
