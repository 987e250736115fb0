//! varinterp-ingestion — Getting data into the knowledge base and variant
//! tables into records.
//! - Curated sheet loading and row expansion (`pmkb`)
//! - Tumor/tissue category reference lists (`categories`)
//! - Idempotent knowledge-base import (`importer`)
//! - Variant-caller table parsing (`ir`)

pub mod categories;
pub mod error;
pub mod importer;
pub mod ir;
pub mod pmkb;

pub use categories::{
    derive_category_lists, import_categories, read_category_list, write_category_list,
    CategoryImport, CategoryLists,
};
pub use error::{ImportError, IrError, Result};
pub use importer::{ImportPath, ImportSummary, Importer, SkipReason, SkippedRow};
pub use ir::{build_records, RawTable, RecordIssue, TableContext, VariantRecord, VariantTable};
pub use pmkb::{expand_row, sheet_export_path, split_variants, CuratedRow, CurationSheet, SheetRow};
