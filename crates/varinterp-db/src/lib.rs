//! varinterp Database Layer
//!
//! This crate defines the logical store the importer writes to and the
//! matcher reads from, with two backends:
//!
//! - [`MemoryStore`]: in-process tables with hash indexes, for tests and
//!   one-shot interpretation runs
//! - [`SqliteStore`]: embedded SQLite file (no external server required)
//!   with write-time uniqueness constraints
//!
//! # Example
//!
//! ```rust,no_run
//! use varinterp_db::{CategoryKind, KnowledgeBaseStore, SqliteStore};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut store = SqliteStore::open("./data/varinterp.sqlite3")?;
//!     store.get_or_create_category(CategoryKind::Tumor, "Any")?;
//!     println!("{} entries", store.count_entries()?);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod store;

pub use error::{DbError, Result};
pub use memory::MemoryStore;
pub use schema::{
    BulkLoad, BulkLoaded, Category, CategoryId, CategoryKind, EntryId, Interpretation,
    InterpretationId, InterpretationRef, KnowledgeBaseEntry, NewEntry, NewInterpretation,
    TABLE_CATEGORIES, TABLE_ENTRIES, TABLE_INTERPRETATIONS,
};
pub use sqlite::SqliteStore;
pub use store::{KnowledgeBaseStore, Upserted};
