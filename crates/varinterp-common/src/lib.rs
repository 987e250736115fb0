//! varinterp-common — Field normalisation, fingerprints, configuration and
//! errors shared by every varinterp crate.

pub mod error;
pub mod normalise;
pub mod fingerprint;
pub mod config;

// Re-export commonly used types
pub use config::{Config, DatabaseConfig, ImportConfig, IrConfig};
pub use error::{FieldError, ConfigError};
pub use fingerprint::{Fingerprint, FingerprintFields};
pub use normalise::{
    canonicalize_category, parse_allele_frequency, parse_genes, title_case, ANY_LABEL,
};
