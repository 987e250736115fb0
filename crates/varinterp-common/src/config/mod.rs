//! Configuration loading for varinterp.
//! Reads varinterp.toml from the current directory or the path in the
//! VARINTERP_CONFIG env var. Values are handed to the importer and the variant
//! table reader explicitly; nothing here is process-wide state.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ConfigError, Result};

/// Env var naming an explicit config file.
pub const CONFIG_ENV: &str = "VARINTERP_CONFIG";

/// Config file looked up in the working directory when the env var is unset.
pub const DEFAULT_CONFIG_FILE: &str = "varinterp.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub ir: IrConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String { "./data/varinterp.sqlite3".to_string() }

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_db_path() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Sheet of the curated workbook that holds the interpretations.
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,
    /// Cap on entries created per batch; 0 means no cap. Full imports are slow,
    /// so development databases are usually loaded with a small cap.
    #[serde(default)]
    pub import_limit: usize,
    /// Allow the single bulk write when the store holds no entries yet.
    #[serde(default = "bool_true")]
    pub bulk_load: bool,
}

fn default_sheet_name() -> String { "Interpretations".to_string() }
fn bool_true()          -> bool   { true }

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            sheet_name: default_sheet_name(),
            import_limit: 0,
            bulk_load: true,
        }
    }
}

impl ImportConfig {
    pub fn limit(&self) -> Option<usize> {
        (self.import_limit > 0).then_some(self.import_limit)
    }
}

/// Column names of the variant-caller export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrConfig {
    #[serde(default = "default_genes_column")]
    pub genes_column: String,
    #[serde(default = "default_frequency_column")]
    pub frequency_column: String,
}

fn default_genes_column()     -> String { "Genes".to_string() }
fn default_frequency_column() -> String { "% Frequency".to_string() }

impl Default for IrConfig {
    fn default() -> Self {
        Self {
            genes_column: default_genes_column(),
            frequency_column: default_frequency_column(),
        }
    }
}


impl Config {
    /// Load configuration from varinterp.toml.
    /// Checks VARINTERP_CONFIG env var first, then current directory.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_ENV)
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        if !Path::new(&path).exists() {
            return Err(ConfigError::NotFound(path));
        }
        Self::from_path(&path)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default() -> Result<Self> {
        match Self::load() {
            Err(ConfigError::NotFound(path)) => {
                tracing::debug!(%path, "No config file found, using defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.ir.genes_column.trim().is_empty() {
            return Err(ConfigError::Invalid("ir.genes_column must not be empty".into()));
        }
        if self.ir.frequency_column.trim().is_empty() {
            return Err(ConfigError::Invalid("ir.frequency_column must not be empty".into()));
        }
        if self.ir.genes_column == self.ir.frequency_column {
            return Err(ConfigError::Invalid(
                "ir.genes_column and ir.frequency_column must differ".into(),
            ));
        }
        if self.import.sheet_name.trim().is_empty() {
            return Err(ConfigError::Invalid("import.sheet_name must not be empty".into()));
        }
        Ok(())
    }
}
