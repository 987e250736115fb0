use thiserror::Error;

/// Failure to turn a raw text cell into a structured value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    #[error("Malformed allele frequency '{raw}': part '{part}' is not <allele>=<number>")]
    MalformedAlleleFrequency { raw: String, part: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
