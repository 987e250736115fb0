use thiserror::Error;
use varinterp_db::{DbError, InterpretationId};

#[derive(Debug, Error)]
pub enum KbError {
    #[error("Store error: {0}")]
    Db(#[from] DbError),

    /// An entry points at an interpretation the store no longer returns.
    #[error("Entry references missing interpretation {0}")]
    MissingInterpretation(InterpretationId),
}

pub type Result<T> = std::result::Result<T, KbError>;
