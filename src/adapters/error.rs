//! Error type shared by the record-source adapters.

use crate::domain::DataError;

/// Error type for fetching upstream records.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error("Source lock poisoned")]
    LockPoisoned,
}
