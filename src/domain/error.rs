//! Data validation errors shared by the domain and the fetch boundary.

/// Errors raised when source tables are empty, malformed or inconsistent.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataError {
    #[error("Source table '{0}' is empty")]
    EmptyTable(&'static str),

    #[error("Source table '{table}' is missing required column '{column}'")]
    MissingColumn { table: &'static str, column: String },

    #[error("Duplicate key '{key}' in table '{table}'")]
    DuplicateKey { table: &'static str, key: String },

    #[error("Invalid record '{key}' in table '{table}': {reason}")]
    InvalidRecord {
        table: &'static str,
        key: String,
        reason: String,
    },

    #[error("Cannot form {clusters} clusters from {rows} districts")]
    InsufficientRows { rows: usize, clusters: usize },

    #[error("Cluster count must be at least 1")]
    InvalidClusterCount,

    #[error("{unresolved} of {total} cases reference unknown patients (tolerance {tolerance})")]
    UnresolvedPatients {
        unresolved: usize,
        total: usize,
        tolerance: f64,
    },
}

impl DataError {
    pub(crate) fn invalid(table: &'static str, key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            table,
            key: key.into(),
            reason: reason.into(),
        }
    }
}
