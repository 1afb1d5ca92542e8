use thiserror::Error;

/// Domain failures that callers resolve to neutral defaults instead of aborting.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RankingError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("insufficient data: need at least {required} samples, got {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("invalid ranking config: {0}")]
    InvalidConfig(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl RankingError {
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        RankingError::NotFound {
            entity,
            key: key.into(),
        }
    }
}

/// Context message for store reads
pub fn read_context(table: &str, key: &str) -> String {
    format!("Failed to read {} for key: {}", table, key)
}

/// Context message for store writes
pub fn write_context(table: &str, key: &str) -> String {
    format!("Failed to write {} for key: {}", table, key)
}
