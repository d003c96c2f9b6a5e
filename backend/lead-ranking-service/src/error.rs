use thiserror::Error;

pub type Result<T> = std::result::Result<T, LeadError>;

#[derive(Debug, Error)]
pub enum LeadError {
    /// Malformed filter/sort spec or paging request. Callers recover with the pass-all default.
    #[error("Spec validation error: {0}")]
    SpecValidation(String),

    /// Scorer call failed, timed out or returned an unusable probability.
    #[error("Scoring service error: {0}")]
    ScoringService(String),

    /// Persisting a computed probability failed.
    #[error("Store write error: {0}")]
    StoreWrite(String),

    /// Fetching a page of records failed.
    #[error("Store fetch error: {0}")]
    StoreFetch(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl LeadError {
    /// Failures that leave a record eligible for the next reconciliation pass.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LeadError::ScoringService(_) | LeadError::StoreWrite(_))
    }
}

impl From<serde_json::Error> for LeadError {
    fn from(err: serde_json::Error) -> Self {
        LeadError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(LeadError::ScoringService("timeout".into()).is_retryable());
        assert!(LeadError::StoreWrite("503".into()).is_retryable());
        assert!(!LeadError::SpecValidation("bad bucket".into()).is_retryable());
        assert!(!LeadError::Config("missing url".into()).is_retryable());
    }

    #[test]
    fn test_from_serde_error() {
        let err: LeadError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, LeadError::Serialization(_)));
    }
}
