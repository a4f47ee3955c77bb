use thiserror::Error;

#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Missing required variables: {0}")]
    MissingVariables(String),

    #[error("Unresolved placeholder: {0}")]
    PlaceholderMismatch(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Market data error: {0}")]
    MarketData(String),

    #[error("Screener error: {0}")]
    Screener(String),
}

impl PredictionError {
    /// Validation errors fail fast and never reach a network call.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            PredictionError::MissingVariables(_)
                | PredictionError::PlaceholderMismatch(_)
                | PredictionError::InvalidData(_)
        )
    }
}
