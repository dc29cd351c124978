use thiserror::Error;

use crate::gateway::GatewayError;

/// Failure taxonomy shared by the three endpoints.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// Missing or malformed input (400)
    #[error("{0}")]
    Validation(String),

    /// Missing credential (500)
    #[error("{0}")]
    Config(String),

    /// The model API returned nothing usable (500)
    #[error("{0}")]
    Upstream(String),

    /// Output was not extractable JSON (500)
    #[error("{0}")]
    Parse(String),

    /// Valid JSON but nothing left after filtering (500)
    #[error("{0}")]
    Generation(String),
}

impl SearchError {
    pub fn status_code(&self) -> u16 {
        match self {
            SearchError::Validation(_) => 400,
            _ => 500,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SearchError::Validation(_) => "validation",
            SearchError::Config(_) => "config",
            SearchError::Upstream(_) => "upstream",
            SearchError::Parse(_) => "parse",
            SearchError::Generation(_) => "generation",
        }
    }
}

impl From<GatewayError> for SearchError {
    fn from(err: GatewayError) -> Self {
        if err.is_configuration() {
            SearchError::Config(err.to_string())
        } else {
            SearchError::Upstream(err.to_string())
        }
    }
}
