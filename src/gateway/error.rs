use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("{0} not configured")]
    MissingCredential(String),

    #[error("API request failed: {0}")]
    ApiRequestFailed(#[from] reqwest::Error),

    #[error("Provider error {status}: {message}")]
    ProviderError { status: u16, message: String },

    #[error("No output from {0}")]
    NoOutput(String),
}

impl GatewayError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, GatewayError::MissingCredential(_))
    }
}
