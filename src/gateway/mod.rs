//! Model gateway: one prompt in, free-form text out.
//!
//! The gateway knows nothing about terms or images. Callers build the prompt,
//! pick a [`CompletionMode`], and hand the returned text to the extractor.

pub mod error;
pub mod openai;

pub use error::GatewayError;
pub use openai::{extract_output_text, OpenAIGateway};

use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionMode {
    /// No tools; the model answers from its own knowledge.
    Plain,
    /// The model may issue web searches before answering.
    WebSearch,
}

impl CompletionMode {
    pub fn uses_web_search(self) -> bool {
        matches!(self, CompletionMode::WebSearch)
    }
}

/// JSON schema for providers that support constrained output.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    pub name: &'static str,
    pub schema: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// System and user instructions joined by a blank line.
    pub prompt: String,
    pub mode: CompletionMode,
    pub schema: Option<OutputSchema>,
}

impl CompletionRequest {
    pub fn new(system: &str, user: &str, mode: CompletionMode) -> Self {
        Self {
            prompt: format!("{}\n\n{}", system, user),
            mode,
            schema: None,
        }
    }

    pub fn with_schema(mut self, schema: OutputSchema) -> Self {
        self.schema = Some(schema);
        self
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Model identifier, used in log lines and "No output from ..." errors.
    fn model_name(&self) -> String;

    /// Fails fast when the credential is missing, without touching the network.
    fn ensure_credential(&self) -> Result<(), GatewayError>;

    async fn complete(&self, request: CompletionRequest) -> Result<String, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_joined_with_blank_line() {
        let req = CompletionRequest::new("system", "user", CompletionMode::Plain);
        assert_eq!(req.prompt, "system\n\nuser");
        assert!(req.schema.is_none());
        assert!(!req.mode.uses_web_search());
        assert!(CompletionMode::WebSearch.uses_web_search());
    }
}
