use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::time::Instant;
use tracing::{debug, info};

use super::{CompletionRequest, GatewayError, ModelGateway};
use crate::config::OpenAIConfig;

/// Maximum characters of a provider error body kept in the error message
const ERROR_BODY_LIMIT: usize = 512;

/// Client for the OpenAI Responses API (`POST {base_url}/responses`).
#[derive(Clone)]
pub struct OpenAIGateway {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIGateway {
    pub fn new(config: &OpenAIConfig) -> Result<Self, GatewayError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            config: config.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/responses", self.config.base_url.trim_end_matches('/'))
    }

    fn api_key(&self) -> Result<String, GatewayError> {
        self.config
            .resolve_api_key()
            .ok_or_else(|| GatewayError::MissingCredential(self.config.credential_name()))
    }

    pub fn build_body(&self, request: &CompletionRequest) -> Value {
        let mut body = Map::new();
        body.insert("model".to_string(), json!(self.config.model));
        body.insert("input".to_string(), json!(request.prompt));

        if request.mode.uses_web_search() {
            body.insert("tools".to_string(), json!([{ "type": "web_search" }]));
        }

        if self.config.structured_output {
            if let Some(ref schema) = request.schema {
                body.insert(
                    "text".to_string(),
                    json!({
                        "format": {
                            "type": "json_schema",
                            "name": schema.name,
                            "schema": schema.schema,
                            "strict": false,
                        }
                    }),
                );
            }
        }

        Value::Object(body)
    }
}

#[async_trait]
impl ModelGateway for OpenAIGateway {
    fn model_name(&self) -> String {
        self.config.model.clone()
    }

    fn ensure_credential(&self) -> Result<(), GatewayError> {
        self.api_key().map(|_| ())
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, GatewayError> {
        let api_key = self.api_key()?;
        let body = self.build_body(&request);

        debug!(
            "Calling {} with model {} (web_search: {})",
            self.endpoint(),
            self.config.model,
            request.mode.uses_web_search()
        );
        let started = Instant::now();

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GatewayError::ProviderError {
                status: status.as_u16(),
                message: text.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        let payload: Value = response.json().await?;
        info!(
            "Model call completed in {}ms",
            started.elapsed().as_millis()
        );

        extract_output_text(&payload).ok_or_else(|| {
            debug!("Response without text output: {}", payload);
            GatewayError::NoOutput(self.config.model.clone())
        })
    }
}

/// Pulls the text answer out of a Responses API payload.
///
/// Checked in order: `output_text`, `output[0].text`, a top-level `text`
/// string, then every `output_text` part under `output[*].content[*]`.
/// Empty strings count as absent.
pub fn extract_output_text(payload: &Value) -> Option<String> {
    let non_empty = |v: Option<&Value>| {
        v.and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    if let Some(text) = non_empty(payload.get("output_text")) {
        return Some(text);
    }
    if let Some(text) = non_empty(payload.pointer("/output/0/text")) {
        return Some(text);
    }
    if let Some(text) = non_empty(payload.get("text")) {
        return Some(text);
    }

    let parts: Vec<&str> = payload
        .get("output")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten()
        .filter(|part| part.get("type").and_then(Value::as_str) == Some("output_text"))
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();

    let joined = parts.concat();
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}
