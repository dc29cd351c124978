use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A generated search term.
///
/// Term items come straight from model output and are passed through
/// untouched, so the raw object is kept and fields are read leniently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchTerm(Value);

impl SearchTerm {
    pub fn new(term: &str, description: &str) -> Self {
        Self(json!({ "term": term, "description": description }))
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    /// The term text, or `""` when missing or not a string.
    pub fn term(&self) -> &str {
        self.0.get("term").and_then(Value::as_str).unwrap_or("")
    }

    pub fn description(&self) -> &str {
        self.0
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

/// Images found for one term. `sources` mirrors `image_urls`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub term: String,
    #[serde(default)]
    pub description: String,
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub sources: Vec<String>,
}

impl SearchResult {
    pub fn new(term: impl Into<String>, description: impl Into<String>, image_urls: Vec<String>) -> Self {
        Self {
            term: term.into(),
            description: description.into(),
            sources: image_urls.clone(),
            image_urls,
        }
    }
}

// Wire bodies. Missing lists read as empty.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateTermsResponse {
    #[serde(default)]
    pub terms: Vec<SearchTerm>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchImagesResponse {
    #[serde(default)]
    pub image_urls: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
