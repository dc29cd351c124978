use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;

use crate::search::{
    ErrorResponse, GenerateTermsResponse, ReferenceSearch, SearchError, SearchImagesResponse,
    SearchResponse, SearchResult, SearchTerm,
};

#[derive(Error, Debug)]
pub enum ApiError {
    /// The endpoint answered with a non-success status.
    #[error("{message}")]
    Endpoint { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Search(#[from] SearchError),
}

/// The three endpoints as seen by the orchestrator, whether they are served
/// in-process or by a running server.
#[async_trait]
pub trait ReferenceApi: Send + Sync {
    async fn generate_terms(&self, query: &str) -> Result<Vec<SearchTerm>, ApiError>;

    async fn search_images(&self, term: &str) -> Result<Vec<String>, ApiError>;

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, ApiError>;
}

#[async_trait]
impl ReferenceApi for ReferenceSearch {
    async fn generate_terms(&self, query: &str) -> Result<Vec<SearchTerm>, ApiError> {
        Ok(ReferenceSearch::generate_terms(self, query).await?)
    }

    async fn search_images(&self, term: &str) -> Result<Vec<String>, ApiError> {
        Ok(ReferenceSearch::search_images(self, term).await?)
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, ApiError> {
        Ok(ReferenceSearch::search(self, query).await?)
    }
}

/// Talks to the JSON endpoints of a running server.
#[derive(Clone)]
pub struct HttpReferenceApi {
    client: Client,
    base_url: String,
}

impl HttpReferenceApi {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
        fallback: &str,
    ) -> Result<T, ApiError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .await
                .map(|e| e.error)
                .ok()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| fallback.to_string());
            return Err(ApiError::Endpoint {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl ReferenceApi for HttpReferenceApi {
    async fn generate_terms(&self, query: &str) -> Result<Vec<SearchTerm>, ApiError> {
        let body: GenerateTermsResponse = self
            .post(
                "/api/generate-terms",
                json!({ "query": query }),
                "Failed to generate search terms",
            )
            .await?;
        Ok(body.terms)
    }

    async fn search_images(&self, term: &str) -> Result<Vec<String>, ApiError> {
        let body: SearchImagesResponse = self
            .post(
                "/api/search-images",
                json!({ "term": term }),
                "Failed to fetch images",
            )
            .await?;
        Ok(body.image_urls)
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, ApiError> {
        let body: SearchResponse = self
            .post("/api/search", json!({ "query": query }), "Search failed")
            .await?;
        Ok(body.results)
    }
}
