use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use super::extract::extract_json;
use super::prompts;
use super::{SearchError, SearchResult, SearchTerm};
use crate::gateway::{CompletionMode, CompletionRequest, ModelGateway, OutputSchema};

/// URLs kept per result by the aggregate search
pub const MAX_URLS_PER_RESULT: usize = 6;

/// Characters of raw model output shown in debug logs
const PREVIEW_CHARS: usize = 200;

/// One model round trip: which prompt, which tool mode, which key to extract.
struct Task {
    name: &'static str,
    key: &'static str,
    mode: CompletionMode,
    system: &'static str,
    user: String,
    schema: OutputSchema,
}

/// The three reference-search operations behind the HTTP endpoints.
///
/// All of them run through [`ReferenceSearch::run`], differing only in the
/// [`Task`] they build and the filtering applied to the extracted JSON.
#[derive(Clone)]
pub struct ReferenceSearch {
    gateway: Arc<dyn ModelGateway>,
}

impl ReferenceSearch {
    pub fn new(gateway: Arc<dyn ModelGateway>) -> Self {
        Self { gateway }
    }

    pub fn model_name(&self) -> String {
        self.gateway.model_name()
    }

    /// Expands a query into search terms. Items are passed through as the
    /// model produced them; fails when the list is empty.
    pub async fn generate_terms(&self, query: &str) -> Result<Vec<SearchTerm>, SearchError> {
        require_text(query, "Invalid query")?;
        info!("Generating search terms for query: {}", query);

        let parsed = self
            .run(Task {
                name: "generate-terms",
                key: "terms",
                mode: CompletionMode::Plain,
                system: prompts::TERMS_SYSTEM,
                user: prompts::terms_user(query),
                schema: prompts::terms_schema(),
            })
            .await?;

        let terms: Vec<SearchTerm> = match parsed.get("terms") {
            Some(Value::Array(items)) => items.iter().cloned().map(SearchTerm::from_value).collect(),
            _ => Vec::new(),
        };

        if terms.is_empty() {
            return Err(SearchError::Generation("No terms generated".to_string()));
        }

        info!("Generated {} search terms", terms.len());
        Ok(terms)
    }

    /// Finds image URLs for one term. An empty list is a valid answer.
    pub async fn search_images(&self, term: &str) -> Result<Vec<String>, SearchError> {
        require_text(term, "Invalid term")?;
        info!("Searching images for term: {}", term);

        let parsed = self
            .run(Task {
                name: "search-images",
                key: "imageUrls",
                mode: CompletionMode::WebSearch,
                system: prompts::IMAGES_SYSTEM,
                user: prompts::images_user(term),
                schema: prompts::images_schema(),
            })
            .await?;

        let urls = http_urls(parsed.get("imageUrls"), None);
        info!("Found {} images for \"{}\"", urls.len(), term);
        Ok(urls)
    }

    /// Single round trip that both expands terms and finds images.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        require_text(query, "Invalid query")?;
        info!("Running aggregate search for query: {}", query);

        let parsed = self
            .run(Task {
                name: "search",
                key: "results",
                mode: CompletionMode::WebSearch,
                system: prompts::AGGREGATE_SYSTEM,
                user: prompts::aggregate_user(query),
                schema: prompts::aggregate_schema(),
            })
            .await?;

        let raw = parsed
            .get("results")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        debug!("Processing {} raw results", raw.len());

        let results: Vec<SearchResult> = raw.iter().filter_map(aggregate_item).collect();
        if results.is_empty() {
            return Err(SearchError::Generation(
                "No valid image results were returned".to_string(),
            ));
        }

        let total_images: usize = results.iter().map(|r| r.image_urls.len()).sum();
        info!(
            "Returning {} terms with {} total images",
            results.len(),
            total_images
        );
        Ok(results)
    }

    async fn run(&self, task: Task) -> Result<Value, SearchError> {
        let name = task.name;
        let started = Instant::now();
        let outcome = self.call(task).await;

        match &outcome {
            Ok(_) => info!("[{}] completed in {}ms", name, started.elapsed().as_millis()),
            Err(e) => error!(
                "[{}] {} error after {}ms: {}",
                name,
                e.kind(),
                started.elapsed().as_millis(),
                e
            ),
        }

        outcome
    }

    async fn call(&self, task: Task) -> Result<Value, SearchError> {
        self.gateway.ensure_credential()?;

        let request =
            CompletionRequest::new(task.system, &task.user, task.mode).with_schema(task.schema);
        debug!(
            "[{}] calling {} (web_search: {})",
            task.name,
            self.gateway.model_name(),
            task.mode.uses_web_search()
        );
        let output = self.gateway.complete(request).await?;
        debug!(
            "[{}] output length {}, preview: {}",
            task.name,
            output.len(),
            output.chars().take(PREVIEW_CHARS).collect::<String>()
        );

        extract_json(&output, task.key).inspect_err(|_| {
            debug!("[{}] unparseable output: {}", task.name, output);
        })
    }
}

fn require_text(value: &str, message: &str) -> Result<(), SearchError> {
    if value.trim().is_empty() {
        Err(SearchError::Validation(message.to_string()))
    } else {
        Ok(())
    }
}

/// String entries starting with `http`, optionally capped.
fn http_urls(value: Option<&Value>, limit: Option<usize>) -> Vec<String> {
    let urls = value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .filter(|url| url.starts_with("http"))
        .map(str::to_string);

    match limit {
        Some(n) => urls.take(n).collect(),
        None => urls.collect(),
    }
}

fn aggregate_item(item: &Value) -> Option<SearchResult> {
    let text = |field: &str| {
        item.get(field)
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or("")
            .to_string()
    };
    let term = text("term");
    let urls = http_urls(item.get("imageUrls"), Some(MAX_URLS_PER_RESULT));

    if term.is_empty() || urls.is_empty() {
        debug!(
            "Skipping result \"{}\": {}",
            term,
            if term.is_empty() { "no term" } else { "no images" }
        );
        return None;
    }

    Some(SearchResult::new(term, text("description"), urls))
}
