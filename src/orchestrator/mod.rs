//! Drives one reference search end to end: term generation, bounded
//! per-term image lookups, and the four-stage checklist.

pub mod api;
pub mod checklist;
pub mod epoch;

pub use api::{ApiError, HttpReferenceApi, ReferenceApi};
pub use checklist::{Checklist, ChecklistError, ChecklistItem, Stage, StageStatus};
pub use epoch::{Epoch, EpochGate};

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::SearchConfig;
use crate::search::{SearchResult, SearchTerm};

/// Shown when a failure carries no message of its own
pub const GENERIC_FAILURE: &str = "Search failed. Please check your OPENAI_API_KEY.";

/// Progress published while a search runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchEvent {
    Checklist { items: Vec<ChecklistItem> },
    Terms { terms: Vec<SearchTerm> },
    ImagesFound { term: String, image_urls: Vec<String> },
    Completed { results: Vec<SearchResult> },
    Failed { message: String },
}

pub trait ProgressSink: Send + Sync {
    fn publish(&self, event: SearchEvent);
}

impl ProgressSink for mpsc::UnboundedSender<SearchEvent> {
    fn publish(&self, event: SearchEvent) {
        // Receiver gone means nobody is watching; the run still finishes.
        let _ = self.send(event);
    }
}

/// Discards every event.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn publish(&self, _event: SearchEvent) {}
}

#[derive(Error, Debug)]
pub enum OrchestrationError {
    #[error("{0}")]
    Failed(String),

    #[error("Search superseded by a newer one")]
    Superseded,

    #[error(transparent)]
    Checklist(#[from] ChecklistError),
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub max_concurrency: usize,
    pub terms_pause: Duration,
    pub collage_pause: Duration,
    pub finalize_pause: Duration,
    /// Named in the first checklist label when known
    pub model: Option<String>,
}

impl OrchestratorSettings {
    /// No cosmetic pauses.
    pub fn immediate(max_concurrency: usize) -> Self {
        Self {
            max_concurrency,
            terms_pause: Duration::ZERO,
            collage_pause: Duration::ZERO,
            finalize_pause: Duration::ZERO,
            model: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

impl From<&SearchConfig> for OrchestratorSettings {
    fn from(config: &SearchConfig) -> Self {
        Self {
            max_concurrency: config.max_concurrency,
            terms_pause: Duration::from_millis(config.terms_pause_ms),
            collage_pause: Duration::from_millis(config.collage_pause_ms),
            finalize_pause: Duration::from_millis(config.finalize_pause_ms),
            model: None,
        }
    }
}

/// State of one run: its epoch, where events go, and its checklist.
struct Run<'a> {
    epoch: Epoch,
    sink: &'a dyn ProgressSink,
    checklist: Checklist,
}

impl Run<'_> {
    fn publish(&self, event: SearchEvent) {
        if self.epoch.is_current() {
            self.sink.publish(event);
        } else {
            debug!("Dropping event from stale search epoch {}", self.epoch.value());
        }
    }

    fn publish_checklist(&self) {
        self.publish(SearchEvent::Checklist {
            items: self.checklist.items().to_vec(),
        });
    }

    fn ensure_current(&self) -> Result<(), OrchestrationError> {
        if self.epoch.is_current() {
            Ok(())
        } else {
            info!("Search epoch {} superseded", self.epoch.value());
            Err(OrchestrationError::Superseded)
        }
    }

    fn fail(&mut self, message: String) -> OrchestrationError {
        let message = if message.trim().is_empty() {
            GENERIC_FAILURE.to_string()
        } else {
            message
        };
        self.checklist.reset();
        self.publish_checklist();
        self.publish(SearchEvent::Failed {
            message: message.clone(),
        });
        OrchestrationError::Failed(message)
    }
}

pub struct Orchestrator {
    api: Arc<dyn ReferenceApi>,
    settings: OrchestratorSettings,
    epochs: EpochGate,
}

impl Orchestrator {
    pub fn new(api: Arc<dyn ReferenceApi>, settings: OrchestratorSettings) -> Self {
        Self::with_epochs(api, settings, EpochGate::new())
    }

    /// Shares `epochs` with other orchestrators, so a search started by any of
    /// them supersedes the rest.
    pub fn with_epochs(
        api: Arc<dyn ReferenceApi>,
        settings: OrchestratorSettings,
        epochs: EpochGate,
    ) -> Self {
        Self {
            api,
            settings,
            epochs,
        }
    }

    pub fn epochs(&self) -> &EpochGate {
        &self.epochs
    }

    /// Two-step flow: generate terms, then look up images per term.
    ///
    /// Lookups run at most `max_concurrency` at a time. A failed lookup only
    /// drops its term; results keep the generated term order.
    pub async fn run(
        &self,
        query: &str,
        sink: &dyn ProgressSink,
    ) -> Result<Vec<SearchResult>, OrchestrationError> {
        let mut run = self.begin(sink);
        info!("Starting search {} for: {}", run.epoch.value(), query);

        run.checklist.start(Stage::Analyze)?;
        run.publish_checklist();

        let terms = match self.api.generate_terms(query).await {
            Ok(terms) => terms,
            Err(e) => {
                warn!("Terms generation error: {}", e);
                return Err(run.fail(e.to_string()));
            }
        };
        run.ensure_current()?;
        info!("Generated {} search terms", terms.len());

        run.checklist.complete(Stage::Analyze, None)?;
        run.checklist.start(Stage::Generate)?;
        run.checklist.complete(
            Stage::Generate,
            Some(format!("Generated {} search terms", terms.len())),
        )?;
        run.publish_checklist();
        run.publish(SearchEvent::Terms {
            terms: terms.clone(),
        });

        pause(self.settings.terms_pause).await;

        run.checklist.start(Stage::Search)?;
        run.publish_checklist();

        let total = terms.len();
        let results: Vec<SearchResult> = {
            let run = &run;
            let lookups: std::pin::Pin<
                Box<dyn std::future::Future<Output = Vec<SearchResult>> + Send + '_>,
            > = Box::pin(
                stream::iter(terms.iter().enumerate())
                    .map(move |(index, term)| self.lookup(run, index, total, term))
                    .buffered(self.settings.max_concurrency.max(1))
                    .filter_map(|result| async move { result })
                    .collect(),
            );
            lookups.await
        };

        self.finish(run, results).await
    }

    /// Single-call flow through the aggregate endpoint.
    pub async fn run_aggregate(
        &self,
        query: &str,
        sink: &dyn ProgressSink,
    ) -> Result<Vec<SearchResult>, OrchestrationError> {
        let mut run = self.begin(sink);
        info!("Starting aggregate search {} for: {}", run.epoch.value(), query);

        run.checklist.start(Stage::Analyze)?;
        run.publish_checklist();

        let results = match self.api.search(query).await {
            Ok(results) => results,
            Err(e) => {
                warn!("Aggregate search error: {}", e);
                return Err(run.fail(e.to_string()));
            }
        };
        run.ensure_current()?;

        run.checklist.complete(Stage::Analyze, None)?;
        run.checklist.start(Stage::Generate)?;
        run.checklist.complete(
            Stage::Generate,
            Some(format!("Generated {} search terms", results.len())),
        )?;
        run.publish_checklist();
        run.publish(SearchEvent::Terms {
            terms: results
                .iter()
                .map(|r| SearchTerm::new(&r.term, &r.description))
                .collect(),
        });

        run.checklist.start(Stage::Search)?;
        run.publish_checklist();
        for result in &results {
            run.publish(SearchEvent::ImagesFound {
                term: result.term.clone(),
                image_urls: result.image_urls.clone(),
            });
        }

        self.finish(run, results).await
    }

    fn begin<'a>(&self, sink: &'a dyn ProgressSink) -> Run<'a> {
        Run {
            epoch: self.epochs.begin(),
            sink,
            checklist: Checklist::for_model(self.settings.model.as_deref()),
        }
    }

    async fn lookup(
        &self,
        run: &Run<'_>,
        index: usize,
        total: usize,
        term: &SearchTerm,
    ) -> Option<SearchResult> {
        let name = term.term();
        debug!("[{}/{}] Starting search for: {}", index + 1, total, name);

        match self.api.search_images(name).await {
            Ok(urls) if !urls.is_empty() => {
                debug!("Found {} images for \"{}\"", urls.len(), name);
                run.publish(SearchEvent::ImagesFound {
                    term: name.to_string(),
                    image_urls: urls.clone(),
                });
                Some(SearchResult::new(name, term.description(), urls))
            }
            Ok(_) => {
                debug!("No images for \"{}\"", name);
                None
            }
            Err(e) => {
                warn!("Error searching images for \"{}\": {}", name, e);
                None
            }
        }
    }

    /// Stage 3 wrap-up and stage 4, then delivery.
    async fn finish(
        &self,
        mut run: Run<'_>,
        results: Vec<SearchResult>,
    ) -> Result<Vec<SearchResult>, OrchestrationError> {
        run.checklist.complete(
            Stage::Search,
            Some(format!("Found images for {} terms", results.len())),
        )?;
        run.checklist.start(Stage::Collage)?;
        run.publish_checklist();

        pause(self.settings.collage_pause).await;

        run.checklist.complete(Stage::Collage, None)?;
        run.publish_checklist();

        pause(self.settings.finalize_pause).await;

        run.ensure_current()?;
        info!(
            "Search {} finished with {} terms",
            run.epoch.value(),
            results.len()
        );
        run.publish(SearchEvent::Completed {
            results: results.clone(),
        });
        Ok(results)
    }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
