//! SSE collage stream: runs one search and pushes rendered checklist and
//! collage fragments to the page as they change.

use axum::{
    extract::{Query, State},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::http::{session_epochs, AppState};
use crate::collage::CollageView;
use crate::orchestrator::{
    OrchestrationError, Orchestrator, OrchestratorSettings, ReferenceApi, SearchEvent,
};
use crate::search::SearchError;

#[derive(Debug, Deserialize)]
pub(super) struct CollageStreamParams {
    query: Option<String>,
    session: Option<String>,
    #[serde(default)]
    aggregate: bool,
    /// Newline-separated image URLs the page could not load.
    failed: Option<String>,
}

enum Step {
    Event(SearchEvent),
    Finished(Result<usize, OrchestrationError>),
}

pub(super) async fn collage_stream(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CollageStreamParams>,
) -> Response {
    let query = params.query.unwrap_or_default().trim().to_string();
    if query.is_empty() {
        return SearchError::Validation("Invalid query".to_string()).into_response();
    }

    let (session_id, epochs) = session_epochs(&state, params.session).await;
    let api: Arc<dyn ReferenceApi> = Arc::new(state.search.clone());
    let settings =
        OrchestratorSettings::from(&state.config.search).with_model(state.search.model_name());
    let orchestrator = Orchestrator::with_epochs(api, settings, epochs);
    let aggregate = params.aggregate;
    let failed: Vec<String> = params
        .failed
        .as_deref()
        .unwrap_or_default()
        .lines()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(String::from)
        .collect();

    let stream = async_stream::stream! {
        // Send session id first
        yield Ok::<Event, Infallible>(Event::default().event("session").data(session_id.clone()));

        let (tx, mut rx) = mpsc::unbounded_channel::<SearchEvent>();
        let mut view = CollageView::new();
        for url in &failed {
            view.mark_failed(url);
        }

        let run = async {
            let outcome = if aggregate {
                orchestrator.run_aggregate(&query, &tx).await
            } else {
                orchestrator.run(&query, &tx).await
            };
            outcome.map(|results| results.len())
        };
        tokio::pin!(run);

        loop {
            let step = tokio::select! {
                biased;
                Some(event) = rx.recv() => Step::Event(event),
                outcome = &mut run => Step::Finished(outcome),
            };

            match step {
                Step::Event(event) => {
                    for frame in render_event(&mut view, &event) {
                        yield Ok(frame);
                    }
                }
                Step::Finished(outcome) => {
                    while let Ok(event) = rx.try_recv() {
                        for frame in render_event(&mut view, &event) {
                            yield Ok(frame);
                        }
                    }
                    match outcome {
                        Ok(count) => info!("Session {}: collage ready with {} terms", session_id, count),
                        Err(OrchestrationError::Superseded) => {
                            debug!("Session {}: search superseded", session_id);
                        }
                        Err(e) => info!("Session {}: search failed: {}", session_id, e),
                    }
                    break;
                }
            }
        }

        yield Ok(Event::default().event("done").data("[DONE]"));
    };

    Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}

/// Applies `event` to the view and returns the frames to send.
fn render_event(view: &mut CollageView, event: &SearchEvent) -> Vec<Event> {
    view.apply(event);
    match event {
        SearchEvent::Checklist { .. } => {
            vec![Event::default()
                .event("checklist")
                .data(view.render_checklist_html())]
        }
        SearchEvent::Terms { .. }
        | SearchEvent::ImagesFound { .. }
        | SearchEvent::Completed { .. } => {
            vec![Event::default().event("collage").data(view.render_html())]
        }
        SearchEvent::Failed { message } => {
            vec![Event::default().event("error").data(message.clone())]
        }
    }
}
