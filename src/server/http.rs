//! HTTP server for refmonster
//!
//! Serves the three JSON endpoints, the SSE collage stream and the embedded
//! web page. Browser sessions only carry a search epoch, so a newer search
//! from the same page supersedes the older one.

use anyhow::Result;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use super::{assets, stream};
use crate::config::Config;
use crate::gateway::{ModelGateway, OpenAIGateway};
use crate::orchestrator::EpochGate;
use crate::search::prompts::SUGGESTIONS;
use crate::search::{
    ErrorResponse, GenerateTermsResponse, ReferenceSearch, SearchError, SearchImagesResponse,
    SearchResponse,
};

/// Session timeout (30 minutes of inactivity)
const SESSION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Maximum number of tracked browser sessions
const MAX_SESSIONS: usize = 100;

pub struct Server {
    config: Config,
    gateway: Arc<dyn ModelGateway>,
}

pub(super) struct SessionEntry {
    epochs: EpochGate,
    last_accessed: Instant,
}

pub(super) struct AppState {
    pub(super) config: Config,
    pub(super) search: ReferenceSearch,
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl Server {
    pub fn new(config: &Config) -> Result<Self> {
        let gateway = OpenAIGateway::new(&config.openai)?;
        Ok(Self::with_gateway(config, Arc::new(gateway)))
    }

    pub fn with_gateway(config: &Config, gateway: Arc<dyn ModelGateway>) -> Self {
        Self {
            config: config.clone(),
            gateway,
        }
    }

    pub async fn run(&self) -> Result<()> {
        let addr: SocketAddr =
            format!("{}:{}", self.config.server.bind, self.config.server.port).parse()?;

        info!("Starting HTTP server on http://{}", addr);

        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serves on an already bound listener.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        info!(
            "Using model {} (max {} concurrent lookups)",
            self.gateway.model_name(),
            self.config.search.max_concurrency
        );
        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    pub fn router(&self) -> Router {
        let state = Arc::new(AppState {
            config: self.config.clone(),
            search: ReferenceSearch::new(self.gateway.clone()),
            sessions: Mutex::new(HashMap::new()),
        });

        // Spawn session cleanup task
        let cleanup_state = state.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                cleanup_expired_sessions(&cleanup_state).await;
            }
        });

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/health", get(health_check))
            .route("/api/suggestions", get(suggestions))
            .route("/api/generate-terms", post(generate_terms))
            .route("/api/search-images", post(search_images))
            .route("/api/search", post(search))
            .route("/api/collage/stream", get(stream::collage_stream))
            .fallback(assets::static_handler)
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .with_state(state)
    }
}

impl IntoResponse for SearchError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// Session cleanup task
async fn cleanup_expired_sessions(state: &Arc<AppState>) {
    let mut sessions = state.sessions.lock().await;
    let before_count = sessions.len();

    sessions.retain(|id, entry| {
        let expired = entry.last_accessed.elapsed() > SESSION_TIMEOUT;
        if expired {
            debug!("Expiring session: {}", id);
        }
        !expired
    });

    let removed = before_count - sessions.len();
    if removed > 0 {
        info!("Cleaned up {} expired sessions", removed);
    }
}

/// Epoch gate for a browser session, creating the session if needed.
pub(super) async fn session_epochs(
    state: &AppState,
    session_id: Option<String>,
) -> (String, EpochGate) {
    let mut sessions = state.sessions.lock().await;

    if let Some(ref id) = session_id {
        if let Some(entry) = sessions.get_mut(id) {
            entry.last_accessed = Instant::now();
            return (id.clone(), entry.epochs.clone());
        }
    }

    if sessions.len() >= MAX_SESSIONS {
        if let Some(oldest_id) = sessions
            .iter()
            .min_by_key(|(_, e)| e.last_accessed)
            .map(|(id, _)| id.clone())
        {
            sessions.remove(&oldest_id);
            info!("Removed oldest session {} to make room", oldest_id);
        }
    }

    let new_id = session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let epochs = EpochGate::new();
    sessions.insert(
        new_id.clone(),
        SessionEntry {
            epochs: epochs.clone(),
            last_accessed: Instant::now(),
        },
    );

    debug!("Created new session: {}", new_id);
    (new_id, epochs)
}

// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

async fn suggestions() -> Json<Vec<&'static str>> {
    Json(SUGGESTIONS.to_vec())
}

/// Pulls a string field out of a JSON body. Anything else is a 400 with
/// `message`.
fn required_field(
    body: Result<Json<Value>, JsonRejection>,
    field: &str,
    message: &str,
) -> Result<String, SearchError> {
    let Ok(Json(value)) = body else {
        return Err(SearchError::Validation(message.to_string()));
    };
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| SearchError::Validation(message.to_string()))
}

async fn generate_terms(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<GenerateTermsResponse>, SearchError> {
    let query = required_field(body, "query", "Invalid query")?;
    let terms = state.search.generate_terms(&query).await?;
    Ok(Json(GenerateTermsResponse { terms }))
}

async fn search_images(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SearchImagesResponse>, SearchError> {
    let term = required_field(body, "term", "Invalid term")?;
    let image_urls = state.search.search_images(&term).await?;
    Ok(Json(SearchImagesResponse { image_urls }))
}

async fn search(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SearchResponse>, SearchError> {
    let query = required_field(body, "query", "Invalid query")?;
    let results = state.search.search(&query).await?;
    Ok(Json(SearchResponse { results }))
}
