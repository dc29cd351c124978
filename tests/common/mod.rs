#![allow(dead_code)]

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

use refmonster::config::Config;
use refmonster::server::Server;

pub const TEST_KEY: &str = "test-key";

/// Terms the fake model hands out. `fail ...` lookups error, `empty ...`
/// lookups return no usable URLs.
pub const TERMS: [&str; 9] = [
    "brass gears",
    "airship deck",
    "fail hull",
    "rigging ropes",
    "empty sky",
    "propeller blades",
    "captain coat",
    "cloud harbor",
    "steam boiler",
];

pub fn image_url(term: &str) -> String {
    format!("https://img.example/{}.jpg", term.replace(' ', "-"))
}

/// Expected results: every term except the failing and empty ones, in order.
pub fn expected_terms() -> Vec<&'static str> {
    TERMS
        .iter()
        .copied()
        .filter(|t| !t.starts_with("fail") && !t.starts_with("empty"))
        .collect()
}

/// A stand-in for the Responses API that answers based on the prompt.
#[derive(Default)]
pub struct FakeUpstream {
    calls: AtomicUsize,
    bodies: Mutex<Vec<Value>>,
}

impl FakeUpstream {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn bodies(&self) -> Vec<Value> {
        self.bodies.lock().unwrap().clone()
    }
}

fn quoted_after<'a>(input: &'a str, marker: &str) -> Option<&'a str> {
    let rest = &input[input.find(marker)? + marker.len()..];
    rest.split('"').next()
}

fn message(text: String) -> Value {
    json!({
        "output": [
            { "type": "web_search_call", "status": "completed" },
            {
                "type": "message",
                "content": [{ "type": "output_text", "text": text }]
            }
        ]
    })
}

async fn responses(
    State(upstream): State<Arc<FakeUpstream>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    upstream.calls.fetch_add(1, Ordering::SeqCst);
    upstream.bodies.lock().unwrap().push(body.clone());

    let authorized = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", TEST_KEY))
        .unwrap_or(false);
    if !authorized {
        return (StatusCode::UNAUTHORIZED, "invalid api key").into_response();
    }

    let input = body["input"].as_str().unwrap_or_default();

    if let Some(term) = quoted_after(input, "Search term: \"") {
        if term.starts_with("fail") {
            return (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response();
        }
        // Scramble completion order
        let delay = (term.len() % 3) as u64 * 15;
        tokio::time::sleep(Duration::from_millis(delay)).await;

        let text = if term.starts_with("empty") {
            r#"{"imageUrls": ["/relative.jpg", "ftp://files.example/x.png"]}"#.to_string()
        } else {
            format!(
                "Found one.\n{{\"imageUrls\": [\"{}\", \"not-a-url\"]}}",
                image_url(term)
            )
        };
        return Json(message(text)).into_response();
    }

    if input.contains("Return JSON with this structure") {
        let results: Vec<Value> = TERMS
            .iter()
            .map(|t| json!({ "term": t, "description": "aggregate", "imageUrls": [image_url(t)] }))
            .collect();
        let text = json!({ "results": results }).to_string();
        return Json(json!({ "output_text": text })).into_response();
    }

    let terms: Vec<Value> = TERMS
        .iter()
        .map(|t| json!({ "term": t, "description": format!("{} detail", t) }))
        .collect();
    let text = format!("```json\n{}\n```", json!({ "terms": terms }));
    Json(json!({ "output_text": text })).into_response()
}

pub async fn spawn_upstream() -> (String, Arc<FakeUpstream>) {
    let upstream = Arc::new(FakeUpstream::default());
    let app = Router::new()
        .route("/v1/responses", post(responses))
        .with_state(upstream.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/v1", addr), upstream)
}

/// Config pointing at `base_url` with the test key and no cosmetic pauses.
pub fn test_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.openai.base_url = base_url.to_string();
    config.openai.api_key = TEST_KEY.to_string();
    config.search.terms_pause_ms = 0;
    config.search.collage_pause_ms = 0;
    config.search.finalize_pause_ms = 0;
    config
}

pub async fn spawn_server(config: &Config) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = Server::new(config).unwrap();
    tokio::spawn(async move {
        let _: anyhow::Result<()> = server.serve(listener).await;
    });

    format!("http://{}", addr)
}
