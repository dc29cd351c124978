mod common;

use std::sync::{Arc, Mutex};

use refmonster::collage::{CollageView, Tile};
use refmonster::gateway::OpenAIGateway;
use refmonster::orchestrator::{
    HttpReferenceApi, Orchestrator, OrchestratorSettings, ProgressSink, SearchEvent, StageStatus,
};
use refmonster::search::ReferenceSearch;

use common::{expected_terms, image_url, spawn_server, spawn_upstream, test_config, TERMS};

#[derive(Default)]
struct Collect(Mutex<Vec<SearchEvent>>);

impl ProgressSink for Collect {
    fn publish(&self, event: SearchEvent) {
        self.0.lock().unwrap().push(event);
    }
}

impl Collect {
    fn events(&self) -> Vec<SearchEvent> {
        self.0.lock().unwrap().clone()
    }
}

#[tokio::test]
async fn test_search_through_running_server() {
    let (upstream_url, upstream) = spawn_upstream().await;
    let base = spawn_server(&test_config(&upstream_url)).await;

    let orchestrator = Orchestrator::new(
        Arc::new(HttpReferenceApi::new(&base)),
        OrchestratorSettings::immediate(3),
    );
    let sink = Collect::default();
    let results = orchestrator.run("steampunk airship", &sink).await.unwrap();

    // One term call plus one lookup per term
    assert_eq!(upstream.calls(), 1 + TERMS.len());

    let terms: Vec<&str> = results.iter().map(|r| r.term.as_str()).collect();
    assert_eq!(terms, expected_terms());
    for result in &results {
        assert_eq!(result.image_urls, vec![image_url(&result.term)]);
        assert!(result.image_urls.iter().all(|u| u.starts_with("http")));
    }

    let mut view = CollageView::new();
    for event in sink.events() {
        view.apply(&event);
    }
    assert!(!view.is_loading());
    assert!(view
        .checklist()
        .iter()
        .all(|item| item.status == StageStatus::Completed));
    assert_eq!(view.tiles().len(), expected_terms().len());
    assert!(matches!(&view.tiles()[0], Tile::Image { term, .. } if term == "brass gears"));
}

#[tokio::test]
async fn test_in_process_search() {
    let (upstream_url, upstream) = spawn_upstream().await;
    let config = test_config(&upstream_url);
    let gateway = OpenAIGateway::new(&config.openai).unwrap();
    let orchestrator = Orchestrator::new(
        Arc::new(ReferenceSearch::new(Arc::new(gateway))),
        OrchestratorSettings::from(&config.search),
    );

    let results = orchestrator.run("steampunk airship", &Collect::default()).await.unwrap();
    assert_eq!(results.len(), expected_terms().len());
    assert_eq!(upstream.calls(), 1 + TERMS.len());
}

#[tokio::test]
async fn test_failed_term_generation_over_http() {
    let (upstream_url, upstream) = spawn_upstream().await;
    let mut config = test_config(&upstream_url);
    config.openai.api_key = "wrong-key".to_string();
    let base = spawn_server(&config).await;

    let orchestrator = Orchestrator::new(
        Arc::new(HttpReferenceApi::new(&base)),
        OrchestratorSettings::immediate(6),
    );
    let sink = Collect::default();
    let err = orchestrator.run("castle", &sink).await.unwrap_err();
    assert!(err.to_string().contains("invalid api key"));

    // Only the term call reached the model
    assert_eq!(upstream.calls(), 1);
    assert!(matches!(sink.events().last(), Some(SearchEvent::Failed { .. })));
}

#[tokio::test]
async fn test_aggregate_search_through_running_server() {
    let (upstream_url, upstream) = spawn_upstream().await;
    let base = spawn_server(&test_config(&upstream_url)).await;

    let orchestrator = Orchestrator::new(
        Arc::new(HttpReferenceApi::new(&base)),
        OrchestratorSettings::immediate(6),
    );
    let results = orchestrator
        .run_aggregate("steampunk airship", &Collect::default())
        .await
        .unwrap();

    assert_eq!(results.len(), TERMS.len());
    assert_eq!(upstream.calls(), 1);
}
