use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::info;

use refmonster::collage::{render_checklist_text, CollageView};
use refmonster::config::Config;
use refmonster::gateway::OpenAIGateway;
use refmonster::orchestrator::{
    ChecklistItem, HttpReferenceApi, Orchestrator, OrchestratorSettings, ReferenceApi,
    SearchEvent, StageStatus,
};
use refmonster::search::prompts::SUGGESTIONS;
use refmonster::search::{ReferenceSearch, SearchResponse};

#[derive(Args)]
pub struct SearchArgs {
    /// What you need references for
    pub query: Option<String>,

    /// Use a running refmonster server instead of calling the model directly
    #[arg(short, long)]
    pub server: Option<String>,

    /// Use the single-call aggregate search
    #[arg(long)]
    pub aggregate: bool,

    /// Maximum concurrent image lookups (overrides config)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Write the collage as an HTML page
    #[arg(long)]
    pub html: Option<PathBuf>,

    /// Output format: text (default) or json
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

pub async fn run(args: SearchArgs, config_path: Option<&str>) -> Result<()> {
    let Some(query) = args
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
    else {
        eprintln!("Usage: refmonster search <query>\n\nTry one of:");
        for suggestion in SUGGESTIONS {
            eprintln!("  {}", suggestion);
        }
        return Ok(());
    };

    let mut config = Config::load_from(config_path)?;
    if let Some(concurrency) = args.concurrency {
        config.search.max_concurrency = concurrency;
        config.validate()?;
    }

    let mut settings = OrchestratorSettings::from(&config.search);
    let api: Arc<dyn ReferenceApi> = match &args.server {
        Some(url) => Arc::new(HttpReferenceApi::new(url)),
        None => {
            settings = settings.with_model(config.openai.model.clone());
            let gateway = OpenAIGateway::new(&config.openai)?;
            Arc::new(ReferenceSearch::new(Arc::new(gateway)))
        }
    };
    let orchestrator = Orchestrator::new(api, settings);

    let (tx, mut rx) = mpsc::unbounded_channel::<SearchEvent>();
    let printer = tokio::spawn(async move {
        let mut view = CollageView::new();
        let mut previous: Vec<ChecklistItem> = Vec::new();
        while let Some(event) = rx.recv().await {
            print_progress(&event, &previous);
            if let SearchEvent::Checklist { items } = &event {
                previous = items.clone();
            }
            view.apply(&event);
        }
        view
    });

    let started = Instant::now();
    let outcome = if args.aggregate {
        orchestrator.run_aggregate(query, &tx).await
    } else {
        orchestrator.run(query, &tx).await
    };
    drop(tx);
    let view = printer.await.context("Progress printer failed")?;
    eprint!("\n{}", render_checklist_text(view.checklist()));
    let results = outcome?;
    info!("Search finished in {:?}", started.elapsed());

    if args.format == "json" {
        println!(
            "{}",
            serde_json::to_string_pretty(&SearchResponse { results })?
        );
    } else {
        print!("{}", view.render_text());
    }

    if let Some(path) = args.html {
        std::fs::write(&path, view.render_document(query))
            .with_context(|| format!("Failed to write collage to {}", path.display()))?;
        eprintln!("Wrote collage to {}", path.display());
    }

    Ok(())
}

/// Progress goes to stderr so stdout stays clean for `--format json`.
fn print_progress(event: &SearchEvent, previous: &[ChecklistItem]) {
    match event {
        SearchEvent::Checklist { items } => {
            for item in items {
                let changed = previous
                    .iter()
                    .find(|p| p.id == item.id)
                    .map_or(item.status != StageStatus::Pending, |p| p.status != item.status);
                if !changed {
                    continue;
                }
                match item.status {
                    StageStatus::Active => eprintln!("[~] {}...", item.label),
                    StageStatus::Completed => eprintln!("[x] {}", item.label),
                    StageStatus::Pending => {}
                }
            }
        }
        SearchEvent::Terms { terms } => {
            for term in terms {
                eprintln!("    - {}", term.term());
            }
        }
        SearchEvent::ImagesFound { term, image_urls } => {
            eprintln!("    {} images for \"{}\"", image_urls.len(), term);
        }
        SearchEvent::Completed { .. } | SearchEvent::Failed { .. } => {}
    }
}
