use anyhow::Result;
use clap::Args;
use std::sync::Arc;

use refmonster::config::Config;
use refmonster::gateway::OpenAIGateway;
use refmonster::search::{GenerateTermsResponse, ReferenceSearch};

#[derive(Args)]
pub struct TermsArgs {
    /// What you need references for
    pub query: String,

    /// Output format: text (default) or json
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

pub async fn run(args: TermsArgs, config_path: Option<&str>) -> Result<()> {
    let config = Config::load_from(config_path)?;
    let gateway = OpenAIGateway::new(&config.openai)?;
    let search = ReferenceSearch::new(Arc::new(gateway));

    let terms = search.generate_terms(&args.query).await?;

    if args.format == "json" {
        let body = GenerateTermsResponse { terms };
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        for (i, term) in terms.iter().enumerate() {
            if term.description().is_empty() {
                println!("{:>2}. {}", i + 1, term.term());
            } else {
                println!("{:>2}. {} - {}", i + 1, term.term(), term.description());
            }
        }
    }

    Ok(())
}
