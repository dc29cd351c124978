use anyhow::Result;
use clap::Args;

use refmonster::config::Config;
use refmonster::server::Server;

#[derive(Args)]
pub struct ServeArgs {
    /// Address to bind (overrides config)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,
}

pub async fn run(args: ServeArgs, config_path: Option<&str>) -> Result<()> {
    let mut config = Config::load_from(config_path)?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    if config.openai.resolve_api_key().is_none() {
        tracing::warn!(
            "{} not configured; searches will fail until it is set",
            config.openai.credential_name()
        );
    }

    let server = Server::new(&config)?;
    server.run().await
}
