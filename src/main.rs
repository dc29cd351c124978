use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Commands};
use refmonster::config::{Config, LoggingConfig};

fn main() -> Result<()> {
    let cli = Cli::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    // A broken config still gets reported by the command itself
    let logging = Config::load_from(cli.config.as_deref())
        .map(|c| c.logging)
        .unwrap_or_default();
    init_logging(cli.verbose, &logging);

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Serve(args) => cli::serve::run(args, config_path).await,
        Commands::Search(args) => cli::search::run(args, config_path).await,
        Commands::Terms(args) => cli::terms::run(args, config_path).await,
        Commands::Config(args) => cli::config::run(args, config_path).await,
    }
}

fn init_logging(verbose: bool, logging: &LoggingConfig) {
    let log_level = if verbose { "debug" } else { logging.level.as_str() };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr);

    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}
