pub mod config;
pub mod search;
pub mod serve;
pub mod terms;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "refmonster")]
#[command(author, version, about = "Art reference search and collage builder")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file
    #[arg(short, long, global = true, env = "REFMONSTER_CONFIG")]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server
    Serve(serve::ServeArgs),

    /// Search for references and build a collage
    Search(search::SearchArgs),

    /// Only generate search terms for a query
    Terms(terms::TermsArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}
