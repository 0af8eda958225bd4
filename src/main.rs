//! docqa: retrieval-augmented question answering over uploaded documents.

use clap::{Parser, Subcommand};
use docqa::Settings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "docqa")]
#[command(author, version, about = "Document question answering server")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server
    Serve {
        /// Bind address, overriding the configured one
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },
    /// Print the effective configuration and exit
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let settings = match cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };

    match cli.command {
        Command::Serve { bind } => docqa::api::serve(settings, bind).await,
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(())
        }
    }
}
