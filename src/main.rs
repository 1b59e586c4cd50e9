use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use nest_ai::{start_web_server, ServerConfig};

// Define the command-line interface structure using clap
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the Nest AI web server.
    Start {
        #[command(flatten)]
        config: ServerConfig,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (for environment variables like GEMINI_API_KEY)
    dotenvy::dotenv().ok();

    // Reads log level from RUST_LOG environment variable (e.g., RUST_LOG=info,nest_ai=debug)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // A missing GEMINI_API_KEY fails here, before anything is served.
    let cli = Cli::parse();

    match cli.command {
        Commands::Start { config } => {
            info!("Starting Nest AI on port {}...", config.port);

            let mut server = tokio::spawn(start_web_server(config));

            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(ctrl_c);

            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("Ctrl-C received, shutting down...");
                    server.abort();
                }
                res = &mut server => {
                    // The server only returns on failure.
                    res.context("Web server task panicked")??;
                }
            }
            info!("Shutdown complete.");
        }
    }

    Ok(())
}
