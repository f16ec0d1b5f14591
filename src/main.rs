//! catalog-ingest command line entry point

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use catalog_ingest::commands::{self, AppContext, ScrapeCommand};
use catalog_ingest::infrastructure::config::AppConfig;
use catalog_ingest::infrastructure::logging;
use catalog_ingest::server;

#[derive(Parser, Debug)]
#[command(name = "catalog-ingest")]
#[command(about = "Scrape a paginated product listing into a JSON catalog")]
#[command(version)]
struct Cli {
    /// Configuration file layered over the defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one ingestion pass and print the result as JSON
    Scrape(ScrapeCommand),

    /// Print the stored catalog as JSON
    Products,

    /// Serve the HTTP trigger
    Serve {
        /// Listen address, overriding `server.bind_addr`
        #[arg(long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    logging::init_logging_with_config(&config.logging)?;
    logging::log_system_info();

    let ctx = AppContext::initialize(config).await?;

    match cli.command {
        Commands::Scrape(command) => {
            let response = commands::execute_scrape(&ctx, &command).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Products => {
            let products = commands::list_products(&ctx).await?;
            println!("{}", serde_json::to_string_pretty(&products)?);
        }
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| ctx.config.server.bind_addr.clone());
            server::serve(ctx, &bind).await?;
            info!("👋 Server stopped");
        }
    }

    Ok(())
}
