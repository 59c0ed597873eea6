// Registry Client - Main Entry Point
//
// Thin CLI over the library:
// - submit: send one signed document through the rate-limited client
// - sample: print an example document

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use registry_client::config::Config;
use registry_client::{Document, DocumentSubmitter};
use std::fs;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

/// Rate-limited document registry client
#[derive(Parser, Debug)]
#[command(name = "registry-client")]
#[command(version)]
#[command(about = "Submit signed documents to a registry under a request quota", long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = registry_client::config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Submit one document
    Submit {
        /// Path to a JSON file holding the document
        #[arg(long)]
        document: PathBuf,

        /// Signature over the document
        #[arg(long)]
        signature: String,
    },
    /// Print a sample document as JSON
    Sample,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load_from_path(&args.config)?;

    init_tracing(&config, args.verbose)?;

    match args.command {
        Commands::Submit {
            document,
            signature,
        } => submit(&config, document, signature).await,
        Commands::Sample => {
            println!("{}", serde_json::to_string_pretty(&Document::sample())?);
            Ok(())
        }
    }
}

fn init_tracing(config: &Config, verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { config.log_level()? };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.logging.format.to_lowercase().as_str() {
        "json" => builder.json().init(),
        "pretty" => builder.pretty().init(),
        _ => builder.compact().init(),
    }
    Ok(())
}

async fn submit(config: &Config, path: PathBuf, signature: String) -> Result<()> {
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read document from {:?}", path))?;
    let document: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse document JSON from {:?}", path))?;

    let client = DocumentSubmitter::from_config(config).context("Failed to build registry client")?;
    info!(
        endpoint = %config.registry.endpoint,
        limit = config.rate_limit.request_limit,
        window = %config.rate_limit.window_unit,
        "Submitting document"
    );

    let result = client
        .submit(&document, &signature)
        .await
        .context("Document submission failed")?;
    client.shutdown();

    println!("{}", result.body);
    Ok(())
}
