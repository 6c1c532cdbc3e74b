//! Briefsmith CLI — the main entry point.
//!
//! Commands:
//! - `chat`   — Interactive drafting session
//! - `stores` — Knowledge store administration
//! - `reset`  — Remove the local registry file

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "briefsmith",
    about = "Briefsmith — bankruptcy motion drafting assistant",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Registry file path (defaults to briefsmith.json or $BRIEFSMITH_CONFIG)
    #[arg(long, global = true)]
    registry: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive drafting session
    Chat {
        /// Motion type slug (value_claim or avoid_lien)
        #[arg(short, long)]
        motion: Option<String>,

        /// Filing jurisdiction, e.g. "Bankr. D. Mass."
        #[arg(short, long)]
        jurisdiction: Option<String>,

        /// Bankruptcy chapter (7, 11, or 13)
        #[arg(short, long)]
        chapter: Option<String>,

        /// HTML-to-PDF conversion service endpoint
        #[arg(long, env = "BRIEFSMITH_CONVERTER_URL")]
        converter_url: Option<String>,

        /// Directory where generated documents are written
        #[arg(long, default_value = "artifacts")]
        output_dir: std::path::PathBuf,
    },

    /// Administer knowledge stores
    Stores {
        #[command(subcommand)]
        action: commands::stores::StoresAction,
    },

    /// Remove the local registry file
    Reset,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let registry_path = cli
        .registry
        .unwrap_or_else(briefsmith_config::RegistryFile::default_path);

    match cli.command {
        Commands::Chat {
            motion,
            jurisdiction,
            chapter,
            converter_url,
            output_dir,
        } => {
            commands::chat::run(
                registry_path,
                motion,
                jurisdiction,
                chapter,
                converter_url,
                output_dir,
            )
            .await?
        }
        Commands::Stores { action } => commands::stores::run(registry_path, action).await?,
        Commands::Reset => commands::stores::reset(registry_path)?,
    }

    Ok(())
}
