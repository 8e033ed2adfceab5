//! BenchPilot CLI, the main entry point.
//!
//! Commands:
//! - `turn`     Run one controller turn against the configured vendor
//! - `tools`    Print the tool catalog for a client type
//! - `pricing`  Show the pricing tier a model resolves to

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "benchpilot",
    about = "BenchPilot: normalized next actions from any LLM vendor",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to BENCHPILOT_CONFIG, then ~/.benchpilot/config.toml)
    #[arg(short, long, global = true, env = "BENCHPILOT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one prompt and print the normalized action
    Turn {
        /// Prompt text
        #[arg(short, long)]
        prompt: String,

        /// Screenshot to attach (repeatable)
        #[arg(short, long = "image")]
        images: Vec<PathBuf>,
    },

    /// Print the tool catalog
    Tools {
        /// Client type (browser, file, code, jupyter, shell, unified, none)
        #[arg(long)]
        client_type: Option<String>,

        /// Render as prompt text instead of JSON schemas
        #[arg(long)]
        text: bool,
    },

    /// Look up pricing for a model and price a call
    Pricing {
        model: String,

        #[arg(long, default_value_t = 0)]
        prompt_tokens: u64,

        #[arg(long, default_value_t = 0)]
        completion_tokens: u64,

        #[arg(long, default_value_t = 0)]
        cached_tokens: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Turn { prompt, images } => commands::turn::run(config, &prompt, &images).await?,
        Commands::Tools { client_type, text } => commands::tools::run(config, client_type.as_deref(), text)?,
        Commands::Pricing {
            model,
            prompt_tokens,
            completion_tokens,
            cached_tokens,
        } => commands::pricing::run(config, &model, prompt_tokens, completion_tokens, cached_tokens)?,
    }

    Ok(())
}
