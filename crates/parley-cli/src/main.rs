//! Parley CLI - serve a local chat model or talk to it.

use clap::{Parser, Subcommand};

mod commands;

/// Parley - a local chat model behind an HTTP API
#[derive(Parser)]
#[command(name = "parley")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the model and serve chat completions on port 8000
    Serve,

    /// Start an interactive chat against a running service
    Chat,

    /// Show the resolved configuration
    Info,
}

impl Commands {
    fn log_filter(&self, verbose: bool) -> &'static str {
        match (self, verbose) {
            (_, true) => "debug",
            (Commands::Serve, false) => "info",
            // Keep the chat transcript free of log lines.
            (Commands::Chat | Commands::Info, false) => "warn",
        }
    }
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    // Set up logging; RUST_LOG wins over the defaults.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.command.log_filter(cli.verbose)));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    match cli.command {
        Commands::Serve => runtime()?.block_on(commands::serve::run()),
        Commands::Chat => runtime()?.block_on(commands::chat::run()),
        Commands::Info => commands::info::run(),
    }
}

fn runtime() -> miette::Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| miette::miette!("Failed to start async runtime: {}", e))
}
