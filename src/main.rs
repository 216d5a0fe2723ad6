use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use formpilot_cli::cli::{cmd_intents, cmd_run, cmd_serve, CommonArgs, RunArgs, ServeArgs};

#[derive(Parser)]
#[command(
    name = "formpilot",
    version,
    about = "Portal automation agent with recovery, vision fallback and human-in-the-loop handoff"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the queue-based agent API over HTTP
    Serve(ServeArgs),
    /// Run one request interactively in the terminal
    Run(RunArgs),
    /// List the intents and pages the active recipe supports
    Intents {
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,formpilot_cli=debug")),
        )
        .init();

    match Cli::parse().command {
        Commands::Serve(args) => cmd_serve(args).await,
        Commands::Run(args) => cmd_run(args).await,
        Commands::Intents { common } => cmd_intents(common).await,
    }
}
