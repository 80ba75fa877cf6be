//! Codeviewer CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "codeviewer")]
#[command(about = "Call-graph and struct diagrams for Go projects, served over HTTP", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ./codeviewer.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Newline-delimited list of project paths
    #[arg(long, global = true)]
    projects: Option<PathBuf>,

    /// Root of the generated diagram cache
    #[arg(long, global = true)]
    resource_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
    },
    /// Print the relation index as JSON and exit
    Relations,
    /// Delete generated diagrams
    Clear {
        /// Only clear this project
        #[arg(long)]
        project: Option<String>,
    },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("codeviewer={}", log_level))),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let overrides = commands::Overrides {
        config: cli.config,
        projects: cli.projects,
        resource_dir: cli.resource_dir,
    };

    match cli.command {
        Commands::Serve { port, host } => {
            tracing::info!("Codeviewer v{}", env!("CARGO_PKG_VERSION"));
            commands::serve(overrides, host, port).await
        }
        Commands::Relations => commands::relations(overrides),
        Commands::Clear { project } => commands::clear(overrides, project.as_deref()),
        Commands::Version => {
            println!("Codeviewer v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
