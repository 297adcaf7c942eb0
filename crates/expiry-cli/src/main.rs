use clap::{Parser, Subcommand};
use expiry_cli::{cmd, root};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "expiry",
    about = "Revert expired user actions (bounce, pause, scale, skip healthchecks)",
    version,
    propagate_version = true
)]
struct Cli {
    /// State root (default: auto-detect from .expiry/)
    #[arg(long, global = true, env = "EXPIRY_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single poll pass and print what it did
    Poll,

    /// Poll periodically until interrupted
    Daemon {
        /// Override the configured poll interval (0 disables polling)
        #[arg(long)]
        every_millis: Option<u64>,
    },

    /// List stored expiring actions with their deadlines
    List {
        /// Only show one kind (bounce, pause, scale, skip_healthchecks)
        #[arg(long)]
        kind: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Poll | Commands::Daemon { .. } => tracing::Level::INFO,
        Commands::List { .. } => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Poll => cmd::poll::run(&root, cli.json),
        Commands::Daemon { every_millis } => cmd::daemon::run(&root, every_millis),
        Commands::List { kind } => cmd::list::run(&root, kind.as_deref(), cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
