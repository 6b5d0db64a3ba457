//! Feedline CLI.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "feedline")]
#[command(about = "Transit feed fetch, publish and deploy scheduler", long_about = None)]
struct Cli {
    /// System configuration file
    #[arg(long, env = "FEEDLINE_CONFIG", default_value = "feedline.kdl")]
    config: PathBuf,

    /// JSON snapshot holding projects, feed sources and versions
    #[arg(long, env = "FEEDLINE_STATE", default_value = "feedline-state.json")]
    state: PathBuf,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run fetch timers and the completion poller until interrupted
    Serve {
        /// Seconds between snapshot saves
        #[arg(long, default_value = "300")]
        save_interval: u64,
    },
    /// Fetch a feed source now, or process an uploaded file
    Run {
        /// Feed source ID
        feed_source: String,
        /// Feed file to store instead of fetching
        #[arg(long)]
        file: Option<PathBuf>,
        /// Name recorded as the actor
        #[arg(long, default_value = "cli")]
        actor: String,
    },
    /// Send the latest version of a feed source to the external publisher
    Publish {
        /// Feed source ID
        feed_source: String,
        #[arg(long, default_value = "cli")]
        actor: String,
    },
    /// Poll the completion markers once
    CheckPublished,
    /// Validate a system configuration file
    Validate {
        /// Path to the configuration file
        #[arg(default_value = "feedline.kdl")]
        path: PathBuf,
    },
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Commands::Serve { save_interval } => {
            commands::serve::serve(&cli.config, &cli.state, save_interval).await?;
        }
        Commands::Run {
            feed_source,
            file,
            actor,
        } => {
            commands::run::run(&cli.config, &cli.state, &feed_source, file, &actor).await?;
        }
        Commands::Publish { feed_source, actor } => {
            commands::run::publish(&cli.config, &cli.state, &feed_source, &actor).await?;
        }
        Commands::CheckPublished => {
            commands::run::check_published(&cli.config, &cli.state).await?;
        }
        Commands::Validate { path } => {
            commands::validate(&path)?;
        }
    }

    Ok(())
}
