use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod artifact;
mod commands;
mod config;
mod decode;
mod extract;
mod language;
mod model;
mod pipeline;
mod runner;
mod search;
mod stages;
mod templates;

const LOG_FILE: &str = "codesmith.log";

#[derive(Parser)]
#[command(name = "codesmith")]
#[command(
    author,
    version,
    about = "LLM-driven code generation with a test-verified regeneration loop"
)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize codesmith files in the current project
    Init {
        /// Force overwrite existing files
        #[arg(short, long)]
        force: bool,
    },

    /// Generate, test, document, optimize, and execute code interactively
    Run {
        /// Number of requests to serve (overrides config)
        #[arg(short, long)]
        iterations: Option<u32>,

        /// Generate-test attempt ceiling (overrides config)
        #[arg(short, long)]
        max_attempts: Option<u32>,

        /// Skip executing the final artifact
        #[arg(long)]
        no_execute: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging: stdout plus an append-mode file log.
    let filter = if cli.verbose {
        EnvFilter::new("codesmith=debug")
    } else {
        EnvFilter::new("codesmith=info")
    };

    let file_appender = tracing_appender::rolling::never(".", LOG_FILE);
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .with(filter)
        .init();

    match cli.command {
        Commands::Init { force } => {
            commands::init::run(force)?;
        }
        Commands::Run {
            iterations,
            max_attempts,
            no_execute,
        } => {
            commands::run::run(commands::run::RunOptions {
                iterations,
                max_attempts,
                no_execute,
            })
            .await?;
        }
    }

    Ok(())
}
