//! Lowkey CLI - Command-line interface for the directory monitor
//!
//! Provides commands for:
//! - Foreground watching
//! - Controlling the background daemon
//! - Inspecting status, logs, and change summaries
//! - Appending external JSON events through the rotating log

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod context;
mod output;

use commands::append::AppendCommand;
use commands::clear::ClearCommand;
use commands::log::LogCommand;
use commands::start::StartCommand;
use commands::status::StatusCommand;
use commands::stop::StopCommand;
use commands::summary::SummaryCommand;
use commands::tail::TailCommand;
use commands::watch::WatchCommand;
use context::CliContext;
use output::{get_formatter, OutputFormat};

#[derive(Debug, Parser)]
#[command(name = "lowkey", version, about = "Hybrid directory monitor")]
pub struct Cli {
    /// Use an alternate manifest file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "plain")]
    output: OutputFormat,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Watch directories in the foreground
    Watch(WatchCommand),
    /// Start the background daemon
    Start(StartCommand),
    /// Stop the background daemon
    Stop(StopCommand),
    /// Show daemon status
    Status(StatusCommand),
    /// Print recent log lines
    Log(LogCommand),
    /// Follow the log file
    Tail(TailCommand),
    /// Summarize recent changes from the log
    Summary(SummaryCommand),
    /// Remove the persisted manifest
    Clear(ClearCommand),
    /// Append JSON lines from stdin through the rotating log
    Append(AppendCommand),
}

impl Commands {
    /// Stable prefix for error lines, naming the failing subsystem.
    fn subsystem(&self) -> &'static str {
        match self {
            Commands::Watch(_) => "watch",
            Commands::Start(_) | Commands::Stop(_) => "daemon",
            Commands::Status(_) => "status",
            Commands::Log(_) | Commands::Tail(_) => "log",
            Commands::Summary(_) => "summary",
            Commands::Clear(_) => "clear",
            Commands::Append(_) => "append",
        }
    }

    async fn execute(&self, ctx: &CliContext) -> Result<()> {
        match self {
            Commands::Watch(cmd) => cmd.execute(ctx).await,
            Commands::Start(cmd) => cmd.execute(ctx).await,
            Commands::Stop(cmd) => cmd.execute(ctx).await,
            Commands::Status(cmd) => cmd.execute(ctx).await,
            Commands::Log(cmd) => cmd.execute(ctx).await,
            Commands::Tail(cmd) => cmd.execute(ctx).await,
            Commands::Summary(cmd) => cmd.execute(ctx).await,
            Commands::Clear(cmd) => cmd.execute(ctx).await,
            Commands::Append(cmd) => cmd.execute(ctx).await,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Setup tracing
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let ctx = CliContext::new(cli.config.clone(), cli.output);

    if let Err(e) = cli.command.execute(&ctx).await {
        get_formatter(cli.output).error(cli.command.subsystem(), &format!("{e:#}"));
        std::process::exit(1);
    }
}
