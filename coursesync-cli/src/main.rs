use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod storage;

use commands::{ConfigCommand, PlanCommand, PullCommand, PushCommand, ShowCommand};
use config::Config;

#[derive(Parser)]
#[command(name = "course")]
#[command(version)]
#[command(about = "Edit course curricula locally and sync them with the course server", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a course into a local working copy
    Pull(PullCommand),

    /// Show the calls the next push would make
    Plan(PlanCommand),

    /// Send local edits to the server
    Push(PushCommand),

    /// Print the outline of a pulled course
    Show(ShowCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

fn main() {
    // Logs go to stderr so command output stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coursesync_core=warn,course=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let cli_config_path = cli.config.clone();
    let config = Config::load(cli.config)?;

    match &cli.command {
        Some(Commands::Pull(cmd)) => cmd.run(&config)?,
        Some(Commands::Plan(cmd)) => cmd.run(&config)?,
        Some(Commands::Push(cmd)) => cmd.run(&config)?,
        Some(Commands::Show(cmd)) => cmd.run(&config)?,
        Some(Commands::Config(cmd)) => cmd.run(&config, cli_config_path)?,
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
