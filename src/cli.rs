//! CLI definitions and entry point

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands;
use combotcha::output::OutputMode;
use combotcha::paths;

/// combotcha - Announce new commits on IRC
#[derive(Parser, Debug)]
#[command(
    name = "combotcha",
    version,
    about = "Announce new commits of git repositories on an IRC channel",
    long_about = "Watch git repositories and post every new commit to an IRC channel.\n\n\
                  The last announced commit of each repository is checkpointed, so a\n\
                  restart resumes where it left off instead of repeating history."
)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output in JSON format (machine-readable)
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file (default: ~/.config/combotcha/config.toml)
    #[arg(short, long, global = true, env = "COMBOTCHA_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Watch the configured repositories and announce new commits
    Run,

    /// Validate the config file and print a summary
    CheckConfig,

    /// Show the last announced commit of each repository
    Status,

    /// Show version
    Version,
}

/// Run the CLI
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };
    let config_path = cli.config.unwrap_or_else(paths::default_config);

    match cli.command {
        Some(Command::Run) => commands::run(&config_path),
        Some(Command::CheckConfig) => commands::check_config(&config_path, output_mode),
        Some(Command::Status) => commands::status(&config_path, output_mode),
        Some(Command::Version) => {
            if output_mode == OutputMode::Json {
                println!(
                    "{}",
                    serde_json::json!({
                        "version": env!("CARGO_PKG_VERSION")
                    })
                );
            } else {
                println!("combotcha v{}", env!("CARGO_PKG_VERSION"));
            }
            Ok(())
        },
        None => {
            if output_mode == OutputMode::Json {
                println!(
                    "{}",
                    serde_json::json!({
                        "version": env!("CARGO_PKG_VERSION"),
                        "hint": "Use --help for usage"
                    })
                );
            } else {
                println!("combotcha v{}", env!("CARGO_PKG_VERSION"));
                println!("\nRun 'combotcha --help' for usage");
                println!("Run 'combotcha run' to start announcing");
            }
            Ok(())
        },
    }
}
