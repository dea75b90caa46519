//! CLI module: command parsing and dispatch
//!
//! All CLI logic lives here. `main.rs` calls `cli::run()`.

pub mod common;
pub mod config;
pub mod generate;
pub mod run;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "banterbot")]
#[command(version)]
#[command(about = "Activity-aware Telegram group companion", long_about = None)]
struct Cli {
    /// Config file (default: ~/.banterbot/config.json)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Telegram and start chatting (default)
    Run,
    /// Validate configuration and print today's post schedule
    Check,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Generate one piece of content against the configured backend
    Generate {
        #[arg(value_enum)]
        kind: GenerateKind,
        /// Message text (comment context or the mentioning message)
        #[arg(long)]
        text: Option<String>,
        /// Display name to address in a mention reply
        #[arg(long)]
        name: Option<String>,
    },
    /// Show version information
    Version,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum GenerateKind {
    Joke,
    Quote,
    Ambient,
    Comment,
    Mention,
}

pub async fn run() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config_path: PathBuf = cli
        .config
        .as_deref()
        .map(common::expand_tilde)
        .unwrap_or_else(banterbot::config::Config::path);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run::cmd_run(&config_path).await?,
        Commands::Check => config::cmd_check(&config_path)?,
        Commands::Init { force } => config::cmd_init(&config_path, force)?,
        Commands::Generate { kind, text, name } => {
            generate::cmd_generate(&config_path, kind, text, name).await?
        }
        Commands::Version => cmd_version(),
    }

    Ok(())
}

fn cmd_version() {
    println!("banterbot {}", env!("CARGO_PKG_VERSION"));
}
