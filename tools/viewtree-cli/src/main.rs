//! Viewtree CLI - render values of the sample process as trees
//!
//! # Commands
//!
//! - `viewtree show <expr>` - Evaluate an expression and print its tree
//! - `viewtree printers` - List the registered printers and their views
//!
//! # Usage
//!
//! ```bash
//! # Colour with its views, two levels deep
//! viewtree show color
//!
//! # Vector elements, synthetic nodes carried in forged type names
//! viewtree show numbers --depth 3 --mode type-encoded
//!
//! # Verbose dispatch decisions
//! RUST_LOG=viewtree_core=debug viewtree show '*list_begin'
//! ```
//!
//! # Configuration (viewtree.toml)
//!
//! ```toml
//! chunk_size = 16
//! summary_max_length = 120
//! max_children = 200
//! tag_mode = "request"
//! ```

mod demo;
mod printers;
mod settings;
mod show;

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Viewtree CLI - value trees for debugger front ends
#[derive(Parser)]
#[command(name = "viewtree")]
#[command(about = "Render value trees with pretty-printer views")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an expression in the sample process and print its tree
    Show(show::ShowArgs),

    /// List the registered printers and their views
    Printers,
}

fn init_logging(log_file: Option<&PathBuf>) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_ref())?;

    let config = settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Show(args) => show::execute(args, config),
        Commands::Printers => printers::execute(),
    }
}
