//! Midy CLI - file-backed content tree.
//!
//! Provides commands for:
//! - `reindex`: Parse content folders into the index
//! - `ls`: List pages and folders of a folder
//! - `show`: Inspect one page or folder
//! - `tree`: Print the folder hierarchy

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{CommonArgs, LsArgs, ReindexArgs, ShowArgs, TreeArgs};
use output::Output;

/// Midy - content tree over a directory of files.
#[derive(Parser)]
#[command(name = "midy", version, about)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reparse folders into the index.
    Reindex(ReindexArgs),
    /// List the pages of a folder.
    Ls(LsArgs),
    /// Show a page or folder.
    Show(ShowArgs),
    /// Print the folder hierarchy.
    Tree(TreeArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.common.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Reindex(args) => args.execute(&cli.common),
        Commands::Ls(args) => args.execute(&cli.common),
        Commands::Show(args) => args.execute(&cli.common),
        Commands::Tree(args) => args.execute(&cli.common),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
