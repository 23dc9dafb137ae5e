//! # Tnet CLI
//!
//! Command-line front end for the tnet workspace engine.
//!
//! ## Commands
//!
//! - `tnet tree [dir]` - Show the sorted directory tree
//! - `tnet write <file>` - Write a note and refresh its keywords
//! - `tnet rename <old> <new>` - Move a note, keeping session and keywords in step
//! - `tnet keywords list` - Show the keyword index
//! - `tnet check <file>` - Report malformed keyword declarations
//!
//! ## Example Usage
//!
//! ```bash
//! # Create a note from the template inside a workspace
//! tnet --root ~/notes create ~/notes/limits.md
//!
//! # Replace its content from a file
//! tnet --root ~/notes write ~/notes/limits.md --from draft.md
//!
//! # Which note declares a keyword?
//! tnet --root ~/notes keywords get "Squeeze theorem"
//! ```

mod app;
mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Tnet - keep a notes workspace and its metadata in sync
#[derive(Parser)]
#[command(name = "tnet")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Workspace root (no workspace when omitted)
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the directory tree
    Tree {
        /// Directory to list (defaults to the workspace root)
        dir: Option<PathBuf>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Print a file's content
    Read { file: PathBuf },

    /// Write content to a file and refresh its keywords
    Write {
        file: PathBuf,

        /// Read the content from this file instead of stdin
        #[arg(short, long)]
        from: Option<PathBuf>,
    },

    /// Create a new note from the template
    Create { file: PathBuf },

    /// Create a directory
    Mkdir { dir: PathBuf },

    /// Delete a file and forget it in the session and keyword index
    Delete {
        file: PathBuf,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Rename or move a file or directory
    #[command(alias = "mv")]
    Rename { old: PathBuf, new: PathBuf },

    /// Show or replace the open-file session
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Inspect the keyword index
    #[command(alias = "kw")]
    Keywords {
        #[command(subcommand)]
        action: KeywordsAction,
    },

    /// Report malformed keyword declarations in a file
    Check { file: PathBuf },

    /// Rebuild the keyword index from every file in the workspace
    Reindex,
}

#[derive(Subcommand)]
enum SessionAction {
    /// Print the open files, in order
    Show,

    /// Replace the session with these files
    Save { paths: Vec<PathBuf> },
}

#[derive(Subcommand)]
enum KeywordsAction {
    /// List every keyword and its file
    List {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Print the file declaring a keyword
    Get { name: String },

    /// List keywords starting with a prefix
    Complete {
        prefix: String,

        /// Maximum number of results to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

#[derive(Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => tnet_core::Config::load_from(path)?,
        None => tnet_core::Config::load()?,
    };

    // Setup logging
    let log_level = if cli.quiet {
        "error".to_string()
    } else {
        match cli.verbose {
            0 => config.general.log_level.clone(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();

    let app = app::App::new(&config, cli.root)?;

    // Execute command
    match cli.command {
        Commands::Tree { dir, output } => commands::tree::run(&app, dir, output),
        Commands::Read { file } => commands::file::read(&app, &file),
        Commands::Write { file, from } => commands::file::write(&app, &file, from),
        Commands::Create { file } => commands::file::create(&app, &file),
        Commands::Mkdir { dir } => commands::file::mkdir(&app, &dir),
        Commands::Delete { file, yes } => commands::file::delete(&app, &file, yes),
        Commands::Rename { old, new } => commands::file::rename(&app, &old, &new),
        Commands::Session { action } => match action {
            SessionAction::Show => commands::session::show(&app),
            SessionAction::Save { paths } => commands::session::save(&app, paths),
        },
        Commands::Keywords { action } => match action {
            KeywordsAction::List { output } => commands::keywords::list(&app, output),
            KeywordsAction::Get { name } => commands::keywords::get(&app, &name),
            KeywordsAction::Complete { prefix, limit } => {
                commands::keywords::complete(&app, &prefix, limit)
            }
        },
        Commands::Check { file } => commands::check::run(&app, &file),
        Commands::Reindex => commands::keywords::reindex(&app),
    }
}
