//! CLI module for Spor.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use crate::source::SourceRef;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Spor - chat with a video or a set of documents
///
/// Loads a YouTube video's captions or local documents, indexes them, and
/// answers questions from the indexed text. Every exchange is kept per source.
#[derive(Parser, Debug)]
#[command(name = "spor")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// A video URL or a set of document paths.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// YouTube video URL
    #[arg(long, conflicts_with = "files")]
    pub video: Option<String>,

    /// Document to load (pdf, docx, txt); repeat for several
    #[arg(short, long = "file")]
    pub files: Vec<PathBuf>,
}

impl SourceArgs {
    /// The source these arguments describe, if any.
    pub fn source_ref(&self) -> Option<SourceRef> {
        match (&self.video, self.files.is_empty()) {
            (Some(url), _) => Some(SourceRef::video(url)),
            (None, false) => Some(SourceRef::documents(self.files.clone())),
            (None, true) => None,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check system requirements and configuration
    Doctor,

    /// Start an interactive chat session
    Chat {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Ask a single question about a video or documents
    Ask {
        #[command(flatten)]
        source: SourceArgs,

        /// The question to ask
        question: String,
    },

    /// Show recorded exchanges for a source, or list all sources
    History {
        /// YouTube video URL
        #[arg(long, conflicts_with = "documents")]
        video: Option<String>,

        /// Document set id (file names joined with '-')
        #[arg(long)]
        documents: Option<String>,

        /// Print the records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
