//! This module defines the command-line interface for the application
//! using `clap`.
//!
//! It provides a `Cli` struct that represents the parsed command-line
//! arguments, and a `Commands` enum that represents the available
//! subcommands and their options.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Represents the parsed command-line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, propagate_version = true, color = clap::ColorChoice::Always)]
pub struct Cli {
    /// The parsed subcommand and its options.
    #[command(subcommand)]
    pub command: Commands,
}

/// Represents the available subcommands and their options.
#[derive(Subcommand, Debug)]
#[command(about, long_about = None, color = clap::ColorChoice::Always)]
pub enum Commands {
    /// Ask one question about a set of files and exit.
    #[clap(name = "ask", alias = "a")]
    Ask {
        /// The question to be asked.
        question: Option<String>,

        /// File to load; repeat the flag for several files.
        #[arg(name = "file", short = 'f', long = "file")]
        files: Vec<PathBuf>,

        /// Query each file independently instead of combining them.
        #[arg(name = "per-file", short = 'p', long = "per-file")]
        per_file: bool,

        #[arg(name = "template", short = 't')]
        template: Option<String>,
    },

    /// Start an interactive chat session over a set of files.
    ///
    /// This subcommand can be invoked with either 'c' or 'chat'.
    #[clap(name = "chat", alias = "c")]
    Chat {
        /// Files to load for the session.
        files: Vec<PathBuf>,

        /// Start in per-file mode (toggle later with /mode).
        #[arg(name = "per-file", short = 'p', long = "per-file")]
        per_file: bool,

        #[arg(name = "template", short = 't')]
        template: Option<String>,
    },

    /// The 'init' subcommand, which takes no arguments and is used for
    /// initialization.
    ///
    /// When invoked, this subcommand creates the configuration directory,
    /// a starter `config.yaml`, and the default chat template.
    Init,
}
