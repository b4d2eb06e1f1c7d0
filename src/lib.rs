//! # filechat (library root)
//!
//! This crate provides the core plumbing for the **filechat** CLI and
//! library:
//! - Asking questions about loaded files over an OpenAI-compatible API
//!   (`api`).
//! - The dual-mode query dispatcher that is the heart of the tool
//!   (`dispatcher`).
//! - File loading and text extraction for plain text and PDF (`loader`).
//! - CLI parsing (`commands`), configuration (`config`), prompt
//!   templates (`template`).
//! - The session's append-only conversation history (`transcript`).
//! - Terminal markdown rendering for replies (`pretty`).
//!
//! The flow for one question is: the UI (one-shot `ask` or the chat REPL)
//! collects the question, the current [`dispatcher::QueryMode`], and the
//! loaded file set, and hands them to [`dispatcher::Dispatcher::handle`],
//! which issues one or more answer calls and assembles the reply that the
//! UI renders and appends to the transcript.
//!
//! ## Modules
//! - [`api`], [`commands`], [`config`], [`dispatcher`], [`error`],
//!   [`loader`], [`pretty`], [`template`], [`transcript`]

use directories::ProjectDirs;
use std::error::Error;

pub mod api;
pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod loader;
pub mod pretty;
pub mod template;
pub mod transcript;

/// Return the per-platform configuration directory used by filechat.
///
/// This uses [`directories::ProjectDirs`] with the application triple
/// `("com", "filechat", "fchat")`, so you get the right place on each OS
/// (e.g., `~/.config/fchat` on Linux via XDG).
///
/// The directory is **not** created by this function; callers that need it
/// should create it with `fs::create_dir_all`.
///
/// # Errors
/// Returns an error if the platform configuration directory cannot be
/// determined (rare, but possible in heavily sandboxed environments).
pub fn config_dir() -> Result<std::path::PathBuf, Box<dyn Error>> {
    let proj_dirs = ProjectDirs::from("com", "filechat", "fchat")
        .ok_or("Unable to determine config directory")?;
    Ok(proj_dirs.config_dir().to_path_buf())
}
