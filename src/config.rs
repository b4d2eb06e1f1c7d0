//! This module provides functionality for loading and handling the
//! application's configuration.
//!
//! It defines the [`FileChatConfig`] struct, a `load_config` function to
//! read it from a YAML file, and the session's API-key resolution.
//!
//! ## API-key resolution
//!
//! The key is resolved once per session through a fixed priority order:
//!
//! 1. the `OPENAI_API_KEY` environment variable,
//! 2. the `api_key` field of the config file,
//! 3. (interactive sessions only) a prompt shown before any answer call.
//!
//! Non-interactive invocations with no key from the first two sources
//! never attempt an API call; they surface `AnswerError::AuthMissing`
//! as the reply instead.
//!
//! # Examples
//!
//! Loading the configuration from a file:
//!
//! ```no_run
//! use filechat::config::{FileChatConfig, load_config};
//!
//! let config: FileChatConfig = load_config("/path/to/config.yaml").unwrap();
//! println!("{:?}", config);
//! ```

use serde::{Deserialize, Serialize};
use std::{env, error::Error, fs};
use tracing::debug;

/// Environment variable consulted first when resolving the API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Represents the application's configuration.
///
/// Constructed by loading a YAML configuration file with [`load_config`];
/// `init` writes a starter file with sensible values.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct FileChatConfig {
    /// The base URL of the OpenAI-compatible API.
    pub api_base: String,

    /// API key, if the user keeps one in the config file rather than the
    /// environment. May be absent; see the module docs for resolution.
    #[serde(default)]
    pub api_key: Option<String>,

    /// The name of the model to be used for generating answers.
    pub model: String,

    // The context size of the model.
    pub context_max_tokens: u16,

    // Tokens held back from the context budget for the answer itself.
    #[serde(default = "default_answer_reserve_tokens")]
    pub answer_reserve_tokens: u16,

    // How many per-file answer calls may run at once (1 = sequential).
    #[serde(default = "default_per_file_concurrency")]
    pub per_file_concurrency: usize,
}

fn default_answer_reserve_tokens() -> u16 {
    1024
}

fn default_per_file_concurrency() -> usize {
    4
}

impl FileChatConfig {
    /// Tokens available for file context in a single call: the model
    /// window minus the answer reserve.
    pub fn context_budget(&self) -> usize {
        self.context_max_tokens
            .saturating_sub(self.answer_reserve_tokens) as usize
    }
}

/// Loads the application's configuration from a YAML file.
///
/// # Parameters
/// - `file`: The path to the YAML configuration file.
///
/// # Returns
/// - `Ok(FileChatConfig)`: The loaded configuration.
/// - `Err(Box<dyn Error>)`: The file could not be read or parsed.
pub fn load_config(file: &str) -> Result<FileChatConfig, Box<dyn Error>> {
    debug!("loading config from {}", file);
    let content = fs::read_to_string(file)?;
    let config: FileChatConfig = serde_yaml::from_str(&content)?;
    Ok(config)
}

/// Resolve the session's API key from the environment, then the config
/// file. Returns `None` when neither source has a non-empty key; the
/// interactive UI collects one in that case, and one-shot invocations
/// report `AuthMissing` without calling the API.
pub fn resolve_api_key(config: &FileChatConfig) -> Option<String> {
    resolve_api_key_from(env::var(API_KEY_ENV).ok(), config)
}

fn resolve_api_key_from(env_key: Option<String>, config: &FileChatConfig) -> Option<String> {
    env_key
        .filter(|key| !key.trim().is_empty())
        .or_else(|| {
            config
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty())
        })
}
