//! Main module for the filechat CLI application (fchat).
//!
//! Handles command parsing, configuration loading, and initialization,
//! then invokes the one-shot or interactive flow.
//!
//! # Examples
//!
//! Asking a question about two files:
//!
//! ```sh
//! fchat ask "What is the capital of France?" -f a.txt -f b.txt
//! fchat ask "Summarize each file" -f a.txt -f b.pdf --per-file
//! ```
//!
//! Starting an interactive session, then initializing configuration:
//!
//! ```sh
//! fchat chat notes.md report.pdf
//! fchat init
//! ```

use clap::Parser;
use once_cell::sync::OnceCell;
use std::{env, error::Error, fs, path::PathBuf};
use tracing::{debug, info};

use filechat::{
    api,
    commands::{self, Commands},
    config::{self, FileChatConfig},
    config_dir,
    dispatcher::QueryMode,
    loader, pretty,
    template::{self, ChatTemplate, DEFAULT_TEMPLATE},
};

static TRACING: OnceCell<()> = OnceCell::new();

fn main() -> Result<(), Box<dyn Error>> {
    TRACING.get_or_init(|| {
        tracing_subscriber::fmt::init();
    });
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run())
}

/// Main asynchronous function of the filechat CLI application.
///
/// Parses command-line arguments, loads configuration, and executes the
/// appropriate command.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or the
/// requested command fails.
async fn run() -> Result<(), Box<dyn Error>> {
    let cli = commands::Cli::parse();

    // `init` must work before a config file exists.
    if matches!(cli.command, Commands::Init) {
        return init();
    }

    let config_path = match env::var("FILECHAT_CONFIG") {
        Ok(path) => PathBuf::from(path),
        Err(_) => config_dir()?.join("config.yaml"),
    };
    debug!("Loading config from: {}", config_path.display());
    let config = config::load_config(
        config_path
            .to_str()
            .ok_or("config path is not valid UTF-8")?,
    )?;

    match cli.command {
        Commands::Ask {
            question,
            files,
            per_file,
            template,
        } => {
            let question = match question {
                Some(q) if !q.trim().is_empty() => q,
                _ => return Err("ask requires a non-empty question".into()),
            };
            let mode = query_mode(per_file);
            let template = resolve_template(template).await?;

            debug!("Asking question: {:?}", question);
            let loaded = loader::load_files(&files);
            let reply = api::ask(&config, question, &loaded, mode, template).await?;
            pretty::print_pretty(&reply)?;
        }
        Commands::Chat {
            files,
            per_file,
            template,
        } => {
            let mode = query_mode(per_file);
            let template = resolve_template(template).await?;
            api::interactive_mode(&config, files, mode, template).await?;
        }
        Commands::Init => unreachable!("handled above"),
    }

    Ok(())
}

fn query_mode(per_file: bool) -> QueryMode {
    if per_file {
        QueryMode::PerFile
    } else {
        QueryMode::Combined
    }
}

/// A named template must load; with no name, fall back from the default
/// template file to the built-in default.
async fn resolve_template(name: Option<String>) -> Result<ChatTemplate, Box<dyn Error>> {
    match name {
        Some(name) => template::load_template(&name).await,
        None => Ok(template::load_template(DEFAULT_TEMPLATE)
            .await
            .unwrap_or_default()),
    }
}

/// Initializes the application's configuration and templates.
///
/// Creates the configuration directory, a starter `config.yaml`, and the
/// default chat template, all in YAML format.
///
/// # Errors
///
/// Returns an error if the directories or files cannot be created, or the
/// defaults cannot be serialized.
fn init() -> Result<(), Box<dyn Error>> {
    let config_dir = config_dir()?;
    let templates_dir = config_dir.join("templates");
    info!("Creating template config directory: {}", templates_dir.display());
    fs::create_dir_all(&templates_dir)?;

    let template_path = templates_dir.join(format!("{DEFAULT_TEMPLATE}.yaml"));
    info!("Creating template file: {}", template_path.display());
    let template_yaml = serde_yaml::to_string(&ChatTemplate::default())?;
    fs::write(template_path, template_yaml)?;

    let config_path = config_dir.join("config.yaml");
    info!("Creating config file: {}", config_path.display());
    let config = FileChatConfig {
        api_base: "https://api.openai.com/v1".to_string(),
        api_key: None,
        model: "gpt-4o-mini".to_string(),
        context_max_tokens: 8192,
        answer_reserve_tokens: 1024,
        per_file_concurrency: 4,
    };
    let config_yaml = serde_yaml::to_string(&config)?;
    fs::write(&config_path, config_yaml)?;

    println!("Wrote {}", config_path.display());
    println!("Set your API key there or export {}.", config::API_KEY_ENV);

    Ok(())
}
