//! # Template loading and structure
//!
//! A template is a small YAML document that steers how questions are put
//! to the model:
//!
//! - a `system_prompt` that conditions the assistant,
//! - optional `pre_user_message_content` / `post_user_message_content`
//!   strings that are prepended/appended to every question at send time.
//!
//! Templates are stored per-user under the application's configuration
//! directory, inside a `templates/` subfolder, and resolved at:
//!
//! ```text
//! <config_dir>/templates/<name>.yaml
//! ```
//!
//! A built-in default (see [`ChatTemplate::default`]) is used when the
//! user never ran `init` and passed no `-t` flag; it instructs the model
//! to answer strictly from the supplied file content.
//!
//! ## Minimal YAML example
//!
//! ```yaml
//! # ~/.config/.../templates/document_qa.yaml
//! system_prompt: "You answer questions using only the provided file content."
//! # Optional fields:
//! # pre_user_message_content: "Keep it under 2 sentences."
//! # post_user_message_content: "Answer in plain English."
//! ```

use serde::{Deserialize, Serialize};
use std::{error::Error, fs, path::Path};

/// Name of the template `init` writes and the CLI falls back to.
pub const DEFAULT_TEMPLATE: &str = "document_qa";

/// A reusable chat template.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatTemplate {
    /// Global instruction used as the session's system message.
    pub system_prompt: String,

    /// Extra text automatically added **before** each question at send time.
    pub pre_user_message_content: Option<String>,

    /// Extra text automatically added **after** each question at send time.
    pub post_user_message_content: Option<String>,
}

impl Default for ChatTemplate {
    fn default() -> Self {
        Self {
            system_prompt: "You are a careful assistant answering questions about files \
the user has loaded. Use only the provided file content; if the content does not \
answer the question, say so instead of guessing. When several files are shown, \
attribute facts to the file they came from."
                .to_string(),
            pre_user_message_content: None,
            post_user_message_content: None,
        }
    }
}

/// Load a chat template by name from the user's config directory.
///
/// Resolves `<config_dir>/templates/<name>.yaml`, reads the file, and
/// deserializes into a [`ChatTemplate`].
///
/// # Errors
/// Returns an error if the config directory cannot be determined, the
/// template file does not exist, or the YAML does not parse.
pub async fn load_template(name: &str) -> Result<ChatTemplate, Box<dyn Error>> {
    let path = crate::config_dir()?.join(format!("templates/{name}.yaml"));
    tracing::info!("Loading template: {}", path.display());
    load_template_from(&path)
}

fn load_template_from(path: &Path) -> Result<ChatTemplate, Box<dyn Error>> {
    let content = fs::read_to_string(path)?;
    let template: ChatTemplate = serde_yaml::from_str(&content)?;
    Ok(template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_template_valid_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
system_prompt: "You are a helpful assistant."
post_user_message_content: "Answer briefly."
"#
        )
        .unwrap();

        let template = load_template_from(temp_file.path()).unwrap();
        assert_eq!(template.system_prompt, "You are a helpful assistant.");
        assert_eq!(
            template.post_user_message_content.as_deref(),
            Some("Answer briefly.")
        );
        assert!(template.pre_user_message_content.is_none());
    }

    #[test]
    fn test_load_template_invalid_format() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, r#"invalid: template: format"#).unwrap();

        assert!(load_template_from(temp_file.path()).is_err());
    }

    #[tokio::test]
    async fn test_load_template_missing_file() {
        let template = load_template("no/such/template").await;
        assert!(template.is_err(), "Expected error for missing template");
    }

    #[test]
    fn test_default_template_grounds_answers_in_files() {
        let template = ChatTemplate::default();
        assert!(template.system_prompt.contains("file content"));
    }
}
