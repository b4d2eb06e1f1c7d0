//! # API Module
//!
//! The answer collaborator and the two user-facing interaction flows.
//!
//! [`OpenAiAnswers`] implements the dispatcher's `AnswerProvider` trait
//! against any OpenAI-compatible chat-completions endpoint: one request
//! per call, no retries, failures mapped onto the `AnswerError` taxonomy.
//!
//! [`ask`] is the one-shot flow (`fchat ask "..." -f notes.txt`);
//! [`interactive_mode`] is the chat REPL with `/mode`, `/files`,
//! `/history`, and `exit` commands.

use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use crossterm::{
    ExecutableCommand,
    style::{Color, Print, SetForegroundColor},
};
use indicatif::ProgressBar;
use std::{
    error::Error,
    io::{Write, stdout},
    path::PathBuf,
    time::Duration,
};
use tracing::{debug, error};

use crate::{
    config::{FileChatConfig, resolve_api_key},
    dispatcher::{AnswerProvider, Dispatcher, QueryMode},
    error::AnswerError,
    loader::{LoadedFile, load_files},
    pretty,
    template::ChatTemplate,
    transcript::Transcript,
};

/// Answer collaborator backed by an OpenAI-compatible API.
///
/// Holds the client, model name, and template for the whole session; the
/// API key is resolved once before construction and never re-checked.
pub struct OpenAiAnswers {
    client: Client<OpenAIConfig>,
    model: String,
    answer_max_tokens: u16,
    template: ChatTemplate,
}

impl OpenAiAnswers {
    /// Create a provider from configuration and an already-resolved key.
    pub fn new(config: &FileChatConfig, api_key: String, template: ChatTemplate) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(config.api_base.clone());
        debug!("client created for {}", config.api_base);

        Self {
            client: Client::with_config(openai_config),
            model: config.model.clone(),
            answer_max_tokens: config.answer_reserve_tokens,
            template,
        }
    }

    fn user_prompt(&self, question: &str, context: &str) -> String {
        let mut question = question.to_string();
        if let Some(prepend_content) = self.template.pre_user_message_content.clone() {
            question = format!("{prepend_content} {question}");
        }
        if let Some(append_content) = self.template.post_user_message_content.clone() {
            question = format!("{question} {append_content}");
        }

        format!(
            "Answer the question using only the file content below.\n\n\
FILE CONTENT:\n{context}\n\nQUESTION: {question}"
        )
    }
}

#[async_trait]
impl AnswerProvider for OpenAiAnswers {
    async fn answer(&self, question: &str, context: &str) -> Result<String, AnswerError> {
        let messages = vec![
            ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                content: ChatCompletionRequestSystemMessageContent::Text(
                    self.template.system_prompt.clone(),
                ),
                name: None,
            }),
            ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(
                    self.user_prompt(question, context),
                ),
                name: None,
            }),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .max_tokens(self.answer_max_tokens)
            .model(self.model.clone())
            .messages(messages)
            .build()
            .map_err(|e| AnswerError::NetworkFailure(e.to_string()))?;

        debug!("sending chat completion request to {}", self.model);
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(map_answer_error)?;

        let mut answer = String::new();
        response.choices.iter().for_each(|chat_choice| {
            if let Some(content) = &chat_choice.message.content {
                answer.push_str(content);
            }
        });

        if answer.trim().is_empty() {
            return Err(AnswerError::ModelRefusal(
                "the completion contained no text".to_string(),
            ));
        }
        Ok(answer)
    }
}

/// Map a client error onto the [`AnswerError`] taxonomy.
fn map_answer_error(err: OpenAIError) -> AnswerError {
    match err {
        OpenAIError::Reqwest(err) if err.is_timeout() => AnswerError::Timeout,
        OpenAIError::Reqwest(err) => AnswerError::NetworkFailure(err.to_string()),
        OpenAIError::ApiError(err) => {
            error!("API error: {}", err);
            classify_api_error(err.to_string())
        }
        other => AnswerError::NetworkFailure(other.to_string()),
    }
}

fn classify_api_error(detail: String) -> AnswerError {
    let lowered = detail.to_lowercase();
    if lowered.contains("rate limit") || lowered.contains("rate_limit") || lowered.contains("quota")
    {
        AnswerError::RateLimited(detail)
    } else if lowered.contains("api key")
        || lowered.contains("api_key")
        || lowered.contains("authentication")
        || lowered.contains("unauthorized")
    {
        AnswerError::AuthMissing
    } else if lowered.contains("content_filter") || lowered.contains("refus") {
        AnswerError::ModelRefusal(detail)
    } else {
        AnswerError::NetworkFailure(detail)
    }
}

/// Answer a single question against an already-loaded file set.
///
/// Resolves the API key first and, when none is available, returns the
/// `AuthMissing` message as the reply without constructing a client or
/// attempting a call.
///
/// # Parameters
/// - `config`: Application configuration.
/// - `question`: The user's question.
/// - `files`: The session's loaded files, in load order.
/// - `mode`: Combined or per-file dispatch.
/// - `template`: Chat template for the system prompt.
///
/// # Returns
/// The full reply text (answer plus any unreadable-file notes).
pub async fn ask(
    config: &FileChatConfig,
    question: String,
    files: &[LoadedFile],
    mode: QueryMode,
    template: ChatTemplate,
) -> Result<String, Box<dyn Error>> {
    let dispatcher = Dispatcher::new(config.context_budget(), config.per_file_concurrency);

    let reply = match resolve_api_key(config) {
        Some(key) => {
            let answers = OpenAiAnswers::new(config, key, template);
            dispatcher.handle(&question, mode, files, &answers).await
        }
        None => AnswerError::AuthMissing.to_string(),
    };

    Ok(reply)
}

/// Enters interactive conversation mode.
///
/// The user can ask repeated questions about the loaded files, switch
/// query mode, or replace the file set, until they type "exit". Each
/// completed reply is rendered to the terminal and appended to the
/// in-memory transcript in one piece.
pub async fn interactive_mode(
    config: &FileChatConfig,
    paths: Vec<PathBuf>,
    mut mode: QueryMode,
    template: ChatTemplate,
) -> Result<(), Box<dyn Error>> {
    // The key is resolved exactly once, before any answer call can happen.
    let key = match resolve_api_key(config) {
        Some(key) => key,
        None => prompt_for_api_key()?,
    };
    let answers = OpenAiAnswers::new(config, key, template);
    let dispatcher = Dispatcher::new(config.context_budget(), config.per_file_concurrency);

    let mut files = load_files(&paths);
    print_load_summary(&files);

    let mut transcript = Transcript::new();
    println!(
        "Mode: {mode}. Commands: /mode [combined|per-file], /files <path>..., /history, exit"
    );

    loop {
        print_prompt()?;

        let mut input = String::new();
        if std::io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        // Empty questions are rejected here, at the UI layer.
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }

        if let Some(rest) = input.strip_prefix("/mode") {
            let rest = rest.trim();
            if rest.is_empty() {
                mode = mode.toggled();
            } else {
                match rest.parse::<QueryMode>() {
                    Ok(parsed) => mode = parsed,
                    Err(err) => {
                        println!("{err}");
                        continue;
                    }
                }
            }
            println!("Mode: {mode}");
            continue;
        }

        if let Some(rest) = input.strip_prefix("/files") {
            let new_paths: Vec<PathBuf> = rest.split_whitespace().map(PathBuf::from).collect();
            if new_paths.is_empty() {
                println!("usage: /files <path> [path ...]");
                continue;
            }
            // Wholesale replacement of the working set.
            files = load_files(&new_paths);
            print_load_summary(&files);
            continue;
        }

        if input == "/history" {
            if transcript.is_empty() {
                println!("(no questions asked yet)");
            }
            for turn in transcript.turns() {
                println!("\nYou: {}", turn.question);
                println!("Assistant: {}", turn.reply);
            }
            continue;
        }

        if input.starts_with('/') {
            println!("unknown command: {input}");
            continue;
        }

        let spinner = query_spinner(mode, &files);
        let reply = dispatcher.handle(input, mode, &files, &answers).await;
        spinner.finish_and_clear();

        // Only a fully assembled reply ever reaches history.
        transcript.record(input, reply.clone());
        pretty::print_pretty(&reply)?;
    }

    Ok(())
}

fn print_prompt() -> Result<(), Box<dyn Error>> {
    let mut stdout = stdout();
    stdout.execute(SetForegroundColor(Color::Green))?;
    stdout.execute(Print("\nYou: "))?;
    stdout.execute(SetForegroundColor(Color::Reset))?;
    stdout.flush()?;
    Ok(())
}

fn prompt_for_api_key() -> Result<String, Box<dyn Error>> {
    let mut stdout = stdout();
    stdout.execute(Print("No API key found in the environment or config.\n"))?;
    stdout.execute(Print("Enter an API key to use for this session: "))?;
    stdout.flush()?;

    let mut key = String::new();
    std::io::stdin().read_line(&mut key)?;
    let key = key.trim().to_string();
    if key.is_empty() {
        return Err(AnswerError::AuthMissing.to_string().into());
    }
    Ok(key)
}

fn print_load_summary(files: &[LoadedFile]) {
    if files.is_empty() {
        println!("No files loaded. Use /files <path>... to load some.");
        return;
    }
    for file in files {
        match &file.text {
            Ok(text) => println!("  loaded {} ({} chars)", file.name, text.len()),
            Err(err) => println!("  could not read {}: {}", file.name, err),
        }
    }
}

fn query_spinner(mode: QueryMode, files: &[LoadedFile]) -> ProgressBar {
    let readable = files.iter().filter(|f| f.text.is_ok()).count();
    let spinner = ProgressBar::new_spinner();
    spinner.set_message(match mode {
        QueryMode::Combined => format!("querying {readable} file(s) as one context..."),
        QueryMode::PerFile => format!("querying {readable} file(s) independently..."),
    });
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::POST;
    use httpmock::MockServer;
    use serde_json::json;

    fn mock_config(api_base: String, api_key: Option<&str>) -> FileChatConfig {
        FileChatConfig {
            api_base,
            api_key: api_key.map(str::to_string),
            model: "mock_model".to_string(),
            context_max_tokens: 8192,
            answer_reserve_tokens: 1024,
            per_file_concurrency: 4,
        }
    }

    fn completion_body(content: &str) -> serde_json::Value {
        json!({
            "id": "chatcmpl-test",
            "object": "chat.completion",
            "created": 0,
            "model": "mock_model",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }]
        })
    }

    #[tokio::test]
    async fn answer_returns_the_completion_text() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200)
                    .json_body(completion_body("The capital of France is Paris."));
            })
            .await;

        let config = mock_config(server.base_url(), None);
        let answers =
            OpenAiAnswers::new(&config, "test-key".to_string(), ChatTemplate::default());

        let reply = answers
            .answer("What is the capital of France?", "Paris is the capital of France")
            .await
            .unwrap();

        assert_eq!(reply, "The capital of France is Paris.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn empty_completion_is_a_model_refusal() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(completion_body("  "));
            })
            .await;

        let config = mock_config(server.base_url(), None);
        let answers = OpenAiAnswers::new(&config, "test-key".to_string(), ChatTemplate::default());

        let err = answers.answer("anything?", "some context").await.unwrap_err();
        assert!(matches!(err, AnswerError::ModelRefusal(_)));
    }

    #[tokio::test]
    async fn ask_dispatches_and_returns_the_reply() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200)
                    .json_body(completion_body("Paris, according to a.txt."));
            })
            .await;

        let config = mock_config(server.base_url(), Some("config-key"));
        let files = vec![LoadedFile::new(
            "a.txt",
            Ok("Paris is the capital of France".to_string()),
        )];

        let reply = ask(
            &config,
            "What is the capital of France?".to_string(),
            &files,
            QueryMode::Combined,
            ChatTemplate::default(),
        )
        .await
        .unwrap();

        assert_eq!(reply, "Paris, according to a.txt.");
        mock.assert_async().await;
    }

    #[test]
    fn api_errors_are_classified_by_detail() {
        assert!(matches!(
            classify_api_error("Rate limit reached for requests".to_string()),
            AnswerError::RateLimited(_)
        ));
        assert!(matches!(
            classify_api_error("You exceeded your current quota".to_string()),
            AnswerError::RateLimited(_)
        ));
        assert!(matches!(
            classify_api_error("Incorrect API key provided".to_string()),
            AnswerError::AuthMissing
        ));
        assert!(matches!(
            classify_api_error("response flagged by content_filter".to_string()),
            AnswerError::ModelRefusal(_)
        ));
        assert!(matches!(
            classify_api_error("upstream connect error".to_string()),
            AnswerError::NetworkFailure(_)
        ));
    }

    #[test]
    fn user_prompt_carries_template_decorations() {
        let config = mock_config("http://localhost:1/v1".to_string(), None);
        let template = ChatTemplate {
            system_prompt: "system".to_string(),
            pre_user_message_content: Some("Please".to_string()),
            post_user_message_content: Some("Thanks.".to_string()),
        };
        let answers = OpenAiAnswers::new(&config, "k".to_string(), template);

        let prompt = answers.user_prompt("what?", "the context");
        assert!(prompt.contains("the context"));
        assert!(prompt.contains("Please what? Thanks."));
    }
}
