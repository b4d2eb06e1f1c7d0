//! # Query dispatcher
//!
//! The one piece of real logic in this application: given the current
//! [`QueryMode`], the session's loaded files, and a user question, produce
//! the text to show as the assistant's reply.
//!
//! The dispatcher is a pure function of `(question, mode, files)` plus the
//! injected [`AnswerProvider`] collaborator: it holds no session state of
//! its own, which is what makes it testable with constructed inputs and a
//! recording mock provider.
//!
//! ## Modes
//!
//! - **Combined**: every readable file's text is concatenated, in load
//!   order, each section under a delimiter naming its file so the model
//!   can attribute facts to a source. Exactly one `answer` call is made.
//!   If it fails, the failure message *is* the reply; there is no retry.
//! - **Per-file**: one independent `answer` call per readable file, each
//!   seeing only that file's text. Calls run with bounded concurrency but
//!   the reply always lists results in load order. One file's failure
//!   replaces only that file's entry; the others still answer.
//!
//! In both modes unreadable files contribute nothing to any context and
//! are listed once below the reply, and if *no* file is readable the
//! dispatcher returns [`NO_CONTENT_REPLY`] without calling the provider
//! at all.
//!
//! ## Context budget
//!
//! Combined contexts are budgeted in `cl100k_base` tokens. Files are taken
//! whole in load order; the file that crosses the budget is cut with a
//! visible `[truncated]` marker and later files are reduced to an
//! `[omitted]` marker. Per-file contexts get the same per-call budget.

use async_trait::async_trait;
use futures::{StreamExt, stream};
use std::fmt;
use std::str::FromStr;
use tiktoken_rs::cl100k_base;
use tracing::{debug, warn};

use crate::error::AnswerError;
use crate::loader::LoadedFile;

/// Fixed reply used when zero loaded files have readable text.
pub const NO_CONTENT_REPLY: &str = "None of the loaded files have readable content, \
so there is nothing to answer from. Load at least one readable file and try again.";

/// How a question is put to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// Merge all readable files into one context, one model call.
    Combined,
    /// One independent model call per readable file, results aggregated.
    PerFile,
}

impl QueryMode {
    /// The other mode. Used by the REPL's bare `/mode` command.
    pub fn toggled(self) -> Self {
        match self {
            QueryMode::Combined => QueryMode::PerFile,
            QueryMode::PerFile => QueryMode::Combined,
        }
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryMode::Combined => write!(f, "combined"),
            QueryMode::PerFile => write!(f, "per-file"),
        }
    }
}

impl FromStr for QueryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "combined" | "c" => Ok(QueryMode::Combined),
            "per-file" | "perfile" | "per_file" | "p" => Ok(QueryMode::PerFile),
            other => Err(format!("unknown mode '{other}' (expected 'combined' or 'per-file')")),
        }
    }
}

/// The external answer collaborator: `(question, context) -> answer`.
///
/// The production implementation talks to an OpenAI-compatible endpoint
/// (see `crate::api::OpenAiAnswers`); tests inject recording mocks.
#[async_trait]
pub trait AnswerProvider: Send + Sync {
    /// Answer `question` against `context`. One call, no retry; failures
    /// are reported through the [`AnswerError`] taxonomy.
    async fn answer(&self, question: &str, context: &str) -> Result<String, AnswerError>;
}

/// Stateless dispatcher configured with a context token budget and a
/// per-file fan-out width.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    context_budget: usize,
    concurrency: usize,
}

impl Dispatcher {
    /// Create a dispatcher.
    ///
    /// # Parameters
    /// - `context_budget`: `cl100k_base` tokens available for file context
    ///   in a single call (model window minus the answer reserve).
    /// - `concurrency`: how many per-file calls may be in flight at once.
    ///   `1` gives fully sequential dispatch; order of the reply is
    ///   unaffected either way.
    pub fn new(context_budget: usize, concurrency: usize) -> Self {
        Self {
            context_budget,
            concurrency: concurrency.max(1),
        }
    }

    /// Produce the reply for one submitted question.
    ///
    /// `files` is the session's file set exactly as loaded when the
    /// question was submitted. The reply is fully assembled before this
    /// returns; callers append it to history in one piece.
    pub async fn handle(
        &self,
        question: &str,
        mode: QueryMode,
        files: &[LoadedFile],
        answers: &dyn AnswerProvider,
    ) -> String {
        let readable: Vec<&LoadedFile> = files.iter().filter(|f| f.text.is_ok()).collect();
        let unreadable: Vec<&LoadedFile> = files.iter().filter(|f| f.text.is_err()).collect();

        let body = if readable.is_empty() {
            debug!("no readable files; skipping answer call");
            NO_CONTENT_REPLY.to_string()
        } else {
            match mode {
                QueryMode::Combined => self.combined(question, &readable, answers).await,
                QueryMode::PerFile => self.per_file(question, &readable, answers).await,
            }
        };

        match unreadable_note(&unreadable) {
            Some(note) => format!("{body}\n\n{note}"),
            None => body,
        }
    }

    async fn combined(
        &self,
        question: &str,
        readable: &[&LoadedFile],
        answers: &dyn AnswerProvider,
    ) -> String {
        let context = self.combined_context(readable);
        debug!(
            "combined dispatch: {} file(s), {} context chars",
            readable.len(),
            context.len()
        );

        match answers.answer(question, &context).await {
            Ok(reply) => reply,
            Err(err) => format!("Could not answer from the loaded files: {err}"),
        }
    }

    async fn per_file(
        &self,
        question: &str,
        readable: &[&LoadedFile],
        answers: &dyn AnswerProvider,
    ) -> String {
        debug!(
            "per-file dispatch: {} file(s), concurrency {}",
            readable.len(),
            self.concurrency
        );

        let calls = readable.iter().map(|file| {
            let context = self.per_file_context(file);
            async move {
                let result = answers.answer(question, &context).await;
                (file.name.as_str(), result)
            }
        });

        // `buffered` bounds how many calls are in flight while yielding
        // results in input order, so the reply is reproducible no matter
        // which call finishes first.
        let results: Vec<(&str, Result<String, AnswerError>)> =
            stream::iter(calls).buffered(self.concurrency).collect().await;

        results
            .into_iter()
            .map(|(name, result)| match result {
                Ok(answer) => format!("### {name}\n{answer}"),
                Err(err) => {
                    warn!("per-file answer for {} failed: {}", name, err);
                    format!("### {name}\n[no answer: {err}]")
                }
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn combined_context(&self, readable: &[&LoadedFile]) -> String {
        let mut remaining = self.context_budget;
        let mut sections = Vec::with_capacity(readable.len());

        for file in readable {
            let header = file_header(&file.name);
            let header_cost = token_count(&header);

            if remaining <= header_cost {
                warn!("context budget exhausted; omitting {}", file.name);
                sections.push(format!("{header}\n[omitted: context budget exhausted]"));
                continue;
            }
            remaining -= header_cost;

            let text = file.readable_text().unwrap_or_default();
            let (body, truncated) = truncate_to_tokens(text, remaining);
            remaining = remaining.saturating_sub(token_count(&body));

            if truncated {
                warn!("truncating {} to fit the context budget", file.name);
                sections.push(format!("{header}\n{body}\n[truncated: context budget reached]"));
            } else {
                sections.push(format!("{header}\n{body}"));
            }
        }

        sections.join("\n\n")
    }

    fn per_file_context(&self, file: &LoadedFile) -> String {
        let text = file.readable_text().unwrap_or_default();
        let (body, truncated) = truncate_to_tokens(text, self.context_budget);
        if truncated {
            warn!("truncating {} to fit the context budget", file.name);
            format!("{body}\n[truncated: context budget reached]")
        } else {
            body
        }
    }
}

fn file_header(name: &str) -> String {
    format!("----- file: {name} -----")
}

fn unreadable_note(unreadable: &[&LoadedFile]) -> Option<String> {
    if unreadable.is_empty() {
        return None;
    }

    let mut note = format!(
        "Note: {} file(s) could not be read and contributed nothing:",
        unreadable.len()
    );
    for file in unreadable {
        let reason = file
            .extraction_error()
            .map(|e| e.to_string())
            .unwrap_or_default();
        note.push_str(&format!("\n- {}: {}", file.name, reason));
    }
    Some(note)
}

fn token_count(text: &str) -> usize {
    let bpe = cl100k_base().unwrap();
    bpe.encode_with_special_tokens(text).len()
}

/// Cut `text` down to at most `budget` tokens. Returns the (possibly
/// shortened) text and whether a cut happened.
fn truncate_to_tokens(text: &str, budget: usize) -> (String, bool) {
    let bpe = cl100k_base().unwrap();
    let tokens = bpe.encode_with_special_tokens(text);
    if tokens.len() <= budget {
        return (text.to_string(), false);
    }

    let kept = tokens[..budget].to_vec();
    let cut = bpe
        .decode(kept)
        // A token cut can land mid-codepoint; fall back to a character cut.
        .unwrap_or_else(|_| text.chars().take(budget.saturating_mul(3)).collect());
    (cut, true)
}
