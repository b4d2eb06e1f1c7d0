//! Error types for file loading and answer generation.
//!
//! Two taxonomies cover every way a question can partially fail:
//!
//! - [`ExtractionError`]: per file, recorded on the `LoadedFile` at load
//!   time. Never aborts the session; the file is simply excluded from
//!   context and reported to the user.
//! - [`AnswerError`]: per model call. In combined mode it becomes the whole
//!   reply; in per-file mode it only replaces the affected file's entry.
//!
//! Neither error is fatal to the process. Application-level plumbing
//! (config loading, terminal IO) keeps returning `Box<dyn Error>`.

use thiserror::Error;

/// Why a file's text could not be extracted.
///
/// Exactly one of these is stored on a `LoadedFile` whose extraction
/// failed. The `Display` text is what the user sees in the
/// "could not be read" listing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// The document is password protected.
    #[error("file is encrypted")]
    Encrypted,

    /// The document could not be parsed at all.
    #[error("file is corrupt: {0}")]
    Corrupt(String),

    /// The file extension maps to no known extractor.
    #[error("unsupported file format: .{0}")]
    UnsupportedFormat(String),

    /// Parsing succeeded but produced no text (e.g. a scanned PDF).
    #[error("no extractable text (file may be empty or image-only)")]
    Empty,

    /// The file could not be read from disk in the first place.
    #[error("could not read file: {0}")]
    Io(String),
}

/// Why a single answer call failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnswerError {
    /// No API key was available from any source. Surfaced before any
    /// request is attempted.
    #[error("no API key available; set OPENAI_API_KEY or add api_key to config.yaml")]
    AuthMissing,

    /// The endpoint refused the request with a rate-limit or quota error.
    #[error("the model endpoint rate limited this request: {0}")]
    RateLimited(String),

    /// Transport-level failure (DNS, connection reset, bad gateway, ...).
    #[error("network failure talking to the model endpoint: {0}")]
    NetworkFailure(String),

    /// The model returned no usable completion or declined to answer.
    #[error("the model declined to answer: {0}")]
    ModelRefusal(String),

    /// The request did not complete in time.
    #[error("the model endpoint timed out")]
    Timeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_error_display_names_the_cause() {
        assert_eq!(ExtractionError::Encrypted.to_string(), "file is encrypted");
        assert_eq!(
            ExtractionError::UnsupportedFormat("docx".to_string()).to_string(),
            "unsupported file format: .docx"
        );
        assert!(
            ExtractionError::Corrupt("bad xref table".to_string())
                .to_string()
                .contains("bad xref table")
        );
    }

    #[test]
    fn answer_error_display_is_user_facing() {
        let err = AnswerError::RateLimited("429".to_string());
        assert!(err.to_string().contains("rate limited"));
        assert!(AnswerError::AuthMissing.to_string().contains("OPENAI_API_KEY"));
    }
}
