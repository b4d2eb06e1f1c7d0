//! In-memory conversation history.
//!
//! The transcript is an ordered, append-only sequence of
//! [`ConversationTurn`]s for the current session. A turn is recorded only
//! once its full reply has been assembled (combined string or complete
//! per-file list), never incrementally, so partial output can never appear
//! in history. Nothing is persisted across restarts.

use serde::Serialize;

/// One completed question/reply exchange.
///
/// Turns are immutable after creation; later mode or file-set changes have
/// no effect on turns already recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationTurn {
    /// The user's question as submitted.
    pub question: String,
    /// The full assistant reply, including any unreadable-file notes.
    pub reply: String,
}

/// Ordered, append-only history of the session's turns.
#[derive(Debug, Default)]
pub struct Transcript {
    turns: Vec<ConversationTurn>,
}

impl Transcript {
    /// An empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a completed turn. The only mutation the transcript allows.
    pub fn record(&mut self, question: impl Into<String>, reply: impl Into<String>) {
        self.turns.push(ConversationTurn {
            question: question.into(),
            reply: reply.into(),
        });
    }

    /// All turns, oldest first.
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turns_are_recorded_in_order() {
        let mut transcript = Transcript::new();
        transcript.record("first?", "one");
        transcript.record("second?", "two");

        let turns = transcript.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].question, "first?");
        assert_eq!(turns[1].reply, "two");
    }

    #[test]
    fn recorded_turns_are_not_altered_by_later_appends() {
        let mut transcript = Transcript::new();
        transcript.record("q1", "r1");
        let snapshot = transcript.turns()[0].clone();

        transcript.record("q2", "r2");
        transcript.record("q3", "r3");

        assert_eq!(transcript.turns()[0], snapshot);
    }
}
