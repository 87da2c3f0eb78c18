//! Bounded conversation log.

use serde::{Deserialize, Serialize};

pub const DEFAULT_HISTORY_TURNS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    fn tag(self) -> &'static str {
        match self {
            Speaker::User => "User",
            Speaker::Assistant => "Assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub message: String,
}

/// Ordered (speaker, message) log of one chat session.
///
/// Append-only; [`ConversationHistory::truncate_to_user_turns`] drops the
/// oldest exchanges so at most `n` user turns (and their replies) remain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationHistory {
    turns: Vec<Turn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn user_turn_count(&self) -> usize {
        self.turns
            .iter()
            .filter(|t| t.speaker == Speaker::User)
            .count()
    }

    pub fn push_user(&mut self, message: impl Into<String>) {
        self.turns.push(Turn {
            speaker: Speaker::User,
            message: message.into(),
        });
    }

    pub fn push_assistant(&mut self, message: impl Into<String>) {
        self.turns.push(Turn {
            speaker: Speaker::Assistant,
            message: message.into(),
        });
    }

    /// Append one user/assistant exchange, then truncate to `max_user_turns`.
    pub fn record_exchange(
        &mut self,
        user: impl Into<String>,
        assistant: impl Into<String>,
        max_user_turns: usize,
    ) {
        self.push_user(user);
        self.push_assistant(assistant);
        self.truncate_to_user_turns(max_user_turns);
    }

    pub fn truncate_to_user_turns(&mut self, n: usize) {
        if n == 0 {
            self.turns.clear();
            return;
        }
        let start = self
            .turns
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, t)| t.speaker == Speaker::User)
            .nth(n - 1)
            .map(|(i, _)| i);
        if let Some(start) = start {
            self.turns.drain(..start);
        }
    }

    /// `User: ...` / `Assistant: ...` lines, one per turn.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for turn in &self.turns {
            out.push_str(turn.speaker.tag());
            out.push_str(": ");
            out.push_str(&turn.message);
            out.push('\n');
        }
        out
    }

    /// The prior log followed by the current turn.
    pub fn serialize_with_turn(&self, turn: &str) -> String {
        let mut out = self.serialize();
        out.push_str("User: ");
        out.push_str(turn);
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_prior_turns_then_current() {
        let mut h = ConversationHistory::new();
        h.push_user("which bundles exist?");
        h.push_assistant("three bundles");
        assert_eq!(
            h.serialize_with_turn("and their scenarios?"),
            "User: which bundles exist?\nAssistant: three bundles\nUser: and their scenarios?\n"
        );
    }

    #[test]
    fn empty_history_serializes_only_the_turn() {
        let h = ConversationHistory::new();
        assert_eq!(h.serialize_with_turn("hi"), "User: hi\n");
    }

    #[test]
    fn truncation_keeps_last_user_turns_with_replies() {
        let mut h = ConversationHistory::new();
        for i in 0..7 {
            h.record_exchange(format!("q{i}"), format!("a{i}"), 5);
        }
        assert_eq!(h.user_turn_count(), 5);
        assert_eq!(h.len(), 10);
        assert_eq!(h.turns()[0].message, "q2");
        assert_eq!(h.turns()[9].message, "a6");
    }

    #[test]
    fn truncation_is_noop_below_limit() {
        let mut h = ConversationHistory::new();
        h.record_exchange("q", "a", 5);
        assert_eq!(h.len(), 2);
        h.truncate_to_user_turns(0);
        assert!(h.is_empty());
    }
}
