//! Prompt assembly from session history.
//!
//! Renders a bounded window of stored messages plus the sanitized new turn
//! into a single plain-text transcript for the generation backend. The
//! window bounds prompt size: only the most recent `history_window - 1`
//! stored messages are rendered, one slot being reserved for the new turn.

use chatrelay_types::chat::{ChatMessage, ChatRole};
use chatrelay_types::config::PromptConfig;

use crate::sanitize::strip_controls;

const HUMAN_PREFIX: &str = "Human: ";
const ASSISTANT_PREFIX: &str = "Assistant: ";

/// Renders session history and the new turn into a backend prompt.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    history_window: usize,
}

impl PromptAssembler {
    pub fn new(config: PromptConfig) -> Self {
        Self {
            history_window: config.history_window.max(1),
        }
    }

    /// Build the prompt: windowed history oldest-first, then the new user
    /// turn, ending with a bare assistant cue for the backend to continue.
    ///
    /// History passes through control-character stripping only; it was
    /// fully sanitized when first accepted. `new_turn` must already be the
    /// sanitizer-cleaned text.
    pub fn assemble(&self, history: &[ChatMessage], new_turn: &str) -> String {
        let window = self.history_window - 1;
        let skip = history.len().saturating_sub(window);

        let mut sections: Vec<String> = history[skip..]
            .iter()
            .map(|msg| {
                let prefix = match msg.role {
                    ChatRole::User => HUMAN_PREFIX,
                    ChatRole::Assistant => ASSISTANT_PREFIX,
                };
                format!("{prefix}{}", strip_controls(&msg.content))
            })
            .collect();

        sections.push(format!("{HUMAN_PREFIX}{new_turn}"));
        sections.push("Assistant:".to_string());
        sections.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assembler(window: usize) -> PromptAssembler {
        PromptAssembler::new(PromptConfig {
            history_window: window,
        })
    }

    #[test]
    fn empty_history_renders_single_turn() {
        let prompt = assembler(50).assemble(&[], "Hello!");
        assert_eq!(prompt, "Human: Hello!\n\nAssistant:");
    }

    #[test]
    fn history_renders_oldest_first_with_role_prefixes() {
        let history = vec![
            ChatMessage::user("first question"),
            ChatMessage::assistant("first answer"),
        ];
        let prompt = assembler(50).assemble(&history, "second question");
        assert_eq!(
            prompt,
            "Human: first question\n\n\
             Assistant: first answer\n\n\
             Human: second question\n\n\
             Assistant:"
        );
    }

    #[test]
    fn window_keeps_most_recent_messages() {
        let history: Vec<ChatMessage> = (0..10)
            .map(|i| ChatMessage::user(format!("msg {i}")))
            .collect();
        // Window of 4 leaves 3 slots for history.
        let prompt = assembler(4).assemble(&history, "new");
        assert!(!prompt.contains("msg 6"));
        assert!(prompt.contains("msg 7"));
        assert!(prompt.contains("msg 9"));
        assert!(prompt.ends_with("Human: new\n\nAssistant:"));
    }

    #[test]
    fn window_of_one_drops_all_history() {
        let history = vec![ChatMessage::user("old")];
        let prompt = assembler(1).assemble(&history, "new");
        assert_eq!(prompt, "Human: new\n\nAssistant:");
    }

    #[test]
    fn history_content_is_control_stripped() {
        let history = vec![ChatMessage::assistant("clean\u{0007}ed")];
        let prompt = assembler(50).assemble(&history, "next");
        assert!(prompt.contains("Assistant: cleaned"));
    }
}
