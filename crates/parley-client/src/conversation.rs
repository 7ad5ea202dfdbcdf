//! Client-side conversation history.

use parley_protocol::Message;

/// Messages exchanged in one REPL session, oldest first.
///
/// Only ever appended to, or emptied as a whole.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    total_tokens: u64,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Add the token usage of a completed turn to the running total.
    pub fn record_usage(&mut self, tokens: u32) {
        self.total_tokens += u64::from(tokens);
    }

    /// Forget every message and reset the running total.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.total_tokens = 0;
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_keeps_order() {
        let mut conversation = Conversation::new();
        conversation.push(Message::user("A"));
        conversation.push(Message::assistant("reply"));
        conversation.push(Message::user("B"));

        let contents: Vec<_> = conversation.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["A", "reply", "B"]);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut conversation = Conversation::new();
        conversation.push(Message::user("A"));
        conversation.push(Message::assistant("reply"));
        conversation.record_usage(42);

        conversation.clear();
        assert!(conversation.is_empty());
        assert_eq!(conversation.len(), 0);
        assert_eq!(conversation.total_tokens(), 0);
    }
}
