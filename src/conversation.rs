//! Conversation history ownership.
//!
//! [`ConversationStore`] is the single owner of the ordered message history
//! that is sent to the completion service on every exchange.  Position 0 always
//! holds the system message the store was seeded with.

use crate::error::{Error, Result};
use crate::types::{Message, Role};

/// Ordered, mutable conversation history seeded with one system message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationStore {
    system_prompt: String,
    history: Vec<Message>,
}

impl ConversationStore {
    /// Creates a store holding exactly one system message.
    pub fn new(system_prompt: impl Into<String>) -> Self {
        let system_prompt = system_prompt.into();
        let history = vec![Message::system(system_prompt.clone())];
        Self {
            system_prompt,
            history,
        }
    }

    /// Appends a message at the end of the history.
    pub fn append(&mut self, message: Message) {
        self.history.push(message);
    }

    /// Discards every message and re-seeds the configured system message.
    pub fn reset(&mut self) {
        self.history.clear();
        self.history.push(Message::system(self.system_prompt.clone()));
    }

    /// Removes the most recently appended message.
    ///
    /// The seed system message is never removed; on a history of length one
    /// this does nothing and returns `None`.
    pub fn rollback_last(&mut self) -> Option<Message> {
        if self.history.len() > 1 {
            self.history.pop()
        } else {
            None
        }
    }

    /// Returns a copy of the history, in order.
    pub fn snapshot(&self) -> Vec<Message> {
        self.history.clone()
    }

    /// Borrows the history, in order.
    pub fn messages(&self) -> &[Message] {
        &self.history
    }

    /// The most recent message.
    pub fn last(&self) -> Option<&Message> {
        self.history.last()
    }

    /// Number of messages, including the seed.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Always false; the seed message is never removed.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// The system prompt used to seed the history on reset.
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Replaces the history with replayed messages, e.g. from a transcript.
    ///
    /// The replay must begin with exactly one system message.  The configured
    /// system prompt is kept, so a later reset re-seeds with it rather than
    /// with the replayed one.  On error the store is unchanged.
    pub fn replace(&mut self, messages: Vec<Message>) -> Result<()> {
        match messages.first() {
            Some(first) if first.role == Role::System => {}
            _ => {
                return Err(Error::validation(
                    "history must begin with a system message",
                    Some("messages".to_string()),
                ));
            }
        }
        if messages[1..].iter().any(|m| m.role == Role::System) {
            return Err(Error::validation(
                "history may hold only one system message",
                Some("messages".to_string()),
            ));
        }
        self.history = messages;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROMPT: &str = "You are a helpful, respectful, and honest assistant.";

    #[test]
    fn new_store_holds_seed() {
        let store = ConversationStore::new(PROMPT);
        assert_eq!(store.len(), 1);
        assert_eq!(store.messages()[0], Message::system(PROMPT));
        assert!(!store.is_empty());
    }

    #[test]
    fn append_keeps_order_and_empty_content() {
        let mut store = ConversationStore::new(PROMPT);
        store.append(Message::user("hello"));
        store.append(Message::assistant(""));
        assert_eq!(
            store.snapshot(),
            vec![
                Message::system(PROMPT),
                Message::user("hello"),
                Message::assistant(""),
            ]
        );
    }

    #[test]
    fn append_then_rollback_is_identity() {
        let mut store = ConversationStore::new(PROMPT);
        store.append(Message::user("one"));
        store.append(Message::assistant("two"));
        let before = store.clone();

        store.append(Message::user("three"));
        assert_eq!(store.rollback_last(), Some(Message::user("three")));
        assert_eq!(store, before);
    }

    #[test]
    fn rollback_never_removes_seed() {
        let mut store = ConversationStore::new(PROMPT);
        assert_eq!(store.rollback_last(), None);
        assert_eq!(store.rollback_last(), None);
        assert_eq!(store.snapshot(), vec![Message::system(PROMPT)]);
    }

    #[test]
    fn reset_reseeds() {
        let mut store = ConversationStore::new(PROMPT);
        store.append(Message::user("hello"));
        store.append(Message::assistant("hi"));
        store.reset();
        assert_eq!(store.len(), 1);
        assert_eq!(store.messages()[0].role, Role::System);
        assert_eq!(store.messages()[0].content, PROMPT);
    }

    #[test]
    fn snapshot_is_detached() {
        let mut store = ConversationStore::new(PROMPT);
        let mut snapshot = store.snapshot();
        snapshot.push(Message::user("not in the store"));
        store.append(Message::user("in the store"));
        assert_eq!(store.len(), 2);
        assert_eq!(store.last(), Some(&Message::user("in the store")));
    }

    #[test]
    fn replace_requires_system_seed() {
        let mut store = ConversationStore::new(PROMPT);
        let err = store
            .replace(vec![Message::user("hi"), Message::assistant("hello")])
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(store.len(), 1);

        let err = store
            .replace(vec![Message::system("a"), Message::system("b")])
            .unwrap_err();
        assert!(err.is_validation());
        assert!(store.replace(Vec::new()).is_err());
    }

    #[test]
    fn reset_after_replace_uses_configured_prompt() {
        let mut store = ConversationStore::new(PROMPT);
        store
            .replace(vec![
                Message::system("Be terse."),
                Message::user("hi"),
                Message::assistant("hello"),
            ])
            .unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.messages()[0], Message::system("Be terse."));
        store.reset();
        assert_eq!(store.snapshot(), vec![Message::system(PROMPT)]);
        assert_eq!(store.system_prompt(), PROMPT);
    }
}
