// ReturnBot Engine — Conversation Store
// Per-customer transcript map: created on first message, appended in arrival
// order, never evicted or persisted. Lost on process restart.

use crate::engine::types::Turn;
use parking_lot::Mutex;
use std::collections::HashMap;

/// In-memory transcript store keyed by customer wa_id.
///
/// The mutex serializes concurrent webhook deliveries for the same user so
/// turn ordering matches arrival order. Never held across await points —
/// callers take a snapshot for the provider round-trip and append the reply
/// afterwards.
#[derive(Default)]
pub struct ConversationStore {
    map: Mutex<HashMap<String, Vec<Turn>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize the user's history if absent, append the turn, and return
    /// a snapshot of the full transcript including it.
    pub fn push(&self, user_id: &str, turn: Turn) -> Vec<Turn> {
        let mut map = self.map.lock();
        let history = map.entry(user_id.to_string()).or_default();
        history.push(turn);
        history.clone()
    }

    /// The last `n` turns for a user (empty if unknown).
    pub fn tail(&self, user_id: &str, n: usize) -> Vec<Turn> {
        let map = self.map.lock();
        match map.get(user_id) {
            Some(history) => {
                let skip = history.len().saturating_sub(n);
                history[skip..].to_vec()
            }
            None => vec![],
        }
    }

    pub fn turn_count(&self, user_id: &str) -> usize {
        self.map.lock().get(user_id).map(|h| h.len()).unwrap_or(0)
    }

    /// Number of users with at least one stored turn.
    pub fn user_count(&self) -> usize {
        self.map.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{Part, Role, Turn};

    #[test]
    fn push_initializes_history_for_new_user() {
        let store = ConversationStore::new();
        assert_eq!(store.turn_count("911234567890"), 0);

        let snapshot = store.push("911234567890", Turn::user(vec![Part::text("hello")]));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.turn_count("911234567890"), 1);
        assert_eq!(store.user_count(), 1);
    }

    #[test]
    fn push_appends_in_arrival_order() {
        let store = ConversationStore::new();
        store.push("u1", Turn::user(vec![Part::text("first")]));
        store.push("u1", Turn::model("second"));
        let snapshot = store.push("u1", Turn::user(vec![Part::text("third")]));

        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0].role, Role::User);
        assert_eq!(snapshot[1].role, Role::Model);
        assert_eq!(snapshot[2].as_text(), "third");
    }

    #[test]
    fn histories_are_isolated_per_user() {
        let store = ConversationStore::new();
        store.push("u1", Turn::user(vec![Part::text("mine")]));
        store.push("u2", Turn::user(vec![Part::text("yours")]));

        assert_eq!(store.turn_count("u1"), 1);
        assert_eq!(store.turn_count("u2"), 1);
        assert_eq!(store.tail("u1", 5)[0].as_text(), "mine");
    }

    #[test]
    fn tail_returns_last_n_turns() {
        let store = ConversationStore::new();
        for i in 0..5 {
            store.push("u1", Turn::model(format!("reply {}", i)));
        }
        let tail = store.tail("u1", 2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].as_text(), "reply 3");
        assert_eq!(tail[1].as_text(), "reply 4");
    }

    #[test]
    fn tail_unknown_user_is_empty() {
        let store = ConversationStore::new();
        assert!(store.tail("nobody", 3).is_empty());
    }
}
