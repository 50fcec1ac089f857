use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::storage::Storage;

/// Fixed user-facing text substituted for a reply when the chat call fails.
pub const ERROR_REPLY: &str = "Sorry, something went wrong. Please try again.";

const SCHEMA_VERSION: u32 = 1;

/// One request/response pair. `bot_text` is `None` while the reply is in
/// flight and always becomes `Some` afterwards (the real reply or
/// [`ERROR_REPLY`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: String,
    pub user_text: String,
    pub bot_text: Option<String>,
}

/// Persisted shape, tagged so older flat-list data can be told apart.
#[derive(Serialize, Deserialize)]
struct StoredHistory {
    version: u32,
    turns: Vec<ConversationTurn>,
}

/// The original client persisted a flat list of independent messages with a
/// sender tag instead of paired turns.
#[derive(Deserialize)]
struct LegacyMessage {
    #[serde(default)]
    #[allow(dead_code)]
    id: String,
    text: String,
    sender: String,
}

static TURN_SEQ: AtomicU64 = AtomicU64::new(0);

/// Opaque, time-derived turn identifier. The sequence suffix keeps ids
/// unique when several turns are created within the same millisecond.
fn next_turn_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let seq = TURN_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}", millis, seq)
}

/// Derive the storage key that namespaces one identity's history.
pub fn history_key(identity: &str) -> String {
    format!("chat_history_{}", identity)
}

/// Ordered list of turns for the current session.
#[derive(Debug, Default)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Append a turn for `text` and return its id so the caller can
    /// correlate the asynchronous reply. Whitespace-only input is rejected
    /// as a no-op.
    pub fn submit(&mut self, text: &str) -> Option<String> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let id = next_turn_id();
        self.turns.push(ConversationTurn {
            id: id.clone(),
            user_text: text.to_string(),
            bot_text: None,
        });
        Some(id)
    }

    /// Apply a completed chat call to the turn it originated from. Turns
    /// are matched by id, so out-of-order completions land correctly even
    /// when newer turns exist. An unknown id (list cleared mid-flight) is
    /// ignored.
    pub fn complete(&mut self, turn_id: &str, result: Result<String>) {
        if let Some(turn) = self.turns.iter_mut().find(|t| t.id == turn_id) {
            turn.bot_text = Some(match result {
                Ok(reply) => reply,
                Err(e) => {
                    log::warn!("chat call for turn {} failed: {}", turn_id, e);
                    ERROR_REPLY.to_string()
                }
            });
        }
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Load the persisted history for `identity`. Tries the current
    /// versioned shape first, then falls back to the legacy flat message
    /// list and converts it to paired turns. Unreadable data yields an
    /// empty conversation.
    pub fn load(storage: &Storage, identity: &str) -> Self {
        let Some(raw) = storage.get(&history_key(identity)) else {
            return Self::new();
        };

        if let Ok(stored) = serde_json::from_str::<StoredHistory>(&raw) {
            return Self { turns: stored.turns };
        }

        if let Ok(messages) = serde_json::from_str::<Vec<LegacyMessage>>(&raw) {
            return Self {
                turns: pair_legacy_messages(messages),
            };
        }

        log::warn!("unreadable chat history for '{}', starting fresh", identity);
        Self::new()
    }

    /// Persist the full turn list for `identity`, tagged with the current
    /// schema version. An empty list deletes the entry instead.
    pub fn save(&self, storage: &Storage, identity: &str) {
        let key = history_key(identity);
        if self.turns.is_empty() {
            storage.remove(&key);
            return;
        }
        let stored = StoredHistory {
            version: SCHEMA_VERSION,
            turns: self.turns.clone(),
        };
        match serde_json::to_string(&stored) {
            Ok(json) => storage.set(&key, &json),
            Err(e) => log::warn!("failed to serialize chat history: {}", e),
        }
    }
}

/// Convert the legacy alternating user/bot record list into paired turns.
/// A bot record completes the most recent open turn; a bot record with no
/// open turn becomes a turn with empty user text; trailing user records
/// stay open (`bot_text: None`).
fn pair_legacy_messages(messages: Vec<LegacyMessage>) -> Vec<ConversationTurn> {
    let mut turns: Vec<ConversationTurn> = Vec::new();
    for msg in messages {
        if msg.sender == "user" {
            turns.push(ConversationTurn {
                id: next_turn_id(),
                user_text: msg.text,
                bot_text: None,
            });
        } else {
            match turns.last_mut() {
                Some(turn) if turn.bot_text.is_none() => {
                    turn.bot_text = Some(msg.text);
                }
                _ => turns.push(ConversationTurn {
                    id: next_turn_id(),
                    user_text: String::new(),
                    bot_text: Some(msg.text),
                }),
            }
        }
    }
    turns
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use tempfile::TempDir;

    fn temp_storage() -> (TempDir, Storage) {
        let dir = TempDir::new().unwrap();
        let storage = Storage::at(dir.path().to_path_buf());
        (dir, storage)
    }

    #[test]
    fn test_submit_appends_one_turn() {
        let mut convo = Conversation::new();
        let id = convo.submit("How do I reset my password?").unwrap();
        assert_eq!(convo.turns().len(), 1);
        assert_eq!(convo.turns()[0].id, id);
        assert_eq!(convo.turns()[0].user_text, "How do I reset my password?");
        assert_eq!(convo.turns()[0].bot_text, None);
    }

    #[test]
    fn test_submit_trims_input() {
        let mut convo = Conversation::new();
        convo.submit("  hello  ").unwrap();
        assert_eq!(convo.turns()[0].user_text, "hello");
    }

    #[test]
    fn test_empty_submit_is_rejected() {
        let mut convo = Conversation::new();
        assert_eq!(convo.submit(""), None);
        assert_eq!(convo.submit("   \t\n"), None);
        assert!(convo.is_empty());
    }

    #[test]
    fn test_turn_ids_are_unique() {
        let mut convo = Conversation::new();
        let a = convo.submit("one").unwrap();
        let b = convo.submit("two").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_complete_matches_by_id_not_position() {
        let mut convo = Conversation::new();
        let first = convo.submit("first").unwrap();
        let second = convo.submit("second").unwrap();

        // Out-of-order completion: the newer turn resolves before the older.
        convo.complete(&second, Ok("reply two".to_string()));
        convo.complete(&first, Ok("reply one".to_string()));

        assert_eq!(convo.turns()[0].bot_text.as_deref(), Some("reply one"));
        assert_eq!(convo.turns()[1].bot_text.as_deref(), Some("reply two"));
    }

    #[test]
    fn test_failed_call_leaves_fixed_error_string() {
        let mut convo = Conversation::new();
        let id = convo.submit("hello").unwrap();
        convo.complete(&id, Err(anyhow!("connection refused")));
        assert_eq!(convo.turns()[0].bot_text.as_deref(), Some(ERROR_REPLY));
    }

    #[test]
    fn test_complete_unknown_id_is_ignored() {
        let mut convo = Conversation::new();
        convo.submit("hello").unwrap();
        convo.complete("not-a-turn", Ok("orphan".to_string()));
        assert_eq!(convo.turns()[0].bot_text, None);
    }

    #[test]
    fn test_persistence_roundtrip() {
        let (_dir, storage) = temp_storage();
        let mut convo = Conversation::new();
        let id = convo.submit("hello").unwrap();
        convo.complete(&id, Ok("hi there".to_string()));
        convo.submit("still waiting").unwrap();
        convo.save(&storage, "jane@example.com");

        let loaded = Conversation::load(&storage, "jane@example.com");
        assert_eq!(loaded.turns(), convo.turns());
    }

    #[test]
    fn test_clear_is_idempotent_and_unpersists() {
        let (_dir, storage) = temp_storage();
        let mut convo = Conversation::new();
        convo.submit("hello").unwrap();
        convo.save(&storage, "jane@example.com");

        convo.clear();
        convo.save(&storage, "jane@example.com");
        assert!(convo.is_empty());
        assert_eq!(storage.get(&history_key("jane@example.com")), None);

        convo.clear();
        convo.save(&storage, "jane@example.com");
        assert!(convo.is_empty());
        assert_eq!(storage.get(&history_key("jane@example.com")), None);
    }

    #[test]
    fn test_histories_are_namespaced_per_identity() {
        let (_dir, storage) = temp_storage();
        let mut convo = Conversation::new();
        convo.submit("jane's secret question").unwrap();
        convo.save(&storage, "jane@example.com");

        let other = Conversation::load(&storage, "john@example.com");
        assert!(other.is_empty());
    }

    #[test]
    fn test_identities_differing_in_escaped_characters_stay_separate() {
        let (_dir, storage) = temp_storage();
        let mut convo = Conversation::new();
        let id = convo.submit("jane's confidential question").unwrap();
        convo.complete(&id, Ok("here you go".to_string()));
        convo.save(&storage, "jane+work@example.com");

        // '+' and '!' both fall outside the storage key's safe character
        // set; the second identity must still get a fresh conversation.
        let other = Conversation::load(&storage, "jane!work@example.com");
        assert!(other.is_empty());

        let same = Conversation::load(&storage, "jane+work@example.com");
        assert_eq!(same.turns().len(), 1);
        assert_eq!(same.turns()[0].user_text, "jane's confidential question");
    }

    #[test]
    fn test_legacy_flat_list_is_paired() {
        let (_dir, storage) = temp_storage();
        let legacy = r#"[
            {"id": "1", "text": "hello", "sender": "user"},
            {"id": "2", "text": "hi, how can I help?", "sender": "bot"},
            {"id": "3", "text": "never mind", "sender": "user"}
        ]"#;
        storage.set(&history_key("jane@example.com"), legacy);

        let convo = Conversation::load(&storage, "jane@example.com");
        assert_eq!(convo.turns().len(), 2);
        assert_eq!(convo.turns()[0].user_text, "hello");
        assert_eq!(
            convo.turns()[0].bot_text.as_deref(),
            Some("hi, how can I help?")
        );
        // Trailing request without a response stays open.
        assert_eq!(convo.turns()[1].user_text, "never mind");
        assert_eq!(convo.turns()[1].bot_text, None);
    }

    #[test]
    fn test_legacy_bot_without_request_gets_its_own_turn() {
        let (_dir, storage) = temp_storage();
        let legacy = r#"[
            {"id": "1", "text": "welcome back", "sender": "bot"},
            {"id": "2", "text": "thanks", "sender": "user"}
        ]"#;
        storage.set(&history_key("jane@example.com"), legacy);

        let convo = Conversation::load(&storage, "jane@example.com");
        assert_eq!(convo.turns().len(), 2);
        assert_eq!(convo.turns()[0].user_text, "");
        assert_eq!(convo.turns()[0].bot_text.as_deref(), Some("welcome back"));
        assert_eq!(convo.turns()[1].user_text, "thanks");
    }

    #[test]
    fn test_migrated_history_is_rewritten_versioned() {
        let (_dir, storage) = temp_storage();
        let legacy = r#"[{"id": "1", "text": "hello", "sender": "user"}]"#;
        storage.set(&history_key("jane@example.com"), legacy);

        let convo = Conversation::load(&storage, "jane@example.com");
        convo.save(&storage, "jane@example.com");

        let raw = storage.get(&history_key("jane@example.com")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], 1);
    }

    #[test]
    fn test_unreadable_history_starts_fresh() {
        let (_dir, storage) = temp_storage();
        storage.set(&history_key("jane@example.com"), "{not json");
        let convo = Conversation::load(&storage, "jane@example.com");
        assert!(convo.is_empty());
    }
}
