use anyhow::{Context, Result};
use tracing::debug;

use super::storage::Storage;
use super::types::{Message, Sender};

pub const HISTORY_KEY: &str = "chatHistory";

/// Append-only log of the messages exchanged in a chat.
pub trait TranscriptStore {
    /// Appends one message and returns the whole updated transcript for re-rendering.
    fn append(&mut self, sender: Sender, text: &str) -> Result<Vec<Message>>;

    /// Reads every stored message in insertion order.
    ///
    /// Missing or `null` content reads as empty. Content that doesn't parse is an
    /// error and is left for the caller to treat as fatal; nothing here repairs it.
    fn load(&self) -> Result<Vec<Message>>;
}

/// A transcript kept as one JSON array under [`HISTORY_KEY`].
///
/// Every append rewrites the whole array. Two writers sharing the same storage
/// overwrite each other's entries.
#[derive(Debug, Clone)]
pub struct LocalTranscript<S> {
    storage: S,
}

impl<S: Storage> LocalTranscript<S> {
    pub fn new(storage: S) -> LocalTranscript<S> {
        LocalTranscript { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

impl<S: Storage> TranscriptStore for LocalTranscript<S> {
    fn append(&mut self, sender: Sender, text: &str) -> Result<Vec<Message>> {
        let mut history = self.load()?;
        history.push(Message::new(sender, text));
        let raw = serde_json::to_string(&history)?;
        self.storage.set_item(HISTORY_KEY, &raw)?;
        debug!(?sender, entries = history.len(), "Transcript appended");
        Ok(history)
    }

    fn load(&self) -> Result<Vec<Message>> {
        let Some(raw) = self.storage.get_item(HISTORY_KEY)? else {
            return Ok(Vec::new());
        };
        let history = serde_json::from_str::<Option<Vec<Message>>>(&raw)
            .context("Stored chat history is corrupted")?;
        Ok(history.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat_core::storage::{FileStorage, MemoryStorage};

    fn memory() -> LocalTranscript<MemoryStorage> {
        LocalTranscript::new(MemoryStorage::new())
    }

    #[test]
    fn test_append_then_load() {
        let mut transcript = memory();
        transcript.append(Sender::User, "hello").unwrap();
        transcript.append(Sender::Bot, "hi there").unwrap();

        assert_eq!(
            transcript.load().unwrap(),
            vec![
                Message::new(Sender::User, "hello"),
                Message::new(Sender::Bot, "hi there"),
            ]
        );
    }

    #[test]
    fn test_insertion_order() {
        let mut transcript = memory();
        let expected: Vec<Message> = (0..25)
            .map(|i| {
                let sender = if i % 3 == 0 { Sender::Bot } else { Sender::User };
                Message::new(sender, format!("message {i}"))
            })
            .collect();
        for msg in &expected {
            transcript.append(msg.sender, &msg.text).unwrap();
        }
        assert_eq!(transcript.load().unwrap(), expected);
    }

    #[test]
    fn test_no_dedup() {
        let mut transcript = memory();
        transcript.append(Sender::User, "same").unwrap();
        let history = transcript.append(Sender::User, "same").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], history[1]);
    }

    #[test]
    fn test_append_returns_full_history() {
        let mut transcript = memory();
        transcript.append(Sender::User, "one").unwrap();
        let history = transcript.append(Sender::Bot, "").unwrap();
        assert_eq!(history, transcript.load().unwrap());
        assert_eq!(history[1], Message::new(Sender::Bot, ""));
    }

    #[test]
    fn test_absent_is_empty() {
        assert!(memory().load().unwrap().is_empty());
    }

    #[test]
    fn test_null_is_empty() {
        let transcript = LocalTranscript::new(MemoryStorage::with_item(HISTORY_KEY, "null"));
        assert!(transcript.load().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_fails() {
        for raw in ["{not json", "{}", "42", r#"[{"sender":"user"}]"#] {
            let transcript = LocalTranscript::new(MemoryStorage::with_item(HISTORY_KEY, raw));
            assert!(transcript.load().is_err(), "{raw} should not load");
        }
    }

    #[test]
    fn test_append_on_malformed_keeps_content() {
        let mut transcript =
            LocalTranscript::new(MemoryStorage::with_item(HISTORY_KEY, "[oops"));
        assert!(transcript.append(Sender::User, "hello").is_err());
        assert_eq!(
            transcript.storage().get_item(HISTORY_KEY).unwrap().as_deref(),
            Some("[oops")
        );
    }

    #[test]
    fn test_file_backed_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let mut transcript = LocalTranscript::new(FileStorage::new(dir.path()));
        transcript.append(Sender::User, "line one\nline two").unwrap();

        let reopened = LocalTranscript::new(FileStorage::new(dir.path()));
        assert_eq!(
            reopened.load().unwrap(),
            vec![Message::new(Sender::User, "line one\nline two")]
        );
    }
}
