use anyhow::{bail, Result};
use tracing::info;

use super::backend::{Backend, Pending, Request};
use super::storage::FileStorage;
use super::transcript::{LocalTranscript, TranscriptStore};
use super::types::{Message, Sender};
use crate::config::Config;

/// One chat session: every request and reply goes through the transcript.
///
/// At most one request waits on the backend at a time.
pub struct Bot<T> {
    transcript: T,
    backend: Backend,
    waiting: bool,
}

pub type LocalBot = Bot<LocalTranscript<FileStorage>>;

impl LocalBot {
    pub fn from_config(config: &Config) -> LocalBot {
        info!(history = %config.history_dir.display(), api = %config.api_url, "New chat session");
        Bot::new(
            LocalTranscript::new(FileStorage::new(&config.history_dir)),
            Backend::new(&config.api_url, &config.language),
        )
    }
}

impl<T: TranscriptStore> Bot<T> {
    pub fn new(transcript: T, backend: Backend) -> Bot<T> {
        Bot {
            transcript,
            backend,
            waiting: false,
        }
    }

    pub fn transcript(&self) -> &T {
        &self.transcript
    }

    /// True between a successful `ask` and the matching `record_reply`.
    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    pub fn history(&self) -> Result<Vec<Message>> {
        self.transcript.load()
    }

    /// Records the user's side of `request`.
    ///
    /// Returns the exchange still waiting on the backend together with the
    /// updated transcript, or `None` without recording anything while an
    /// earlier reply is still pending.
    pub fn ask(&mut self, request: Request) -> Result<Option<(Pending, Vec<Message>)>> {
        if self.waiting {
            return Ok(None);
        }
        let history = self.transcript.append(Sender::User, &request.user_text())?;
        self.waiting = true;
        Ok(Some((Pending::new(self.backend.clone(), request), history)))
    }

    pub fn record_reply(&mut self, reply: &str) -> Result<Vec<Message>> {
        self.waiting = false;
        self.transcript.append(Sender::Bot, reply)
    }

    pub async fn chat(&mut self, request: Request) -> Result<String> {
        let Some((pending, _)) = self.ask(request)? else {
            bail!("A reply is still pending")
        };
        let reply = pending.resolve().await;
        self.record_reply(&reply)?;
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat_core::storage::{MemoryStorage, Storage};
    use crate::chat_core::transcript::HISTORY_KEY;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn bot(api_url: &str) -> Bot<LocalTranscript<MemoryStorage>> {
        Bot::new(
            LocalTranscript::new(MemoryStorage::new()),
            Backend::new(api_url, "en"),
        )
    }

    #[tokio::test]
    async fn test_chat_records_both_sides() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "answer": "hi there" })))
            .mount(&server)
            .await;

        let mut bot = bot(&server.uri());
        let reply = bot.chat(Request::Text("hello".into())).await.unwrap();
        assert_eq!(reply, "hi there");
        assert_eq!(
            bot.history().unwrap(),
            vec![
                Message::new(Sender::User, "hello"),
                Message::new(Sender::Bot, "hi there"),
            ]
        );
    }

    #[tokio::test]
    async fn test_chat_failure_is_recorded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "rainfall").unwrap();

        let mut bot = bot(&server.uri());
        let reply = bot.chat(Request::File(file)).await.unwrap();
        assert_eq!(reply, "⚠️ Error: Could not upload the file.");
        assert_eq!(
            bot.history().unwrap(),
            vec![
                Message::new(Sender::User, "[📂 File uploaded: notes.txt]"),
                Message::new(Sender::Bot, "⚠️ Error: Could not upload the file."),
            ]
        );
    }

    #[test]
    fn test_ask_records_before_reply() {
        let mut bot = bot("http://127.0.0.1:9");
        let (pending, history) = bot
            .ask(Request::Text("is it raining?".into()))
            .unwrap()
            .expect("nothing pending yet");
        assert_eq!(pending.request(), &Request::Text("is it raining?".into()));
        assert_eq!(history, vec![Message::new(Sender::User, "is it raining?")]);

        let history = bot.record_reply("yes").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1], Message::new(Sender::Bot, "yes"));
    }

    #[test]
    fn test_one_request_at_a_time() {
        let mut bot = bot("http://127.0.0.1:9");
        assert!(!bot.is_waiting());

        let first = bot.ask(Request::Text("first".into())).unwrap();
        assert!(first.is_some());
        assert!(bot.is_waiting());

        // Refused while the first reply is outstanding, and not recorded.
        assert!(bot.ask(Request::Text("second".into())).unwrap().is_none());
        assert_eq!(bot.history().unwrap(), vec![Message::new(Sender::User, "first")]);

        bot.record_reply("done").unwrap();
        assert!(!bot.is_waiting());
        assert!(bot.ask(Request::Text("third".into())).unwrap().is_some());
        assert_eq!(bot.history().unwrap().len(), 3);
    }

    #[test]
    fn test_ask_on_corrupt_history() {
        let mut bot = Bot::new(
            LocalTranscript::new(MemoryStorage::with_item(HISTORY_KEY, "not json")),
            Backend::new("http://127.0.0.1:9", "en"),
        );
        assert!(bot.history().is_err());
        assert!(bot.ask(Request::Text("hello".into())).is_err());
        assert!(!bot.is_waiting());
        assert_eq!(
            bot.transcript().storage().get_item(HISTORY_KEY).unwrap().as_deref(),
            Some("not json")
        );
    }
}
