mod backend;
mod bot;
mod speech;
mod storage;
mod transcript;
mod types;

pub use backend::{Backend, Pending, Request};
pub use bot::{Bot, LocalBot};
pub use speech::{CommandLine, Recognizer, Speaker, Utterance};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use transcript::{LocalTranscript, TranscriptStore, HISTORY_KEY};
pub use types::{Message, Sender};
