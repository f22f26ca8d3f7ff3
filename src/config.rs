use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use dotenvy::dotenv;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_url: String,
    pub language: String,
    pub listen_addr: SocketAddr,
    /// Host and port browsers use to reach the websocket.
    pub reachable_addr: String,
    pub history_dir: PathBuf,
    pub speech_command: Option<String>,
    pub recognition_command: Option<String>,
}

impl Config {
    /// Reads `.env` (if any) and then the process environment.
    pub fn from_env() -> Result<Config> {
        dotenv().ok();
        Config::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let optional = |key: &str, default: Option<&str>| {
            lookup(key)
                .or_else(|| default.map(str::to_string))
                .filter(|value| !value.trim().is_empty())
        };

        let listen = var("LISTEN_ADDR", "127.0.0.1:3030");
        let listen_addr: SocketAddr = listen
            .parse()
            .with_context(|| format!("LISTEN_ADDR is not a socket address: {listen}"))?;

        Ok(Config {
            api_url: var("API_URL", "http://127.0.0.1:8000")
                .trim_end_matches('/')
                .to_string(),
            language: var("LANGUAGE", "en"),
            reachable_addr: var("REACHABLE_ADDR", &listen),
            listen_addr,
            history_dir: PathBuf::from(var("HISTORY_DIR", ".kalpataru")),
            speech_command: optional("SPEECH_COMMAND", Some("espeak-ng -v en-in")),
            recognition_command: optional("RECOGNITION_COMMAND", None),
        })
    }
}
