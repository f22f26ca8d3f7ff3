use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

#[derive(Deserialize)]
struct ChatAnswer {
    answer: String,
}

#[derive(Deserialize)]
struct DiseaseReport {
    disease_report: String,
}

#[derive(Deserialize)]
struct UploadReceipt {
    message: String,
}

/// Client for the farming-assistant HTTP backend.
#[derive(Debug, Clone)]
pub struct Backend {
    client: reqwest::Client,
    api_url: String,
    language: String,
}

impl Backend {
    pub fn new(api_url: impl Into<String>, language: impl Into<String>) -> Backend {
        Backend {
            client: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            language: language.into(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub async fn chat(&self, message: &str) -> Result<String> {
        debug!(url = %self.api_url, "POST /chat");
        let reply: ChatAnswer = self
            .client
            .post(format!("{}/chat", self.api_url))
            .json(&json!({ "message": message, "language": self.language }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(reply.answer)
    }

    /// Sends a crop image for disease diagnosis.
    pub async fn diagnose(&self, image: &Path) -> Result<String> {
        let reply: DiseaseReport = self.post_file("diagnose", image).await?;
        Ok(reply.disease_report)
    }

    pub async fn upload(&self, file: &Path) -> Result<String> {
        let reply: UploadReceipt = self.post_file("upload", file).await?;
        Ok(reply.message)
    }

    async fn post_file<R: DeserializeOwned>(&self, route: &str, path: &Path) -> Result<R> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        let part = Part::bytes(bytes)
            .file_name(file_name(path))
            .mime_str(mime.essence_str())?;

        debug!(url = %self.api_url, route, file = %path.display(), "POST multipart");
        let reply = self
            .client
            .post(format!("{}/{route}", self.api_url))
            .multipart(Form::new().part("file", part))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(reply)
    }
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Something the user sends to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Text(String),
    Image(PathBuf),
    File(PathBuf),
}

impl Request {
    /// Trimmed text request; `None` when there is nothing to send.
    pub fn text(draft: &str) -> Option<Request> {
        let text = draft.trim();
        if text.is_empty() {
            None
        } else {
            Some(Request::Text(text.to_string()))
        }
    }

    pub fn image(path: &str) -> Option<Request> {
        attachment(path).map(Request::Image)
    }

    pub fn file(path: &str) -> Option<Request> {
        attachment(path).map(Request::File)
    }

    /// What the transcript records on the user's side.
    pub fn user_text(&self) -> String {
        match self {
            Request::Text(text) => text.clone(),
            Request::Image(_) => "[📷 Image uploaded]".to_string(),
            Request::File(path) => format!("[📂 File uploaded: {}]", file_name(path)),
        }
    }

    /// Fixed reply shown when the backend can't be reached.
    pub fn failure_text(&self) -> &'static str {
        match self {
            Request::Text(_) => "⚠️ Error: Cannot connect to server.",
            Request::Image(_) => "⚠️ Error: Could not process the image.",
            Request::File(_) => "⚠️ Error: Could not upload the file.",
        }
    }

    pub async fn send(&self, backend: &Backend) -> Result<String> {
        match self {
            Request::Text(text) => backend.chat(text).await,
            Request::Image(path) => backend.diagnose(path).await,
            Request::File(path) => backend.upload(path).await,
        }
    }
}

fn attachment(path: &str) -> Option<PathBuf> {
    let path = path.trim();
    (!path.is_empty()).then(|| PathBuf::from(path))
}

/// A request already recorded in the transcript, waiting for its reply.
#[derive(Debug)]
pub struct Pending {
    backend: Backend,
    request: Request,
}

impl Pending {
    pub fn new(backend: Backend, request: Request) -> Pending {
        Pending { backend, request }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// The reply text, or the request's fixed failure text. Never retried.
    pub async fn resolve(self) -> String {
        match self.request.send(&self.backend).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!("Backend request failed: {:#}", err);
                self.request.failure_text().to_string()
            }
        }
    }
}
