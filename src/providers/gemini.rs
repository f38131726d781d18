//! Gemini HTTP provider.
//!
//! Text and images go straight into `generateContent`. Audio takes the
//! Files API route: the bytes are written to a temp file, uploaded with the
//! resumable protocol, and polled (bounded) until the file leaves the
//! PROCESSING state.
#![allow(dead_code)]

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use crate::config::Settings;

use super::provider::{Inference, ProviderError, Result, UserInput};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub struct GeminiProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    max_poll_attempts: u32,
    poll_interval: Duration,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiFile {
    name: String,
    uri: String,
    #[serde(default)]
    state: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: GeminiFile,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>, settings: &Settings) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: settings.gemini.model.clone(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_poll_attempts: settings.audio.max_poll_attempts,
            poll_interval: Duration::from_millis(settings.audio.poll_interval_ms),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// One `generateContent` call with the persona as system instruction.
    async fn generate(&self, persona: &str, parts: Vec<Value>) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let payload = json!({
            "systemInstruction": { "parts": [{ "text": persona }] },
            "contents": [{ "role": "user", "parts": parts }],
        });

        let response = self.client.post(&url).json(&payload).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError(api_error_message(status, &text)));
        }

        let v: Value = response.json().await?;
        extract_text(&v)
            .ok_or_else(|| ProviderError::ParseError("no text in model response".to_string()))
    }

    /// Resumable upload of a media file: start the session, then push the
    /// bytes and finalize in one shot.
    async fn upload_file(&self, path: &Path, mime: &str) -> Result<GeminiFile> {
        let bytes = tokio::fs::read(path).await?;

        let start_url = format!("{}/upload/v1beta/files?key={}", self.base_url, self.api_key);
        let response = self
            .client
            .post(&start_url)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime)
            .json(&json!({ "file": { "display_name": "octavia-voice-input" } }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError(api_error_message(status, &text)));
        }

        let upload_url = response
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                ProviderError::ParseError("upload session missing x-goog-upload-url".to_string())
            })?;

        let response = self
            .client
            .post(&upload_url)
            .header("X-Goog-Upload-Command", "upload, finalize")
            .header("X-Goog-Upload-Offset", "0")
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError(api_error_message(status, &text)));
        }

        let uploaded: UploadResponse = response.json().await?;
        Ok(uploaded.file)
    }

    async fn get_file(&self, name: &str) -> Result<GeminiFile> {
        let url = format!("{}/v1beta/{}?key={}", self.base_url, name, self.api_key);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError(api_error_message(status, &text)));
        }

        Ok(response.json().await?)
    }

    /// Poll until the uploaded file leaves PROCESSING, bounded by the
    /// configured attempt count.
    async fn wait_until_active(&self, mut file: GeminiFile) -> Result<GeminiFile> {
        let mut attempts = 0;
        while file.state == "PROCESSING" {
            attempts += 1;
            if attempts > self.max_poll_attempts {
                return Err(ProviderError::UploadTimeout(self.max_poll_attempts));
            }
            tokio::time::sleep(self.poll_interval).await;
            file = self.get_file(&file.name).await?;
        }

        if file.state == "FAILED" {
            return Err(ProviderError::ApiError(
                "media processing failed on the provider side".to_string(),
            ));
        }
        Ok(file)
    }

    async fn infer_audio(&self, persona: &str, bytes: &[u8], mime: &str) -> Result<String> {
        // The Files API wants a file on disk; stage the recording in a temp
        // file that cleans itself up when the turn ends.
        let mut tmp = tempfile::NamedTempFile::new()?;
        tmp.write_all(bytes)?;
        tmp.flush()?;

        let file = self.upload_file(tmp.path(), mime).await?;
        let file = self.wait_until_active(file).await?;
        tracing::debug!("Uploaded audio as {} ({})", file.name, file.state);

        self.generate(
            persona,
            vec![json!({
                "fileData": { "mimeType": mime, "fileUri": file.uri }
            })],
        )
        .await
    }
}

#[async_trait]
impl Inference for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn infer(&self, persona: &str, input: &UserInput) -> Result<String> {
        match input {
            UserInput::Text(text) => {
                self.generate(persona, vec![json!({ "text": format!("User Input: {}", text) })])
                    .await
            }
            UserInput::Image { bytes, mime } => {
                let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
                self.generate(
                    persona,
                    vec![
                        json!({ "text": "User uploaded this image:" }),
                        json!({ "inlineData": { "mimeType": mime, "data": encoded } }),
                    ],
                )
                .await
            }
            UserInput::Audio { bytes, mime } => self.infer_audio(persona, bytes, mime).await,
        }
    }
}

/// Pull the first text part out of the first candidate.
fn extract_text(v: &Value) -> Option<String> {
    v["candidates"][0]["content"]["parts"]
        .as_array()
        .and_then(|parts| parts.iter().find_map(|part| part["text"].as_str()))
        .map(str::to_string)
}

/// Prefer the API's own error message over the raw body.
fn api_error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(v) = serde_json::from_str::<Value>(body) {
        if let Some(message) = v["error"]["message"].as_str() {
            return message.to_string();
        }
    }
    format!("HTTP {}: {}", status, body)
}
