//! Model inference provider trait for Octavia.
#![allow(dead_code)]

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not available: {0}")]
    NotAvailable(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Media upload still processing after {0} poll attempts")]
    UploadTimeout(u32),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ProviderError>;

impl ProviderError {
    pub fn other(s: impl Into<String>) -> Self {
        ProviderError::Other(s.into())
    }
}

/// One user input for a single assistant turn.
#[derive(Debug, Clone)]
pub enum UserInput {
    Text(String),
    Image { bytes: Vec<u8>, mime: String },
    Audio { bytes: Vec<u8>, mime: String },
}

/// Inference provider trait.
#[async_trait]
pub trait Inference: Send + Sync {
    /// Provider name.
    fn name(&self) -> &str;

    /// Check if the provider is configured.
    async fn is_available(&self) -> bool;

    /// Run one inference turn: persona prompt plus the user's input,
    /// returning the model's raw text (which may embed an intent envelope).
    async fn infer(&self, persona: &str, input: &UserInput) -> Result<String>;
}
