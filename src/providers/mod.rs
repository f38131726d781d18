//! Model inference providers.

use std::sync::Arc;

pub mod gemini;
pub mod provider;

pub use provider::{Inference, ProviderError, Result, UserInput};

use crate::config::Settings;
use crate::error::Error;

/// Build the configured inference provider.
///
/// The inference key is the one credential whose absence is fatal: without
/// it no turn can be interpreted at all.
pub fn create_provider(settings: &Settings) -> crate::error::Result<Arc<dyn Inference>> {
    let api_key = settings.gemini_api_key().ok_or_else(|| {
        Error::Config("GEMINI_API_KEY not set (env or settings.gemini.api_key)".to_string())
    })?;

    Ok(Arc::new(gemini::GeminiProvider::new(api_key, settings)))
}
