pub mod gemini;
pub mod sse;

use futures::stream::BoxStream;
use thiserror::Error;

use crate::prompt::GenerationRequest;

pub use gemini::GeminiClient;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("No API key configured. Set GEMINI_API_KEY or api_key in config.toml")]
    MissingApiKey,
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Response blocked by the model ({0})")]
    Blocked(String),
    #[error("Malformed stream event: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Text fragments in arrival order; ends after the first error
pub type FragmentStream = BoxStream<'static, Result<String, ClientError>>;

/// Anything that can turn a request into a stream of text fragments
pub trait Generator: Send + Sync {
    fn stream(&self, request: GenerationRequest) -> FragmentStream;
}
