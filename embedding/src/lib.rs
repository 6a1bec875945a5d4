//! Text → vector boundary. The graph builder never calls an [`Embedder`];
//! only the assembler (for query text) and the catalog cache refresh do.

pub mod openai;

use simgraph_core::embedding::deterministic_embedding;
use simgraph_core::error::{ErrorCode, SimgraphError};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

pub use openai::OpenAiEmbedder;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding input must not be empty")]
    EmptyInput,
    #[error("API key environment variable {0} is not set")]
    MissingApiKey(String),
    #[error("embedding transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("embedding request failed with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed embedding response: {0}")]
    MalformedResponse(String),
    #[error("embedding provider unavailable: {0}")]
    Unavailable(String),
}

impl SimgraphError for EmbeddingError {
    fn error_code(&self) -> ErrorCode {
        match self {
            EmbeddingError::EmptyInput | EmbeddingError::MissingApiKey(_) => {
                ErrorCode::InvalidArgument
            }
            EmbeddingError::Transport(_)
            | EmbeddingError::Status { .. }
            | EmbeddingError::Unavailable(_) => ErrorCode::Unavailable,
            EmbeddingError::MalformedResponse(_) => ErrorCode::Internal,
        }
    }
}

pub trait Embedder: Send + Sync {
    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f64>, EmbeddingError>>;

    fn model_id(&self) -> &str;
}

pub struct DeterministicEmbedder {
    dims: usize,
    model_id: String,
}

impl DeterministicEmbedder {
    pub fn new(dims: usize) -> Self {
        Self::with_model(dims, "deterministic-v1")
    }

    pub fn with_model(dims: usize, model_id: impl Into<String>) -> Self {
        Self {
            dims: dims.max(1),
            model_id: model_id.into(),
        }
    }
}

impl Default for DeterministicEmbedder {
    fn default() -> Self {
        Self::new(1536)
    }
}

impl Embedder for DeterministicEmbedder {
    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f64>, EmbeddingError>> {
        Box::pin(async move {
            if text.is_empty() {
                return Err(EmbeddingError::EmptyInput);
            }
            Ok(deterministic_embedding(text, &self.model_id, self.dims))
        })
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
