use crate::{BoxFuture, Embedder, EmbeddingError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use simgraph_core::config::EmbeddingConfig;
use std::time::Duration;
use tracing::debug;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f64>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

/// Client for an OpenAI-compatible `/embeddings` endpoint.
///
/// One request per call, no retries: a failed request surfaces as an
/// [`EmbeddingError`] and the caller decides what a failed search means.
pub struct OpenAiEmbedder {
    http: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl OpenAiEmbedder {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    /// Reads the API key from the environment variable named in the config.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| EmbeddingError::MissingApiKey(config.api_key_env.clone()))?;

        Self::new(
            &config.base_url,
            config.model.clone(),
            api_key,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn request(&self, text: &str) -> Result<Vec<f64>, EmbeddingError> {
        if text.is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EmbeddingError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = resp.bytes().await?;
        let embedding = parse_embedding_response(&bytes)?;
        debug!(model = %self.model, dims = embedding.len(), "embedding received");
        Ok(embedding)
    }
}

impl Embedder for OpenAiEmbedder {
    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f64>, EmbeddingError>> {
        Box::pin(self.request(text))
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

pub(crate) fn parse_embedding_response(bytes: &[u8]) -> Result<Vec<f64>, EmbeddingError> {
    let parsed: EmbeddingResponse = serde_json::from_slice(bytes)
        .map_err(|err| EmbeddingError::MalformedResponse(err.to_string()))?;

    let embedding = parsed
        .data
        .into_iter()
        .next()
        .ok_or_else(|| EmbeddingError::MalformedResponse("no embedding in response".into()))?
        .embedding;

    if embedding.is_empty() {
        return Err(EmbeddingError::MalformedResponse("empty embedding".into()));
    }
    Ok(embedding)
}
