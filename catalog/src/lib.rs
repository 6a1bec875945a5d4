pub mod cache;

use embedding::EmbeddingError;
use simgraph_core::error::{ErrorCode, SimgraphError};
use simgraph_core::model::Item;
use std::collections::HashSet;
use thiserror::Error;

pub use cache::{load_sources, EmbeddingCache};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate item name: {0}")]
    DuplicateName(String),
    #[error("item {0} has an empty embedding")]
    EmptyEmbedding(String),
    #[error("item {name} has {actual} dimensions, expected {expected}")]
    DimensionMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("failed to embed item {name}: {source}")]
    Embedding {
        name: String,
        #[source]
        source: EmbeddingError,
    },
    #[error("embedding task failed: {0}")]
    Task(String),
}

impl SimgraphError for CatalogError {
    fn error_code(&self) -> ErrorCode {
        match self {
            CatalogError::Io(err) if err.kind() == std::io::ErrorKind::NotFound => {
                ErrorCode::NotFound
            }
            CatalogError::Json(_)
            | CatalogError::DuplicateName(_)
            | CatalogError::EmptyEmbedding(_)
            | CatalogError::DimensionMismatch { .. } => ErrorCode::InvalidArgument,
            CatalogError::Embedding { source, .. } => source.error_code(),
            CatalogError::Io(_) | CatalogError::Task(_) => ErrorCode::Internal,
        }
    }
}

/// Read-only source of candidate items. The order of `items()` is stable for
/// the lifetime of the store and only serves as a tie-break order.
pub trait CatalogStore: Send + Sync {
    fn items(&self) -> &[Item];

    /// Shared embedding dimensionality, `None` for an empty catalog.
    fn dimension(&self) -> Option<usize> {
        self.items().first().map(|item| item.embedding.len())
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    items: Vec<Item>,
}

impl InMemoryCatalog {
    /// Validates names and embeddings; any violation is a startup error.
    pub fn new(items: Vec<Item>) -> Result<Self, CatalogError> {
        let mut names = HashSet::new();
        let mut expected = None;

        for item in &items {
            if !names.insert(item.name.as_str()) {
                return Err(CatalogError::DuplicateName(item.name.clone()));
            }
            if item.embedding.is_empty() {
                return Err(CatalogError::EmptyEmbedding(item.name.clone()));
            }
            let expected = *expected.get_or_insert(item.embedding.len());
            if item.embedding.len() != expected {
                return Err(CatalogError::DimensionMismatch {
                    name: item.name.clone(),
                    expected,
                    actual: item.embedding.len(),
                });
            }
        }

        Ok(Self { items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl CatalogStore for InMemoryCatalog {
    fn items(&self) -> &[Item] {
        &self.items
    }
}
