use crate::{CatalogError, InMemoryCatalog};
use embedding::Embedder;
use simgraph_core::model::{Item, ItemSource};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tokio::task::JoinSet;
use tracing::{debug, info};

/// Items with precomputed embeddings, persisted as a JSON array of
/// `{name, tags, description, embedding}` records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddingCache {
    items: Vec<Item>,
}

impl EmbeddingCache {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    /// A missing file yields an empty cache; a malformed one is an error.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        if !fs::try_exists(path).await? {
            debug!(path = %path.display(), "embedding cache not found, starting empty");
            return Ok(Self::default());
        }

        let bytes = fs::read(path).await?;
        let items: Vec<Item> = serde_json::from_slice(&bytes)?;
        info!(path = %path.display(), items = items.len(), "embedding cache loaded");
        Ok(Self { items })
    }

    /// Rewrites the whole file. Writes to a temp file then renames.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), CatalogError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !fs::try_exists(parent).await? {
                fs::create_dir_all(parent).await?;
            }
        }

        let data = serde_json::to_vec_pretty(&self.items)?;
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, data).await?;
        fs::rename(&tmp_path, path).await?;

        info!(path = %path.display(), items = self.items.len(), "embedding cache written");
        Ok(())
    }

    /// Embeds every source whose name is not cached yet and appends the
    /// results in source order. Requests run concurrently within a batch of
    /// `batch_size`; batches run one after another. Returns how many items
    /// were added. Batches finished before a failure stay in the cache.
    pub async fn refresh(
        &mut self,
        sources: &[ItemSource],
        embedder: Arc<dyn Embedder>,
        batch_size: usize,
    ) -> Result<usize, CatalogError> {
        let mut seen: HashSet<&str> = self.items.iter().map(|item| item.name.as_str()).collect();
        let missing: Vec<ItemSource> = sources
            .iter()
            .filter(|source| seen.insert(source.name.as_str()))
            .cloned()
            .collect();

        if missing.is_empty() {
            debug!("embedding cache is up to date");
            return Ok(0);
        }

        let batch_size = batch_size.max(1);
        let mut added = 0;
        for (batch_no, batch) in missing.chunks(batch_size).enumerate() {
            debug!(batch = batch_no, size = batch.len(), "embedding batch");
            let embedded = embed_batch(batch, &embedder).await?;
            added += embedded.len();
            self.items.extend(embedded);
        }

        info!(added, total = self.items.len(), "embedding cache refreshed");
        Ok(added)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.iter().any(|item| item.name == name)
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_catalog(self) -> Result<InMemoryCatalog, CatalogError> {
        InMemoryCatalog::new(self.items)
    }
}

async fn embed_batch(
    batch: &[ItemSource],
    embedder: &Arc<dyn Embedder>,
) -> Result<Vec<Item>, CatalogError> {
    let mut tasks = JoinSet::new();
    for (idx, source) in batch.iter().enumerate() {
        let embedder = Arc::clone(embedder);
        let input = source.embedding_input();
        tasks.spawn(async move { (idx, embedder.embed(&input).await) });
    }

    let mut results: Vec<Option<Vec<f64>>> = vec![None; batch.len()];
    while let Some(joined) = tasks.join_next().await {
        let (idx, result) = joined.map_err(|err| CatalogError::Task(err.to_string()))?;
        let embedding = result.map_err(|source| CatalogError::Embedding {
            name: batch[idx].name.clone(),
            source,
        })?;
        results[idx] = Some(embedding);
    }

    batch
        .iter()
        .cloned()
        .zip(results)
        .map(|(source, embedding)| match embedding {
            Some(embedding) => Ok(source.with_embedding(embedding)),
            None => Err(CatalogError::Task(format!("no result for {}", source.name))),
        })
        .collect()
}

/// Loads the raw catalog: a JSON array of `{name, tags, description}`.
pub async fn load_sources(path: impl AsRef<Path>) -> Result<Vec<ItemSource>, CatalogError> {
    let bytes = fs::read(path.as_ref()).await?;
    Ok(serde_json::from_slice(&bytes)?)
}
