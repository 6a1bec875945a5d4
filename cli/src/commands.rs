use std::sync::Arc;

use anyhow::{Context, Result};
use catalog::{load_sources, EmbeddingCache};
use embedding::{DeterministicEmbedder, Embedder, OpenAiEmbedder};
use query::{GraphAssembler, NetworkBuilder};
use simgraph_core::config::{AppConfig, EmbeddingConfig};
use simgraph_core::model::Graph;
use tracing::{debug, warn};

pub fn embedder(config: &EmbeddingConfig, offline: bool) -> Result<Arc<dyn Embedder>> {
    if offline {
        debug!(dims = config.dims, "using deterministic embedder");
        return Ok(Arc::new(DeterministicEmbedder::new(config.dims)));
    }

    let embedder = OpenAiEmbedder::from_config(config)
        .context("hosted embedder is not configured, pass --offline to run without it")?;
    debug!(endpoint = embedder.endpoint(), model = %config.model, "using hosted embedder");
    Ok(Arc::new(embedder))
}

pub async fn search(config: &AppConfig, embedder: Arc<dyn Embedder>, query: &str) -> Result<Graph> {
    let cache_path = &config.catalog.cache_path;
    let cache = EmbeddingCache::load(cache_path)
        .await
        .with_context(|| format!("failed to load embedding cache {cache_path}"))?;
    if cache.is_empty() {
        warn!(path = %cache_path, "embedding cache is empty, run `simgraph embed-catalog` first");
    }

    let catalog = cache
        .into_catalog()
        .with_context(|| format!("embedding cache {cache_path} is not a valid catalog"))?;
    let builder =
        NetworkBuilder::from_config(&config.builder).context("invalid builder configuration")?;

    let assembler = GraphAssembler::new(Arc::new(catalog), embedder).with_builder(builder);
    Ok(assembler.build_graph(query).await)
}

/// Returns the number of items embedded by this run. Progress made before a
/// provider failure is still written out.
pub async fn embed_catalog(config: &AppConfig, embedder: Arc<dyn Embedder>) -> Result<usize> {
    let catalog = &config.catalog;
    let sources = load_sources(&catalog.source_path)
        .await
        .with_context(|| format!("failed to read source catalog {}", catalog.source_path))?;
    let mut cache = EmbeddingCache::load(&catalog.cache_path)
        .await
        .with_context(|| format!("failed to load embedding cache {}", catalog.cache_path))?;

    let before = cache.len();
    let refreshed = cache.refresh(&sources, embedder, catalog.batch_size).await;
    if cache.len() > before {
        cache
            .save(&catalog.cache_path)
            .await
            .with_context(|| format!("failed to write embedding cache {}", catalog.cache_path))?;
    }

    refreshed.context("failed to embed catalog")
}

#[cfg(test)]
mod tests {
    use super::*;
    use simgraph_core::model::QUERY_NODE_ID;
    use std::path::Path;

    const DIMS: usize = 8;

    fn config_in(dir: &Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.catalog.source_path = dir.join("suggestions.json").display().to_string();
        config.catalog.cache_path = dir
            .join("data")
            .join("suggestions-with-embeddings.json")
            .display()
            .to_string();
        config.embedding.dims = DIMS;
        config.builder.thresholds = vec![0.0];
        config
    }

    fn write_sources(config: &AppConfig) {
        std::fs::write(
            &config.catalog.source_path,
            r#"[
                {"name": "Chess Club", "tags": ["board", "strategy"], "description": "Weekly tournaments"},
                {"name": "Go Club", "tags": ["board"], "description": "Nine stones handicap games"},
                {"name": "Hiking Group", "tags": ["outdoor"], "description": "Weekend trails"}
            ]"#,
        )
        .unwrap();
    }

    #[tokio::test]
    async fn embed_catalog_only_embeds_new_items() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        write_sources(&config);
        let embedder = embedder(&config.embedding, true).unwrap();

        let added = embed_catalog(&config, embedder.clone()).await.unwrap();
        assert_eq!(added, 3);
        assert!(Path::new(&config.catalog.cache_path).exists());

        let added = embed_catalog(&config, embedder).await.unwrap();
        assert_eq!(added, 0);
    }

    #[tokio::test]
    async fn offline_search_builds_a_tree_from_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        write_sources(&config);
        let embedder = embedder(&config.embedding, true).unwrap();
        embed_catalog(&config, embedder.clone()).await.unwrap();

        let graph = search(&config, embedder, "Chess Club").await.unwrap();

        assert_eq!(graph.nodes[0].id, QUERY_NODE_ID);
        assert_eq!(graph.nodes[0].label, "Chess Club");
        assert_eq!(graph.verify(), Ok(()));
        assert!(graph
            .nodes
            .iter()
            .all(|node| node.name.as_deref() != Some("Chess Club")));
    }

    #[tokio::test]
    async fn search_without_cache_returns_only_the_query() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let embedder = embedder(&config.embedding, true).unwrap();

        let graph = search(&config, embedder, "anything").await.unwrap();

        assert_eq!(graph.nodes.len(), 1);
        assert!(graph.links.is_empty());
    }

    #[tokio::test]
    async fn invalid_builder_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.builder.thresholds = vec![0.5, 0.9];
        let embedder = embedder(&config.embedding, true).unwrap();

        assert!(search(&config, embedder, "anything").await.is_err());
    }

    #[test]
    fn hosted_embedder_requires_an_api_key() {
        let config = EmbeddingConfig {
            api_key_env: "SIMGRAPH_TEST_UNSET_API_KEY".to_string(),
            ..EmbeddingConfig::default()
        };
        assert!(embedder(&config, false).is_err());
    }
}
