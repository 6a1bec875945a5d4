use crate::builder::NetworkBuilder;
use catalog::CatalogStore;
use embedding::{Embedder, EmbeddingError};
use simgraph_core::error::{ErrorCode, SimgraphError};
use simgraph_core::metrics::{MetricsCollector, MetricsSnapshot};
use simgraph_core::model::{Graph, GraphNode, QUERY_NODE_ID};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("query embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error("query embedding has {actual} dimensions, catalog has {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl SimgraphError for SearchError {
    fn error_code(&self) -> ErrorCode {
        match self {
            SearchError::Embedding(err) => err.error_code(),
            SearchError::DimensionMismatch { .. } => ErrorCode::Internal,
        }
    }
}

/// Entry point of a search: embeds the query, expands it against the
/// catalog and returns the finished graph with the query node first.
///
/// Holds no per-search state, so one assembler can serve concurrent
/// searches.
pub struct GraphAssembler {
    catalog: Arc<dyn CatalogStore>,
    embedder: Arc<dyn Embedder>,
    builder: NetworkBuilder,
    metrics: MetricsCollector,
}

impl GraphAssembler {
    pub fn new(catalog: Arc<dyn CatalogStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            catalog,
            embedder,
            builder: NetworkBuilder::default(),
            metrics: MetricsCollector::default(),
        }
    }

    pub fn with_builder(mut self, builder: NetworkBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn builder(&self) -> &NetworkBuilder {
        &self.builder
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn metrics_collector(&self) -> MetricsCollector {
        self.metrics.clone()
    }

    /// Never fails: any search error is logged and yields an empty graph,
    /// which renders as a neutral "no results" state.
    pub async fn build_graph(&self, query: &str) -> Graph {
        if is_blank(query) {
            debug!("blank query, search skipped");
            return Graph::empty();
        }

        let start = Instant::now();
        match self.try_build_graph(query).await {
            Ok(graph) => {
                let latency_us = start.elapsed().as_micros() as u64;
                self.metrics.record_search(latency_us, graph.nodes.len());
                info!(
                    query,
                    nodes = graph.nodes.len(),
                    links = graph.links.len(),
                    latency_us,
                    "search completed"
                );
                graph
            }
            Err(err) => {
                self.metrics
                    .record_failure(start.elapsed().as_micros() as u64);
                error!(query, error = %err, code = %err.error_code(), "search failed");
                Graph::empty()
            }
        }
    }

    /// Same as [`GraphAssembler::build_graph`] but surfaces the failure.
    pub async fn try_build_graph(&self, query: &str) -> Result<Graph, SearchError> {
        if is_blank(query) {
            return Ok(Graph::empty());
        }

        let query_embedding = self.embedder.embed(query).await?;
        if let Some(expected) = self.catalog.dimension() {
            if expected != query_embedding.len() {
                return Err(SearchError::DimensionMismatch {
                    expected,
                    actual: query_embedding.len(),
                });
            }
        }

        let excluded_labels = HashSet::from([query.to_string()]);
        let mut visited = HashSet::new();
        let network = self.builder.expand(
            self.catalog.items(),
            QUERY_NODE_ID,
            &query_embedding,
            &excluded_labels,
            0,
            &mut visited,
        );

        let mut nodes = Vec::with_capacity(network.nodes.len() + 1);
        nodes.push(GraphNode::query(query));
        nodes.extend(network.nodes);
        let graph = Graph {
            nodes,
            links: network.links,
        };

        if let Err(err) = graph.verify() {
            warn!(query, error = %err, "assembled graph is not a tree");
        }

        Ok(graph)
    }
}

fn is_blank(query: &str) -> bool {
    query.trim().is_empty()
}
