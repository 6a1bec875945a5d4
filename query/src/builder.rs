//! Depth-bounded recursive expansion of a similarity network.
//!
//! Starting from a parent embedding, every catalog item not excluded on the
//! current path is scored with cosine similarity. Items above the depth's
//! threshold that were not already accepted elsewhere in the traversal are
//! ranked, the best `max_links_per_node` become children, and each child is
//! expanded in turn one level deeper.

use crate::thresholds::{ThresholdError, ThresholdTable};
use simgraph_core::config::BuilderConfig;
use simgraph_core::model::{GraphLink, GraphNode, Item};
use simgraph_core::similarity::cosine_similarity;
use std::cmp::Ordering;
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_MAX_LINKS_PER_NODE: usize = 3;
pub const DEFAULT_MAX_LEVELS: u8 = 3;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BuilderConfigError {
    #[error("invalid thresholds: {0}")]
    Thresholds(#[from] ThresholdError),
    #[error("max_links_per_node must be at least 1")]
    InvalidMaxLinks,
    #[error("max_levels must be at least 1")]
    InvalidMaxLevels,
}

/// Nodes and links produced by one expansion, in discovery order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Network {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

impl Network {
    fn append(&mut self, other: Network) {
        self.nodes.extend(other.nodes);
        self.links.extend(other.links);
    }
}

struct Candidate<'c> {
    item: &'c Item,
    id: String,
    similarity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkBuilder {
    thresholds: ThresholdTable,
    max_links_per_node: usize,
    max_levels: u8,
}

impl NetworkBuilder {
    pub fn new(thresholds: ThresholdTable) -> Self {
        Self {
            thresholds,
            max_links_per_node: DEFAULT_MAX_LINKS_PER_NODE,
            max_levels: DEFAULT_MAX_LEVELS,
        }
    }

    pub fn from_config(config: &BuilderConfig) -> Result<Self, BuilderConfigError> {
        if config.max_links_per_node == 0 {
            return Err(BuilderConfigError::InvalidMaxLinks);
        }
        if config.max_levels == 0 {
            return Err(BuilderConfigError::InvalidMaxLevels);
        }
        let thresholds = ThresholdTable::new(config.thresholds.clone())?;
        Ok(Self::new(thresholds)
            .with_max_links_per_node(config.max_links_per_node)
            .with_max_levels(config.max_levels))
    }

    pub fn with_max_links_per_node(mut self, max_links_per_node: usize) -> Self {
        self.max_links_per_node = max_links_per_node;
        self
    }

    /// Number of levels below the query node that get expanded.
    pub fn with_max_levels(mut self, max_levels: u8) -> Self {
        self.max_levels = max_levels;
        self
    }

    pub fn thresholds(&self) -> &ThresholdTable {
        &self.thresholds
    }

    pub fn max_links_per_node(&self) -> usize {
        self.max_links_per_node
    }

    pub fn max_levels(&self) -> u8 {
        self.max_levels
    }

    /// Expands `parent_id` against `items`.
    ///
    /// `excluded_labels` holds the query text and every item name on the path
    /// from the root to the parent; each child's sub-branch gets its own copy
    /// extended with the child's name. `visited` holds the ids accepted
    /// anywhere in this traversal and is shared by all branches, so an id is
    /// accepted at most once per search.
    pub fn expand(
        &self,
        items: &[Item],
        parent_id: &str,
        parent_embedding: &[f64],
        excluded_labels: &HashSet<String>,
        depth: u8,
        visited: &mut HashSet<String>,
    ) -> Network {
        if depth >= self.max_levels {
            return Network::default();
        }

        let threshold = self.thresholds.for_depth(depth);
        let mut candidates: Vec<Candidate<'_>> = items
            .iter()
            .filter(|item| !excluded_labels.contains(&item.name))
            .filter_map(|item| {
                let similarity = match cosine_similarity(parent_embedding, &item.embedding) {
                    Ok(similarity) => similarity,
                    Err(err) => {
                        debug!(item = %item.name, error = %err, "candidate skipped");
                        return None;
                    }
                };
                // Written as a negation so NaN scores are dropped too.
                if !(similarity > threshold) {
                    return None;
                }
                let id = GraphNode::item_id(&item.name, depth);
                if visited.contains(&id) {
                    return None;
                }
                Some(Candidate {
                    item,
                    id,
                    similarity,
                })
            })
            .collect();

        // Stable sort: equal scores keep catalog order.
        candidates.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
        });
        candidates.truncate(self.max_links_per_node);

        debug!(
            parent = parent_id,
            depth,
            threshold,
            accepted = candidates.len(),
            "level expanded"
        );

        let mut network = Network::default();
        for candidate in &candidates {
            visited.insert(candidate.id.clone());
            network.nodes.push(GraphNode::item(
                &candidate.item.name,
                depth,
                candidate.similarity,
            ));
            network.links.push(GraphLink {
                source: parent_id.to_string(),
                target: candidate.id.clone(),
                value: candidate.similarity,
            });
        }

        for candidate in &candidates {
            let mut branch_labels = excluded_labels.clone();
            branch_labels.insert(candidate.item.name.clone());
            let sub_network = self.expand(
                items,
                &candidate.id,
                &candidate.item.embedding,
                &branch_labels,
                depth + 1,
                visited,
            );
            network.append(sub_network);
        }

        network
    }
}

impl Default for NetworkBuilder {
    fn default() -> Self {
        Self::new(ThresholdTable::default())
    }
}
