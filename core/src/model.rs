use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use thiserror::Error;

/// Id of the synthetic node standing for the search text.
pub const QUERY_NODE_ID: &str = "query";

/// A catalog entry before its embedding has been computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSource {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: String,
}

impl ItemSource {
    /// Text sent to the embedding model for this item.
    pub fn embedding_input(&self) -> String {
        format!("{} {} {}", self.name, self.tags.join(" "), self.description)
    }

    pub fn with_embedding(self, embedding: Vec<f64>) -> Item {
        Item {
            name: self.name,
            tags: self.tags,
            description: self.description,
            embedding,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: String,
    pub embedding: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
}

impl GraphNode {
    pub fn query(text: impl Into<String>) -> Self {
        Self {
            id: QUERY_NODE_ID.to_string(),
            label: text.into(),
            name: None,
            depth: None,
            similarity: None,
        }
    }

    /// Node for a catalog item discovered at `depth` below its parent.
    pub fn item(name: &str, depth: u8, similarity: f64) -> Self {
        Self {
            id: Self::item_id(name, depth),
            label: format!("{} (Rank: {})", name, u16::from(depth) + 1),
            name: Some(name.to_string()),
            depth: Some(depth),
            similarity: Some(similarity),
        }
    }

    pub fn item_id(name: &str, depth: u8) -> String {
        format!("{}-{}", name, depth)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
    pub value: f64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphInvariantError {
    #[error("first node must be the query node")]
    RootNotFirst,
    #[error("links present without nodes")]
    LinksWithoutNodes,
    #[error("duplicate node id: {0}")]
    DuplicateNode(String),
    #[error("link {from} -> {to} references a missing node")]
    DanglingLink { from: String, to: String },
    #[error("query node has an incoming link from {0}")]
    RootHasParent(String),
    #[error("node {0} has more than one parent")]
    MultipleParents(String),
    #[error("node {0} is not reachable from the query node")]
    Unreachable(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

impl Graph {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.links.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Outgoing links of `id`, in discovery order.
    pub fn children(&self, id: &str) -> Vec<&GraphLink> {
        self.links.iter().filter(|link| link.source == id).collect()
    }

    /// Checks that the graph is a tree rooted at the query node.
    pub fn verify(&self) -> Result<(), GraphInvariantError> {
        let Some(root) = self.nodes.first() else {
            if self.links.is_empty() {
                return Ok(());
            }
            return Err(GraphInvariantError::LinksWithoutNodes);
        };
        if root.id != QUERY_NODE_ID {
            return Err(GraphInvariantError::RootNotFirst);
        }

        let mut ids = HashSet::new();
        for node in &self.nodes {
            if !ids.insert(node.id.as_str()) {
                return Err(GraphInvariantError::DuplicateNode(node.id.clone()));
            }
        }

        let mut parents: HashMap<&str, &str> = HashMap::new();
        let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
        for link in &self.links {
            if !ids.contains(link.source.as_str()) || !ids.contains(link.target.as_str()) {
                return Err(GraphInvariantError::DanglingLink {
                    from: link.source.clone(),
                    to: link.target.clone(),
                });
            }
            if link.target == QUERY_NODE_ID {
                return Err(GraphInvariantError::RootHasParent(link.source.clone()));
            }
            if parents
                .insert(link.target.as_str(), link.source.as_str())
                .is_some()
            {
                return Err(GraphInvariantError::MultipleParents(link.target.clone()));
            }
            adjacency
                .entry(link.source.as_str())
                .or_default()
                .push(link.target.as_str());
        }

        let mut reached = HashSet::from([QUERY_NODE_ID]);
        let mut queue = VecDeque::from([QUERY_NODE_ID]);
        while let Some(current) = queue.pop_front() {
            for &next in adjacency.get(current).into_iter().flatten() {
                if reached.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        match self.nodes.iter().find(|node| !reached.contains(node.id.as_str())) {
            Some(node) => Err(GraphInvariantError::Unreachable(node.id.clone())),
            None => Ok(()),
        }
    }
}
