//! Hierarchical topic memory.
//!
//! A [`Forest`] is an ordered list of [`Tree`]s. Each tree owns its [`Node`]s in
//! a flat id-indexed map with weak parent ids, so subtrees can be detached and
//! removed without reference cycles. Total size is bounded by [`Forest::prune`].

mod eviction;
mod node;
mod tree;

pub use eviction::EvictionReport;
pub use node::{new_id, Node};
pub use tree::Tree;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Forest-level bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    /// Prompts processed since the forest was created.
    pub total_prompts: u64,
    /// When the forest was created.
    pub created: DateTime<Utc>,
    /// Last structural change.
    pub last_update: DateTime<Utc>,
}

impl Default for Meta {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            total_prompts: 0,
            created: now,
            last_update: now,
        }
    }
}

/// The whole topic memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Forest {
    /// Trees in creation order.
    #[serde(default)]
    pub trees: Vec<Tree>,
    /// Running counters and timestamps.
    #[serde(default)]
    pub meta: Meta,
}

impl Forest {
    /// Create an empty forest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total nodes across all trees.
    pub fn node_count(&self) -> usize {
        self.trees.iter().map(Tree::node_count).sum()
    }

    /// True when the forest holds no trees.
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Append a tree and return its index.
    pub fn add_tree(&mut self, tree: Tree) -> usize {
        self.meta.last_update = tree.last_accessed;
        self.trees.push(tree);
        self.trees.len() - 1
    }

    /// Remove the tree at `idx`; out-of-range indices are ignored.
    pub fn remove_tree(&mut self, idx: usize) -> Option<Tree> {
        if idx >= self.trees.len() {
            return None;
        }
        self.meta.last_update = Utc::now();
        Some(self.trees.remove(idx))
    }

    /// Index of the tree with the given id.
    pub fn tree_index(&self, id: &str) -> Option<usize> {
        self.trees.iter().position(|t| t.id == id)
    }

    /// Tree with the given id.
    pub fn tree(&self, id: &str) -> Option<&Tree> {
        self.trees.iter().find(|t| t.id == id)
    }

    /// Whether any tree holds a node with this id.
    pub fn contains_node(&self, node_id: &str) -> bool {
        self.trees.iter().any(|t| t.nodes.contains_key(node_id))
    }

    /// The most recently inserted leaf of the last tree, used to link guide entries.
    pub fn latest_leaf_id(&self) -> Option<&str> {
        let tree = self.trees.last()?;
        tree.leaves()
            .into_iter()
            .max_by_key(|n| n.created)
            .map(|n| n.id.as_str())
    }
}
