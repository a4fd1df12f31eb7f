//! Decay-scored eviction under a hard node cap.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::{Forest, Node, Tree};

/// What an eviction pass removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvictionReport {
    /// Literal content of every removed indexed node, for corpus cleanup.
    pub removed_contents: Vec<String>,
    /// Ids of trees dropped entirely, for transition-chain cleanup.
    pub removed_tree_ids: Vec<String>,
}

impl EvictionReport {
    /// True when nothing was removed.
    pub fn is_empty(&self) -> bool {
        self.removed_contents.is_empty() && self.removed_tree_ids.is_empty()
    }

    fn absorb_tree(&mut self, tree: Tree) {
        self.removed_contents.extend(
            tree.nodes
                .into_values()
                .filter(|n| n.indexed)
                .map(|n| n.content),
        );
        self.removed_tree_ids.push(tree.id);
    }
}

/// A scored removal candidate. Ordered by score, then ids for a stable pop order.
#[derive(Debug, Clone, PartialEq)]
struct LeafEntry {
    score: f64,
    tree_id: String,
    node_id: String,
}

impl LeafEntry {
    fn new(tree_id: &str, node: &Node, now: DateTime<Utc>, decay_rate: f64) -> Self {
        Self {
            score: node.score(now, decay_rate),
            tree_id: tree_id.to_string(),
            node_id: node.id.clone(),
        }
    }
}

impl Eq for LeafEntry {}

impl Ord for LeafEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| self.tree_id.cmp(&other.tree_id))
            .then_with(|| self.node_id.cmp(&other.node_id))
    }
}

impl PartialOrd for LeafEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Forest {
    /// Evict until the forest holds at most `memory_size` nodes.
    ///
    /// The globally lowest-scoring non-root leaf goes first. A tree left with a
    /// single node is dropped whole. When no non-root leaf exists anywhere the
    /// tree with the lowest root score is dropped instead.
    pub fn prune(&mut self, memory_size: usize, decay_rate: f64) -> EvictionReport {
        let mut report = EvictionReport::default();
        if self.node_count() <= memory_size {
            return report;
        }

        let now = Utc::now();
        let mut heap: BinaryHeap<Reverse<LeafEntry>> = self
            .trees
            .iter()
            .flat_map(|tree| {
                tree.leaves()
                    .into_iter()
                    .filter(|n| !n.is_root())
                    .map(move |n| Reverse(LeafEntry::new(&tree.id, n, now, decay_rate)))
            })
            .collect();

        while self.node_count() > memory_size {
            let Some(Reverse(entry)) = heap.pop() else {
                let Some(tree) = self
                    .weakest_tree(now, decay_rate)
                    .and_then(|idx| self.remove_tree(idx))
                else {
                    break;
                };
                info!(tree_id = %tree.id, nodes = tree.node_count(), "Evicted whole tree");
                report.absorb_tree(tree);
                continue;
            };

            let Some(idx) = self.tree_index(&entry.tree_id) else {
                continue;
            };
            let tree = &mut self.trees[idx];
            let Some(node) = tree.get(&entry.node_id) else {
                continue;
            };
            let parent_id = node.parent_id.clone();
            if node.indexed {
                report.removed_contents.push(node.content.clone());
            }
            debug!(node_id = %entry.node_id, score = entry.score, "Evicted leaf");
            tree.remove_node(&entry.node_id);

            if tree.node_count() <= 1 {
                let Some(tree) = self.remove_tree(idx) else {
                    continue;
                };
                info!(tree_id = %tree.id, "Evicted tree reduced to its root");
                report.absorb_tree(tree);
                continue;
            }

            // An abstraction whose last child just went is now a candidate too.
            if let Some(parent) = parent_id.as_deref().and_then(|pid| tree.nodes.get(pid)) {
                if parent.is_leaf() && !parent.is_root() {
                    heap.push(Reverse(LeafEntry::new(&tree.id, parent, now, decay_rate)));
                }
            }
        }

        if !report.is_empty() {
            self.meta.last_update = now;
        }
        report
    }

    fn weakest_tree(&self, now: DateTime<Utc>, decay_rate: f64) -> Option<usize> {
        self.trees
            .iter()
            .enumerate()
            .map(|(i, t)| (i, t.root().map_or(0.0, |r| r.score(now, decay_rate))))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }
}
