use std::collections::HashMap;

use crate::forest::Node;
use crate::tfidf::{Corpus, SparseVector};

/// Lazily computed node vectors keyed by node id.
///
/// Invalidation rules:
/// - a node whose content changes drops its own entry;
/// - any corpus mutation drops everything, since IDF weights shift globally.
#[derive(Debug, Clone, Default)]
pub struct VectorCache {
    entries: HashMap<String, SparseVector>,
}

impl VectorCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached vector for `node`, computing it against `corpus` on a miss.
    pub fn get_or_compute(&mut self, corpus: &Corpus, node: &Node) -> &SparseVector {
        self.entries
            .entry(node.id.clone())
            .or_insert_with(|| corpus.vectorize(&node.content))
    }

    /// Drop one node's entry after its content changed.
    pub fn invalidate(&mut self, node_id: &str) {
        self.entries.remove(node_id);
    }

    /// Drop every entry after the corpus changed.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Whether a vector is memoized for `node_id`.
    pub fn contains(&self, node_id: &str) -> bool {
        self.entries.contains_key(node_id)
    }

    /// Number of memoized vectors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is memoized.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
