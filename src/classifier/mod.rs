//! Intent classifier: the orchestrator tying the vector space, the forest and
//! the transition chain together.
//!
//! One prompt moves through:
//!
//! ```text
//! RECEIVED -> TOKENIZED -> VECTORIZED -> CLASSIFIED{NEW|BRANCH|EXTEND}
//!   -> APPLIED -> BUBBLED_UP -> CORPUS_UPDATED -> [PRUNED]
//!   -> TRANSITION_RECORDED -> RENDERED
//! ```
//!
//! A prompt with no tokens exits right after tokenization without touching state.

mod cache;
mod dry_run;
mod render;

pub use cache::VectorCache;
pub use dry_run::{DryRunResult, LeafScore, TreeScore};
pub use render::{insert_before_close, CLOSE_MARKER};

use std::collections::HashMap;
use std::fmt;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::GateConfig;
use crate::forest::{Forest, Tree};
use crate::guide::Guide;
use crate::text::tokenize;
use crate::tfidf::{cosine_similarity, Corpus, SparseVector};
use crate::transition::TransitionChain;

/// Source id recorded on roots touched by response reinforcement.
pub const REINFORCE_SOURCE: &str = "guide-reinforce";

/// Separator between terms of an abstracted node.
const TERM_SEPARATOR: &str = " | ";

/// How a prompt relates to existing memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Unrelated: start a new tree.
    New,
    /// Broadly related: add under the matched tree's root.
    Branch,
    /// Closely related: add next to the matched leaf.
    Extend,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::New => write!(f, "new"),
            Action::Branch => write!(f, "branch"),
            Action::Extend => write!(f, "extend"),
        }
    }
}

/// Outcome of [`Classifier::classify`].
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Chosen action.
    pub action: Action,
    /// Index of the best-matching tree (0 when nothing matched).
    pub tree_idx: usize,
    /// Best-matching leaf; `None` when the root scored highest.
    pub leaf_id: Option<String>,
    /// Highest boosted similarity.
    pub score: f64,
}

impl Classification {
    fn new_topic() -> Self {
        Self {
            action: Action::New,
            tree_idx: 0,
            leaf_id: None,
            score: 0.0,
        }
    }
}

/// Owns the in-memory state for one invocation and mutates it per prompt.
#[derive(Debug, Clone)]
pub struct Classifier {
    /// Topic memory.
    pub forest: Forest,
    /// Document frequencies of every indexed prompt.
    pub corpus: Corpus,
    /// Topic transition model.
    pub chain: TransitionChain,
    /// Thresholds and limits.
    pub config: GateConfig,
    cache: VectorCache,
}

impl Classifier {
    /// A classifier over empty state.
    pub fn new(config: GateConfig) -> Self {
        Self::with_state(Forest::new(), Corpus::new(), TransitionChain::new(), config)
    }

    /// A classifier over previously persisted state.
    pub fn with_state(
        forest: Forest,
        corpus: Corpus,
        chain: TransitionChain,
        config: GateConfig,
    ) -> Self {
        Self {
            forest,
            corpus,
            chain,
            config,
            cache: VectorCache::new(),
        }
    }

    /// Memoized node vectors.
    pub fn cache(&self) -> &VectorCache {
        &self.cache
    }

    /// Multiplicative transition boost for a candidate tree.
    ///
    /// `1 + α × P(last topic → tree)`, or exactly 1 when boosting is off or no
    /// previous topic exists. A zero cosine therefore stays zero.
    pub fn boost_factor(&self, tree_id: &str) -> f64 {
        let alpha = self.config.transition_boost;
        match self.chain.last_topic.as_deref() {
            Some(last) if alpha > 0.0 => 1.0 + alpha * self.chain.probability(last, tree_id),
            _ => 1.0,
        }
    }

    /// Compare a prompt vector with every root and leaf and pick an action.
    pub fn classify(&mut self, vector: &SparseVector) -> Classification {
        if self.forest.is_empty() || vector.is_empty() {
            return Classification::new_topic();
        }

        let scores = self.score_trees(vector);
        self.select(&scores)
    }

    /// Highest boosted root or leaf score, first match winning ties.
    fn select(&self, scores: &[TreeScore]) -> Classification {
        let mut best = Classification::new_topic();
        for ts in scores {
            if ts.root_boosted > best.score {
                best.score = ts.root_boosted;
                best.tree_idx = ts.tree_idx;
                best.leaf_id = None;
            }
            for ls in &ts.leaf_scores {
                if ls.boosted > best.score {
                    best.score = ls.boosted;
                    best.tree_idx = ts.tree_idx;
                    best.leaf_id = Some(ls.leaf_id.clone());
                }
            }
        }
        best.action = self.action_for(best.score);
        best
    }

    fn action_for(&self, score: f64) -> Action {
        if score >= self.config.extend_threshold {
            Action::Extend
        } else if score >= self.config.branch_threshold {
            Action::Branch
        } else {
            Action::New
        }
    }

    /// Mutate the forest according to `cls` and return the affected tree index.
    ///
    /// New content always lands in an indexed leaf. EXTEND whose leaf has
    /// vanished falls back to BRANCH; a classification pointing at a missing
    /// tree starts a new one.
    pub fn apply(&mut self, cls: &Classification, content: &str, source: &str) -> usize {
        if cls.action == Action::New || cls.tree_idx >= self.forest.trees.len() {
            let mut tree = Tree::new(content, source);
            if let Some(root) = tree.root_mut() {
                root.indexed = true;
            }
            info!(tree_id = %tree.id, "Started new topic");
            return self.forest.add_tree(tree);
        }

        let idx = cls.tree_idx;
        let tree = &mut self.forest.trees[idx];
        let matched_parent = match (cls.action, cls.leaf_id.as_deref()) {
            (Action::Extend, Some(leaf_id)) => tree.get(leaf_id).map(|leaf| leaf.parent_id.clone()),
            _ => None,
        };

        let parent_id = match matched_parent {
            Some(Some(parent_id)) => parent_id,
            _ => {
                // BRANCH, or a root/vanished leaf: attach under the root.
                preserve_root(tree);
                tree.root_id.clone()
            }
        };

        if let Some(child) = tree.add_child(&parent_id, content, source) {
            child.indexed = true;
        }
        debug!(tree_id = %tree.id, action = %cls.action, "Attached prompt");

        let root_id = tree.root_id.clone();
        self.bubble_up(idx, &root_id);
        idx
    }

    /// Rewrite every internal node under `node_id` from its descendant leaves.
    ///
    /// Each internal node becomes the top `bubble_up_terms` stemmed terms of
    /// its leaves, by count then alphabetically, joined with ` | `. Rewritten
    /// nodes are never indexed and lose their cached vector. Leaves are left
    /// alone, so re-running on unchanged leaves is a no-op.
    pub fn bubble_up(&mut self, tree_idx: usize, node_id: &str) {
        let Some(tree) = self.forest.trees.get_mut(tree_idx) else {
            return;
        };
        let internal: Vec<String> = tree
            .subtree(node_id)
            .into_iter()
            .filter(|n| !n.is_leaf())
            .map(|n| n.id.clone())
            .collect();

        // Reverse pre-order visits children before their parents.
        for id in internal.iter().rev() {
            let summary = abstract_leaves(tree, id, self.config.bubble_up_terms);
            if let Some(node) = tree.get_mut(id) {
                node.content = summary;
                node.indexed = false;
            }
            self.cache.invalidate(id);
        }
    }

    /// Classify `prompt`, store it, keep memory bounded, and render the context.
    ///
    /// Returns an empty string and leaves every structure untouched when the
    /// prompt has no meaningful tokens.
    pub fn process_prompt(&mut self, prompt: &str, source: &str) -> String {
        let tokens = tokenize(prompt);
        if tokens.is_empty() {
            debug!("Prompt has no meaningful tokens, skipping");
            return String::new();
        }

        let vector = self.corpus.vectorize_tokens(&tokens);
        let cls = self.classify(&vector);
        debug!(
            action = %cls.action,
            score = cls.score,
            tree_idx = cls.tree_idx,
            "Classified prompt"
        );

        let idx = self.apply(&cls, prompt, source);
        let current = self.forest.trees[idx].id.clone();

        self.forest.meta.total_prompts += 1;
        self.forest.meta.last_update = Utc::now();

        self.corpus.add_document(&tokens);
        self.cache.clear();

        if self.forest.node_count() > self.config.memory_size {
            let report = self
                .forest
                .prune(self.config.memory_size, self.config.decay_rate);
            for content in &report.removed_contents {
                self.corpus.remove_document(&tokenize(content));
            }
            for tree_id in &report.removed_tree_ids {
                self.chain.prune_topic(tree_id);
            }
            self.cache.clear();
            info!(
                removed_documents = report.removed_contents.len(),
                removed_trees = report.removed_tree_ids.len(),
                nodes = self.forest.node_count(),
                "Evicted memory over capacity"
            );
        }

        if self.forest.tree(&current).is_some() {
            if let Some(last) = self.chain.last_topic.take() {
                self.chain.record(&last, &current);
            }
            self.chain.last_topic = Some(current);
        } else {
            self.chain.last_topic = None;
        }

        self.render_context()
    }

    /// Touch the roots that unreinforced guide entries talk about.
    ///
    /// Matching uses plain cosine against tree roots with no transition boost.
    /// Only matches at or above the branch threshold count. Every processed
    /// entry is marked reinforced either way. Returns how many roots were touched.
    pub fn reinforce_from_guide(&mut self, guide: &mut Guide) -> usize {
        let mut reinforced = 0;
        for entry in guide.unreinforced_mut() {
            let tokens = tokenize(&entry.summary);
            if !tokens.is_empty() {
                let vector = self.corpus.vectorize_tokens(&tokens);
                if let Some((idx, score)) = self.best_root(&vector) {
                    if score >= self.config.branch_threshold {
                        let max_sources = self.config.max_sources_per_node;
                        if let Some(root) = self.forest.trees[idx].root_mut() {
                            root.touch(max_sources, REINFORCE_SOURCE);
                            reinforced += 1;
                        }
                    }
                }
            }
            entry.reinforced = true;
        }
        if reinforced > 0 {
            info!(reinforced, "Reinforced topics from responses");
        }
        reinforced
    }

    fn best_root(&mut self, vector: &SparseVector) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (i, tree) in self.forest.trees.iter().enumerate() {
            let Some(root) = tree.root() else {
                continue;
            };
            let score = cosine_similarity(vector, self.cache.get_or_compute(&self.corpus, root));
            if score > best.map_or(0.0, |(_, s)| s) {
                best = Some((i, score));
            }
        }
        best
    }
}

/// When the root is still a leaf, copy it into a child so the original prompt
/// survives the root being rewritten as an abstraction.
fn preserve_root(tree: &mut Tree) {
    let Some(root) = tree.root().filter(|r| r.is_leaf()).cloned() else {
        return;
    };
    if let Some(child) = tree.add_child(&root.id, root.content, "") {
        child.sources = root.sources;
        child.frequency = root.frequency;
        child.weight = root.weight;
        child.created = root.created;
        child.last_accessed = root.last_accessed;
        child.indexed = root.indexed;
    }
}

/// Top `k` terms across the leaves under `node_id`.
fn abstract_leaves(tree: &Tree, node_id: &str, k: usize) -> String {
    let mut freq: HashMap<String, usize> = HashMap::new();
    for leaf in tree.leaves_under(node_id) {
        for token in tokenize(&leaf.content) {
            *freq.entry(token).or_insert(0) += 1;
        }
    }

    let mut terms: Vec<(String, usize)> = freq.into_iter().collect();
    terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    terms
        .into_iter()
        .take(k)
        .map(|(term, _)| term)
        .collect::<Vec<_>>()
        .join(TERM_SEPARATOR)
}
